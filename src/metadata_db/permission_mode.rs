/// Policy deciding who receives access to a freshly added subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    /// Every user known at the time of the add.
    All,
    /// Every administrator known at the time of the add.
    Administrators,
    /// Only the user performing the add.
    Owner,
}

impl PermissionMode {
    /// Parses the textual mode ("all", "admin" or "self", case insensitive).
    /// Anything unrecognized falls back to sharing with everybody.
    pub fn parse(mode: &str) -> Self {
        match mode.trim().to_lowercase().as_str() {
            "self" => Self::Owner,
            "admin" => Self::Administrators,
            _ => Self::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Administrators => "admin",
            Self::Owner => "self",
        }
    }
}

impl Default for PermissionMode {
    fn default() -> Self {
        Self::All
    }
}
