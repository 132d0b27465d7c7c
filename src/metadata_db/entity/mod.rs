use super::schema;

// Basic entity mappings on database tables (Should be mostly 1:1 copies of our schema and helpers).
pub mod item;
pub use self::item::Item;
pub mod item_kind_enum;
pub use self::item_kind_enum::ItemKind;
pub mod item_accessibility;
pub use self::item_accessibility::ItemAccessibility;
pub mod item_rating;
pub use self::item_rating::ItemRating;
pub mod suggestion;
pub use self::suggestion::Suggestion;
pub mod user;
pub use self::user::User;
