use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::*;
use serde::Deserialize;
use std::io::Write;

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromSqlRow, AsExpression, Deserialize)]
#[sql_type = "Integer"]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Directory = 1,
    Video = 2,
    Audio = 3,
    Image = 4,
    Text = 5,
    File = 6,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Text => "text",
            Self::File => "file",
        }
    }
}

impl<DB> FromSql<Integer, DB> for ItemKind
where
    DB: Backend,
    i32: FromSql<Integer, DB>,
{
    fn from_sql(bytes: Option<&DB::RawValue>) -> deserialize::Result<Self> {
        match i32::from_sql(bytes)? {
            x if x == Self::Directory as i32 => Ok(Self::Directory),
            x if x == Self::Video as i32 => Ok(Self::Video),
            x if x == Self::Audio as i32 => Ok(Self::Audio),
            x if x == Self::Image as i32 => Ok(Self::Image),
            x if x == Self::Text as i32 => Ok(Self::Text),
            x if x == Self::File as i32 => Ok(Self::File),
            x => Err(format!("Unrecognized variant {}", x).into()),
        }
    }
}

impl<DB> ToSql<Integer, DB> for ItemKind
where
    DB: Backend,
    i32: ToSql<Integer, DB>,
{
    fn to_sql<W: Write>(&self, out: &mut Output<W, DB>) -> serialize::Result {
        (*self as i32).to_sql(out)
    }
}
