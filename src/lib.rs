#[macro_use]
extern crate diesel;

pub mod config;
pub mod fs_interaction;
pub mod metadata_db;
pub mod vault;
