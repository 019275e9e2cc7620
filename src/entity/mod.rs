//! SeaORM entity definitions for the catalog tables.

pub mod annotation;
pub mod image;
pub mod location;
pub mod user;
