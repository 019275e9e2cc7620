//! Annotation entity for SeaORM.
//!
//! Keyed by `(image_key, index)`; the polygon is stored as
//! `{"points": [[x, y], ...]}`.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "annotations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub image_key: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub index: i32,
    pub instrument: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub polygon: JsonValue,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::image::Entity",
        from = "Column::ImageKey",
        to = "super::image::Column::ImageKey",
        on_delete = "Cascade"
    )]
    Image,
}

impl Related<super::image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Image.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
