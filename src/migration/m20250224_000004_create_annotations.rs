//! Migration: Create annotations table.
//!
//! Composite primary key (image_key, index); rows go away with their image.

use sea_orm_migration::prelude::*;

use super::m20250224_000003_create_images::Images;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Annotations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Annotations::ImageKey).string().not_null())
                    .col(ColumnDef::new(Annotations::Index).integer().not_null())
                    .col(ColumnDef::new(Annotations::Instrument).string().not_null())
                    .col(ColumnDef::new(Annotations::Polygon).json_binary().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_annotations")
                            .col(Annotations::ImageKey)
                            .col(Annotations::Index),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_annotations_image_key")
                            .from(Annotations::Table, Annotations::ImageKey)
                            .to(Images::Table, Images::ImageKey)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Instrument filter on the image listing
        manager
            .create_index(
                Index::create()
                    .name("idx_annotations_instrument")
                    .table(Annotations::Table)
                    .col(Annotations::Instrument)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(Annotations::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
pub enum Annotations {
    Table,
    ImageKey,
    Index,
    Instrument,
    Polygon,
}
