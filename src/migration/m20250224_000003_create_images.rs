//! Migration: Create images table.
//!
//! Location and user references are nullable; removing a location or user
//! detaches its images instead of deleting them.

use sea_orm_migration::prelude::*;

use super::m20250224_000001_create_locations::Locations;
use super::m20250224_000002_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Images::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Images::ImageKey)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Images::ClientId).string().not_null())
                    .col(
                        ColumnDef::new(Images::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Images::HardwareId).string().null())
                    .col(ColumnDef::new(Images::MlTag).string_len(8).null())
                    .col(ColumnDef::new(Images::LocationId).string().null())
                    .col(ColumnDef::new(Images::UserId).string().null())
                    .col(ColumnDef::new(Images::FileName).string().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_images_location_id")
                            .from(Images::Table, Images::LocationId)
                            .to(Locations::Table, Locations::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_images_user_id")
                            .from(Images::Table, Images::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Filter columns used by the image listing
        manager
            .create_index(
                Index::create()
                    .name("idx_images_user_id")
                    .table(Images::Table)
                    .col(Images::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_images_location_id")
                    .table(Images::Table)
                    .col(Images::LocationId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Images::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Images {
    Table,
    ImageKey,
    ClientId,
    CreatedAt,
    HardwareId,
    MlTag,
    LocationId,
    UserId,
    FileName,
}
