//! Database queries for annotations.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;

use crate::entity::annotation::{self, ActiveModel, Entity as Annotation};
use crate::error::{AppError, AppResult};
use crate::models::{AnnotationCreate, AnnotationUpdate};

use super::images::find_image;
use super::{DbPool, db_error};

/// Look up one annotation by its composite key.
pub async fn find_annotation<C: ConnectionTrait>(
    db: &C,
    image_key: &str,
    index: i32,
) -> AppResult<Option<annotation::Model>> {
    Annotation::find_by_id((image_key.to_string(), index))
        .one(db)
        .await
        .map_err(|e| db_error("Failed to get annotation", e))
}

impl DbPool {
    /// Get all annotations of an image, ordered by index.
    ///
    /// Returns `NotFound` when the image does not exist, so an empty list
    /// always means "image without annotations".
    pub async fn get_annotations_by_image(
        &self,
        image_key: &str,
    ) -> AppResult<Vec<annotation::Model>> {
        if find_image(self.connection(), image_key).await?.is_none() {
            return Err(AppError::NotFound(format!("Image {}", image_key)));
        }

        Annotation::find()
            .filter(annotation::Column::ImageKey.eq(image_key))
            .order_by_asc(annotation::Column::Index)
            .all(self.connection())
            .await
            .map_err(|e| db_error("Failed to get annotations", e))
    }

    /// Add an annotation to an existing image.
    pub async fn create_annotation(
        &self,
        image_key: &str,
        req: &AnnotationCreate,
    ) -> AppResult<annotation::Model> {
        let txn = self.begin().await?;

        if find_image(&txn, image_key).await?.is_none() {
            return Err(AppError::NotFound(format!("Image {}", image_key)));
        }

        if find_annotation(&txn, image_key, req.index).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Annotation {} already exists for image {}",
                req.index, image_key
            )));
        }

        let created = annotation::Model {
            image_key: image_key.to_string(),
            index: req.index,
            instrument: req.instrument.clone(),
            polygon: req.polygon.to_json(),
        };

        let model = ActiveModel {
            image_key: Set(created.image_key.clone()),
            index: Set(created.index),
            instrument: Set(created.instrument.clone()),
            polygon: Set(created.polygon.clone()),
        };

        Annotation::insert(model)
            .exec_without_returning(&txn)
            .await
            .map_err(|e| db_error("Failed to insert annotation", e))?;

        txn.commit()
            .await
            .map_err(|e| db_error("Failed to commit annotation", e))?;

        info!(
            "Annotation created: image={}, index={}, instrument={}",
            image_key, created.index, created.instrument
        );

        Ok(created)
    }

    /// Replace the instrument and polygon of an existing annotation.
    pub async fn update_annotation(
        &self,
        image_key: &str,
        index: i32,
        req: &AnnotationUpdate,
    ) -> AppResult<annotation::Model> {
        let txn = self.begin().await?;

        let existing = find_annotation(&txn, image_key, index)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Annotation {} of image {}", index, image_key))
            })?;

        let mut active: ActiveModel = existing.into();
        active.instrument = Set(req.instrument.clone());
        active.polygon = Set(req.polygon.to_json());

        let updated = active
            .update(&txn)
            .await
            .map_err(|e| db_error("Failed to update annotation", e))?;

        txn.commit()
            .await
            .map_err(|e| db_error("Failed to commit annotation update", e))?;

        info!(
            "Annotation updated: image={}, index={}, instrument={}",
            image_key, index, updated.instrument
        );

        Ok(updated)
    }
}
