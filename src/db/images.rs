//! Database queries for images.

use std::collections::HashMap;

use sea_orm::sea_query::Query;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::info;

use crate::entity::annotation::{self, Entity as Annotation};
use crate::entity::image::{self, ActiveModel, Entity as Image};
use crate::error::{AppError, AppResult};
use crate::models::{ImageCreate, ImageFilter};

use super::{DbPool, db_error, directory};

/// An image row together with its annotations, ordered by index.
pub type ImageWithAnnotations = (image::Model, Vec<annotation::Model>);

/// Look up an image by key.
pub async fn find_image<C: ConnectionTrait>(
    db: &C,
    image_key: &str,
) -> AppResult<Option<image::Model>> {
    Image::find_by_id(image_key.to_string())
        .one(db)
        .await
        .map_err(|e| db_error("Failed to get image", e))
}

/// Fetch annotations for many images in one query, grouped by image key.
pub async fn annotations_for_images<C: ConnectionTrait>(
    db: &C,
    image_keys: &[String],
) -> AppResult<HashMap<String, Vec<annotation::Model>>> {
    if image_keys.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = Annotation::find()
        .filter(annotation::Column::ImageKey.is_in(image_keys.to_vec()))
        .order_by_asc(annotation::Column::ImageKey)
        .order_by_asc(annotation::Column::Index)
        .all(db)
        .await
        .map_err(|e| db_error("Failed to get annotations", e))?;

    let mut grouped: HashMap<String, Vec<annotation::Model>> = HashMap::new();
    for row in rows {
        grouped.entry(row.image_key.clone()).or_default().push(row);
    }
    Ok(grouped)
}

impl DbPool {
    /// Get an image by key.
    pub async fn get_image(&self, image_key: &str) -> AppResult<Option<image::Model>> {
        find_image(self.connection(), image_key).await
    }

    /// Create an image, its placeholder location/user rows, and its initial
    /// annotations in one transaction.
    ///
    /// `file_name` is the storage key of an already written file, if any.
    pub async fn create_image(
        &self,
        req: &ImageCreate,
        file_name: Option<String>,
    ) -> AppResult<ImageWithAnnotations> {
        let txn = self.begin().await?;

        if find_image(&txn, &req.image_key).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Image {} already exists",
                req.image_key
            )));
        }

        if let Some(ref location_id) = req.location_id {
            directory::ensure_location(&txn, location_id).await?;
        }
        if let Some(ref user_id) = req.user_id {
            directory::ensure_user(&txn, user_id).await?;
        }

        let image = image::Model {
            image_key: req.image_key.clone(),
            client_id: req.client_id.clone(),
            created_at: req.created_at,
            hardware_id: req.hardware_id.clone(),
            ml_tag: req.ml_tag.map(|tag| tag.as_str().to_string()),
            location_id: req.location_id.clone(),
            user_id: req.user_id.clone(),
            file_name,
        };

        let model = ActiveModel {
            image_key: Set(image.image_key.clone()),
            client_id: Set(image.client_id.clone()),
            created_at: Set(image.created_at),
            hardware_id: Set(image.hardware_id.clone()),
            ml_tag: Set(image.ml_tag.clone()),
            location_id: Set(image.location_id.clone()),
            user_id: Set(image.user_id.clone()),
            file_name: Set(image.file_name.clone()),
        };

        Image::insert(model)
            .exec_without_returning(&txn)
            .await
            .map_err(|e| db_error("Failed to insert image", e))?;

        let mut annotations: Vec<annotation::Model> = req
            .annotations
            .iter()
            .map(|a| annotation::Model {
                image_key: req.image_key.clone(),
                index: a.index,
                instrument: a.instrument.clone(),
                polygon: a.polygon.to_json(),
            })
            .collect();
        annotations.sort_by_key(|a| a.index);

        if !annotations.is_empty() {
            Annotation::insert_many(annotations.iter().map(|a| annotation::ActiveModel {
                image_key: Set(a.image_key.clone()),
                index: Set(a.index),
                instrument: Set(a.instrument.clone()),
                polygon: Set(a.polygon.clone()),
            }))
            .exec_without_returning(&txn)
            .await
            .map_err(|e| db_error("Failed to insert annotations", e))?;
        }

        txn.commit()
            .await
            .map_err(|e| db_error("Failed to commit image", e))?;

        info!(
            "Image created: key={}, annotations={}, has_file={}",
            image.image_key,
            annotations.len(),
            image.file_name.is_some()
        );

        Ok((image, annotations))
    }

    /// List images with their annotations.
    ///
    /// Non-empty filters are ANDed; each matches any of its ids. The
    /// instrument filter is a semi-join, so an image appears once however
    /// many of its annotations match.
    pub async fn list_images(&self, filter: &ImageFilter) -> AppResult<Vec<ImageWithAnnotations>> {
        let mut select = Image::find();

        if !filter.user_ids.is_empty() {
            select = select.filter(image::Column::UserId.is_in(filter.user_ids.clone()));
        }

        if !filter.location_ids.is_empty() {
            select = select.filter(image::Column::LocationId.is_in(filter.location_ids.clone()));
        }

        if !filter.instrument_ids.is_empty() {
            select = select.filter(
                image::Column::ImageKey.in_subquery(
                    Query::select()
                        .column(annotation::Column::ImageKey)
                        .from(Annotation)
                        .and_where(
                            annotation::Column::Instrument.is_in(filter.instrument_ids.clone()),
                        )
                        .to_owned(),
                ),
            );
        }

        let images = select
            .order_by_asc(image::Column::ImageKey)
            .all(self.connection())
            .await
            .map_err(|e| db_error("Failed to list images", e))?;

        let keys: Vec<String> = images.iter().map(|i| i.image_key.clone()).collect();
        let mut grouped = annotations_for_images(self.connection(), &keys).await?;

        Ok(images
            .into_iter()
            .map(|image| {
                let annotations = grouped.remove(&image.image_key).unwrap_or_default();
                (image, annotations)
            })
            .collect())
    }

    /// Delete an image and its annotations.
    ///
    /// Returns the deleted row and the number of annotations removed, or
    /// `NotFound` when no image has this key.
    pub async fn delete_image(&self, image_key: &str) -> AppResult<(image::Model, u64)> {
        let txn = self.begin().await?;

        let image = find_image(&txn, image_key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image {}", image_key)))?;

        // Explicit delete keeps the cascade independent of backend FK enforcement
        let annotations = Annotation::delete_many()
            .filter(annotation::Column::ImageKey.eq(image_key))
            .exec(&txn)
            .await
            .map_err(|e| db_error("Failed to delete annotations", e))?;

        Image::delete_by_id(image_key.to_string())
            .exec(&txn)
            .await
            .map_err(|e| db_error("Failed to delete image", e))?;

        txn.commit()
            .await
            .map_err(|e| db_error("Failed to commit image deletion", e))?;

        info!(
            "Image deleted: key={}, annotations={}",
            image_key, annotations.rows_affected
        );

        Ok((image, annotations.rows_affected))
    }
}
