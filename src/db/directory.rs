//! Location and user rows referenced by images.
//!
//! Images may name a location or user that the catalog has not seen yet.
//! Such references are auto-provisioned: a placeholder row is created in the
//! caller's transaction so the foreign key holds.

use sea_orm::{ConnectionTrait, EntityTrait, Set};
use tracing::info;

use crate::entity::location::{self, Entity as Location};
use crate::entity::user::{self, Entity as User};
use crate::error::AppResult;

use super::db_error;

/// Placeholder values for auto-provisioned rows.
pub mod placeholder {
    pub const LOCATION_ADDRESS: &str = "Default Address";
    pub const LOCATION_COUNTRY: &str = "Default Country";
    pub const LOCATION_TOWN: &str = "Default Town";
    pub const USER_FIRST_NAME: &str = "Default";
    pub const USER_LAST_NAME: &str = "User";
    pub const USER_ROLE: &str = "default_role";
}

/// Make sure a location row exists. Returns `true` when a placeholder was created.
pub async fn ensure_location<C: ConnectionTrait>(db: &C, id: &str) -> AppResult<bool> {
    if find_location(db, id).await?.is_some() {
        return Ok(false);
    }

    let model = location::ActiveModel {
        id: Set(id.to_string()),
        address: Set(placeholder::LOCATION_ADDRESS.to_string()),
        country: Set(placeholder::LOCATION_COUNTRY.to_string()),
        town: Set(placeholder::LOCATION_TOWN.to_string()),
    };

    Location::insert(model)
        .exec_without_returning(db)
        .await
        .map_err(|e| db_error("Failed to insert location", e))?;

    info!("Auto-provisioned location: id={}", id);
    Ok(true)
}

/// Make sure a user row exists. Returns `true` when a placeholder was created.
pub async fn ensure_user<C: ConnectionTrait>(db: &C, id: &str) -> AppResult<bool> {
    if find_user(db, id).await?.is_some() {
        return Ok(false);
    }

    let model = user::ActiveModel {
        id: Set(id.to_string()),
        first_name: Set(placeholder::USER_FIRST_NAME.to_string()),
        last_name: Set(placeholder::USER_LAST_NAME.to_string()),
        role: Set(placeholder::USER_ROLE.to_string()),
    };

    User::insert(model)
        .exec_without_returning(db)
        .await
        .map_err(|e| db_error("Failed to insert user", e))?;

    info!("Auto-provisioned user: id={}", id);
    Ok(true)
}

/// Look up a location.
pub async fn find_location<C: ConnectionTrait>(
    db: &C,
    id: &str,
) -> AppResult<Option<location::Model>> {
    Location::find_by_id(id.to_string())
        .one(db)
        .await
        .map_err(|e| db_error("Failed to get location", e))
}

/// Look up a user.
pub async fn find_user<C: ConnectionTrait>(db: &C, id: &str) -> AppResult<Option<user::Model>> {
    User::find_by_id(id.to_string())
        .one(db)
        .await
        .map_err(|e| db_error("Failed to get user", e))
}
