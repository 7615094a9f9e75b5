use super::models::{self as users, UserCreate, UserProfile};
use super::password::{check_password, hash_password};
use crate::common::auth::verify_password;
use crate::common::errors::{BusinessError, BusinessResult, DbErrorExt};
use crate::config::Config;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel};
use tracing::{info, warn};

fn invalid_credentials() -> BusinessError {
    BusinessError::Unauthenticated {
        message: "invalid user id or password".to_string(),
    }
}

pub async fn find_user(db: &DatabaseConnection, id: &str) -> BusinessResult<users::Model> {
    users::Entity::find_by_id(id.to_string())
        .one(db)
        .await
        .map_err(|err| err.to_business_error("user"))?
        .ok_or_else(|| crate::not_found!("User", id))
}

pub async fn create_user(db: &DatabaseConnection, new: UserCreate) -> BusinessResult<UserProfile> {
    let id = new.id.trim().to_string();
    let full_name = new.full_name.trim().to_string();
    if id.is_empty() {
        return Err(crate::validation_error!("id", "id is required"));
    }
    if full_name.is_empty() {
        return Err(crate::validation_error!("full_name", "full name is required"));
    }
    check_password(&new.password).map_err(|message| crate::validation_error!("password", message))?;

    let password_hash = hash_password(&new.password).map_err(|err| BusinessError::InternalError {
        message: format!("could not hash password: {err}"),
    })?;

    let user = users::ActiveModel {
        id: Set(id),
        full_name: Set(full_name),
        role: Set(new.role.trim().to_string()),
        password_hash: Set(password_hash),
        online: Set(false),
        last_login: Set(None),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
    .map_err(|err| match err.to_business_error("user") {
        BusinessError::Duplicate { .. } => crate::duplicate_resource!("User", "id"),
        other => other,
    })?;

    info!(user_id = %user.id, role = %user.role, "Created user");
    Ok(user.into())
}

/// Checks the password and marks the user online.
pub async fn login(db: &DatabaseConnection, id: &str, password: &str) -> BusinessResult<UserProfile> {
    let user = users::Entity::find_by_id(id.trim().to_string())
        .one(db)
        .await
        .map_err(|err| err.to_business_error("user"))?;

    if !verify_password(password, user.as_ref().map(|user| user.password_hash.as_str())) {
        warn!(user_id = %id, "Rejected login");
        return Err(invalid_credentials());
    }
    let Some(user) = user else {
        return Err(invalid_credentials());
    };

    let mut active = user.into_active_model();
    active.online = Set(true);
    active.last_login = Set(Some(chrono::Utc::now()));
    let user = active
        .update(db)
        .await
        .map_err(|err| err.to_business_error("user"))?;

    info!(user_id = %user.id, "User logged in");
    Ok(user.into())
}

pub async fn logout(db: &DatabaseConnection, id: &str) -> BusinessResult<()> {
    let Some(user) = users::Entity::find_by_id(id.to_string())
        .one(db)
        .await
        .map_err(|err| err.to_business_error("user"))?
    else {
        return Ok(());
    };

    let mut active = user.into_active_model();
    active.online = Set(false);
    active
        .update(db)
        .await
        .map_err(|err| err.to_business_error("user"))?;

    info!(user_id = %id, "User logged out");
    Ok(())
}

/// Creates the configured admin account on first start.
pub async fn bootstrap_admin(db: &DatabaseConnection, config: &Config) -> BusinessResult<()> {
    let (Some(id), Some(password)) = (&config.admin_user_id, &config.admin_password) else {
        return Ok(());
    };

    let existing = users::Entity::find_by_id(id.clone())
        .one(db)
        .await
        .map_err(|err| err.to_business_error("user"))?;
    if existing.is_some() {
        return Ok(());
    }

    create_user(
        db,
        UserCreate {
            id: id.clone(),
            full_name: "Administrator".to_string(),
            role: "admin".to_string(),
            password: password.clone(),
        },
    )
    .await?;
    info!(user_id = %id, "Bootstrapped admin user");
    Ok(())
}
