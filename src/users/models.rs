use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub full_name: String,
    pub role: String,
    pub password_hash: String,
    pub online: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// A user as returned by the API; never carries the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub id: String,
    pub full_name: String,
    pub role: String,
    pub online: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<Model> for UserProfile {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            full_name: model.full_name,
            role: model.role,
            online: model.online,
            last_login: model.last_login,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub id: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserCreate {
    pub id: String,
    pub full_name: String,
    #[serde(default = "default_role")]
    pub role: String,
    pub password: String,
}

fn default_role() -> String {
    "engineer".to_string()
}
