use crate::config::Config;
use crate::devices::schema::DeviceKind;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize, Serialize, Default)]
pub struct UIConfiguration {
    #[serde(rename = "appName")]
    pub app_name: String,
    pub deployment: String,
    /// Prefix shared by every media URL the API hands out.
    #[serde(rename = "mediaBaseUrl")]
    pub media_base_url: String,
    #[serde(rename = "deviceKinds")]
    pub device_kinds: Vec<DeviceKind>,
    #[serde(rename = "requireSession")]
    pub require_session: bool,
}

impl UIConfiguration {
    pub fn new(config: &Config) -> Self {
        Self {
            app_name: config.app_name.clone(),
            deployment: config.deployment.clone(),
            media_base_url: format!("{}/{}", config.storage_public_url, config.media_bucket),
            device_kinds: DeviceKind::ALL.to_vec(),
            require_session: config.require_session,
        }
    }
}

#[derive(ToSchema, Deserialize, Serialize)]
pub struct HealthCheck {
    pub status: String,
    pub database: bool,
    pub deployment: String,
}
