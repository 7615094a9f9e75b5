use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub db_url: Option<String>,
    pub app_name: String,
    pub deployment: String,
    pub bind_addr: String,
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    pub s3_bucket_id: Option<String>,
    pub s3_url: Option<String>,
    /// Logical bucket that device, equipment and calibration media land in.
    pub media_bucket: String,
    /// Prefix of every public media URL, joined as `<base>/<bucket>/<path>`.
    pub storage_public_url: String,
    pub session_max_age_hours: i64,
    pub require_session: bool,
    pub admin_user_id: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok(); // Load from .env file if available
        let db_url = env::var("DATABASE_URL").or_else(|_| env::var("DB_URL")).ok().or_else(|| {
            Some(format!(
                "{}://{}:{}@{}:{}/{}",
                env::var("DB_PREFIX").unwrap_or_else(|_| "postgresql".to_string()),
                env::var("DB_USER").expect("DB_USER must be set"),
                env::var("DB_PASSWORD").expect("DB_PASSWORD must be set"),
                env::var("DB_HOST").expect("DB_HOST must be set"),
                env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string()),
                env::var("DB_NAME").expect("DB_NAME must be set"),
            ))
        });

        let mut config = Config {
            app_name: env::var("APP_NAME").expect("APP_NAME must be set"),
            deployment: env::var("DEPLOYMENT")
                .expect("DEPLOYMENT must be set, this can be local, dev, stage, or prod"),
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            s3_access_key: env::var("S3_ACCESS_KEY").ok(),
            s3_secret_key: env::var("S3_SECRET_KEY").ok(),
            s3_bucket_id: env::var("S3_BUCKET_ID").ok(),
            s3_url: env::var("S3_URL").ok().filter(|url| !url.is_empty()),
            media_bucket: env::var("MEDIA_BUCKET").unwrap_or_else(|_| "media".to_string()),
            storage_public_url: String::new(),
            session_max_age_hours: env::var("SESSION_MAX_AGE_HOURS")
                .ok()
                .and_then(|hours| hours.parse().ok())
                .unwrap_or(24),
            require_session: env::var("REQUIRE_SESSION")
                .map(|value| !matches!(value.to_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(true),
            admin_user_id: env::var("ADMIN_USER_ID").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            db_url,
        };

        let public_url = env::var("STORAGE_PUBLIC_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .or_else(|| config.s3_public_base())
            .unwrap_or_else(|| "http://localhost:3000/media".to_string());
        config.storage_public_url = public_url.trim_end_matches('/').to_string();
        config
    }

    /// Bucket that S3 objects are written to.
    pub fn s3_physical_bucket(&self) -> String {
        self.s3_bucket_id
            .clone()
            .unwrap_or_else(|| self.media_bucket.clone())
    }

    /// Key prefix in front of `<bucket>/<path>` for every S3 object.
    pub fn s3_key_prefix(&self) -> String {
        format!("{}/{}", self.app_name, self.deployment)
    }

    /// Public base under which `<bucket>/<path>` addresses an S3 object
    /// directly, with path-style addressing.
    pub fn s3_public_base(&self) -> Option<String> {
        let endpoint = self.s3_url.as_deref()?.trim_end_matches('/');
        Some(format!(
            "{endpoint}/{}/{}",
            self.s3_physical_bucket(),
            self.s3_key_prefix()
        ))
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            app_name: "instrument-api-test".to_string(),
            deployment: "test".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            s3_access_key: None,
            s3_secret_key: None,
            s3_bucket_id: None,
            s3_url: None,
            media_bucket: "media".to_string(),
            storage_public_url: "http://storage.test/storage/v1/object/public".to_string(),
            session_max_age_hours: 24,
            require_session: false,
            admin_user_id: None,
            admin_password: None,
            db_url: None,
        }
    }
}
