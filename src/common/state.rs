use crate::config::Config;
use crate::devices::store::{RecordStore, SqlRecordStore};
use crate::external::blob::BlobStore;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    /// Table-agnostic query interface used by the device workflow.
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: Config, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            records: Arc::new(SqlRecordStore::new(db.clone())),
            db,
            config,
            blobs,
        }
    }

    #[cfg(test)]
    pub fn with_records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = records;
        self
    }
}
