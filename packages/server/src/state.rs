use std::sync::Arc;

use lules_common::storage::ObjectStore;
use sea_orm::DatabaseConnection;

use crate::cache::QueryCache;
use crate::config::AppConfig;
use crate::mail::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub object_store: Arc<dyn ObjectStore>,
    pub mailer: Arc<dyn Mailer>,
    pub cache: Arc<QueryCache>,
}
