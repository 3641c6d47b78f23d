mod config;
mod connection;
mod error;
mod models;
mod store;

use std::sync::Arc;

pub use config::MongoConfig;
pub use error::{MongoDaoError, MongoResult};
pub use store::MongoScoreStore;

use crate::dao::{score_store::ScoreStore, storage::StorageError};

/// Connect to MongoDB and box the store behind the [`ScoreStore`] trait.
pub async fn connect_store(
    uri: &str,
    db_name: Option<&str>,
) -> Result<Arc<dyn ScoreStore>, StorageError> {
    let config = MongoConfig::from_uri(uri, db_name).await?;
    let store = MongoScoreStore::connect(config).await?;
    Ok(Arc::new(store))
}
