use std::sync::Arc;

use bounty_service::BountyService;
use bounty_storage::{db::Db, index::SearchIndexStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<BountyService>,
}
impl AppState {
	pub async fn new(config: bounty_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let index = SearchIndexStore::new(&config.storage.qdrant)?;

		index.ensure_collections().await?;

		let service = BountyService::new(config, db, index);

		Ok(Self { service: Arc::new(service) })
	}
}
