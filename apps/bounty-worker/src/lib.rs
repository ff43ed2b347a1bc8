pub mod worker;

mod error;

pub use error::{Error, Result};

use clap::Parser;

use bounty_cli::ConfigArgs;
use bounty_providers::github::GithubClient;
use bounty_service::BountyService;
use bounty_storage::{db::Db, index::SearchIndexStore};

#[derive(Debug, Parser)]
#[command(
	version = bounty_cli::VERSION,
	rename_all = "kebab",
	styles = bounty_cli::styles(),
)]
pub struct Args {
	#[command(flatten)]
	pub config: ConfigArgs,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = bounty_config::load(&args.config.config)?;

	bounty_cli::init_tracing(&config.service.log_level);

	let db = Db::connect(&config.storage.postgres).await?;

	db.ensure_schema().await?;

	let index = SearchIndexStore::new(&config.storage.qdrant)?;

	index.ensure_collections().await?;

	let github = GithubClient::new(&config.providers.github)?;
	let service = BountyService::new(config, db, index);

	tracing::info!(version = bounty_cli::VERSION, "Worker started.");

	worker::run_worker(worker::WorkerState { service, github }).await?;

	Ok(())
}
