use serde::{Deserialize, Serialize};

use bounty_storage::queries;

use crate::{BountyService, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RebuildReport {
	pub trackers_indexed: u64,
	pub issues_indexed: u64,
}

impl BountyService {
	/// Re-upserts every stored tracker and issue into the search index.
	pub async fn rebuild_index(&self) -> Result<RebuildReport> {
		let trackers = queries::all_trackers(&self.db).await?;
		let trackers_indexed = self.index.upsert_trackers(&trackers).await?;
		let issues = queries::issue_index_rows(&self.db, None).await?;
		let issues_indexed = self.index.upsert_issues(&issues).await?;

		tracing::info!(trackers_indexed, issues_indexed, "Search index rebuilt.");

		Ok(RebuildReport { trackers_indexed, issues_indexed })
	}
}
