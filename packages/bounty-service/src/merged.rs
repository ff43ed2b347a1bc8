use bounty_domain::merged;
use bounty_storage::{
	models::{Issue, Tracker},
	queries,
};

use crate::{BountyService, Result};

impl BountyService {
	/// Removes items whose extracted id was merged away, with one lookup for the whole batch.
	pub async fn filter_merged<T, F>(&self, items: &mut Vec<T>, id_of: F) -> Result<()>
	where
		F: Fn(&T) -> i64,
	{
		let ids = merged::candidate_ids(items.iter().map(&id_of));
		let bad_ids = queries::merged_bad_ids(&self.db, &ids).await?;

		if !bad_ids.is_empty() {
			tracing::debug!(removed_ids = ?bad_ids, "Dropping merged entities.");
		}

		merged::reject_merged(items, &bad_ids, id_of);

		Ok(())
	}

	pub async fn filter_merged_trackers(&self, trackers: &mut Vec<Tracker>) -> Result<()> {
		self.filter_merged(trackers, |tracker| tracker.id).await
	}

	/// Issues are dropped when their tracker was merged away.
	pub async fn filter_merged_issues(&self, issues: &mut Vec<Issue>) -> Result<()> {
		self.filter_merged(issues, |issue| issue.tracker_id).await
	}
}
