//! Remote sync of one tracker: repository metadata, languages and issues, then reindexing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{Duration, OffsetDateTime};

use bounty_domain::query;
use bounty_providers::github::{GithubClient, IssueState, RemoteIssue};
use bounty_storage::{
	models::{IssueSync, TrackerSync},
	queries,
};

use crate::{BountyService, Error, Result};

pub const REMOTE_SYNC_TASK: &str = "tracker.remote_sync";

/// Unforced syncs are skipped when the tracker was synced more recently than this.
const RESYNC_INTERVAL: Duration = Duration::hours(1);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSyncArgs {
	pub tracker_id: i64,
	#[serde(default)]
	pub force: bool,
	#[serde(default)]
	pub state: IssueState,
}
impl RemoteSyncArgs {
	pub fn to_json(&self) -> Result<Value> {
		serde_json::to_value(self).map_err(|err| Error::Invariant {
			message: format!("Failed to encode remote sync arguments: {err}."),
		})
	}

	pub fn from_json(args: &Value) -> Result<Self> {
		Self::deserialize(args).map_err(|err| Error::InvalidRequest {
			message: format!("Invalid remote sync arguments: {err}."),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
	pub tracker_id: i64,
	pub skipped: bool,
	pub issues_synced: u64,
	pub issues_indexed: u64,
}

impl BountyService {
	pub async fn remote_sync(
		&self,
		github: &GithubClient,
		args: &RemoteSyncArgs,
	) -> Result<SyncReport> {
		let now = OffsetDateTime::now_utc();
		let tracker = queries::tracker_by_id(&self.db, args.tracker_id).await?.ok_or_else(|| {
			Error::NotFound { message: format!("Tracker {} does not exist.", args.tracker_id) }
		})?;

		if !args.force && tracker.synced_at.is_some_and(|synced_at| now - synced_at < RESYNC_INTERVAL)
		{
			tracing::debug!(tracker_id = tracker.id, "Tracker synced recently. Skipping.");

			return Ok(SyncReport {
				tracker_id: tracker.id,
				skipped: true,
				issues_synced: 0,
				issues_indexed: 0,
			});
		}

		let target = query::parse_github_url(&tracker.url).ok_or_else(|| Error::InvalidRequest {
			message: format!("Tracker {} does not point at a GitHub repository.", tracker.id),
		})?;
		let (owner, name) = (target.owner(), target.name());
		let repo = github.repository(owner, name).await?;
		let languages = github.languages(owner, name).await?;
		let remote_issues = github.issues(owner, name, args.state).await?;
		let sync = TrackerSync {
			full_name: repo.full_name,
			name: repo.name,
			url: repo.html_url,
			remote_id: repo.remote_id,
			forks: repo.forks,
			watchers: repo.watchers,
			languages,
		};
		let mut tx = self.db.pool.begin().await?;
		let tracker = queries::apply_tracker_sync(&mut tx, tracker.id, &sync, now).await?;

		for issue in remote_issues.iter().map(issue_sync) {
			queries::upsert_issue_sync(&mut tx, tracker.id, &issue, now).await?;
		}

		tx.commit().await?;

		self.index.upsert_trackers(std::slice::from_ref(&tracker)).await?;

		let rows = queries::issue_index_rows(&self.db, Some(tracker.id)).await?;
		let issues_indexed = self.index.upsert_issues(&rows).await?;

		tracing::info!(
			tracker_id = tracker.id,
			issues = remote_issues.len(),
			issues_indexed,
			"Tracker synced."
		);

		Ok(SyncReport {
			tracker_id: tracker.id,
			skipped: false,
			issues_synced: remote_issues.len() as u64,
			issues_indexed,
		})
	}
}

fn issue_sync(remote: &RemoteIssue) -> IssueSync {
	IssueSync {
		number: remote.number,
		title: remote.title.clone(),
		body: remote.body.clone(),
		url: remote.html_url.clone(),
		state: remote.state.clone(),
		author_login: remote.author_login.clone(),
		comments_count: remote.comments,
		thumbs_up_count: remote.thumbs_up,
		remote_created_at: remote.created_at,
	}
}
