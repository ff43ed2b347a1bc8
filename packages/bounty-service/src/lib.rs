pub mod admin;
pub mod bounties;
pub mod jobs;
pub mod merged;
pub mod resolve;
pub mod searches;
pub mod sync;
pub mod time_serde;
pub mod typeahead;
pub mod views;

mod error;

pub use admin::RebuildReport;
pub use bounties::BountyListing;
pub use error::{Error, Result};
pub use jobs::JobStatus;
pub use resolve::{Resolved, SearchResponse};
pub use searches::{CreateSearchRequest, CreateSearchResponse};
pub use sync::{REMOTE_SYNC_TASK, RemoteSyncArgs, SyncReport};

use std::{future::Future, pin::Pin, sync::Arc};

use bounty_config::Config;
use bounty_domain::{
	query::{self, GithubTarget},
	ranking::{IndexHit, IndexQuery},
};
use bounty_storage::{
	db::Db,
	index::{IndexKind, SearchIndexStore},
	models::{IssueIndexRow, Tracker},
	queries,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Field-boosted full-text search over trackers and issues.
pub trait SearchIndex
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		kind: IndexKind,
		query: &'a IndexQuery,
		page_size: u32,
	) -> BoxFuture<'a, bounty_storage::Result<Vec<IndexHit>>>;

	fn upsert_trackers<'a>(
		&'a self,
		trackers: &'a [Tracker],
	) -> BoxFuture<'a, bounty_storage::Result<u64>>;

	fn upsert_issues<'a>(
		&'a self,
		issues: &'a [IssueIndexRow],
	) -> BoxFuture<'a, bounty_storage::Result<u64>>;
}

/// Turns a URL query into a known or freshly created entity.
pub trait UrlResolver
where
	Self: Send + Sync,
{
	fn resolve<'a>(&'a self, db: &'a Db, url: &'a str) -> BoxFuture<'a, Result<Resolved>>;
}

/// Resolves `github.com/{owner}/{repo}` and `.../issues/{number}` URLs against stored trackers.
pub struct GithubUrlResolver;

pub struct BountyService {
	pub cfg: Config,
	pub db: Db,
	pub index: Arc<dyn SearchIndex>,
	pub resolver: Arc<dyn UrlResolver>,
}
impl BountyService {
	pub fn new(cfg: Config, db: Db, index: SearchIndexStore) -> Self {
		Self { cfg, db, index: Arc::new(index), resolver: Arc::new(GithubUrlResolver) }
	}

	pub fn with_collaborators(
		cfg: Config,
		db: Db,
		index: Arc<dyn SearchIndex>,
		resolver: Arc<dyn UrlResolver>,
	) -> Self {
		Self { cfg, db, index, resolver }
	}
}

impl SearchIndex for SearchIndexStore {
	fn search<'a>(
		&'a self,
		kind: IndexKind,
		query: &'a IndexQuery,
		page_size: u32,
	) -> BoxFuture<'a, bounty_storage::Result<Vec<IndexHit>>> {
		Box::pin(SearchIndexStore::search(self, kind, query, page_size))
	}

	fn upsert_trackers<'a>(
		&'a self,
		trackers: &'a [Tracker],
	) -> BoxFuture<'a, bounty_storage::Result<u64>> {
		Box::pin(SearchIndexStore::upsert_trackers(self, trackers))
	}

	fn upsert_issues<'a>(
		&'a self,
		issues: &'a [IssueIndexRow],
	) -> BoxFuture<'a, bounty_storage::Result<u64>> {
		Box::pin(SearchIndexStore::upsert_issues(self, issues))
	}
}

impl UrlResolver for GithubUrlResolver {
	fn resolve<'a>(&'a self, db: &'a Db, url: &'a str) -> BoxFuture<'a, Result<Resolved>> {
		Box::pin(resolve_github_url(db, url))
	}
}

async fn resolve_github_url(db: &Db, url: &str) -> Result<Resolved> {
	let Some(target) = query::parse_github_url(url) else {
		return Ok(Resolved::NoMatch);
	};
	let full_name = target.full_name();
	let known = queries::tracker_by_full_name(db, &full_name).await?;

	match (target, known) {
		(GithubTarget::Issue { number, .. }, Some(tracker)) =>
			match queries::issue_by_tracker_and_number(db, tracker.id, number).await? {
				Some(issue) => Ok(Resolved::Issue(issue)),
				None => Ok(Resolved::NoMatch),
			},
		(GithubTarget::Issue { .. }, None) => Ok(Resolved::NoMatch),
		(GithubTarget::Repository { .. }, Some(tracker)) => Ok(Resolved::ExistingTracker(tracker)),
		(target @ GithubTarget::Repository { .. }, None) => {
			let url = target.repository_url();

			match queries::insert_unsynced_tracker(db, &full_name, target.name(), &url).await? {
				Some(tracker) => {
					tracing::info!(tracker_id = tracker.id, %full_name, "Created tracker from URL.");

					Ok(Resolved::NewTracker(tracker))
				},
				// Lost an insert race; the winner owns the initial sync.
				None => queries::tracker_by_full_name(db, &full_name)
					.await?
					.map(Resolved::ExistingTracker)
					.ok_or_else(|| Error::Invariant {
						message: format!("Tracker {full_name} vanished after a conflicting insert."),
					}),
			}
		},
	}
}
