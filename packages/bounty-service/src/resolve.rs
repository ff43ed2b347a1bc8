//! Query resolution: a URL query resolves to one entity, anything else is a free-text search.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use bounty_domain::{
	query::{self, QueryKind},
	ranking::{BoostBy, FieldWeight, IndexQuery, MatchMode, Sort},
};
use bounty_providers::github::IssueState;
use bounty_storage::{
	index::{
		ATTR_BOUNTY_TOTAL, ATTR_COMMENTS_COUNT, ATTR_FORKS, ATTR_WATCHERS, FIELD_BODY,
		FIELD_LANGUAGES_NAME, FIELD_NAME, FIELD_TITLE, FIELD_TRACKER_NAME, IndexKind,
	},
	jobs,
	models::{Issue, Tracker},
	queries,
};

use crate::{
	BountyService, REMOTE_SYNC_TASK, RemoteSyncArgs, Result,
	views::{IssueItem, TrackerItem},
};

/// What a URL query resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
	NoMatch,
	Issue(Issue),
	/// Created by this resolution and never synced.
	NewTracker(Tracker),
	ExistingTracker(Tracker),
}

/// Resolution result. Absent fields are omitted, so an unmatched URL renders as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResponse {
	#[serde(rename = "async", skip_serializing_if = "Option::is_none")]
	pub is_async: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub job_id: Option<Uuid>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub issue: Option<IssueItem>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tracker: Option<TrackerItem>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub trackers: Option<Vec<TrackerItem>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub trackers_total: Option<usize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub issues: Option<Vec<IssueItem>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub issues_total: Option<usize>,
}
impl SearchResponse {
	pub fn no_match() -> Self {
		Self::default()
	}

	pub fn issue(issue: Issue) -> Self {
		Self { is_async: Some(false), issue: Some(issue.into()), ..Self::default() }
	}

	pub fn tracker(tracker: Tracker, job_id: Option<Uuid>) -> Self {
		Self {
			is_async: Some(job_id.is_some()),
			job_id,
			tracker: Some(tracker.into()),
			..Self::default()
		}
	}

	pub fn listing(trackers: Vec<Tracker>, issues: Vec<Issue>) -> Self {
		Self {
			trackers_total: Some(trackers.len()),
			trackers: Some(trackers.into_iter().map(TrackerItem::from).collect()),
			issues_total: Some(issues.len()),
			issues: Some(issues.into_iter().map(IssueItem::from).collect()),
			..Self::default()
		}
	}
}

impl BountyService {
	pub async fn resolve(&self, query: &str, person_id: Option<i64>) -> Result<SearchResponse> {
		match query::classify(query) {
			QueryKind::Url(url) => {
				tracing::debug!(person_id, url, "Resolving URL query.");

				self.resolve_url(url).await
			},
			QueryKind::Text(text) => {
				tracing::debug!(person_id, query = text, "Running free-text search.");

				self.local_trackers_and_issues(text).await
			},
		}
	}

	async fn resolve_url(&self, url: &str) -> Result<SearchResponse> {
		match self.resolver.resolve(&self.db, url).await? {
			Resolved::NoMatch => Ok(SearchResponse::no_match()),
			Resolved::Issue(issue) => Ok(SearchResponse::issue(issue)),
			Resolved::ExistingTracker(tracker) => Ok(SearchResponse::tracker(tracker, None)),
			Resolved::NewTracker(tracker) => {
				// Callers poll the job handle for sync completion.
				let args =
					RemoteSyncArgs { tracker_id: tracker.id, force: true, state: IssueState::Open };
				let job_id = jobs::enqueue(
					&self.db,
					REMOTE_SYNC_TASK,
					&args.to_json()?,
					OffsetDateTime::now_utc(),
				)
				.await?;

				tracing::info!(tracker_id = tracker.id, %job_id, "Queued initial remote sync.");

				Ok(SearchResponse::tracker(tracker, Some(job_id)))
			},
		}
	}

	async fn local_trackers_and_issues(&self, text: &str) -> Result<SearchResponse> {
		let candidate_k = self.cfg.search.candidate_k;
		let tracker_query = tracker_search_query(text, self.cfg.search.tracker_limit);
		let tracker_hits =
			self.index.search(IndexKind::Trackers, &tracker_query, candidate_k).await?;
		let tracker_ids: Vec<i64> = tracker_hits.iter().map(|hit| hit.id).collect();
		let mut trackers = queries::trackers_by_ids(&self.db, &tracker_ids).await?;

		self.filter_merged_trackers(&mut trackers).await?;

		let issue_query = issue_search_query(text, self.cfg.search.issue_limit);
		let issue_hits = self.index.search(IndexKind::Issues, &issue_query, candidate_k).await?;
		let issue_ids: Vec<i64> = issue_hits.iter().map(|hit| hit.id).collect();
		let mut issues = queries::issues_by_ids(&self.db, &issue_ids).await?;

		self.filter_merged_issues(&mut issues).await?;

		Ok(SearchResponse::listing(trackers, issues))
	}
}

pub fn tracker_search_query(text: &str, limit: u32) -> IndexQuery {
	IndexQuery {
		text: text.to_string(),
		fields: vec![FieldWeight::new(FIELD_NAME, 1.0)],
		boost_by: vec![BoostBy::new(ATTR_FORKS, 1.0), BoostBy::new(ATTR_WATCHERS, 1.0)],
		order: vec![Sort::field_desc(ATTR_BOUNTY_TOTAL)],
		match_mode: MatchMode::WordStart,
		limit,
	}
}

pub fn issue_search_query(text: &str, limit: u32) -> IndexQuery {
	IndexQuery {
		text: text.to_string(),
		fields: vec![
			FieldWeight::new(FIELD_TITLE, 50.0),
			FieldWeight::new(FIELD_TRACKER_NAME, 25.0),
			FieldWeight::new(FIELD_LANGUAGES_NAME, 5.0),
			FieldWeight::new(FIELD_BODY, 1.0),
		],
		boost_by: vec![BoostBy::new(ATTR_COMMENTS_COUNT, 10.0)],
		order: vec![Sort::field_desc(ATTR_BOUNTY_TOTAL)],
		match_mode: MatchMode::Word,
		limit,
	}
}
