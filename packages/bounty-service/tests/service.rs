use std::sync::{Arc, Mutex};

use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use time::OffsetDateTime;

use bounty_domain::{
	params::RawBountyParams,
	ranking::{IndexHit, IndexQuery, MatchMode},
};
use bounty_service::{BountyService, BoxFuture, Resolved, SearchIndex, UrlResolver};
use bounty_storage::{
	db::Db,
	index::IndexKind,
	jobs,
	models::{IssueIndexRow, Tracker},
};
use bounty_testkit::TestDatabase;

#[derive(Default)]
struct StubIndex {
	tracker_hits: Vec<i64>,
	issue_hits: Vec<i64>,
	seen: Mutex<Vec<(IndexKind, IndexQuery)>>,
}
impl SearchIndex for StubIndex {
	fn search<'a>(
		&'a self,
		kind: IndexKind,
		query: &'a IndexQuery,
		_page_size: u32,
	) -> BoxFuture<'a, bounty_storage::Result<Vec<IndexHit>>> {
		self.seen.lock().unwrap_or_else(|err| err.into_inner()).push((kind, query.clone()));

		let ids = match kind {
			IndexKind::Trackers => &self.tracker_hits,
			IndexKind::Issues => &self.issue_hits,
		};
		let hits = ids.iter().map(|id| IndexHit { id: *id, score: 1.0 }).collect();

		Box::pin(async move { Ok(hits) })
	}

	fn upsert_trackers<'a>(
		&'a self,
		trackers: &'a [Tracker],
	) -> BoxFuture<'a, bounty_storage::Result<u64>> {
		Box::pin(async move { Ok(trackers.len() as u64) })
	}

	fn upsert_issues<'a>(
		&'a self,
		issues: &'a [IssueIndexRow],
	) -> BoxFuture<'a, bounty_storage::Result<u64>> {
		Box::pin(async move { Ok(issues.len() as u64) })
	}
}

struct StubResolver(Resolved);
impl UrlResolver for StubResolver {
	fn resolve<'a>(
		&'a self,
		_db: &'a Db,
		_url: &'a str,
	) -> BoxFuture<'a, bounty_service::Result<Resolved>> {
		let resolved = self.0.clone();

		Box::pin(async move { Ok(resolved) })
	}
}

fn config(dsn: &str) -> bounty_config::Config {
	let raw = format!(
		r#"
[service]
http_bind = "127.0.0.1:8080"
admin_bind = "127.0.0.1:8081"
log_level = "info"

[storage.postgres]
dsn = "{dsn}"
pool_max_conns = 2

[storage.qdrant]
url = "http://127.0.0.1:6334"
tracker_collection = "trackers"
issue_collection = "issues"

[providers.github]
api_base = "https://api.github.com"
user_agent = "bounty-test"
timeout_ms = 1000

[security]
bind_localhost_only = true
"#
	);

	bounty_config::parse(&raw).expect("Test config must parse.")
}

fn tracker(id: i64) -> Tracker {
	Tracker {
		id,
		full_name: "foo/bar".to_string(),
		name: "bar".to_string(),
		url: "https://github.com/foo/bar".to_string(),
		remote_id: None,
		forks: 0,
		watchers: 0,
		bounty_total: 0.0,
		team_id: None,
		synced_at: None,
		created_at: OffsetDateTime::UNIX_EPOCH,
		updated_at: OffsetDateTime::UNIX_EPOCH,
	}
}

/// A service whose pool never connects; only paths that skip the store may run against it.
fn offline_service(index: Arc<StubIndex>, resolved: Resolved) -> BountyService {
	let dsn = "postgres://postgres@127.0.0.1:1/offline";
	let pool = PgPoolOptions::new().connect_lazy(dsn).expect("Lazy pool must build.");

	BountyService::with_collaborators(
		config(dsn),
		Db { pool },
		index,
		Arc::new(StubResolver(resolved)),
	)
}

#[tokio::test]
async fn unmatched_url_resolves_to_empty_object() {
	let service = offline_service(Arc::new(StubIndex::default()), Resolved::NoMatch);
	let response =
		service.resolve("https://github.com/foo/bar", None).await.expect("Resolve failed.");

	assert_eq!(serde_json::to_value(response).expect("serialize failed"), json!({}));
}

#[tokio::test]
async fn known_tracker_url_is_synchronous() {
	let service =
		offline_service(Arc::new(StubIndex::default()), Resolved::ExistingTracker(tracker(7)));
	let response =
		service.resolve("https://github.com/foo/bar", Some(3)).await.expect("Resolve failed.");

	assert_eq!(response.is_async, Some(false));
	assert_eq!(response.tracker.map(|tracker| tracker.id), Some(7));
	assert!(response.job_id.is_none());
}

#[tokio::test]
async fn free_text_without_hits_reports_zero_totals() {
	let index = Arc::new(StubIndex::default());
	let service = offline_service(index.clone(), Resolved::NoMatch);
	let response = service.resolve("  bugfix ", None).await.expect("Resolve failed.");

	assert_eq!(response.trackers_total, Some(0));
	assert_eq!(response.issues_total, Some(0));

	let seen = index.seen.lock().unwrap_or_else(|err| err.into_inner());

	assert_eq!(seen.len(), 2);
	assert_eq!(seen[0].0, IndexKind::Trackers);
	assert_eq!(seen[0].1.text, "bugfix");
	assert_eq!(seen[0].1.limit, 50);
	assert_eq!(seen[1].0, IndexKind::Issues);
	assert_eq!(seen[1].1.match_mode, MatchMode::Word);
}

async fn seeded_service(test_db: &TestDatabase, index: StubIndex) -> BountyService {
	let cfg = config(test_db.dsn());
	let db = Db::connect(&cfg.storage.postgres).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	BountyService::with_collaborators(
		cfg,
		db,
		Arc::new(index),
		Arc::new(bounty_service::GithubUrlResolver),
	)
}

async fn insert_tracker(service: &BountyService, full_name: &str) -> i64 {
	sqlx::query_scalar(
		"INSERT INTO trackers (full_name, name, url) VALUES ($1, $1, 'https://github.com/' || $1) RETURNING id",
	)
	.bind(full_name)
	.fetch_one(&service.db.pool)
	.await
	.expect("Failed to insert tracker.")
}

async fn insert_issue(service: &BountyService, tracker_id: i64, number: i64, bounty: f64) -> i64 {
	sqlx::query_scalar(
		"\
INSERT INTO issues (tracker_id, number, title, url, bounty_total)
VALUES ($1, $2, 'Issue ' || $2::text, 'https://github.com/x/y/issues/' || $2::text, $3)
RETURNING id",
	)
	.bind(tracker_id)
	.bind(number)
	.bind(bounty)
	.fetch_one(&service.db.pool)
	.await
	.expect("Failed to insert issue.")
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BOUNTY_PG_DSN to run."]
async fn crypto_listing_pages_and_counts_before_slicing() {
	let Some(base_dsn) = bounty_testkit::env_dsn() else {
		eprintln!("Skipping crypto_listing_pages_and_counts_before_slicing; set BOUNTY_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = seeded_service(&test_db, StubIndex::default()).await;
	let tracker_id = insert_tracker(&service, "foo/bar").await;
	let mut ids = Vec::new();

	for number in 1..=25 {
		let id = insert_issue(&service, tracker_id, number, f64::from(number as i32)).await;

		sqlx::query(
			"INSERT INTO crypto_bounties (issue_id, amount, symbol) VALUES ($1, 1, 'ETH'), ($1, 2, 'ETH')",
		)
		.bind(id)
		.execute(&service.db.pool)
		.await
		.expect("Failed to insert crypto bounty.");
		ids.push(id);
	}

	let raw = RawBountyParams {
		category: Some("crypto".to_string()),
		page: Some("2".to_string()),
		per_page: Some("10".to_string()),
		order: Some("invalid".to_string()),
		..RawBountyParams::default()
	};
	let listing = service.list_bounties(&raw).await.expect("Listing failed.");

	// Default order is bounty_total desc, so page 2 holds bounties 15 down to 6.
	let expected: Vec<i64> = ids.iter().rev().skip(10).take(10).copied().collect();

	assert_eq!(listing.issues_total, 25);
	assert_eq!(listing.issues.iter().map(|item| item.issue.id).collect::<Vec<_>>(), expected);
	assert!(listing.issues.iter().all(|item| item.tracker.is_some()));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BOUNTY_PG_DSN to run."]
async fn merged_trackers_are_excluded_everywhere() {
	let Some(base_dsn) = bounty_testkit::env_dsn() else {
		eprintln!("Skipping merged_trackers_are_excluded_everywhere; set BOUNTY_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = seeded_service(&test_db, StubIndex::default()).await;
	let good = insert_tracker(&service, "good/repo").await;
	let bad = insert_tracker(&service, "bad/repo").await;
	let kept = insert_issue(&service, good, 1, 50.0).await;
	let dropped = insert_issue(&service, bad, 1, 80.0).await;

	sqlx::query("INSERT INTO merged_models (good_id, bad_id) VALUES ($1, $2)")
		.bind(good)
		.bind(bad)
		.execute(&service.db.pool)
		.await
		.expect("Failed to insert merged model.");

	let listing =
		service.list_bounties(&RawBountyParams::default()).await.expect("Listing failed.");

	assert_eq!(listing.issues_total, 1);
	assert_eq!(listing.issues[0].issue.id, kept);

	let index = StubIndex {
		tracker_hits: vec![bad, good],
		issue_hits: vec![dropped, kept],
		..StubIndex::default()
	};
	let searching = BountyService::with_collaborators(
		config(test_db.dsn()),
		Db { pool: service.db.pool.clone() },
		Arc::new(index),
		Arc::new(bounty_service::GithubUrlResolver),
	);
	let response = searching.resolve("repo", None).await.expect("Resolve failed.");

	assert_eq!(response.trackers_total, Some(1));
	assert_eq!(response.trackers.map(|items| items[0].id), Some(good));
	assert_eq!(response.issues_total, Some(1));
	assert_eq!(response.issues.map(|items| items[0].id), Some(kept));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BOUNTY_PG_DSN to run."]
async fn new_repository_url_queues_forced_sync() {
	let Some(base_dsn) = bounty_testkit::env_dsn() else {
		eprintln!("Skipping new_repository_url_queues_forced_sync; set BOUNTY_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = seeded_service(&test_db, StubIndex::default()).await;
	let first =
		service.resolve("https://github.com/Foo/Bar", None).await.expect("Resolve failed.");
	let job_id = first.job_id.expect("New tracker must queue a job.");

	assert_eq!(first.is_async, Some(true));

	let status = service.job_status(job_id).await.expect("Job lookup failed.");

	assert_eq!(status.status, jobs::STATUS_PENDING);
	assert_eq!(status.task, bounty_service::REMOTE_SYNC_TASK);
	let tracker_id = first.tracker.as_ref().map(|tracker| tracker.id);

	assert_eq!(status.args, json!({ "tracker_id": tracker_id, "force": true, "state": "open" }));

	let second =
		service.resolve("https://github.com/foo/bar", None).await.expect("Resolve failed.");

	assert_eq!(second.is_async, Some(false));
	assert!(second.job_id.is_none());

	let unknown_issue = service
		.resolve("https://github.com/foo/bar/issues/404", None)
		.await
		.expect("Resolve failed.");

	assert_eq!(serde_json::to_value(unknown_issue).expect("serialize failed"), json!({}));

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BOUNTY_PG_DSN to run."]
async fn create_search_records_the_request() {
	let Some(base_dsn) = bounty_testkit::env_dsn() else {
		eprintln!("Skipping create_search_records_the_request; set BOUNTY_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = seeded_service(&test_db, StubIndex::default()).await;

	sqlx::query("INSERT INTO people (id, display_name) VALUES (12, 'Searcher')")
		.execute(&service.db.pool)
		.await
		.expect("Failed to insert person.");

	let req = serde_json::from_value(json!({
		"query": "bugfix",
		"person_id": 12,
		"params": { "page": "1" }
	}))
	.expect("Request must deserialize.");
	let created = service.create_search(req).await.expect("Create search failed.");
	let stored: (String, Option<i64>, serde_json::Value) =
		sqlx::query_as("SELECT query, person_id, params FROM searches WHERE id = $1")
			.bind(created.search_id)
			.fetch_one(&service.db.pool)
			.await
			.expect("Search record must exist.");

	assert_eq!(stored, ("bugfix".to_string(), Some(12), json!({ "page": "1" })));
	assert_eq!(created.results.trackers_total, Some(0));

	let report = service.rebuild_index().await.expect("Rebuild failed.");

	assert_eq!(report.trackers_indexed, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BOUNTY_PG_DSN to run."]
async fn create_search_rejects_unknown_person() {
	let Some(base_dsn) = bounty_testkit::env_dsn() else {
		eprintln!("Skipping create_search_rejects_unknown_person; set BOUNTY_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = seeded_service(&test_db, StubIndex::default()).await;
	let req = serde_json::from_value(json!({ "query": "bugfix", "person_id": 404 }))
		.expect("Request must deserialize.");

	match service.create_search(req).await {
		Err(bounty_service::Error::InvalidRequest { message }) => {
			assert!(message.contains("person_id 404"), "Unexpected message: {message}");
		},
		other => panic!("Expected an invalid request, got {other:?}."),
	}

	let (count,): (i64,) = sqlx::query_as("SELECT count(*) FROM searches")
		.fetch_one(&service.db.pool)
		.await
		.expect("Count must succeed.");

	assert_eq!(count, 0);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BOUNTY_PG_DSN to run."]
async fn create_search_without_person_is_anonymous() {
	let Some(base_dsn) = bounty_testkit::env_dsn() else {
		eprintln!("Skipping create_search_without_person_is_anonymous; set BOUNTY_PG_DSN.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let service = seeded_service(&test_db, StubIndex::default()).await;
	let req = serde_json::from_value(json!({ "query": "bugfix" }))
		.expect("Request must deserialize.");
	let created = service.create_search(req).await.expect("Create search failed.");

	assert_eq!(created.person_id, None);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
