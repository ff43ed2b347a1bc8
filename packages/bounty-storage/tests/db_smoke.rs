use serde_json::json;
use time::{Duration, OffsetDateTime};

use bounty_domain::params::{BountyOrder, Direction};
use bounty_storage::{
	db::Db,
	jobs,
	queries::{self, BountyScope},
};
use bounty_testkit::TestDatabase;

async fn connect(test_db: &TestDatabase) -> Db {
	let cfg = bounty_config::Postgres { dsn: test_db.dsn().to_string(), pool_max_conns: 1 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	db
}

async fn insert_tracker(db: &Db, full_name: &str) -> i64 {
	sqlx::query_scalar(
		"INSERT INTO trackers (full_name, name, url) VALUES ($1, $1, 'https://github.com/' || $1) RETURNING id",
	)
	.bind(full_name)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to insert tracker.")
}

async fn insert_issue(db: &Db, tracker_id: i64, title: &str, bounty_total: f64, open: bool) -> i64 {
	sqlx::query_scalar(
		"\
INSERT INTO issues (tracker_id, title, url, bounty_total, can_add_bounty)
VALUES ($1, $2, 'https://github.com/x/y/issues/1', $3, $4)
RETURNING id",
	)
	.bind(tracker_id)
	.bind(title)
	.bind(bounty_total)
	.bind(open)
	.fetch_one(&db.pool)
	.await
	.expect("Failed to insert issue.")
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BOUNTY_PG_DSN to run."]
async fn schema_is_idempotent() {
	let Some(base_dsn) = bounty_testkit::env_dsn() else {
		eprintln!("Skipping schema_is_idempotent; set BOUNTY_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;

	db.ensure_schema().await.expect("Second schema pass must succeed.");

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BOUNTY_PG_DSN to run."]
async fn merged_lookup_returns_only_bad_ids() {
	let Some(base_dsn) = bounty_testkit::env_dsn() else {
		eprintln!("Skipping merged_lookup_returns_only_bad_ids; set BOUNTY_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;

	sqlx::query("INSERT INTO merged_models (good_id, bad_id) VALUES (1, 2), (1, 3)")
		.execute(&db.pool)
		.await
		.expect("Failed to insert merged models.");

	let bad = queries::merged_bad_ids(&db, &[1, 2, 4]).await.expect("Lookup failed.");

	assert_eq!(bad.into_iter().collect::<Vec<_>>(), vec![2]);
	assert!(queries::merged_bad_ids(&db, &[]).await.expect("Lookup failed.").is_empty());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BOUNTY_PG_DSN to run."]
async fn bounty_issues_respect_scope_and_order() {
	let Some(base_dsn) = bounty_testkit::env_dsn() else {
		eprintln!("Skipping bounty_issues_respect_scope_and_order; set BOUNTY_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;
	let tracker_id = insert_tracker(&db, "foo/bar").await;
	let small = insert_issue(&db, tracker_id, "small", 10.0, true).await;
	let large = insert_issue(&db, tracker_id, "large", 500.0, true).await;
	let closed = insert_issue(&db, tracker_id, "closed", 900.0, false).await;
	let unfunded = insert_issue(&db, tracker_id, "unfunded", 0.0, true).await;
	let fiat =
		queries::list_bounty_issues(&db, BountyScope::Fiat, BountyOrder::BountyTotal, Direction::Desc)
			.await
			.expect("Fiat listing failed.");

	assert_eq!(fiat.iter().map(|issue| issue.id).collect::<Vec<_>>(), vec![large, small]);

	let ids = [unfunded, closed, small];
	let crypto = queries::list_bounty_issues(
		&db,
		BountyScope::Crypto { issue_ids: &ids },
		BountyOrder::BountyTotal,
		Direction::Asc,
	)
	.await
	.expect("Crypto listing failed.");

	assert_eq!(crypto.iter().map(|issue| issue.id).collect::<Vec<_>>(), vec![unfunded, small]);
	assert!(crypto.iter().all(|issue| issue.id != closed));

	let reordered = queries::issues_by_ids(&db, &[small, 9_999, large]).await.expect("Load failed.");

	assert_eq!(reordered.iter().map(|issue| issue.id).collect::<Vec<_>>(), vec![small, large]);

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set BOUNTY_PG_DSN to run."]
async fn job_lifecycle_claims_once_and_retries() {
	let Some(base_dsn) = bounty_testkit::env_dsn() else {
		eprintln!("Skipping job_lifecycle_claims_once_and_retries; set BOUNTY_PG_DSN to run this test.");

		return;
	};
	let test_db = TestDatabase::new(&base_dsn).await.expect("Failed to create test database.");
	let db = connect(&test_db).await;
	let now = OffsetDateTime::now_utc();
	let job_id = jobs::enqueue(&db, "tracker.remote_sync", &json!({ "tracker_id": 1 }), now)
		.await
		.expect("Failed to enqueue job.");
	let claimed = jobs::claim_next(&db, now, Duration::seconds(30))
		.await
		.expect("Claim failed.")
		.expect("Expected a job.");

	assert_eq!(claimed.job_id, job_id);
	assert_eq!(claimed.status, jobs::STATUS_RUNNING);
	assert!(
		jobs::claim_next(&db, now, Duration::seconds(30)).await.expect("Claim failed.").is_none()
	);

	let status = jobs::mark_failed(&db, job_id, 1, 3, "boom", now, now)
		.await
		.expect("Failed to mark job failed.");

	assert_eq!(status, jobs::STATUS_FAILED);

	let reclaimed = jobs::claim_next(&db, now, Duration::seconds(30))
		.await
		.expect("Claim failed.")
		.expect("Expected the failed job again.");

	assert_eq!(reclaimed.attempts, 1);

	jobs::mark_done(&db, job_id, now).await.expect("Failed to mark job done.");

	let job = jobs::get(&db, job_id).await.expect("Lookup failed.").expect("Job must exist.");

	assert_eq!(job.status, jobs::STATUS_DONE);
	assert!(job.completed_at.is_some());

	test_db.cleanup().await.expect("Failed to cleanup test database.");
}
