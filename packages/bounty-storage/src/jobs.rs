//! Postgres-backed background job queue.
//!
//! Jobs move `PENDING -> RUNNING -> DONE`. A failed run goes back to `FAILED` with a later
//! `available_at` until it exhausts its attempts and becomes `DEAD`. A `RUNNING` job whose lease
//! expired is claimable again.

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{Result, db::Db, models::BackgroundJob};

pub const STATUS_PENDING: &str = "PENDING";
pub const STATUS_RUNNING: &str = "RUNNING";
pub const STATUS_DONE: &str = "DONE";
pub const STATUS_FAILED: &str = "FAILED";
pub const STATUS_DEAD: &str = "DEAD";

const JOB_COLUMNS: &str = "\
job_id, task, args, status, attempts, last_error, available_at, created_at, updated_at, \
completed_at";

pub async fn enqueue(db: &Db, task: &str, args: &Value, now: OffsetDateTime) -> Result<Uuid> {
	let job_id = Uuid::new_v4();

	sqlx::query(
		"\
INSERT INTO background_jobs (job_id, task, args, status, available_at, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $5, $5)",
	)
	.bind(job_id)
	.bind(task)
	.bind(args)
	.bind(STATUS_PENDING)
	.bind(now)
	.execute(&db.pool)
	.await?;

	Ok(job_id)
}

pub async fn get(db: &Db, job_id: Uuid) -> Result<Option<BackgroundJob>> {
	let row = sqlx::query_as::<_, BackgroundJob>(&format!(
		"SELECT {JOB_COLUMNS} FROM background_jobs WHERE job_id = $1"
	))
	.bind(job_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

/// Claims the oldest available job and leases it until `now + lease`.
pub async fn claim_next(
	db: &Db,
	now: OffsetDateTime,
	lease: Duration,
) -> Result<Option<BackgroundJob>> {
	let mut tx = db.pool.begin().await?;
	let row = sqlx::query_as::<_, BackgroundJob>(&format!(
		"\
SELECT {JOB_COLUMNS}
FROM background_jobs
WHERE status IN ('PENDING', 'FAILED', 'RUNNING') AND available_at <= $1
ORDER BY available_at ASC
LIMIT 1
FOR UPDATE SKIP LOCKED"
	))
	.bind(now)
	.fetch_optional(&mut *tx)
	.await?;
	let job = if let Some(mut job) = row {
		let lease_until = now + lease;

		sqlx::query(
			"\
UPDATE background_jobs
SET status = $1, available_at = $2, updated_at = $3
WHERE job_id = $4",
		)
		.bind(STATUS_RUNNING)
		.bind(lease_until)
		.bind(now)
		.bind(job.job_id)
		.execute(&mut *tx)
		.await?;

		job.status = STATUS_RUNNING.to_string();
		job.available_at = lease_until;
		job.updated_at = now;

		Some(job)
	} else {
		None
	};

	tx.commit().await?;

	Ok(job)
}

pub async fn mark_done(db: &Db, job_id: Uuid, now: OffsetDateTime) -> Result<()> {
	sqlx::query(
		"\
UPDATE background_jobs
SET status = $1, last_error = NULL, updated_at = $2, completed_at = $2
WHERE job_id = $3",
	)
	.bind(STATUS_DONE)
	.bind(now)
	.bind(job_id)
	.execute(&db.pool)
	.await?;

	Ok(())
}

/// Records a failed attempt. Returns the status the job was moved to.
pub async fn mark_failed(
	db: &Db,
	job_id: Uuid,
	attempts: i32,
	max_attempts: i32,
	error: &str,
	retry_at: OffsetDateTime,
	now: OffsetDateTime,
) -> Result<&'static str> {
	let status = if attempts >= max_attempts { STATUS_DEAD } else { STATUS_FAILED };

	sqlx::query(
		"\
UPDATE background_jobs
SET
	status = $1,
	attempts = $2,
	last_error = $3,
	available_at = $4,
	updated_at = $5
WHERE job_id = $6",
	)
	.bind(status)
	.bind(attempts)
	.bind(error)
	.bind(retry_at)
	.bind(now)
	.bind(job_id)
	.execute(&db.pool)
	.await?;

	Ok(status)
}
