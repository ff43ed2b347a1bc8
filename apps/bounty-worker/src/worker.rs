//! Background job loop: claim, dispatch, then record the outcome with capped backoff.

use std::time::Duration as StdDuration;

use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use bounty_providers::github::GithubClient;
use bounty_service::{BountyService, REMOTE_SYNC_TASK, RemoteSyncArgs};
use bounty_storage::{jobs, models::BackgroundJob};

use crate::{Error, Result};

const BASE_BACKOFF_MS: i64 = 1_000;
const MAX_BACKOFF_MS: i64 = 300_000;
const MAX_JOB_ERROR_CHARS: usize = 1_024;

pub struct WorkerState {
	pub service: BountyService,
	pub github: GithubClient,
}

pub async fn run_worker(state: WorkerState) -> Result<()> {
	let idle = Duration::milliseconds(state.service.cfg.worker.poll_interval_ms as i64);

	loop {
		match process_once(&state).await {
			Ok(true) => continue,
			Ok(false) => {},
			Err(err) => tracing::error!(error = %err, "Job processing failed."),
		}

		tokio_time::sleep(to_std_duration(idle)).await;
	}
}

/// Runs at most one job. Returns whether a job was claimed.
pub async fn process_once(state: &WorkerState) -> Result<bool> {
	let cfg = &state.service.cfg.worker;
	let now = OffsetDateTime::now_utc();
	let lease = Duration::seconds(cfg.claim_lease_seconds);
	let Some(job) = jobs::claim_next(&state.service.db, now, lease).await? else {
		return Ok(false);
	};

	match handle_job(state, &job).await {
		Ok(()) => {
			jobs::mark_done(&state.service.db, job.job_id, OffsetDateTime::now_utc()).await?;

			tracing::info!(job_id = %job.job_id, task = %job.task, "Job done.");
		},
		Err(err) => {
			let attempts = job.attempts.saturating_add(1);
			let failed_at = OffsetDateTime::now_utc();
			let message = sanitize_job_error(&err.to_string());
			let status = jobs::mark_failed(
				&state.service.db,
				job.job_id,
				attempts,
				cfg.max_attempts,
				&message,
				failed_at + backoff_for_attempt(attempts),
				failed_at,
			)
			.await?;

			tracing::warn!(
				job_id = %job.job_id,
				task = %job.task,
				attempts,
				status,
				error = %message,
				"Job failed."
			);
		},
	}

	Ok(true)
}

async fn handle_job(state: &WorkerState, job: &BackgroundJob) -> Result<()> {
	match job.task.as_str() {
		REMOTE_SYNC_TASK => {
			let args = RemoteSyncArgs::from_json(&job.args)?;
			let report = state.service.remote_sync(&state.github, &args).await?;

			tracing::debug!(
				tracker_id = report.tracker_id,
				skipped = report.skipped,
				issues_synced = report.issues_synced,
				"Remote sync finished."
			);

			Ok(())
		},
		other => Err(Error::Validation(format!("Unknown job task {other:?}."))),
	}
}

/// Redacts credentials and bounds the length of an error stored on a job row.
fn sanitize_job_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		if redact_next {
			parts.push("[REDACTED]".to_string());
			redact_next = false;

			continue;
		}
		if raw.eq_ignore_ascii_case("bearer") || raw.eq_ignore_ascii_case("token") {
			redact_next = true;
			parts.push(raw.to_string());

			continue;
		}

		let lowered = raw.to_ascii_lowercase();
		let secret_key = ["access_token", "password", "secret", "token"]
			.iter()
			.any(|key| lowered.contains(key));
		let word = match raw.find(['=', ':']) {
			Some(at) if secret_key && !lowered.starts_with("http") =>
				format!("{}[REDACTED]", &raw[..=at]),
			_ => raw.to_string(),
		};

		parts.push(word);
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_JOB_ERROR_CHARS {
		out = out.chars().take(MAX_JOB_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}

fn backoff_for_attempt(attempt: i32) -> Duration {
	let attempts = attempt.max(1) as u32;
	let exp = attempts.saturating_sub(1).min(12);
	let base = BASE_BACKOFF_MS.saturating_mul(1 << exp);

	Duration::milliseconds(base.min(MAX_BACKOFF_MS))
}

fn to_std_duration(duration: Duration) -> StdDuration {
	let millis = duration.whole_milliseconds();

	if millis <= 0 {
		return StdDuration::from_millis(0);
	}

	StdDuration::from_millis(millis as u64)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn backoff_doubles_then_caps() {
		assert_eq!(backoff_for_attempt(0), Duration::seconds(1));
		assert_eq!(backoff_for_attempt(1), Duration::seconds(1));
		assert_eq!(backoff_for_attempt(2), Duration::seconds(2));
		assert_eq!(backoff_for_attempt(5), Duration::seconds(16));
		assert_eq!(backoff_for_attempt(30), Duration::minutes(5));
	}

	#[test]
	fn redacts_credentials() {
		let sanitized =
			sanitize_job_error("request failed: Authorization: Bearer ghp_abc access_token=xyz");

		assert!(!sanitized.contains("ghp_abc"));
		assert!(!sanitized.contains("xyz"));
		assert!(sanitized.contains("access_token=[REDACTED]"));
	}

	#[test]
	fn keeps_plain_urls_readable() {
		let text = "error sending request for url (https://api.github.com/repos/foo/bar)";

		assert_eq!(sanitize_job_error(text), text);
	}

	#[test]
	fn truncates_long_errors() {
		let sanitized = sanitize_job_error(&"x".repeat(MAX_JOB_ERROR_CHARS + 10));

		assert_eq!(sanitized.chars().count(), MAX_JOB_ERROR_CHARS + 3);
		assert!(sanitized.ends_with("..."));
	}

	#[test]
	fn negative_durations_clamp_to_zero() {
		assert_eq!(to_std_duration(Duration::seconds(-3)), StdDuration::ZERO);
		assert_eq!(to_std_duration(Duration::milliseconds(250)), StdDuration::from_millis(250));
	}
}
