use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use bounty_storage::{jobs, models::BackgroundJob};

use crate::{BountyService, Error, Result};

/// Polling view of a background job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatus {
	pub job_id: Uuid,
	pub task: String,
	pub args: Value,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	#[serde(with = "crate::time_serde::option")]
	pub completed_at: Option<OffsetDateTime>,
}
impl From<BackgroundJob> for JobStatus {
	fn from(job: BackgroundJob) -> Self {
		Self {
			job_id: job.job_id,
			task: job.task,
			args: job.args,
			status: job.status,
			attempts: job.attempts,
			last_error: job.last_error,
			created_at: job.created_at,
			updated_at: job.updated_at,
			completed_at: job.completed_at,
		}
	}
}

impl BountyService {
	pub async fn job_status(&self, job_id: Uuid) -> Result<JobStatus> {
		let job = jobs::get(&self.db, job_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("Job {job_id} does not exist.") })?;

		Ok(job.into())
	}
}
