use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use bounty_storage::queries;

use crate::{BountyService, Error, Result, SearchResponse};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSearchRequest {
	pub query: String,
	pub person_id: Option<i64>,
	#[serde(default)]
	pub params: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateSearchResponse {
	pub search_id: i64,
	pub query: String,
	pub person_id: Option<i64>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	pub results: SearchResponse,
}

impl BountyService {
	/// Records the search for auditing, then resolves it.
	pub async fn create_search(&self, req: CreateSearchRequest) -> Result<CreateSearchResponse> {
		let query = req.query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must not be empty.".to_string() });
		}

		let record = queries::insert_search(
			&self.db,
			query,
			req.person_id,
			&Value::Object(req.params),
			OffsetDateTime::now_utc(),
		)
		.await?;
		let results = self.resolve(&record.query, record.person_id).await?;

		Ok(CreateSearchResponse {
			search_id: record.id,
			query: record.query,
			person_id: record.person_id,
			created_at: record.created_at,
			results,
		})
	}
}
