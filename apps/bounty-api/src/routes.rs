use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{HeaderName, StatusCode},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bounty_domain::{
	pagination::{self, TOTAL_ITEMS_HEADER, TOTAL_PAGES_HEADER},
	params::RawBountyParams,
};
use bounty_service::{
	CreateSearchRequest, CreateSearchResponse, Error, JobStatus, RebuildReport, SearchResponse,
	views::TrackerItem,
};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
	pub query: String,
	pub person_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct TypeaheadQuery {
	pub query: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				ApiError::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message, None),
			Error::NotFound { message } =>
				ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message, None),
			Error::Provider { message } => {
				tracing::error!(error = %message, "Provider failure.");

				ApiError::new(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", "Provider failure.", None)
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage failure.");

				ApiError::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"STORAGE_ERROR",
					"Storage failure.",
					None,
				)
			},
			Error::Qdrant { message } => {
				tracing::error!(error = %message, "Search index failure.");

				ApiError::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"INDEX_ERROR",
					"Search index failure.",
					None,
				)
			},
			Error::Invariant { message } => {
				tracing::error!(error = %message, "Invariant violated.");

				ApiError::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"INTERNAL_ERROR",
					"Internal error.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", get(search))
		.route("/v1/searches", post(create_search))
		.route("/v1/bounties", get(list_bounties))
		.route("/v1/trackers/typeahead", get(tracker_typeahead))
		.route("/v1/jobs/{job_id}", get(job_status))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new().route("/v1/admin/rebuild_index", post(rebuild_index)).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.resolve(&params.query, params.person_id).await?;

	Ok(Json(response))
}

async fn create_search(
	State(state): State<AppState>,
	Json(payload): Json<CreateSearchRequest>,
) -> Result<Json<CreateSearchResponse>, ApiError> {
	let response = state.service.create_search(payload).await?;

	Ok(Json(response))
}

async fn list_bounties(
	State(state): State<AppState>,
	Query(params): Query<RawBountyParams>,
) -> Result<Response, ApiError> {
	let listing = state.service.list_bounties(&params).await?;
	let total_pages = pagination::total_pages(listing.issues_total as u64, listing.per_page);
	let headers = [
		(HeaderName::from_static(TOTAL_ITEMS_HEADER), listing.issues_total.to_string()),
		(HeaderName::from_static(TOTAL_PAGES_HEADER), total_pages.to_string()),
	];

	Ok((headers, Json(listing)).into_response())
}

async fn tracker_typeahead(
	State(state): State<AppState>,
	Query(params): Query<TypeaheadQuery>,
) -> Result<Json<Vec<TrackerItem>>, ApiError> {
	let response = state.service.tracker_typeahead(&params.query).await?;

	Ok(Json(response))
}

async fn job_status(
	State(state): State<AppState>,
	Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatus>, ApiError> {
	let response = state.service.job_status(job_id).await?;

	Ok(Json(response))
}

async fn rebuild_index(State(state): State<AppState>) -> Result<Json<RebuildReport>, ApiError> {
	let response = state.service.rebuild_index().await?;

	Ok(Json(response))
}
