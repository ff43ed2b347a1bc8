//! Qdrant-backed full-text index for trackers and issues.
//!
//! Each searchable field is a named BM25 sparse vector, so field weights are applied by querying
//! fields one at a time and summing weighted scores. Tracker names also carry a prefix-tokenized
//! payload index for word-start matching.

use std::collections::{HashMap, HashSet};

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		Condition, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Document,
		FieldType, Filter, Modifier, PointId, PointStruct, Query, QueryPointsBuilder,
		RetrievedPoint, ScoredPoint, ScrollPointsBuilder, SparseVectorParamsBuilder,
		SparseVectorsConfigBuilder, TextIndexParamsBuilder, TokenizerType, UpsertPointsBuilder,
		Value, Vector, point_id::PointIdOptions, value::Kind,
	},
};

use bounty_domain::ranking::{self, Candidate, IndexHit, IndexQuery, MatchMode};

use crate::{
	Error, Result,
	models::{IssueIndexRow, Tracker},
};

pub const BM25_MODEL: &str = "qdrant/bm25";

pub const FIELD_NAME: &str = "name";
pub const FIELD_TITLE: &str = "title";
pub const FIELD_TRACKER_NAME: &str = "tracker_name";
pub const FIELD_LANGUAGES_NAME: &str = "languages_name";
pub const FIELD_BODY: &str = "body";

pub const ATTR_ID: &str = "id";
pub const ATTR_TRACKER_ID: &str = "tracker_id";
pub const ATTR_BOUNTY_TOTAL: &str = "bounty_total";
pub const ATTR_FORKS: &str = "forks";
pub const ATTR_WATCHERS: &str = "watchers";
pub const ATTR_COMMENTS_COUNT: &str = "comments_count";

const TRACKER_FIELDS: [&str; 1] = [FIELD_NAME];
const ISSUE_FIELDS: [&str; 4] = [FIELD_TITLE, FIELD_TRACKER_NAME, FIELD_LANGUAGES_NAME, FIELD_BODY];
const NUMERIC_ATTRS: [&str; 5] =
	[ATTR_TRACKER_ID, ATTR_BOUNTY_TOTAL, ATTR_FORKS, ATTR_WATCHERS, ATTR_COMMENTS_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
	Trackers,
	Issues,
}
impl IndexKind {
	fn fields(self) -> &'static [&'static str] {
		match self {
			Self::Trackers => &TRACKER_FIELDS,
			Self::Issues => &ISSUE_FIELDS,
		}
	}
}

pub struct SearchIndexStore {
	pub client: Qdrant,
	pub tracker_collection: String,
	pub issue_collection: String,
}
impl SearchIndexStore {
	pub fn new(cfg: &bounty_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self {
			client,
			tracker_collection: cfg.tracker_collection.clone(),
			issue_collection: cfg.issue_collection.clone(),
		})
	}

	pub fn collection(&self, kind: IndexKind) -> &str {
		match kind {
			IndexKind::Trackers => &self.tracker_collection,
			IndexKind::Issues => &self.issue_collection,
		}
	}

	/// Creates missing collections. Existing collections are left as they are.
	pub async fn ensure_collections(&self) -> Result<()> {
		for kind in [IndexKind::Trackers, IndexKind::Issues] {
			let collection = self.collection(kind);

			if self.client.collection_exists(collection).await? {
				continue;
			}

			let mut sparse_vectors_config = SparseVectorsConfigBuilder::default();

			for field in kind.fields() {
				sparse_vectors_config.add_named_vector_params(
					*field,
					SparseVectorParamsBuilder::default().modifier(Modifier::Idf as i32),
				);
			}

			self.client
				.create_collection(
					CreateCollectionBuilder::new(collection)
						.sparse_vectors_config(sparse_vectors_config),
				)
				.await?;

			if kind == IndexKind::Trackers {
				self.client
					.create_field_index(
						CreateFieldIndexCollectionBuilder::new(
							collection,
							FIELD_NAME,
							FieldType::Text,
						)
						.field_index_params(
							TextIndexParamsBuilder::new(TokenizerType::Prefix).lowercase(true).build(),
						)
						.wait(true),
					)
					.await?;
			}

			tracing::info!(collection, "Search index collection created.");
		}

		Ok(())
	}

	pub async fn upsert_trackers(&self, trackers: &[Tracker]) -> Result<u64> {
		let points = trackers.iter().map(tracker_point).collect::<Result<Vec<_>>>()?;

		self.upsert(IndexKind::Trackers, points).await
	}

	pub async fn upsert_issues(&self, issues: &[IssueIndexRow]) -> Result<u64> {
		let points = issues.iter().map(issue_point).collect::<Result<Vec<_>>>()?;

		self.upsert(IndexKind::Issues, points).await
	}

	/// Runs a field-boosted search over every matching point and returns hits already boosted,
	/// ordered and truncated. `page_size` bounds each round trip, not the candidate set.
	pub async fn search(
		&self,
		kind: IndexKind,
		query: &IndexQuery,
		page_size: u32,
	) -> Result<Vec<IndexHit>> {
		if ranking::terms(&query.text).is_empty() {
			return Ok(Vec::new());
		}

		let page_size = page_size.max(1);
		let candidates = match query.match_mode {
			MatchMode::Word => self.word_candidates(kind, query, page_size).await?,
			MatchMode::WordStart => self.word_start_candidates(kind, query, page_size).await?,
		};

		Ok(ranking::rank(candidates, query))
	}

	async fn upsert(&self, kind: IndexKind, points: Vec<PointStruct>) -> Result<u64> {
		if points.is_empty() {
			return Ok(0);
		}

		let count = points.len() as u64;

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection(kind), points).wait(true))
			.await?;

		Ok(count)
	}

	async fn word_candidates(
		&self,
		kind: IndexKind,
		query: &IndexQuery,
		page_size: u32,
	) -> Result<Vec<Candidate>> {
		let mut merged: HashMap<i64, Candidate> = HashMap::new();

		for field in &query.fields {
			if !kind.fields().contains(&field.field.as_str()) {
				return Err(Error::InvalidArgument(format!(
					"Field {} is not searchable.",
					field.field
				)));
			}

			let mut offset = 0_u64;

			// Sparse queries only return points sharing a term, so a short page ends the field.
			loop {
				let response = self
					.client
					.query(
						QueryPointsBuilder::new(self.collection(kind))
							.query(Query::new_nearest(Document::new(
								query.text.clone(),
								BM25_MODEL,
							)))
							.using(field.field.as_str())
							.with_payload(true)
							.limit(u64::from(page_size))
							.offset(offset),
					)
					.await?;
				let fetched = response.result.len() as u64;

				merge_scored_points(&mut merged, field.weight, response.result);

				if fetched < u64::from(page_size) {
					break;
				}

				offset += fetched;
			}
		}

		Ok(merged.into_values().collect())
	}

	async fn word_start_candidates(
		&self,
		kind: IndexKind,
		query: &IndexQuery,
		page_size: u32,
	) -> Result<Vec<Candidate>> {
		let filter = Filter::should(
			query
				.fields
				.iter()
				.map(|field| Condition::matches_text(field.field.as_str(), query.text.clone())),
		);
		let mut seen = HashSet::new();
		let mut candidates = Vec::new();
		let mut offset: Option<PointId> = None;

		loop {
			let mut request = ScrollPointsBuilder::new(self.collection(kind))
				.filter(filter.clone())
				.with_payload(true)
				.limit(page_size);

			if let Some(offset) = offset.take() {
				request = request.offset(offset);
			}

			let response = self.client.scroll(request).await?;

			for point in &response.result {
				if let Some(candidate) = word_start_candidate(query, point)
					&& seen.insert(candidate.id)
				{
					candidates.push(candidate);
				}
			}

			match response.next_page_offset {
				Some(next) => offset = Some(next),
				None => break,
			}
		}

		tracing::debug!(candidates = candidates.len(), "Word-start scroll drained.");

		Ok(candidates)
	}
}

fn merge_scored_points(
	merged: &mut HashMap<i64, Candidate>,
	weight: f32,
	points: Vec<ScoredPoint>,
) {
	for point in points {
		let Some(id) = point_entity_id(point.id.as_ref()) else {
			continue;
		};
		let candidate = merged.entry(id).or_insert_with(|| Candidate {
			id,
			relevance: 0.0,
			values: numeric_attrs(&point.payload),
		});

		candidate.relevance += weight * point.score;
	}
}

fn word_start_candidate(query: &IndexQuery, point: &RetrievedPoint) -> Option<Candidate> {
	let id = point_entity_id(point.id.as_ref())?;
	let relevance = query
		.fields
		.iter()
		.map(|field| {
			let text = string_attr(&point.payload, &field.field).unwrap_or_default();

			field.weight * ranking::word_start_relevance(&query.text, text)
		})
		.sum();

	Some(Candidate { id, relevance, values: numeric_attrs(&point.payload) })
}

fn tracker_point(tracker: &Tracker) -> Result<PointStruct> {
	let mut payload = Payload::new();

	payload.insert(ATTR_ID, tracker.id);
	payload.insert(FIELD_NAME, tracker.name.clone());
	payload.insert(ATTR_BOUNTY_TOTAL, tracker.bounty_total);
	payload.insert(ATTR_FORKS, i64::from(tracker.forks));
	payload.insert(ATTR_WATCHERS, i64::from(tracker.watchers));

	let mut vectors = HashMap::new();

	vectors.insert(
		FIELD_NAME.to_string(),
		Vector::from(Document::new(tracker.name.clone(), BM25_MODEL)),
	);

	Ok(PointStruct::new(point_id(tracker.id)?, vectors, payload))
}

fn issue_point(issue: &IssueIndexRow) -> Result<PointStruct> {
	let body = issue.body.clone().unwrap_or_default();
	let mut payload = Payload::new();

	payload.insert(ATTR_ID, issue.id);
	payload.insert(ATTR_TRACKER_ID, issue.tracker_id);
	payload.insert(FIELD_TITLE, issue.title.clone());
	payload.insert(FIELD_TRACKER_NAME, issue.tracker_name.clone());
	payload.insert(FIELD_LANGUAGES_NAME, issue.languages_name.clone());
	payload.insert(ATTR_BOUNTY_TOTAL, issue.bounty_total);
	payload.insert(ATTR_COMMENTS_COUNT, i64::from(issue.comments_count));

	let mut vectors = HashMap::new();

	for (field, text) in [
		(FIELD_TITLE, issue.title.as_str()),
		(FIELD_TRACKER_NAME, issue.tracker_name.as_str()),
		(FIELD_LANGUAGES_NAME, issue.languages_name.as_str()),
		(FIELD_BODY, body.as_str()),
	] {
		vectors.insert(field.to_string(), Vector::from(Document::new(text, BM25_MODEL)));
	}

	Ok(PointStruct::new(point_id(issue.id)?, vectors, payload))
}

fn point_id(id: i64) -> Result<PointId> {
	let id = u64::try_from(id)
		.map_err(|_| Error::InvalidArgument(format!("Entity id {id} cannot be a point id.")))?;

	Ok(PointId::from(id))
}

fn point_entity_id(id: Option<&PointId>) -> Option<i64> {
	match id?.point_id_options.as_ref()? {
		PointIdOptions::Num(num) => i64::try_from(*num).ok(),
		PointIdOptions::Uuid(_) => None,
	}
}

fn numeric_attrs(payload: &HashMap<String, Value>) -> HashMap<String, f64> {
	NUMERIC_ATTRS
		.iter()
		.filter_map(|attr| {
			let value = match payload.get(*attr)?.kind.as_ref()? {
				Kind::IntegerValue(value) => *value as f64,
				Kind::DoubleValue(value) => *value,
				_ => return None,
			};

			Some((attr.to_string(), value))
		})
		.collect()
}

fn string_attr<'a>(payload: &'a HashMap<String, Value>, key: &str) -> Option<&'a str> {
	match payload.get(key)?.kind.as_ref()? {
		Kind::StringValue(value) => Some(value.as_str()),
		_ => None,
	}
}
