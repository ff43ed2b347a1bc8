//! Index-side ranking contract: what a field-boosted search is asked for, and how raw
//! per-field matches become an ordered, bounded hit list.

use std::{cmp::Ordering, collections::HashMap};

use serde::{Deserialize, Serialize};

use crate::params::Direction;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
	/// Whole-term relevance matching.
	#[default]
	Word,
	/// Every query term must prefix a term of the field.
	WordStart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldWeight {
	pub field: String,
	pub weight: f32,
}
impl FieldWeight {
	pub fn new(field: impl Into<String>, weight: f32) -> Self {
		Self { field: field.into(), weight }
	}
}

/// Multiplies relevance by `ln(2 + factor * value)` of a numeric attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostBy {
	pub field: String,
	pub factor: f32,
}
impl BoostBy {
	pub fn new(field: impl Into<String>, factor: f32) -> Self {
		Self { field: field.into(), factor }
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
	Score,
	Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
	pub key: SortKey,
	pub direction: Direction,
}
impl Sort {
	pub fn score_desc() -> Self {
		Self { key: SortKey::Score, direction: Direction::Desc }
	}

	pub fn field_desc(field: impl Into<String>) -> Self {
		Self { key: SortKey::Field(field.into()), direction: Direction::Desc }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexQuery {
	pub text: String,
	pub fields: Vec<FieldWeight>,
	pub boost_by: Vec<BoostBy>,
	pub order: Vec<Sort>,
	pub match_mode: MatchMode,
	pub limit: u32,
}

/// One document matched by the index before boosting and ordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
	pub id: i64,
	/// Field-weighted relevance.
	pub relevance: f32,
	/// Numeric attributes available for boosting and ordering.
	pub values: HashMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexHit {
	pub id: i64,
	pub score: f32,
}

/// Attribute value used when a document lacks a boost field.
const MISSING_BOOST_VALUE: f64 = 1.0;

pub fn boosted_score(relevance: f32, boost_by: &[BoostBy], values: &HashMap<String, f64>) -> f32 {
	if boost_by.is_empty() {
		return relevance;
	}

	let multiplier: f64 = boost_by
		.iter()
		.map(|boost| {
			let value = values.get(&boost.field).copied().unwrap_or(MISSING_BOOST_VALUE).max(0.0);

			(2.0 + f64::from(boost.factor) * value).ln()
		})
		.sum();

	(f64::from(relevance) * multiplier) as f32
}

/// Fraction of query terms that prefix some term of `text`, or zero unless all of them do.
pub fn word_start_relevance(query: &str, text: &str) -> f32 {
	let query_terms = terms(query);

	if query_terms.is_empty() {
		return 0.0;
	}

	let text_terms = terms(text);
	let all_match = query_terms
		.iter()
		.all(|query_term| text_terms.iter().any(|term| term.starts_with(query_term.as_str())));

	if !all_match {
		return 0.0;
	}

	let exact = query_terms.iter().filter(|query_term| text_terms.contains(query_term)).count();

	// Exact terms outrank bare prefixes.
	1.0 + exact as f32 / query_terms.len() as f32
}

pub fn terms(text: &str) -> Vec<String> {
	text.split(|ch: char| !ch.is_alphanumeric())
		.filter(|term| !term.is_empty())
		.map(str::to_lowercase)
		.collect()
}

/// Boosts, orders and truncates index candidates. Candidates without relevance are dropped.
pub fn rank(candidates: Vec<Candidate>, query: &IndexQuery) -> Vec<IndexHit> {
	let mut scored: Vec<(f32, Candidate)> = candidates
		.into_iter()
		.filter(|candidate| candidate.relevance > 0.0)
		.map(|candidate| {
			(boosted_score(candidate.relevance, &query.boost_by, &candidate.values), candidate)
		})
		.collect();

	scored.sort_by(|(left_score, left), (right_score, right)| {
		for sort in &query.order {
			let ordering = match &sort.key {
				SortKey::Score => left_score.total_cmp(right_score),
				SortKey::Field(field) => value_of(left, field).total_cmp(&value_of(right, field)),
			};
			let ordering = match sort.direction {
				Direction::Asc => ordering,
				Direction::Desc => ordering.reverse(),
			};

			if ordering != Ordering::Equal {
				return ordering;
			}
		}

		left.id.cmp(&right.id)
	});
	scored.truncate(query.limit as usize);

	scored.into_iter().map(|(score, candidate)| IndexHit { id: candidate.id, score }).collect()
}

fn value_of(candidate: &Candidate, field: &str) -> f64 {
	candidate.values.get(field).copied().unwrap_or(0.0)
}
