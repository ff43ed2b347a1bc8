//! Whitelisting of untrusted listing parameters.
//!
//! Every parameter is validated on its own. A value that is missing, blank, or outside its
//! whitelist silently falls back to its default; none of these conversions fail.

use serde::{Deserialize, Serialize};

use crate::query::WILDCARD;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 25;
pub const DEFAULT_BOUNTY_PER_PAGE: u32 = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
	Asc,
	#[default]
	Desc,
}
impl Direction {
	pub fn parse_or_default(raw: Option<&str>) -> Self {
		match raw.map(str::trim) {
			Some("asc") => Self::Asc,
			Some("desc") => Self::Desc,
			_ => Self::default(),
		}
	}

	pub fn as_sql(self) -> &'static str {
		match self {
			Self::Asc => "ASC",
			Self::Desc => "DESC",
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BountyOrder {
	#[default]
	BountyTotal,
	UpdatedAt,
	CreatedAt,
	BackersCount,
	EarliestBounty,
	ParticipantsCount,
	ThumbsUpCount,
	RemoteCreatedAt,
}
impl BountyOrder {
	pub const ALL: [Self; 8] = [
		Self::BountyTotal,
		Self::UpdatedAt,
		Self::CreatedAt,
		Self::BackersCount,
		Self::EarliestBounty,
		Self::ParticipantsCount,
		Self::ThumbsUpCount,
		Self::RemoteCreatedAt,
	];

	pub fn parse_or_default(raw: Option<&str>) -> Self {
		let Some(raw) = raw.map(str::trim) else {
			return Self::default();
		};

		Self::ALL.into_iter().find(|order| order.column() == raw).unwrap_or_default()
	}

	/// Column name on `issues`. Only these literals ever reach an `ORDER BY` clause.
	pub fn column(self) -> &'static str {
		match self {
			Self::BountyTotal => "bounty_total",
			Self::UpdatedAt => "updated_at",
			Self::CreatedAt => "created_at",
			Self::BackersCount => "backers_count",
			Self::EarliestBounty => "earliest_bounty",
			Self::ParticipantsCount => "participants_count",
			Self::ThumbsUpCount => "thumbs_up_count",
			Self::RemoteCreatedAt => "remote_created_at",
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
	#[default]
	Fiat,
	Crypto,
}
impl Category {
	pub fn parse_or_default(raw: Option<&str>) -> Self {
		match raw.map(str::trim) {
			Some("crypto") => Self::Crypto,
			Some("fiat") => Self::Fiat,
			_ => Self::default(),
		}
	}
}

/// Raw listing parameters exactly as they arrive over HTTP.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBountyParams {
	pub page: Option<String>,
	pub per_page: Option<String>,
	pub search: Option<String>,
	pub direction: Option<String>,
	pub order: Option<String>,
	pub category: Option<String>,
	pub since: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyParams {
	pub page: u32,
	pub per_page: u32,
	pub query: String,
	pub direction: Direction,
	pub order: BountyOrder,
	pub category: Category,
	pub since: Option<String>,
}
impl BountyParams {
	pub fn normalize(raw: &RawBountyParams, default_per_page: u32) -> Self {
		// The title filter is a literal substring match, so surrounding whitespace is kept.
		let query = match raw.search.as_deref() {
			Some(value) if !value.is_empty() => value.to_string(),
			_ => WILDCARD.to_string(),
		};
		let since = raw.since.as_deref().map(str::trim).filter(|value| !value.is_empty());

		Self {
			page: positive_or(raw.page.as_deref(), DEFAULT_PAGE),
			per_page: positive_or(raw.per_page.as_deref(), default_per_page.max(1)),
			query,
			direction: Direction::parse_or_default(raw.direction.as_deref()),
			order: BountyOrder::parse_or_default(raw.order.as_deref()),
			category: Category::parse_or_default(raw.category.as_deref()),
			since: since.map(str::to_string),
		}
	}

	pub fn is_wildcard(&self) -> bool {
		self.query == WILDCARD
	}
}

/// Parses a strictly positive integer, falling back to `default` otherwise.
pub fn positive_or(raw: Option<&str>, default: u32) -> u32 {
	raw.and_then(|value| value.trim().parse::<u32>().ok()).filter(|value| *value > 0).unwrap_or(default)
}
