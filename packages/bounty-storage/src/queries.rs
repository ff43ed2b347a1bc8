use std::collections::HashSet;

use serde_json::Value;
use sqlx::{Postgres, QueryBuilder, Transaction};
use time::OffsetDateTime;

use bounty_domain::params::{BountyOrder, Direction};

use crate::{
	Error, Result,
	db::Db,
	models::{
		Author, CryptoBounty, Issue, IssueAddress, IssueIndexRow, IssueSync, Person, SearchRecord,
		Team, Tracker, TrackerLanguage, TrackerSync,
	},
};

const TRACKER_COLUMNS: &str = "\
id, full_name, name, url, remote_id, forks, watchers, bounty_total, team_id, synced_at, \
created_at, updated_at";
const ISSUE_COLUMNS: &str = "\
id, tracker_id, author_id, number, title, body, url, state, bounty_total, can_add_bounty, \
participants_count, thumbs_up_count, backers_count, comments_count, earliest_bounty, \
remote_created_at, created_at, updated_at";

/// Which issues the bounty listing starts from.
#[derive(Debug, Clone, Copy)]
pub enum BountyScope<'a> {
	/// Open to bounties and already carrying a positive fiat total.
	Fiat,
	/// Open to bounties and referenced by one of these crypto bounties.
	Crypto { issue_ids: &'a [i64] },
}

/// Returns the subset of `ids` recorded as merged away, in one round trip.
pub async fn merged_bad_ids(db: &Db, ids: &[i64]) -> Result<HashSet<i64>> {
	if ids.is_empty() {
		return Ok(HashSet::new());
	}

	let rows: Vec<i64> =
		sqlx::query_scalar("SELECT bad_id FROM merged_models WHERE bad_id = ANY($1)")
			.bind(ids)
			.fetch_all(&db.pool)
			.await?;

	Ok(rows.into_iter().collect())
}

pub async fn list_crypto_bounties(db: &Db) -> Result<Vec<CryptoBounty>> {
	let rows = sqlx::query_as::<_, CryptoBounty>(
		"SELECT id, issue_id, amount, symbol, created_at FROM crypto_bounties ORDER BY id",
	)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Every issue in `scope`, ordered by a whitelisted column. Ties fall back to id.
pub async fn list_bounty_issues(
	db: &Db,
	scope: BountyScope<'_>,
	order: BountyOrder,
	direction: Direction,
) -> Result<Vec<Issue>> {
	let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE "));

	match scope {
		BountyScope::Fiat => {
			builder.push("can_add_bounty = true AND bounty_total > 0");
		},
		BountyScope::Crypto { issue_ids } => {
			if issue_ids.is_empty() {
				return Ok(Vec::new());
			}

			builder.push("id = ANY(");
			builder.push_bind(issue_ids);
			builder.push(") AND can_add_bounty = true");
		},
	}

	builder.push(format!(" ORDER BY {} {}, id ASC", order.column(), direction.as_sql()));

	let rows = builder.build_query_as::<Issue>().fetch_all(&db.pool).await?;

	Ok(rows)
}

/// Loads issues by id, preserving the order of `ids` and skipping missing rows.
pub async fn issues_by_ids(db: &Db, ids: &[i64]) -> Result<Vec<Issue>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, Issue>(&format!(
		"SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ANY($1)"
	))
	.bind(ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(order_like(ids, rows, |issue| issue.id))
}

/// Loads trackers by id, preserving the order of `ids` and skipping missing rows.
pub async fn trackers_by_ids(db: &Db, ids: &[i64]) -> Result<Vec<Tracker>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, Tracker>(&format!(
		"SELECT {TRACKER_COLUMNS} FROM trackers WHERE id = ANY($1)"
	))
	.bind(ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(order_like(ids, rows, |tracker| tracker.id))
}

pub async fn tracker_by_id(db: &Db, id: i64) -> Result<Option<Tracker>> {
	let row = sqlx::query_as::<_, Tracker>(&format!(
		"SELECT {TRACKER_COLUMNS} FROM trackers WHERE id = $1"
	))
	.bind(id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

pub async fn tracker_by_full_name(db: &Db, full_name: &str) -> Result<Option<Tracker>> {
	let row = sqlx::query_as::<_, Tracker>(&format!(
		"SELECT {TRACKER_COLUMNS} FROM trackers WHERE lower(full_name) = lower($1)"
	))
	.bind(full_name)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

pub async fn issue_by_tracker_and_number(
	db: &Db,
	tracker_id: i64,
	number: i64,
) -> Result<Option<Issue>> {
	let row = sqlx::query_as::<_, Issue>(&format!(
		"SELECT {ISSUE_COLUMNS} FROM issues WHERE tracker_id = $1 AND number = $2"
	))
	.bind(tracker_id)
	.bind(number)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

/// Inserts a tracker that has never been synced. Returns `None` when another request won the race.
pub async fn insert_unsynced_tracker(
	db: &Db,
	full_name: &str,
	name: &str,
	url: &str,
) -> Result<Option<Tracker>> {
	let row = sqlx::query_as::<_, Tracker>(&format!(
		"\
INSERT INTO trackers (full_name, name, url)
VALUES ($1, $2, $3)
ON CONFLICT (full_name) DO NOTHING
RETURNING {TRACKER_COLUMNS}"
	))
	.bind(full_name)
	.bind(name)
	.bind(url)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}

pub async fn insert_search(
	db: &Db,
	query: &str,
	person_id: Option<i64>,
	params: &Value,
	now: OffsetDateTime,
) -> Result<SearchRecord> {
	let row = sqlx::query_as::<_, SearchRecord>(
		"\
INSERT INTO searches (query, person_id, params, created_at)
VALUES ($1, $2, $3, $4)
RETURNING id, query, person_id, params, created_at",
	)
	.bind(query)
	.bind(person_id)
	.bind(params)
	.bind(now)
	.fetch_one(&db.pool)
	.await
	.map_err(|err| match &err {
		sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
			Error::InvalidArgument(format!(
				"person_id {} does not reference a person.",
				person_id.unwrap_or_default()
			))
		},
		_ => Error::from(err),
	})?;

	Ok(row)
}

pub async fn issue_addresses_for(db: &Db, issue_ids: &[i64]) -> Result<Vec<IssueAddress>> {
	if issue_ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, IssueAddress>(
		"SELECT id, issue_id, public_address FROM issue_addresses WHERE issue_id = ANY($1)",
	)
	.bind(issue_ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn authors_by_ids(db: &Db, ids: &[i64]) -> Result<Vec<Author>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, Author>(
		"SELECT id, login, person_id FROM authors WHERE id = ANY($1)",
	)
	.bind(ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn people_by_ids(db: &Db, ids: &[i64]) -> Result<Vec<Person>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, Person>(
		"SELECT id, display_name, image_url FROM people WHERE id = ANY($1)",
	)
	.bind(ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn languages_for_trackers(db: &Db, tracker_ids: &[i64]) -> Result<Vec<TrackerLanguage>> {
	if tracker_ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, TrackerLanguage>(
		"\
SELECT tl.tracker_id, l.id, l.name
FROM tracker_languages tl
JOIN languages l ON l.id = tl.language_id
WHERE tl.tracker_id = ANY($1)
ORDER BY tl.tracker_id, l.name",
	)
	.bind(tracker_ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

pub async fn teams_by_ids(db: &Db, ids: &[i64]) -> Result<Vec<Team>> {
	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, Team>("SELECT id, name, slug FROM teams WHERE id = ANY($1)")
		.bind(ids)
		.fetch_all(&db.pool)
		.await?;

	Ok(rows)
}

pub async fn all_trackers(db: &Db) -> Result<Vec<Tracker>> {
	let rows = sqlx::query_as::<_, Tracker>(&format!(
		"SELECT {TRACKER_COLUMNS} FROM trackers ORDER BY id"
	))
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Issues joined with tracker name and languages, optionally limited to one tracker.
pub async fn issue_index_rows(db: &Db, tracker_id: Option<i64>) -> Result<Vec<IssueIndexRow>> {
	let rows = sqlx::query_as::<_, IssueIndexRow>(
		"\
SELECT
	i.id,
	i.tracker_id,
	i.title,
	i.body,
	i.bounty_total,
	i.comments_count,
	t.name AS tracker_name,
	COALESCE(string_agg(l.name, ' ' ORDER BY l.name), '') AS languages_name
FROM issues i
JOIN trackers t ON t.id = i.tracker_id
LEFT JOIN tracker_languages tl ON tl.tracker_id = t.id
LEFT JOIN languages l ON l.id = tl.language_id
WHERE $1::bigint IS NULL OR i.tracker_id = $1
GROUP BY i.id, t.name
ORDER BY i.id",
	)
	.bind(tracker_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(rows)
}

/// Writes the remote repository state onto `tracker_id` and replaces its languages.
pub async fn apply_tracker_sync(
	tx: &mut Transaction<'_, Postgres>,
	tracker_id: i64,
	sync: &TrackerSync,
	now: OffsetDateTime,
) -> Result<Tracker> {
	let tracker = sqlx::query_as::<_, Tracker>(&format!(
		"\
UPDATE trackers
SET
	full_name = $1,
	name = $2,
	url = $3,
	remote_id = $4,
	forks = $5,
	watchers = $6,
	synced_at = $7,
	updated_at = $7
WHERE id = $8
RETURNING {TRACKER_COLUMNS}"
	))
	.bind(sync.full_name.as_str())
	.bind(sync.name.as_str())
	.bind(sync.url.as_str())
	.bind(sync.remote_id)
	.bind(sync.forks)
	.bind(sync.watchers)
	.bind(now)
	.bind(tracker_id)
	.fetch_optional(&mut **tx)
	.await?
	.ok_or_else(|| Error::NotFound(format!("Tracker {tracker_id} does not exist.")))?;

	sqlx::query("DELETE FROM tracker_languages WHERE tracker_id = $1")
		.bind(tracker_id)
		.execute(&mut **tx)
		.await?;

	for language in &sync.languages {
		let language_id: i64 = sqlx::query_scalar(
			"\
INSERT INTO languages (name)
VALUES ($1)
ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
RETURNING id",
		)
		.bind(language.as_str())
		.fetch_one(&mut **tx)
		.await?;

		sqlx::query(
			"INSERT INTO tracker_languages (tracker_id, language_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
		)
		.bind(tracker_id)
		.bind(language_id)
		.execute(&mut **tx)
		.await?;
	}

	Ok(tracker)
}

/// Inserts or refreshes one remote issue of `tracker_id`. Bounty columns are left untouched.
pub async fn upsert_issue_sync(
	tx: &mut Transaction<'_, Postgres>,
	tracker_id: i64,
	sync: &IssueSync,
	now: OffsetDateTime,
) -> Result<i64> {
	let author_id: Option<i64> = match sync.author_login.as_deref() {
		Some(login) => Some(
			sqlx::query_scalar(
				"\
INSERT INTO authors (login)
VALUES ($1)
ON CONFLICT (login) DO UPDATE SET login = EXCLUDED.login
RETURNING id",
			)
			.bind(login)
			.fetch_one(&mut **tx)
			.await?,
		),
		None => None,
	};
	let issue_id: i64 = sqlx::query_scalar(
		"\
INSERT INTO issues (
	tracker_id,
	author_id,
	number,
	title,
	body,
	url,
	state,
	comments_count,
	thumbs_up_count,
	remote_created_at,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
ON CONFLICT (tracker_id, number) DO UPDATE
SET
	author_id = EXCLUDED.author_id,
	title = EXCLUDED.title,
	body = EXCLUDED.body,
	url = EXCLUDED.url,
	state = EXCLUDED.state,
	comments_count = EXCLUDED.comments_count,
	thumbs_up_count = EXCLUDED.thumbs_up_count,
	remote_created_at = EXCLUDED.remote_created_at,
	updated_at = EXCLUDED.updated_at
RETURNING id",
	)
	.bind(tracker_id)
	.bind(author_id)
	.bind(sync.number)
	.bind(sync.title.as_str())
	.bind(sync.body.as_deref())
	.bind(sync.url.as_str())
	.bind(sync.state.as_str())
	.bind(sync.comments_count)
	.bind(sync.thumbs_up_count)
	.bind(sync.remote_created_at)
	.bind(now)
	.fetch_one(&mut **tx)
	.await?;

	Ok(issue_id)
}

fn order_like<T, F>(ids: &[i64], rows: Vec<T>, id_of: F) -> Vec<T>
where
	F: Fn(&T) -> i64,
{
	let mut by_id: std::collections::HashMap<i64, T> =
		rows.into_iter().map(|row| (id_of(&row), row)).collect();

	ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
