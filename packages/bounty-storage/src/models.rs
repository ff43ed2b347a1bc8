use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Tracker {
	pub id: i64,
	pub full_name: String,
	pub name: String,
	pub url: String,
	pub remote_id: Option<i64>,
	pub forks: i32,
	pub watchers: i32,
	pub bounty_total: f64,
	pub team_id: Option<i64>,
	pub synced_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Issue {
	pub id: i64,
	pub tracker_id: i64,
	pub author_id: Option<i64>,
	pub number: Option<i64>,
	pub title: String,
	pub body: Option<String>,
	pub url: String,
	pub state: String,
	pub bounty_total: f64,
	pub can_add_bounty: bool,
	pub participants_count: i32,
	pub thumbs_up_count: i32,
	pub backers_count: i32,
	pub comments_count: i32,
	pub earliest_bounty: Option<OffsetDateTime>,
	pub remote_created_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CryptoBounty {
	pub id: i64,
	pub issue_id: i64,
	pub amount: f64,
	pub symbol: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchRecord {
	pub id: i64,
	pub query: String,
	pub person_id: Option<i64>,
	pub params: Value,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IssueAddress {
	pub id: i64,
	pub issue_id: i64,
	pub public_address: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Author {
	pub id: i64,
	pub login: String,
	pub person_id: Option<i64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Person {
	pub id: i64,
	pub display_name: String,
	pub image_url: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrackerLanguage {
	pub tracker_id: i64,
	pub id: i64,
	pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Team {
	pub id: i64,
	pub name: String,
	pub slug: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BackgroundJob {
	pub job_id: Uuid,
	pub task: String,
	pub args: Value,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
	pub completed_at: Option<OffsetDateTime>,
}

/// Issue row joined with the text its tracker contributes to the search index.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IssueIndexRow {
	pub id: i64,
	pub tracker_id: i64,
	pub title: String,
	pub body: Option<String>,
	pub bounty_total: f64,
	pub comments_count: i32,
	pub tracker_name: String,
	pub languages_name: String,
}

/// Repository state fetched from the remote host.
#[derive(Debug, Clone)]
pub struct TrackerSync {
	pub full_name: String,
	pub name: String,
	pub url: String,
	pub remote_id: i64,
	pub forks: i32,
	pub watchers: i32,
	pub languages: Vec<String>,
}

/// Issue state fetched from the remote host.
#[derive(Debug, Clone)]
pub struct IssueSync {
	pub number: i64,
	pub title: String,
	pub body: Option<String>,
	pub url: String,
	pub state: String,
	pub author_login: Option<String>,
	pub comments_count: i32,
	pub thumbs_up_count: i32,
	pub remote_created_at: Option<OffsetDateTime>,
}
