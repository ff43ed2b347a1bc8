//! JSON shapes for trackers and issues returned by the service.

use serde::Serialize;
use time::OffsetDateTime;

use bounty_storage::models::{Issue, Person, Team, Tracker, TrackerLanguage};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackerItem {
	pub id: i64,
	pub full_name: String,
	pub name: String,
	pub url: String,
	pub forks: i32,
	pub watchers: i32,
	pub bounty_total: f64,
	#[serde(with = "crate::time_serde::option")]
	pub synced_at: Option<OffsetDateTime>,
}
impl From<Tracker> for TrackerItem {
	fn from(tracker: Tracker) -> Self {
		Self {
			id: tracker.id,
			full_name: tracker.full_name,
			name: tracker.name,
			url: tracker.url,
			forks: tracker.forks,
			watchers: tracker.watchers,
			bounty_total: tracker.bounty_total,
			synced_at: tracker.synced_at,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueItem {
	pub id: i64,
	pub tracker_id: i64,
	pub number: Option<i64>,
	pub title: String,
	pub url: String,
	pub state: String,
	pub bounty_total: f64,
	pub can_add_bounty: bool,
	pub participants_count: i32,
	pub thumbs_up_count: i32,
	pub backers_count: i32,
	pub comments_count: i32,
	#[serde(with = "crate::time_serde::option")]
	pub earliest_bounty: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option")]
	pub remote_created_at: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl From<Issue> for IssueItem {
	fn from(issue: Issue) -> Self {
		Self {
			id: issue.id,
			tracker_id: issue.tracker_id,
			number: issue.number,
			title: issue.title,
			url: issue.url,
			state: issue.state,
			bounty_total: issue.bounty_total,
			can_add_bounty: issue.can_add_bounty,
			participants_count: issue.participants_count,
			thumbs_up_count: issue.thumbs_up_count,
			backers_count: issue.backers_count,
			comments_count: issue.comments_count,
			earliest_bounty: issue.earliest_bounty,
			remote_created_at: issue.remote_created_at,
			created_at: issue.created_at,
			updated_at: issue.updated_at,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonItem {
	pub id: i64,
	pub display_name: String,
	pub image_url: Option<String>,
}
impl From<Person> for PersonItem {
	fn from(person: Person) -> Self {
		Self { id: person.id, display_name: person.display_name, image_url: person.image_url }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorItem {
	pub id: i64,
	pub login: String,
	pub person: Option<PersonItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageItem {
	pub id: i64,
	pub name: String,
}
impl From<TrackerLanguage> for LanguageItem {
	fn from(language: TrackerLanguage) -> Self {
		Self { id: language.id, name: language.name }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamItem {
	pub id: i64,
	pub name: String,
	pub slug: String,
}
impl From<Team> for TeamItem {
	fn from(team: Team) -> Self {
		Self { id: team.id, name: team.name, slug: team.slug }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BountyTracker {
	#[serde(flatten)]
	pub tracker: TrackerItem,
	pub languages: Vec<LanguageItem>,
	pub team: Option<TeamItem>,
}

/// A listed bounty issue with its associations loaded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BountyIssue {
	#[serde(flatten)]
	pub issue: IssueItem,
	pub issue_address: Option<String>,
	pub author: Option<AuthorItem>,
	pub tracker: Option<BountyTracker>,
}
