//! Read-only GitHub REST client used to sync trackers and their issues.

use std::{collections::BTreeMap, time::Duration};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{Error, Result};

/// Upper bound on issue pages fetched for a single repository.
const MAX_ISSUE_PAGES: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
	#[default]
	Open,
	Closed,
	All,
}
impl IssueState {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Open => "open",
			Self::Closed => "closed",
			Self::All => "all",
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRepository {
	pub remote_id: i64,
	pub full_name: String,
	pub name: String,
	pub html_url: String,
	pub forks: i32,
	pub watchers: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteIssue {
	pub number: i64,
	pub title: String,
	pub body: Option<String>,
	pub html_url: String,
	pub state: String,
	pub author_login: Option<String>,
	pub comments: i32,
	pub thumbs_up: i32,
	pub created_at: Option<OffsetDateTime>,
}

pub struct GithubClient {
	client: Client,
	api_base: String,
	issues_per_page: u32,
}
impl GithubClient {
	pub fn new(cfg: &bounty_config::GithubProviderConfig) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.default_headers(crate::github_headers(cfg)?)
			.build()?;

		Ok(Self {
			client,
			api_base: cfg.api_base.clone(),
			issues_per_page: cfg.issues_per_page,
		})
	}

	pub async fn repository(&self, owner: &str, name: &str) -> Result<RemoteRepository> {
		let json = self.get_json(&format!("{}/repos/{owner}/{name}", self.api_base), &[]).await?;

		parse_repository(json)
	}

	/// Repository languages, largest byte count first.
	pub async fn languages(&self, owner: &str, name: &str) -> Result<Vec<String>> {
		let json = self
			.get_json(&format!("{}/repos/{owner}/{name}/languages", self.api_base), &[])
			.await?;

		parse_languages(json)
	}

	/// Issues in `state`, excluding pull requests, walking pages until a short page.
	pub async fn issues(
		&self,
		owner: &str,
		name: &str,
		state: IssueState,
	) -> Result<Vec<RemoteIssue>> {
		let url = format!("{}/repos/{owner}/{name}/issues", self.api_base);
		let per_page = self.issues_per_page.to_string();
		let mut out = Vec::new();

		for page in 1..=MAX_ISSUE_PAGES {
			let page = page.to_string();
			let json = self
				.get_json(
					&url,
					&[("state", state.as_str()), ("per_page", &per_page), ("page", &page)],
				)
				.await?;
			let (issues, raw_len) = parse_issues(json)?;

			out.extend(issues);

			if raw_len < self.issues_per_page as usize {
				break;
			}
		}

		tracing::debug!(owner, name, count = out.len(), "Fetched remote issues.");

		Ok(out)
	}

	async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value> {
		let res = self.client.get(url).query(query).send().await?;
		let json = res.error_for_status()?.json().await?;

		Ok(json)
	}
}

#[derive(Deserialize)]
struct RawRepository {
	id: i64,
	full_name: String,
	name: String,
	html_url: String,
	#[serde(default)]
	forks_count: i32,
	#[serde(default)]
	watchers_count: i32,
}

#[derive(Deserialize)]
struct RawIssue {
	number: i64,
	title: String,
	body: Option<String>,
	html_url: String,
	state: String,
	user: Option<RawUser>,
	#[serde(default)]
	comments: i32,
	reactions: Option<RawReactions>,
	created_at: Option<String>,
	pull_request: Option<Value>,
}

#[derive(Deserialize)]
struct RawUser {
	login: String,
}

#[derive(Deserialize)]
struct RawReactions {
	#[serde(rename = "+1", default)]
	thumbs_up: i32,
}

fn parse_repository(json: Value) -> Result<RemoteRepository> {
	let raw: RawRepository = serde_json::from_value(json)?;

	Ok(RemoteRepository {
		remote_id: raw.id,
		full_name: raw.full_name,
		name: raw.name,
		html_url: raw.html_url,
		forks: raw.forks_count,
		watchers: raw.watchers_count,
	})
}

fn parse_languages(json: Value) -> Result<Vec<String>> {
	let map: BTreeMap<String, u64> = serde_json::from_value(json)?;
	let mut languages: Vec<(String, u64)> = map.into_iter().collect();

	languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

	Ok(languages.into_iter().map(|(name, _)| name).collect())
}

/// Returns the parsed issues and the raw page length, pull requests included.
fn parse_issues(json: Value) -> Result<(Vec<RemoteIssue>, usize)> {
	let Value::Array(items) = json else {
		return Err(Error::InvalidResponse {
			message: "Issue listing response is not an array.".to_string(),
		});
	};
	let raw_len = items.len();
	let mut out = Vec::with_capacity(raw_len);

	for item in items {
		let raw: RawIssue = serde_json::from_value(item)?;

		if raw.pull_request.is_some() {
			continue;
		}

		let created_at = match raw.created_at.as_deref() {
			Some(text) => Some(OffsetDateTime::parse(text, &Rfc3339).map_err(|err| {
				Error::InvalidResponse { message: format!("Invalid issue created_at: {err}.") }
			})?),
			None => None,
		};

		out.push(RemoteIssue {
			number: raw.number,
			title: raw.title,
			body: raw.body,
			html_url: raw.html_url,
			state: raw.state,
			author_login: raw.user.map(|user| user.login),
			comments: raw.comments,
			thumbs_up: raw.reactions.map(|r| r.thumbs_up).unwrap_or_default(),
			created_at,
		});
	}

	Ok((out, raw_len))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_repository_counts() {
		let json = serde_json::json!({
			"id": 42,
			"full_name": "foo/bar",
			"name": "bar",
			"html_url": "https://github.com/foo/bar",
			"forks_count": 7,
			"watchers_count": 11,
			"private": false
		});
		let repo = parse_repository(json).expect("parse failed");

		assert_eq!(repo.remote_id, 42);
		assert_eq!(repo.full_name, "foo/bar");
		assert_eq!((repo.forks, repo.watchers), (7, 11));
	}

	#[test]
	fn orders_languages_by_size() {
		let json = serde_json::json!({ "Shell": 10, "Rust": 900, "C": 10 });

		assert_eq!(parse_languages(json).expect("parse failed"), vec!["Rust", "C", "Shell"]);
	}

	#[test]
	fn skips_pull_requests_but_counts_them_in_page_length() {
		let json = serde_json::json!([
			{
				"number": 1,
				"title": "Crash on start",
				"body": null,
				"html_url": "https://github.com/foo/bar/issues/1",
				"state": "open",
				"user": { "login": "alice" },
				"comments": 3,
				"reactions": { "+1": 5 },
				"created_at": "2024-03-01T12:00:00Z"
			},
			{
				"number": 2,
				"title": "Fix crash",
				"html_url": "https://github.com/foo/bar/pull/2",
				"state": "open",
				"pull_request": { "url": "https://api.github.com/repos/foo/bar/pulls/2" }
			}
		]);
		let (issues, raw_len) = parse_issues(json).expect("parse failed");

		assert_eq!(raw_len, 2);
		assert_eq!(issues.len(), 1);
		assert_eq!(issues[0].author_login.as_deref(), Some("alice"));
		assert_eq!(issues[0].thumbs_up, 5);
		assert_eq!(issues[0].created_at.map(|ts| ts.year()), Some(2024));
	}

	#[test]
	fn rejects_non_array_issue_listing() {
		let json = serde_json::json!({ "message": "Not Found" });

		assert!(matches!(parse_issues(json), Err(Error::InvalidResponse { .. })));
	}
}
