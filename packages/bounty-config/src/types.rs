use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub pagination: Pagination,
	pub providers: Providers,
	#[serde(default)]
	pub worker: Worker,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub tracker_collection: String,
	pub issue_collection: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Upper bound on trackers returned by a free-text search.
	pub tracker_limit: u32,
	/// Upper bound on issues returned by a free-text search.
	pub issue_limit: u32,
	pub typeahead_limit: u32,
	/// Points fetched per index round trip. Searches page until every match is collected.
	pub candidate_k: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self { tracker_limit: 50, issue_limit: 50, typeahead_limit: 5, candidate_k: 200 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Pagination {
	pub default_per_page: u32,
	pub bounty_per_page: u32,
}
impl Default for Pagination {
	fn default() -> Self {
		Self { default_per_page: 25, bounty_per_page: 20 }
	}
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub github: GithubProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubProviderConfig {
	pub api_base: String,
	pub token: Option<String>,
	pub user_agent: String,
	pub timeout_ms: u64,
	#[serde(default = "default_issues_per_page")]
	pub issues_per_page: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Worker {
	pub poll_interval_ms: u64,
	pub claim_lease_seconds: i64,
	pub max_attempts: i32,
}
impl Default for Worker {
	fn default() -> Self {
		Self { poll_interval_ms: 500, claim_lease_seconds: 300, max_attempts: 8 }
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}

fn default_issues_per_page() -> u32 {
	100
}
