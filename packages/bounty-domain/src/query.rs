use std::sync::LazyLock;

use regex::Regex;

/// Listing query that matches every title.
pub const WILDCARD: &str = "*";

static URL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"^https?://").expect("URL prefix pattern must compile.")
});
static GITHUB_TARGET: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"^https?://(?:www\.)?github\.com/(?P<owner>[A-Za-z0-9][A-Za-z0-9-]*)/(?P<repo>[A-Za-z0-9._-]+?)(?:\.git)?(?:/issues/(?P<number>\d+))?/?(?:[?#].*)?$",
	)
	.expect("GitHub target pattern must compile.")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind<'a> {
	Url(&'a str),
	Text(&'a str),
}

pub fn classify(query: &str) -> QueryKind<'_> {
	let query = query.trim();

	if URL_PREFIX.is_match(query) { QueryKind::Url(query) } else { QueryKind::Text(query) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GithubTarget {
	Repository { owner: String, name: String },
	Issue { owner: String, name: String, number: i64 },
}
impl GithubTarget {
	pub fn owner(&self) -> &str {
		match self {
			Self::Repository { owner, .. } | Self::Issue { owner, .. } => owner,
		}
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Repository { name, .. } | Self::Issue { name, .. } => name,
		}
	}

	/// `owner/name`, the key trackers are stored under.
	pub fn full_name(&self) -> String {
		format!("{}/{}", self.owner(), self.name())
	}

	pub fn repository_url(&self) -> String {
		format!("https://github.com/{}", self.full_name())
	}
}

pub fn parse_github_url(url: &str) -> Option<GithubTarget> {
	let captures = GITHUB_TARGET.captures(url.trim())?;
	let owner = captures.name("owner")?.as_str().to_string();
	let name = captures.name("repo")?.as_str().to_string();

	match captures.name("number") {
		Some(number) => {
			let number = number.as_str().parse().ok()?;

			Some(GithubTarget::Issue { owner, name, number })
		},
		None => Some(GithubTarget::Repository { owner, name }),
	}
}
