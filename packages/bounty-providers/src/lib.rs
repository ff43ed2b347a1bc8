pub mod github;

mod error;

pub use error::{Error, Result};

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

pub fn github_headers(cfg: &bounty_config::GithubProviderConfig) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
	headers.insert(USER_AGENT, cfg.user_agent.parse()?);

	if let Some(token) = cfg.token.as_deref() {
		let mut value: HeaderValue = format!("Bearer {token}").parse()?;

		value.set_sensitive(true);
		headers.insert(AUTHORIZATION, value);
	}

	Ok(headers)
}
