mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, GithubProviderConfig, Pagination, Postgres, Providers, Qdrant, Search, Security,
	Service, Storage, Worker,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	parse(&raw).map_err(|err| match err {
		Error::ParseConfig { source, .. } =>
			Error::ParseConfig { path: path.to_path_buf(), source },
		other => other,
	})
}

pub fn parse(raw: &str) -> Result<Config> {
	let mut cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: Default::default(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	for (label, value) in [
		("service.http_bind", &cfg.service.http_bind),
		("service.admin_bind", &cfg.service.admin_bind),
		("storage.postgres.dsn", &cfg.storage.postgres.dsn),
		("storage.qdrant.url", &cfg.storage.qdrant.url),
		("storage.qdrant.tracker_collection", &cfg.storage.qdrant.tracker_collection),
		("storage.qdrant.issue_collection", &cfg.storage.qdrant.issue_collection),
		("providers.github.api_base", &cfg.providers.github.api_base),
		("providers.github.user_agent", &cfg.providers.github.user_agent),
	] {
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if cfg.storage.qdrant.tracker_collection == cfg.storage.qdrant.issue_collection {
		return Err(Error::Validation {
			message: "storage.qdrant.tracker_collection and storage.qdrant.issue_collection must differ."
				.to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}

	for (label, value) in [
		("search.tracker_limit", cfg.search.tracker_limit),
		("search.issue_limit", cfg.search.issue_limit),
		("search.typeahead_limit", cfg.search.typeahead_limit),
		("search.candidate_k", cfg.search.candidate_k),
		("pagination.default_per_page", cfg.pagination.default_per_page),
		("pagination.bounty_per_page", cfg.pagination.bounty_per_page),
		("providers.github.issues_per_page", cfg.providers.github.issues_per_page),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	let largest_limit = cfg
		.search
		.tracker_limit
		.max(cfg.search.issue_limit)
		.max(cfg.search.typeahead_limit);

	if largest_limit > cfg.search.candidate_k {
		return Err(Error::Validation {
			message: "search.candidate_k must be at least as large as every search limit."
				.to_string(),
		});
	}
	if cfg.providers.github.issues_per_page > 100 {
		return Err(Error::Validation {
			message: "providers.github.issues_per_page must be 100 or less.".to_string(),
		});
	}
	if cfg.providers.github.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.github.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.poll_interval_ms == 0 {
		return Err(Error::Validation {
			message: "worker.poll_interval_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.claim_lease_seconds <= 0 {
		return Err(Error::Validation {
			message: "worker.claim_lease_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.worker.max_attempts <= 0 {
		return Err(Error::Validation {
			message: "worker.max_attempts must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.providers.github.token.as_deref().map(|token| token.trim().is_empty()).unwrap_or(false)
	{
		cfg.providers.github.token = None;
	}

	cfg.providers.github.api_base = cfg.providers.github.api_base.trim_end_matches('/').to_string();
}
