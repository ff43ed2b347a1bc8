pub mod routes;
pub mod state;

use std::net::SocketAddr;

use clap::Parser;
use color_eyre::eyre;
use tokio::net::TcpListener;

use bounty_cli::ConfigArgs;

use crate::state::AppState;

#[derive(Debug, Parser)]
#[command(
	version = bounty_cli::VERSION,
	rename_all = "kebab",
	styles = bounty_cli::styles(),
)]
pub struct Args {
	#[command(flatten)]
	pub config: ConfigArgs,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = bounty_config::load(&args.config.config)?;

	bounty_cli::init_tracing(&config.service.log_level);

	let (http_addr, admin_addr) = bind_addrs(&config)?;
	let state = AppState::new(config).await?;
	let app = routes::router(state.clone());
	let admin_app = routes::admin_router(state);
	let http_listener = TcpListener::bind(http_addr).await?;

	tracing::info!(%http_addr, "HTTP server listening.");

	let http_server = axum::serve(http_listener, app);
	let admin_listener = TcpListener::bind(admin_addr).await?;

	tracing::info!(%admin_addr, "Admin server listening.");

	let admin_server = axum::serve(admin_listener, admin_app);

	tokio::try_join!(http_server, admin_server)?;

	Ok(())
}

/// The admin listener is always loopback-only; the public one only when configured so.
fn bind_addrs(config: &bounty_config::Config) -> color_eyre::Result<(SocketAddr, SocketAddr)> {
	let http_addr: SocketAddr = config.service.http_bind.parse()?;
	let admin_addr: SocketAddr = config.service.admin_bind.parse()?;

	if config.security.bind_localhost_only && !http_addr.ip().is_loopback() {
		return Err(eyre::eyre!(
			"http_bind must be a loopback address when bind_localhost_only is true."
		));
	}
	if !admin_addr.ip().is_loopback() {
		return Err(eyre::eyre!("admin_bind must be a loopback address."));
	}

	Ok((http_addr, admin_addr))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config(http_bind: &str, admin_bind: &str, localhost_only: bool) -> bounty_config::Config {
		let raw = format!(
			r#"
[service]
http_bind = "{http_bind}"
admin_bind = "{admin_bind}"
log_level = "info"

[storage.postgres]
dsn = "postgres://postgres@127.0.0.1/bounty"
pool_max_conns = 1

[storage.qdrant]
url = "http://127.0.0.1:6334"
tracker_collection = "trackers"
issue_collection = "issues"

[providers.github]
api_base = "https://api.github.com"
user_agent = "bounty-test"
timeout_ms = 1000

[security]
bind_localhost_only = {localhost_only}
"#
		);

		bounty_config::parse(&raw).expect("Test config must parse.")
	}

	#[test]
	fn public_bind_requires_opt_out() {
		assert!(bind_addrs(&config("0.0.0.0:8080", "127.0.0.1:8081", true)).is_err());
		assert!(bind_addrs(&config("0.0.0.0:8080", "127.0.0.1:8081", false)).is_ok());
	}

	#[test]
	fn admin_bind_is_always_loopback() {
		assert!(bind_addrs(&config("127.0.0.1:8080", "0.0.0.0:8081", false)).is_err());
	}
}
