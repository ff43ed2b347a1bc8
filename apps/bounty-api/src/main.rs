use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = bounty_api::Args::parse();

	bounty_api::run(args).await
}
