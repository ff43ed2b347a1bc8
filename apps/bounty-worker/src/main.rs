use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = bounty_worker::Args::parse();

	bounty_worker::run(args).await
}
