use clap::Parser;
use guestlist_server::config::Cli;
use guestlist_server::telemetry::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format, &cli.log_level);
    guestlist_server::app::run(cli).await
}
