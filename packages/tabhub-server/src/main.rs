use clap::Parser;
use tabhub_server::server;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(
    name = "tabhub",
    about = "Merges browser tab lists and focuses the owning window on request"
)]
struct Cli {
    #[command(flatten)]
    server: server::ServerArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_directive = if cli.server.debug {
        "tabhub=debug,tabhub_core=debug,tabhub_server=debug,info"
    } else {
        "tabhub=info,tabhub_core=info,tabhub_server=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    info!("Starting tabhub v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = server::run(cli.server).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
