use clap::Parser;
use setup_admin::cli::{Cli, ReportedError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Load .env if present so local runs pick up ADMIN_SETUP_TOKEN, DATABASE_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("setup_admin=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = setup_admin::cli::run(cli).await {
        if e.downcast_ref::<ReportedError>().is_some() {
            std::process::exit(1);
        }
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }
}
