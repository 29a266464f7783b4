pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "setup-admin")]
#[command(about = "One-time administrator bootstrap service and operator tools")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the bootstrap HTTP server")]
    Serve(commands::serve::ServeArgs),

    #[command(about = "Call a deployed bootstrap endpoint")]
    Invoke(commands::invoke::InvokeArgs),

    #[command(about = "Check an address against the bootstrap email rules")]
    CheckEmail(commands::check_email::CheckEmailArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// A command failure already written out in the selected output format.
/// `main` only sets the exit status for it.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ReportedError(pub String);

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Serve(args) => commands::serve::handle(args).await,
        Commands::Invoke(args) => commands::invoke::handle(args, output_format).await,
        Commands::CheckEmail(args) => commands::check_email::handle(args, output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_with_seeded_users() {
        let cli = Cli::try_parse_from([
            "setup-admin",
            "serve",
            "--memory",
            "--port",
            "8080",
            "--user",
            "u1=owner@example.com",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve(args) => {
                assert!(args.memory);
                assert_eq!(args.port, Some(8080));
                assert_eq!(args.users.len(), 1);
                assert_eq!(args.users[0].id, "u1");
                assert_eq!(args.users[0].email, "owner@example.com");
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn json_flag_is_global() {
        let cli = Cli::try_parse_from(["setup-admin", "check-email", "a@b.co", "--json"]).unwrap();
        assert_eq!(OutputFormat::from_cli(&cli), OutputFormat::Json);
    }

    #[test]
    fn rejects_malformed_seed_user() {
        assert!(Cli::try_parse_from(["setup-admin", "serve", "--memory", "--user", "no-separator"]).is_err());
    }
}
