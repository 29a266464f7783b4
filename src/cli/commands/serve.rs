use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tracing::{info, warn};

use crate::app::{connect_directory, router, AppState};
use crate::config::AppConfig;
use crate::directory::{Directory, MemoryDirectory};

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Port to listen on (overrides PORT / SETUP_ADMIN_PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Use an in-process directory instead of the configured backend")]
    pub memory: bool,

    #[arg(
        long = "user",
        value_name = "ID=EMAIL",
        requires = "memory",
        help = "Seed a user into the in-process directory (repeatable)"
    )]
    pub users: Vec<SeedUser>,
}

/// `ID=EMAIL` pair for `--user`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedUser {
    pub id: String,
    pub email: String,
}

impl FromStr for SeedUser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((id, email)) if !id.is_empty() && !email.is_empty() => Ok(Self {
                id: id.to_string(),
                email: email.to_string(),
            }),
            _ => Err(format!("expected ID=EMAIL, got '{}'", s)),
        }
    }
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::from_env();
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!("Starting setup-admin in {:?} mode", config.environment);
    if config.bootstrap.setup_token.is_none() {
        warn!("ADMIN_SETUP_TOKEN is not set; every bootstrap request will be rejected");
    }

    let directory: Arc<dyn Directory> = if args.memory {
        let memory = MemoryDirectory::new();
        for user in &args.users {
            memory.add_user(user.id.clone(), user.email.clone());
        }
        info!("Using in-process directory with {} seeded user(s)", args.users.len());
        Arc::new(memory)
    } else {
        connect_directory(&config).await?
    };

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let app = router(AppState::new(config, directory));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("setup-admin listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("setup-admin stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seed_user() {
        assert_eq!(
            "u1=owner@example.com".parse::<SeedUser>(),
            Ok(SeedUser { id: "u1".to_string(), email: "owner@example.com".to_string() })
        );
        assert!("=owner@example.com".parse::<SeedUser>().is_err());
        assert!("u1=".parse::<SeedUser>().is_err());
        assert!("u1".parse::<SeedUser>().is_err());
    }
}
