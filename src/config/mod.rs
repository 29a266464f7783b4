use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;

/// Default ceiling for the declared request body of the bootstrap endpoint.
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub bootstrap: BootstrapConfig,
    pub directory: DirectoryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct BootstrapConfig {
    /// Deploy-time shared secret. `None` means the endpoint refuses every caller.
    pub setup_token: Option<SetupToken>,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub database_url: Option<Secret>,
    pub supabase_url: Option<String>,
    pub service_role_key: Option<Secret>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

/// Errors raised while turning the environment into a usable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No user directory configured: set DATABASE_URL or SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY")]
    NoDirectory,

    #[error("Invalid SUPABASE_URL: {0}")]
    InvalidSupabaseUrl(String),
}

/// Opaque secret string. Never printed, never serialized.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

/// The setup token gating the bootstrap endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct SetupToken(Secret);

impl SetupToken {
    /// Empty values count as unset so a blank env var cannot open the endpoint.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() {
            None
        } else {
            Some(Self(Secret(value)))
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.expose().as_bytes()
    }
}

impl fmt::Debug for SetupToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SetupToken([redacted])")
    }
}

/// Which directory backend the configuration selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryBackend {
    Postgres { database_url: Secret },
    Supabase { base_url: url::Url, service_role_key: Secret },
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server
        if let Some(port) = env::var("SETUP_ADMIN_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|v| v.parse().ok())
        {
            self.server.port = port;
        }

        // Bootstrap
        self.bootstrap.setup_token = env::var("ADMIN_SETUP_TOKEN").ok().and_then(SetupToken::new);
        if let Ok(v) = env::var("SETUP_MAX_BODY_BYTES") {
            self.bootstrap.max_body_bytes = v.parse().unwrap_or(self.bootstrap.max_body_bytes);
        }

        // Directory
        self.directory.database_url = non_empty_var("DATABASE_URL").map(Secret);
        self.directory.supabase_url = non_empty_var("SUPABASE_URL");
        self.directory.service_role_key = non_empty_var("SUPABASE_SERVICE_ROLE_KEY").map(Secret);
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.directory.max_connections = v.parse().unwrap_or(self.directory.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.directory.connection_timeout = v.parse().unwrap_or(self.directory.connection_timeout);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            bootstrap: BootstrapConfig {
                setup_token: None,
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            },
            directory: DirectoryConfig {
                database_url: None,
                supabase_url: None,
                service_role_key: None,
                max_connections: 2,
                connection_timeout: 30,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            directory: DirectoryConfig {
                max_connections: 2,
                connection_timeout: 10,
                ..Self::development().directory
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            directory: DirectoryConfig {
                max_connections: 4,
                connection_timeout: 5,
                ..Self::development().directory
            },
            ..Self::development()
        }
    }

    /// Pick the directory backend. Postgres wins when both are configured.
    pub fn directory_backend(&self) -> Result<DirectoryBackend, ConfigError> {
        if let Some(database_url) = &self.directory.database_url {
            return Ok(DirectoryBackend::Postgres {
                database_url: database_url.clone(),
            });
        }

        match (&self.directory.supabase_url, &self.directory.service_role_key) {
            (Some(raw), Some(key)) => {
                let base_url = url::Url::parse(raw)
                    .map_err(|e| ConfigError::InvalidSupabaseUrl(e.to_string()))?;
                if !matches!(base_url.scheme(), "http" | "https") {
                    return Err(ConfigError::InvalidSupabaseUrl(format!(
                        "unsupported scheme '{}'",
                        base_url.scheme()
                    )));
                }
                Ok(DirectoryBackend::Supabase {
                    base_url,
                    service_role_key: key.clone(),
                })
            }
            _ => Err(ConfigError::NoDirectory),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
