// handlers/mod.rs - HTTP handlers
//
// Public (no auth): service metadata and health.
// Token-gated: the one-time admin bootstrap.

pub mod health;
pub mod setup_admin;

pub use health::{health, root};
pub use setup_admin::setup_admin;
