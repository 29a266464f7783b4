pub mod app;
pub mod cli;
pub mod config;
pub mod directory;
pub mod email;
pub mod error;
pub mod handlers;
