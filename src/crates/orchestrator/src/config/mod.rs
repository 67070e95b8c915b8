//! Layered configuration: a TOML file for static topology, environment
//! variables for secrets and per-deployment overrides, and CLI flags
//! (see `bin/orchestrator-server.rs`) that take precedence over both.

pub mod server;

pub use server::{PathsConfig, ProvidersConfig, ServerConfig, ServerConfigError, ServerInfoConfig};
