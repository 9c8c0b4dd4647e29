// STEMwerk - interpreter discovery and helper launching for AI stem separation
//
// This is the library crate containing the resolver, process plumbing and workflows.
// The binary crate (main.rs) provides the command-line entry point for the host actions.

pub mod actions;
pub mod config;
pub mod logging;
pub mod models;
pub mod services;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::{ConfigManager, ExtStateStore};
pub use models::{Platform, Stem, StemwerkSettings};
pub use services::{InterpreterResolver, Resolution, ResolvedInterpreter};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
