//! Data models for the STEMwerk launcher.
//!
//! - [`StemwerkSettings`]: typed view over the `STEMwerk` extension-state section
//! - [`Platform`]: operating system family, determined once at startup
//! - [`Stem`]: stem selection (vocals, drums, bass or all) and the files each produces

pub mod config;
pub mod platform;
pub mod stem;

pub use config::StemwerkSettings;
pub use platform::Platform;
pub use stem::{Stem, UnknownStem};
