//! Services module - interpreter discovery and external process verification.
//!
//! Everything here is framework-agnostic: no dialogs, no persistence. Every
//! external effect goes through one of two injected boundaries so the logic
//! can be tested without spawning real interpreters:
//!
//! - [`ProcessRunner`]: blocking process execution with a timeout
//! - [`FileSystem`]: existence and size checks
//!
//! # Components
//!
//! - [`InterpreterResolver`]: configured override first, then the ranked
//!   per-platform [`CandidatePolicy`]; first candidate that exits 0 and prints a
//!   `major.minor.patch` version wins
//! - [`CompatibilityPolicy`]: flags interpreter versions the separation package
//!   is known not to support
//! - [`ToolchainVerifier`]: `ffmpeg -version` presence check
//! - [`SeparatorHelper`]: runs the Python separation helper (`--check`, listings,
//!   full separation) and verifies its outputs
//! - [`PackageInstaller`]: import check and `pip install` of the separation package
//!
//! # Usage Example
//!
//! ```ignore
//! use stemwerk::services::{InterpreterResolver, RealFileSystem, TokioProcessRunner};
//!
//! let runner = TokioProcessRunner::new()?;
//! let resolver = InterpreterResolver::new(&runner, &RealFileSystem);
//! let resolution = resolver.resolve(&settings.python_path, platform, &home, &script_dir);
//! ```

pub mod candidates;
pub mod filesystem;
pub mod helper;
pub mod installer;
pub mod process;
pub mod resolver;
pub mod toolchain;
pub mod version;

pub use candidates::{Candidate, CandidateKind, CandidatePolicy, build_candidate_list};
pub use filesystem::{FileSystem, RealFileSystem};
pub use helper::{
    ComputeDevice, DeviceInventory, HelperError, Progress, SeparationReport, SeparationRequest,
    SeparatorHelper, SkippedDevice, helper_script_path, parse_device_inventory,
};
pub use installer::{InstallError, PackageInstaller};
pub use process::{CommandSpec, ProcessError, ProcessOutput, ProcessRunner, TokioProcessRunner};
pub use resolver::{
    InterpreterResolver, ProbeFailure, Resolution, ResolutionSource, ResolvedInterpreter,
};
pub use toolchain::ToolchainVerifier;
pub use version::{Compatibility, CompatibilityPolicy, PythonVersion};
