//! Interpreter resolution: configured override first, then the ranked candidate search.
//!
//! A candidate is only trusted once its probe exited with status 0 AND printed
//! a `major.minor.patch` version. The configured path gets no special
//! treatment beyond going first: it is re-probed on every run and a failing
//! override simply falls through to the candidate list.
//!
//! Resolution never fails with an error. Every spawn error, timeout, missing
//! file or unparsable output is a [`ProbeFailure`] that is logged and skipped;
//! when nothing verifies the caller receives [`Resolution::NotFound`].

use crate::models::Platform;
use crate::services::candidates::{Candidate, CandidatePolicy};
use crate::services::filesystem::FileSystem;
use crate::services::process::{CommandSpec, ProcessError, ProcessRunner};
use crate::services::version::PythonVersion;
use camino::Utf8Path;
use std::time::Duration;
use thiserror::Error;

/// Python snippet printing `major.minor.patch` from `sys.version_info`.
pub const VERSION_PROBE_SCRIPT: &str = "import sys; print('%d.%d.%d' % sys.version_info[:3])";

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// Why a single candidate could not be verified
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    #[error("{0} does not exist")]
    Missing(String),

    #[error("could not start: {0}")]
    Spawn(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("exited with status {0:?}")]
    ExitStatus(Option<i32>),

    #[error("printed no version: {0:?}")]
    NoVersion(String),
}

impl From<ProcessError> for ProbeFailure {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Timeout(duration) => ProbeFailure::Timeout(duration),
            other => ProbeFailure::Spawn(other.to_string()),
        }
    }
}

/// Where a resolved interpreter came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    Configured,
    Search,
}

/// A verified interpreter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInterpreter {
    pub path: String,
    pub version: PythonVersion,
    pub source: ResolutionSource,
}

/// Result of [`InterpreterResolver::resolve`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedInterpreter),
    /// Nothing verified. `fallback` is the platform default alias and is
    /// NOT verified; callers must treat this as a failure.
    NotFound { fallback: String },
}

impl Resolution {
    pub fn interpreter(&self) -> Option<&ResolvedInterpreter> {
        match self {
            Resolution::Resolved(interpreter) => Some(interpreter),
            Resolution::NotFound { .. } => None,
        }
    }

    /// Command name to use: the verified path, or the unverified fallback alias.
    pub fn command(&self) -> &str {
        match self {
            Resolution::Resolved(interpreter) => &interpreter.path,
            Resolution::NotFound { fallback } => fallback,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }
}

/// Finds a runnable interpreter using injected process and filesystem boundaries.
pub struct InterpreterResolver<'a> {
    runner: &'a dyn ProcessRunner,
    fs: &'a dyn FileSystem,
    probe_timeout: Duration,
    policy: Option<CandidatePolicy>,
}

impl<'a> InterpreterResolver<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, fs: &'a dyn FileSystem) -> Self {
        Self {
            runner,
            fs,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            policy: None,
        }
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    /// Replace the built-in per-platform search order.
    pub fn with_policy(mut self, policy: CandidatePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Run the version probe against one candidate.
    pub fn probe(&self, candidate: &Candidate) -> Result<PythonVersion, ProbeFailure> {
        if candidate.is_path() && !self.fs.exists(candidate.as_path()) {
            return Err(ProbeFailure::Missing(candidate.value.clone()));
        }

        let command = CommandSpec::new(candidate.value.as_str())
            .arg("-c")
            .arg(VERSION_PROBE_SCRIPT);

        let output = self.runner.run(&command, self.probe_timeout)?;

        if !output.success() {
            return Err(ProbeFailure::ExitStatus(output.exit_code));
        }

        PythonVersion::parse(&output.stdout)
            .ok_or_else(|| ProbeFailure::NoVersion(output.stdout.trim().to_string()))
    }

    /// Candidate list this resolver would search for the given inputs.
    pub fn candidates(&self, platform: Platform, home: &Utf8Path, script_dir: &Utf8Path) -> Vec<Candidate> {
        match &self.policy {
            Some(policy) => policy.build(platform, home, script_dir),
            None => CandidatePolicy::for_platform(platform).build(platform, home, script_dir),
        }
    }

    /// Resolve an interpreter, preferring `configured_path` when it verifies.
    pub fn resolve(
        &self,
        configured_path: &str,
        platform: Platform,
        home: &Utf8Path,
        script_dir: &Utf8Path,
    ) -> Resolution {
        let configured = configured_path.trim().trim_matches('"');
        let mut rejected_configured = None;

        if !configured.is_empty() {
            let candidate = Candidate::classify(configured);
            match self.probe(&candidate) {
                Ok(version) => {
                    tracing::info!("Using configured interpreter {} ({})", configured, version);
                    return Resolution::Resolved(ResolvedInterpreter {
                        path: candidate.value,
                        version,
                        source: ResolutionSource::Configured,
                    });
                }
                Err(failure) => {
                    tracing::warn!(
                        "Configured interpreter {} failed verification ({}), searching",
                        configured,
                        failure
                    );
                    rejected_configured = Some(candidate.value);
                }
            }
        }

        let candidates = self.candidates(platform, home, script_dir);
        tracing::debug!("Probing {} candidates for {}", candidates.len(), platform);

        for candidate in candidates {
            // Already probed (and rejected) as the configured value
            if rejected_configured.as_deref() == Some(candidate.value.as_str()) {
                tracing::debug!("Skipping {}: configured value already rejected", candidate);
                continue;
            }

            match self.probe(&candidate) {
                Ok(version) => {
                    tracing::info!("Found interpreter {} ({})", candidate, version);
                    return Resolution::Resolved(ResolvedInterpreter {
                        path: candidate.value,
                        version,
                        source: ResolutionSource::Search,
                    });
                }
                Err(failure) => {
                    tracing::debug!("Candidate {} rejected: {}", candidate, failure);
                }
            }
        }

        let fallback = platform.default_alias().to_string();
        tracing::warn!("No working interpreter found, falling back to '{}'", fallback);
        Resolution::NotFound { fallback }
    }
}
