//! Host actions: the user-triggered workflows built on top of [`crate::services`].
//!
//! Each action receives an [`ActionContext`] holding every collaborator it
//! touches (process runner, filesystem, extension-state store, dialogs and the
//! host environment), so workflows run the same way against the real system and
//! against test doubles.
//!
//! The services never decide whether to halt. This layer does: a
//! [`WorkflowError::ResolutionFailure`] stops every action that needs Python,
//! while a missing ffmpeg is only a warning.

pub mod check;
pub mod separate;
pub mod setup;

pub use check::{CandidateReport, DiagnosticsReport, run_check};
pub use separate::{
    HelperListing, default_output_dir, list_device_inventory, list_helper, run_quick,
    run_separation,
};
pub use setup::{SetupOptions, SetupReport, choose_helper_script, run_setup};

use crate::config::{ExtStateError, ExtStateStore};
use crate::models::{Platform, StemwerkSettings};
use crate::services::{
    CandidatePolicy, FileSystem, HelperError, InstallError, InterpreterResolver, ProcessRunner,
    PythonVersion, Resolution, ResolvedInterpreter, SeparatorHelper, helper_script_path,
};
use crate::ui::Prompter;
use anyhow::{Context, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use thiserror::Error;

/// Title used on every dialog.
pub const DIALOG_TITLE: &str = "STEMwerk";

/// Errors that end an action
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(
        "No working Python interpreter found (tried the configured path and all known locations; \
         '{fallback}' did not verify)"
    )]
    ResolutionFailure { fallback: String },

    #[error("Separation helper check failed: {0}")]
    HelperCheckFailed(#[source] HelperError),

    #[error("Installing the separation package failed: {0}")]
    InstallFailed(#[from] InstallError),

    #[error("Separation failed: {0}")]
    SeparationFailed(#[source] HelperError),

    #[error("{0}")]
    NotConfigured(String),

    #[error("Cancelled by user")]
    Cancelled,

    #[error("Failed to update configuration: {0}")]
    Store(#[from] ExtStateError),
}

/// Where the launcher is running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    pub platform: Platform,
    pub home: Utf8PathBuf,
    /// Directory holding the helper script (and, two levels up, the repository venv).
    pub script_dir: Utf8PathBuf,
}

impl HostEnvironment {
    pub fn new(platform: Platform, home: impl Into<Utf8PathBuf>, script_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            platform,
            home: home.into(),
            script_dir: script_dir.into(),
        }
    }

    /// Detect platform and home directory; `script_dir` defaults to the executable's directory.
    pub fn detect(script_dir: Option<Utf8PathBuf>) -> anyhow::Result<Self> {
        let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("Could not determine home directory"))?;
        let home = Utf8PathBuf::from_path_buf(base_dirs.home_dir().to_path_buf())
            .map_err(|p| anyhow!("Home directory is not valid UTF-8: {}", p.display()))?;

        let script_dir = match script_dir {
            Some(dir) => dir,
            None => {
                let exe = std::env::current_exe().context("Failed to locate the running executable")?;
                let exe = Utf8PathBuf::from_path_buf(exe)
                    .map_err(|p| anyhow!("Executable path is not valid UTF-8: {}", p.display()))?;
                exe.parent()
                    .map(Utf8Path::to_path_buf)
                    .ok_or_else(|| anyhow!("Executable has no parent directory: {}", exe))?
            }
        };

        let environment = Self::new(Platform::current(), home, script_dir);
        tracing::info!(
            "Host environment: platform={}, home={}, script_dir={}",
            environment.platform,
            environment.home,
            environment.script_dir
        );
        Ok(environment)
    }
}

/// Collaborators shared by every action
pub struct ActionContext<'a> {
    pub runner: &'a dyn ProcessRunner,
    pub fs: &'a dyn FileSystem,
    pub store: &'a mut dyn ExtStateStore,
    pub prompter: &'a dyn Prompter,
    pub environment: HostEnvironment,
    /// User search order from `candidates.yaml`; `None` uses the platform default.
    pub candidate_policy: Option<CandidatePolicy>,
}

impl ActionContext<'_> {
    pub fn settings(&self) -> StemwerkSettings {
        StemwerkSettings::load(&*self.store)
    }

    pub fn resolver(&self, settings: &StemwerkSettings) -> InterpreterResolver<'_> {
        let resolver = InterpreterResolver::new(self.runner, self.fs)
            .with_probe_timeout(settings.probe_timeout());

        match &self.candidate_policy {
            Some(policy) => resolver.with_policy(policy.clone()),
            None => resolver,
        }
    }

    pub fn resolve(&self, settings: &StemwerkSettings) -> Resolution {
        self.resolver(settings).resolve(
            &settings.python_path,
            self.environment.platform,
            &self.environment.home,
            &self.environment.script_dir,
        )
    }

    pub fn helper_script(&self, settings: &StemwerkSettings) -> Utf8PathBuf {
        helper_script_path(&settings.separator_script, &self.environment.script_dir)
    }

    pub fn helper(&self, settings: &StemwerkSettings, python: &str) -> SeparatorHelper<'_> {
        SeparatorHelper::new(self.runner, self.fs, python, self.helper_script(settings))
            .with_separation_timeout(settings.separation_timeout())
    }
}

/// Installation advice shown when no interpreter verifies.
pub fn install_advice(platform: Platform) -> String {
    let steps = match platform {
        Platform::Windows => {
            "Install Python 3.10 to 3.13 from python.org (tick \"Add python.exe to PATH\"), \
             then run setup again."
        }
        Platform::MacOs => {
            "Install Python with Homebrew (brew install python@3.12) or from python.org, \
             then run setup again."
        }
        Platform::Linux => {
            "Install python3 and python3-venv with your package manager, or create \
             ~/.stemwerk-venv with python3 -m venv, then run setup again."
        }
    };

    format!(
        "No working Python interpreter was found.\n\n{}\n\nYou can also set an explicit \
         interpreter with: stemwerk config set pythonPath <path>",
        steps
    )
}

/// Resolve an interpreter or tell the user how to get one.
pub fn require_interpreter(
    ctx: &ActionContext<'_>,
    settings: &StemwerkSettings,
) -> Result<ResolvedInterpreter, WorkflowError> {
    match ctx.resolve(settings) {
        Resolution::Resolved(interpreter) => Ok(interpreter),
        Resolution::NotFound { fallback } => {
            tracing::error!("Interpreter resolution failed");
            ctx.prompter
                .warn(DIALOG_TITLE, &install_advice(ctx.environment.platform));
            Err(WorkflowError::ResolutionFailure { fallback })
        }
    }
}

pub(crate) fn incompatibility_message(version: PythonVersion, python: &str) -> String {
    format!(
        "Python {} at {} is likely incompatible with audio-separator and its \
         dependencies.\n\nSeparation may fail. Continue anyway?",
        version, python
    )
}
