use crate::services::process::{CommandSpec, ProcessError, ProcessRunner};
use std::time::Duration;
use thiserror::Error;

/// pip distribution providing the separation backend.
pub const SEPARATOR_PACKAGE: &str = "audio-separator";

/// Import name of [`SEPARATOR_PACKAGE`].
pub const SEPARATOR_MODULE: &str = "audio_separator";

pub const DEFAULT_INSTALL_TIMEOUT: Duration = Duration::from_secs(900);

#[derive(Error, Debug)]
pub enum InstallError {
    #[error("pip could not be started: {0}")]
    Process(#[from] ProcessError),

    #[error("pip install {package} failed with status {exit_code:?}:\n{details}")]
    Failed {
        package: String,
        exit_code: Option<i32>,
        details: String,
    },
}

/// Checks for and installs Python packages into a resolved interpreter.
pub struct PackageInstaller<'a> {
    runner: &'a dyn ProcessRunner,
    python: String,
    probe_timeout: Duration,
    install_timeout: Duration,
}

impl<'a> PackageInstaller<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, python: impl Into<String>) -> Self {
        Self {
            runner,
            python: python.into(),
            probe_timeout: Duration::from_secs(30),
            install_timeout: DEFAULT_INSTALL_TIMEOUT,
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_install_timeout(mut self, timeout: Duration) -> Self {
        self.install_timeout = timeout;
        self
    }

    /// True when `import <module>` succeeds in the interpreter.
    pub fn is_importable(&self, module: &str) -> bool {
        let command = CommandSpec::new(self.python.as_str())
            .arg("-c")
            .arg(format!("import {}", module));

        match self.runner.run(&command, self.probe_timeout) {
            Ok(output) => output.success(),
            Err(e) => {
                tracing::debug!("Import probe for {} failed: {}", module, e);
                false
            }
        }
    }

    /// `python -m pip install --upgrade <package>`
    pub fn install(&self, package: &str) -> Result<(), InstallError> {
        let command = CommandSpec::new(self.python.as_str()).args([
            "-m",
            "pip",
            "install",
            "--upgrade",
            package,
        ]);

        tracing::info!("Installing {} with {}", package, self.python);
        let output = self.runner.run(&command, self.install_timeout)?;

        if !output.success() {
            return Err(InstallError::Failed {
                package: package.to_string(),
                exit_code: output.exit_code,
                details: output.tail(12),
            });
        }

        tracing::info!(
            "Installed {} in {:.1}s",
            package,
            output.duration.as_secs_f32()
        );
        Ok(())
    }

    pub fn separator_installed(&self) -> bool {
        self.is_importable(SEPARATOR_MODULE)
    }

    pub fn install_separator(&self) -> Result<(), InstallError> {
        self.install(SEPARATOR_PACKAGE)
    }
}
