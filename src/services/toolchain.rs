use crate::services::process::{CommandSpec, ProcessRunner};
use std::time::Duration;

pub const FFMPEG: &str = "ffmpeg";

/// Confirms a companion binary on the search path runs.
///
/// Success is exit status 0 for `<binary> -version`; output is not inspected
/// and no alternative locations are searched.
pub struct ToolchainVerifier<'a> {
    runner: &'a dyn ProcessRunner,
    binary: String,
    timeout: Duration,
}

impl<'a> ToolchainVerifier<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, timeout: Duration) -> Self {
        Self {
            runner,
            binary: FFMPEG.to_string(),
            timeout,
        }
    }

    pub fn verify(&self) -> bool {
        let command = CommandSpec::new(self.binary.as_str()).arg("-version");

        match self.runner.run(&command, self.timeout) {
            Ok(output) if output.success() => {
                tracing::info!("{} is available", self.binary);
                true
            }
            Ok(output) => {
                tracing::warn!("{} -version exited with {:?}", self.binary, output.exit_code);
                false
            }
            Err(e) => {
                tracing::warn!("{} is not runnable: {}", self.binary, e);
                false
            }
        }
    }
}
