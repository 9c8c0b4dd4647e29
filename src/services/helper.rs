//! Launching the Python separation helper script.
//!
//! The helper is an external collaborator with a small command-line contract:
//!
//! - `<python> -u <script> --check`: exit 0 when the separation package and its
//!   runtime dependencies import cleanly
//! - `<python> -u <script> --list-models` / `--list-devices`: one entry per line
//! - `<python> -u <script> --list-devices-machine`: tab-separated device records
//!   between `STEMWERK_DEVICES_BEGIN` and `STEMWERK_DEVICES_END`
//! - `<python> -u <script> <input> <output_dir> --model <m> --device <d>`:
//!   writes `vocals.wav`, `drums.wav`, `bass.wav`, `other.wav` into `output_dir`
//!   and prints `PROGRESS:<percent>:<stage>` lines while working
//!
//! Non-zero exits carry diagnostics on stdout.

use crate::models::Stem;
use crate::services::filesystem::FileSystem;
use crate::services::process::{CommandSpec, ProcessError, ProcessOutput, ProcessRunner};
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const HELPER_SCRIPT_NAME: &str = "audio_separator_process.py";

/// Number of output lines kept in error messages.
const DIAGNOSTIC_LINES: usize = 12;

/// Errors that can occur while running the helper
#[derive(Error, Debug)]
pub enum HelperError {
    #[error("Separation helper not found at {0}")]
    ScriptMissing(Utf8PathBuf),

    #[error("Input file {0} not found")]
    InputMissing(Utf8PathBuf),

    #[error("Helper process error: {0}")]
    Process(#[from] ProcessError),

    #[error("Helper exited with status {exit_code:?}:\n{details}")]
    Failed {
        exit_code: Option<i32>,
        details: String,
    },

    #[error("Helper finished but these stems are missing or empty: {}", .0.join(", "))]
    MissingOutputs(Vec<String>),

    #[error("Helper printed an unreadable device listing:\n{0}")]
    MalformedListing(String),
}

/// One `PROGRESS:<percent>:<stage>` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub stage: String,
}

/// Parse a helper progress line. Percentages above 100 are clamped.
pub fn parse_progress(line: &str) -> Option<Progress> {
    let rest = line.trim().strip_prefix("PROGRESS:")?;
    let (percent, stage) = match rest.split_once(':') {
        Some((percent, stage)) => (percent, stage),
        None => (rest, ""),
    };

    let percent: u32 = percent.trim().parse().ok()?;
    Some(Progress {
        percent: percent.min(100) as u8,
        stage: stage.trim().to_string(),
    })
}

const DEVICES_BEGIN: &str = "STEMWERK_DEVICES_BEGIN";
const DEVICES_END: &str = "STEMWERK_DEVICES_END";
const DEVICE_RECORD: &str = "STEMWERK_DEVICE\t";
const SKIPPED_RECORD: &str = "STEMWERK_DEVICE_SKIPPED\t";
const ENV_RECORD: &str = "STEMWERK_ENV_JSON ";

/// A usable compute device (`cpu`, `cuda:0`, `mps`, `directml`, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeDevice {
    pub id: String,
    pub name: String,
    pub kind: String,
}

/// A device the helper found but cannot use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDevice {
    pub id: String,
    pub name: String,
    pub reason: String,
}

/// Parsed `--list-devices-machine` output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInventory {
    pub devices: Vec<ComputeDevice>,
    pub skipped: Vec<SkippedDevice>,
    /// Raw JSON describing the helper's Python environment, passed through untouched.
    pub environment_json: Option<String>,
}

fn record_fields(record: &str) -> (String, String, String) {
    let mut fields = record.splitn(3, '\t').map(|f| f.trim().to_string());
    (
        fields.next().unwrap_or_default(),
        fields.next().unwrap_or_default(),
        fields.next().unwrap_or_default(),
    )
}

/// Parse the machine-readable device listing. Lines outside the
/// begin/end markers are diagnostics and are ignored.
pub fn parse_device_inventory(stdout: &str) -> Option<DeviceInventory> {
    let mut lines = stdout.lines().map(|line| line.trim_end_matches('\r'));
    lines.by_ref().find(|line| line.trim() == DEVICES_BEGIN)?;

    let mut inventory = DeviceInventory::default();
    for line in lines {
        if line.trim() == DEVICES_END {
            return Some(inventory);
        }

        if let Some(record) = line.strip_prefix(SKIPPED_RECORD) {
            let (id, name, reason) = record_fields(record);
            inventory.skipped.push(SkippedDevice { id, name, reason });
        } else if let Some(record) = line.strip_prefix(DEVICE_RECORD) {
            let (id, name, kind) = record_fields(record);
            if !id.is_empty() {
                inventory.devices.push(ComputeDevice { id, name, kind });
            }
        } else if let Some(json) = line.strip_prefix(ENV_RECORD) {
            inventory.environment_json = Some(json.trim().to_string());
        }
    }

    None
}

/// What to separate and where to put it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparationRequest {
    pub input: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
    pub stem: Stem,
    pub model: String,
    pub device: String,
}

/// Successful separation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeparationReport {
    pub outputs: Vec<Utf8PathBuf>,
    pub duration: Duration,
    pub last_progress: Option<Progress>,
}

/// Helper script path: the configured value, or the default script next to `script_dir`.
pub fn helper_script_path(configured: &str, script_dir: &Utf8Path) -> Utf8PathBuf {
    let configured = configured.trim().trim_matches('"');
    if configured.is_empty() {
        script_dir.join(HELPER_SCRIPT_NAME)
    } else {
        Utf8PathBuf::from(configured)
    }
}

pub struct SeparatorHelper<'a> {
    runner: &'a dyn ProcessRunner,
    fs: &'a dyn FileSystem,
    python: String,
    script: Utf8PathBuf,
    check_timeout: Duration,
    separation_timeout: Duration,
}

impl<'a> SeparatorHelper<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        fs: &'a dyn FileSystem,
        python: impl Into<String>,
        script: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            runner,
            fs,
            python: python.into(),
            script: script.into(),
            check_timeout: Duration::from_secs(60),
            separation_timeout: Duration::from_secs(3600),
        }
    }

    /// Timeout for `--check` and the listing commands.
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    pub fn with_separation_timeout(mut self, timeout: Duration) -> Self {
        self.separation_timeout = timeout;
        self
    }

    fn base_command(&self) -> CommandSpec {
        CommandSpec::new(self.python.as_str())
            .arg("-u")
            .arg(self.script.as_str())
    }

    fn ensure_script(&self) -> Result<(), HelperError> {
        if self.fs.exists(&self.script) {
            Ok(())
        } else {
            Err(HelperError::ScriptMissing(self.script.clone()))
        }
    }

    fn run_checked(&self, command: CommandSpec, timeout: Duration) -> Result<ProcessOutput, HelperError> {
        let output = self.runner.run(&command, timeout)?;
        if output.success() {
            Ok(output)
        } else {
            Err(HelperError::Failed {
                exit_code: output.exit_code,
                details: output.tail(DIAGNOSTIC_LINES),
            })
        }
    }

    /// Dry run: does the helper's Python environment have everything it needs?
    pub fn check(&self) -> Result<(), HelperError> {
        self.ensure_script()?;
        self.run_checked(self.base_command().arg("--check"), self.check_timeout)?;
        tracing::info!("Separation helper check passed");
        Ok(())
    }

    pub fn list_models(&self) -> Result<Vec<String>, HelperError> {
        self.list("--list-models")
    }

    pub fn list_devices(&self) -> Result<Vec<String>, HelperError> {
        self.list("--list-devices")
    }

    /// Structured device listing for tools that consume it.
    pub fn list_devices_machine(&self) -> Result<DeviceInventory, HelperError> {
        self.ensure_script()?;
        let output = self.run_checked(
            self.base_command().arg("--list-devices-machine"),
            self.check_timeout,
        )?;

        parse_device_inventory(&output.stdout)
            .ok_or_else(|| HelperError::MalformedListing(output.tail(DIAGNOSTIC_LINES)))
    }

    fn list(&self, flag: &str) -> Result<Vec<String>, HelperError> {
        self.ensure_script()?;
        let output = self.run_checked(self.base_command().arg(flag), self.check_timeout)?;

        Ok(output
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Run a full separation and verify the requested stems were written.
    pub fn separate(&self, request: &SeparationRequest) -> Result<SeparationReport, HelperError> {
        self.ensure_script()?;
        if !self.fs.exists(&request.input) {
            return Err(HelperError::InputMissing(request.input.clone()));
        }

        tracing::info!(
            "Separating {} ({}) with model {} on {}",
            request.input,
            request.stem,
            request.model,
            request.device
        );

        let command = self
            .base_command()
            .arg(request.input.as_str())
            .arg(request.output_dir.as_str())
            .args(["--model", request.model.as_str()])
            .args(["--device", request.device.as_str()]);

        let output = self.run_checked(command, self.separation_timeout)?;

        let last_progress = output.stdout.lines().filter_map(parse_progress).last();
        if let Some(progress) = &last_progress {
            tracing::debug!("Last helper progress: {}% {}", progress.percent, progress.stage);
        }

        let mut outputs = Vec::new();
        let mut missing = Vec::new();
        for name in request.stem.expected_outputs() {
            let path = request.output_dir.join(name);
            match self.fs.file_size(&path) {
                Some(size) if size > 0 => outputs.push(path),
                _ => missing.push((*name).to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(HelperError::MissingOutputs(missing));
        }

        tracing::info!(
            "Separation finished in {:.1}s, {} stem(s) written to {}",
            output.duration.as_secs_f32(),
            outputs.len(),
            request.output_dir
        );

        Ok(SeparationReport {
            outputs,
            duration: output.duration,
            last_progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::filesystem::MockFileSystem;
    use crate::services::process::MockProcessRunner;

    fn ok_output(stdout: &str) -> ProcessOutput {
        ProcessOutput {
            exit_code: Some(0),
            stdout: stdout.to_string(),
            ..ProcessOutput::default()
        }
    }

    fn request(stem: Stem) -> SeparationRequest {
        SeparationRequest {
            input: Utf8PathBuf::from("/audio/song.wav"),
            output_dir: Utf8PathBuf::from("/audio/stems"),
            stem,
            model: "htdemucs".to_string(),
            device: "auto".to_string(),
        }
    }

    #[test]
    fn test_parse_progress() {
        assert_eq!(
            parse_progress("PROGRESS:45:Processing chunk 3/8"),
            Some(Progress {
                percent: 45,
                stage: "Processing chunk 3/8".to_string()
            })
        );
        assert_eq!(parse_progress("PROGRESS:250:").unwrap().percent, 100);
        assert_eq!(parse_progress("PROGRESS:10").unwrap().stage, "");
        assert_eq!(parse_progress("Loading model"), None);
        assert_eq!(parse_progress("PROGRESS:abc:x"), None);
    }

    #[test]
    fn test_helper_script_path() {
        let dir = Utf8Path::new("/opt/stemwerk/scripts/reaper");
        assert_eq!(
            helper_script_path("", dir),
            Utf8PathBuf::from("/opt/stemwerk/scripts/reaper/audio_separator_process.py")
        );
        assert_eq!(
            helper_script_path("/custom/sep.py", dir),
            Utf8PathBuf::from("/custom/sep.py")
        );
    }

    #[test]
    fn test_check_passes_flag() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(|cmd, _| {
                cmd.program == "/venv/bin/python"
                    && cmd.args == vec!["-u".to_string(), "/s/sep.py".to_string(), "--check".to_string()]
            })
            .returning(|_, _| Ok(ok_output("audio-separator OK")));
        let mut fs = MockFileSystem::new();
        fs.expect_exists().return_const(true);

        let helper = SeparatorHelper::new(&runner, &fs, "/venv/bin/python", "/s/sep.py");
        assert!(helper.check().is_ok());
    }

    #[test]
    fn test_check_failure_carries_diagnostics() {
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|_, _| {
            Ok(ProcessOutput {
                exit_code: Some(1),
                stdout: "ERROR: audio-separator not installed\n".to_string(),
                ..ProcessOutput::default()
            })
        });
        let mut fs = MockFileSystem::new();
        fs.expect_exists().return_const(true);

        let helper = SeparatorHelper::new(&runner, &fs, "python3", "/s/sep.py");
        match helper.check() {
            Err(HelperError::Failed { exit_code, details }) => {
                assert_eq!(exit_code, Some(1));
                assert!(details.contains("not installed"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_check_missing_script() {
        let mut runner = MockProcessRunner::new();
        runner.expect_run().never();
        let mut fs = MockFileSystem::new();
        fs.expect_exists().return_const(false);

        let helper = SeparatorHelper::new(&runner, &fs, "python3", "/s/sep.py");
        assert!(matches!(helper.check(), Err(HelperError::ScriptMissing(_))));
    }

    #[test]
    fn test_list_models_trims_lines() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok(ok_output("htdemucs\n  htdemucs_ft \n\nhtdemucs_6s\n")));
        let mut fs = MockFileSystem::new();
        fs.expect_exists().return_const(true);

        let helper = SeparatorHelper::new(&runner, &fs, "python3", "/s/sep.py");
        assert_eq!(
            helper.list_models().unwrap(),
            vec!["htdemucs", "htdemucs_ft", "htdemucs_6s"]
        );
    }

    #[test]
    fn test_parse_device_inventory() {
        let stdout = "torch 2.3 loaded\n\
                      STEMWERK_DEVICES_BEGIN\n\
                      STEMWERK_DEVICE\tcpu\tCPU\tcpu\n\
                      STEMWERK_DEVICE\tcuda:0\tNVIDIA GeForce RTX 3060\tcuda\r\n\
                      STEMWERK_DEVICE_SKIPPED\trocm:0\tRadeon RX 6600\tgfx1032 not supported by rocBLAS\n\
                      STEMWERK_ENV_JSON {\"platform\": \"Linux\", \"cuda_count\": 1}\n\
                      STEMWERK_DEVICES_END\n";

        let inventory = parse_device_inventory(stdout).unwrap();

        assert_eq!(
            inventory.devices,
            vec![
                ComputeDevice {
                    id: "cpu".to_string(),
                    name: "CPU".to_string(),
                    kind: "cpu".to_string(),
                },
                ComputeDevice {
                    id: "cuda:0".to_string(),
                    name: "NVIDIA GeForce RTX 3060".to_string(),
                    kind: "cuda".to_string(),
                },
            ]
        );
        assert_eq!(inventory.skipped.len(), 1);
        assert_eq!(inventory.skipped[0].reason, "gfx1032 not supported by rocBLAS");
        assert!(inventory.environment_json.unwrap().contains("cuda_count"));
    }

    #[test]
    fn test_parse_device_inventory_requires_markers() {
        assert_eq!(parse_device_inventory("Available devices:\n  cpu: CPU (cpu)\n"), None);
        assert_eq!(
            parse_device_inventory("STEMWERK_DEVICES_BEGIN\nSTEMWERK_DEVICE\tcpu\tCPU\tcpu\n"),
            None
        );
    }

    #[test]
    fn test_list_devices_machine_flag() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(|cmd, _| cmd.args.last().map(String::as_str) == Some("--list-devices-machine"))
            .returning(|_, _| {
                Ok(ok_output(
                    "STEMWERK_DEVICES_BEGIN\nSTEMWERK_DEVICE\tmps\tApple M2\tmps\nSTEMWERK_DEVICES_END\n",
                ))
            });
        let mut fs = MockFileSystem::new();
        fs.expect_exists().return_const(true);

        let helper = SeparatorHelper::new(&runner, &fs, "python3", "/s/sep.py");
        let inventory = helper.list_devices_machine().unwrap();

        assert_eq!(inventory.devices[0].id, "mps");
        assert!(inventory.skipped.is_empty());
    }

    #[test]
    fn test_list_devices_machine_malformed() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .returning(|_, _| Ok(ok_output("Traceback (most recent call last):\n")));
        let mut fs = MockFileSystem::new();
        fs.expect_exists().return_const(true);

        let helper = SeparatorHelper::new(&runner, &fs, "python3", "/s/sep.py");
        assert!(matches!(
            helper.list_devices_machine(),
            Err(HelperError::MalformedListing(_))
        ));
    }

    #[test]
    fn test_separate_verifies_outputs() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(|cmd, timeout| {
                cmd.args
                    == vec![
                        "-u", "/s/sep.py", "/audio/song.wav", "/audio/stems", "--model", "htdemucs",
                        "--device", "auto",
                    ]
                    .into_iter()
                    .map(String::from)
                    .collect::<Vec<_>>()
                    && *timeout == Duration::from_secs(120)
            })
            .returning(|_, _| Ok(ok_output("PROGRESS:50:Separating\nPROGRESS:100:Done\n")));
        let mut fs = MockFileSystem::new();
        fs.expect_exists().return_const(true);
        fs.expect_file_size().return_const(Some(1024u64));

        let helper = SeparatorHelper::new(&runner, &fs, "python3", "/s/sep.py")
            .with_separation_timeout(Duration::from_secs(120));
        let report = helper.separate(&request(Stem::Vocals)).unwrap();

        assert_eq!(report.outputs, vec![Utf8PathBuf::from("/audio/stems/vocals.wav")]);
        assert_eq!(report.last_progress.unwrap().percent, 100);
    }

    #[test]
    fn test_separate_reports_missing_stems() {
        let mut runner = MockProcessRunner::new();
        runner.expect_run().returning(|_, _| Ok(ok_output("")));
        let mut fs = MockFileSystem::new();
        fs.expect_exists().return_const(true);
        fs.expect_file_size()
            .returning(|path| if path.as_str().ends_with("drums.wav") { Some(0) } else { Some(10) });

        let helper = SeparatorHelper::new(&runner, &fs, "python3", "/s/sep.py");
        match helper.separate(&request(Stem::All)) {
            Err(HelperError::MissingOutputs(missing)) => assert_eq!(missing, vec!["drums.wav"]),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_separate_missing_input() {
        let mut runner = MockProcessRunner::new();
        runner.expect_run().never();
        let mut fs = MockFileSystem::new();
        fs.expect_exists()
            .returning(|path| path.as_str() == "/s/sep.py");

        let helper = SeparatorHelper::new(&runner, &fs, "python3", "/s/sep.py");
        assert!(matches!(
            helper.separate(&request(Stem::Bass)),
            Err(HelperError::InputMissing(_))
        ));
    }
}
