use super::{ActionContext, DIALOG_TITLE, WorkflowError, require_interpreter};
use crate::models::Stem;
use crate::services::{DeviceInventory, SeparationReport, SeparationRequest, ToolchainVerifier};
use camino::{Utf8Path, Utf8PathBuf};

/// `<input dir>/<input stem>_stems`
pub fn default_output_dir(input: &Utf8Path) -> Utf8PathBuf {
    let stem = input.file_stem().unwrap_or("audio");
    let name = format!("{}_stems", stem);

    match input.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.join(name),
        _ => Utf8PathBuf::from(name),
    }
}

/// Separate `input` into the requested stems.
///
/// The configured interpreter is re-verified first; a missing ffmpeg is reported
/// as a warning and the helper is run regardless.
pub fn run_separation(
    ctx: &ActionContext<'_>,
    input: &Utf8Path,
    stem: Stem,
    output_dir: Option<Utf8PathBuf>,
) -> Result<SeparationReport, WorkflowError> {
    let settings = ctx.settings();
    let interpreter = require_interpreter(ctx, &settings)?;

    if !ToolchainVerifier::new(ctx.runner, settings.probe_timeout()).verify() {
        ctx.prompter.warn(
            DIALOG_TITLE,
            "ffmpeg was not found. Continuing, but the helper may fail to read this file.",
        );
    }

    let request = SeparationRequest {
        input: input.to_path_buf(),
        output_dir: output_dir.unwrap_or_else(|| default_output_dir(input)),
        stem,
        model: settings.model.clone(),
        device: settings.device.clone(),
    };

    match ctx.helper(&settings, &interpreter.path).separate(&request) {
        Ok(report) => {
            let files: Vec<&str> = report.outputs.iter().map(|p| p.as_str()).collect();
            ctx.prompter.inform(
                DIALOG_TITLE,
                &format!("Separation finished:\n\n{}", files.join("\n")),
            );
            Ok(report)
        }
        Err(e) => {
            tracing::error!("Separation failed: {}", e);
            ctx.prompter.warn(DIALOG_TITLE, &format!("Separation failed:\n\n{}", e));
            Err(WorkflowError::SeparationFailed(e))
        }
    }
}

/// One-click separation using the stored quick preset.
pub fn run_quick(ctx: &ActionContext<'_>, input: &Utf8Path) -> Result<SeparationReport, WorkflowError> {
    let settings = ctx.settings();

    if !settings.quick_run {
        let message = "Quick run is disabled. Enable it with: stemwerk config set quick_run 1 \
                       (and choose stems with: stemwerk config set quick_preset vocals|drums|bass|all)";
        ctx.prompter.inform(DIALOG_TITLE, message);
        return Err(WorkflowError::NotConfigured(message.to_string()));
    }

    tracing::info!("Quick run with preset {}", settings.quick_preset);
    run_separation(ctx, input, settings.quick_preset, None)
}

/// What the helper can list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelperListing {
    Models,
    Devices,
}

pub fn list_helper(ctx: &ActionContext<'_>, listing: HelperListing) -> Result<Vec<String>, WorkflowError> {
    let settings = ctx.settings();
    let interpreter = require_interpreter(ctx, &settings)?;
    let helper = ctx.helper(&settings, &interpreter.path);

    let result = match listing {
        HelperListing::Models => helper.list_models(),
        HelperListing::Devices => helper.list_devices(),
    };

    result.map_err(WorkflowError::HelperCheckFailed)
}

/// Devices in the helper's machine-readable format, for other tools to consume.
pub fn list_device_inventory(ctx: &ActionContext<'_>) -> Result<DeviceInventory, WorkflowError> {
    let settings = ctx.settings();
    let interpreter = require_interpreter(ctx, &settings)?;

    ctx.helper(&settings, &interpreter.path)
        .list_devices_machine()
        .map_err(WorkflowError::HelperCheckFailed)
}
