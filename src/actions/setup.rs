use super::{
    ActionContext, DIALOG_TITLE, WorkflowError, incompatibility_message, require_interpreter,
};
use crate::models::StemwerkSettings;
use crate::models::config::{KEY_SEPARATOR_SCRIPT, SECTION};
use crate::services::{
    Compatibility, CompatibilityPolicy, HelperError, PackageInstaller, ResolvedInterpreter,
    ToolchainVerifier,
};
use camino::Utf8PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupOptions {
    /// Offer to install the separation package when the helper check fails.
    pub offer_install: bool,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self { offer_install: true }
    }
}

/// What setup found and changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupReport {
    pub interpreter: ResolvedInterpreter,
    pub compatibility: Compatibility,
    /// Helper `--check` passed (possibly after installing).
    pub package_ready: bool,
    pub installed_package: bool,
    pub ffmpeg_available: bool,
}

impl SetupReport {
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Python: {} ({})",
            self.interpreter.path, self.interpreter.version
        )];

        if self.compatibility == Compatibility::LikelyIncompatible {
            lines.push("  warning: this Python version is likely incompatible".to_string());
        }

        lines.push(format!(
            "audio-separator: {}{}",
            if self.package_ready { "ready" } else { "NOT ready" },
            if self.installed_package { " (installed now)" } else { "" }
        ));
        lines.push(format!(
            "ffmpeg: {}",
            if self.ffmpeg_available { "found" } else { "NOT found" }
        ));

        lines.join("\n")
    }
}

/// Full first-run setup: resolve, persist, check the helper, optionally install, verify ffmpeg.
pub fn run_setup(ctx: &mut ActionContext<'_>, options: SetupOptions) -> Result<SetupReport, WorkflowError> {
    tracing::info!("Starting setup");
    let settings = ctx.settings();

    let interpreter = require_interpreter(ctx, &settings)?;

    let compatibility = CompatibilityPolicy::new(settings.incompatible_minor).check(interpreter.version);
    if compatibility == Compatibility::LikelyIncompatible {
        tracing::warn!("Python {} is likely incompatible", interpreter.version);
        let proceed = ctx.prompter.confirm(
            DIALOG_TITLE,
            &incompatibility_message(interpreter.version, &interpreter.path),
        );
        if !proceed {
            return Err(WorkflowError::Cancelled);
        }
    }

    StemwerkSettings::store_python_path(&mut *ctx.store, &interpreter.path)?;
    tracing::info!("Saved interpreter path {}", interpreter.path);

    let (package_ready, installed_package) = ensure_package(ctx, &settings, &interpreter, options)?;

    if package_ready && settings.separator_script.is_empty() {
        let script = ctx.helper_script(&settings);
        ctx.store.set(SECTION, KEY_SEPARATOR_SCRIPT, script.as_str())?;
    }

    let ffmpeg_available = ToolchainVerifier::new(ctx.runner, settings.probe_timeout()).verify();
    if !ffmpeg_available {
        ctx.prompter.warn(
            DIALOG_TITLE,
            "ffmpeg was not found on the search path. Separation of non-WAV files will fail \
             until ffmpeg is installed.",
        );
    }

    let report = SetupReport {
        interpreter,
        compatibility,
        package_ready,
        installed_package,
        ffmpeg_available,
    };

    ctx.prompter.inform(DIALOG_TITLE, &format!("Setup finished.\n\n{}", report.summary()));
    tracing::info!("Setup finished: package_ready={}, ffmpeg={}", package_ready, ffmpeg_available);
    Ok(report)
}

/// Returns `(package_ready, installed_now)`.
///
/// pip is only offered when the package itself does not import.
fn ensure_package(
    ctx: &ActionContext<'_>,
    settings: &StemwerkSettings,
    interpreter: &ResolvedInterpreter,
    options: SetupOptions,
) -> Result<(bool, bool), WorkflowError> {
    let helper = ctx
        .helper(settings, &interpreter.path)
        .with_check_timeout(settings.probe_timeout().max(std::time::Duration::from_secs(60)));

    let failure = match helper.check() {
        Ok(()) => return Ok((true, false)),
        Err(e @ HelperError::ScriptMissing(_)) => {
            ctx.prompter.warn(DIALOG_TITLE, &e.to_string());
            return Err(WorkflowError::HelperCheckFailed(e));
        }
        Err(e) => e,
    };

    tracing::warn!("Helper check failed: {}", failure);

    let installer = PackageInstaller::new(ctx.runner, interpreter.path.as_str())
        .with_probe_timeout(settings.probe_timeout())
        .with_install_timeout(settings.install_timeout());

    // The package imports, so reinstalling it will not help
    if installer.separator_installed() {
        ctx.prompter.warn(
            DIALOG_TITLE,
            &format!(
                "audio-separator is installed for {}, but the separation helper check failed. \
                 One of its runtime dependencies (PyTorch, onnxruntime) is probably missing \
                 or broken:\n\n{}",
                interpreter.path, failure
            ),
        );
        return Ok((false, false));
    }

    if !options.offer_install {
        ctx.prompter.warn(
            DIALOG_TITLE,
            &format!("The separation helper is not ready:\n\n{}", failure),
        );
        return Ok((false, false));
    }

    let install = ctx.prompter.confirm(
        DIALOG_TITLE,
        &format!(
            "audio-separator is not installed for {}.\n\nInstall it now with pip? \
             This downloads several hundred MB and may take a few minutes.",
            interpreter.path
        ),
    );
    if !install {
        tracing::info!("User declined package installation");
        return Ok((false, false));
    }

    installer.install_separator()?;

    helper.check().map_err(WorkflowError::HelperCheckFailed)?;
    Ok((true, true))
}

/// Let the user pick the helper script and persist it.
pub fn choose_helper_script(ctx: &mut ActionContext<'_>) -> Result<Utf8PathBuf, WorkflowError> {
    let picked = ctx
        .prompter
        .pick_file("Select audio_separator_process.py", "Python script", &["py"])
        .ok_or(WorkflowError::Cancelled)?;

    ctx.store.set(SECTION, KEY_SEPARATOR_SCRIPT, picked.as_str())?;
    tracing::info!("Separator script set to {}", picked);
    Ok(picked)
}
