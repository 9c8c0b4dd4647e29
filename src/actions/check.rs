use super::ActionContext;
use crate::services::{
    Candidate, Compatibility, CompatibilityPolicy, PackageInstaller, ProbeFailure, PythonVersion,
    Resolution, ToolchainVerifier,
};
use std::fmt::Write as _;

/// Probe outcome of one search candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateReport {
    pub candidate: Candidate,
    pub outcome: Result<PythonVersion, ProbeFailure>,
}

/// Read-only diagnostics: nothing is persisted or installed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsReport {
    pub configured_path: String,
    pub resolution: Resolution,
    pub compatibility: Option<Compatibility>,
    /// `import audio_separator` result; `None` without an interpreter.
    pub package_installed: Option<bool>,
    /// `Ok` when the helper `--check` passed, otherwise the failure text.
    pub helper_check: Result<(), String>,
    pub ffmpeg_available: bool,
    /// Every candidate probed individually; only filled when requested.
    pub candidates: Vec<CandidateReport>,
}

impl DiagnosticsReport {
    pub fn render(&self) -> String {
        let mut out = String::new();

        let configured = if self.configured_path.is_empty() {
            "(not set)"
        } else {
            self.configured_path.as_str()
        };
        let _ = writeln!(out, "Configured pythonPath: {}", configured);

        match &self.resolution {
            Resolution::Resolved(interpreter) => {
                let _ = writeln!(
                    out,
                    "Python: {} ({}, {:?})",
                    interpreter.path, interpreter.version, interpreter.source
                );
            }
            Resolution::NotFound { fallback } => {
                let _ = writeln!(out, "Python: NOT FOUND (fallback '{}' is unverified)", fallback);
            }
        }

        if self.compatibility == Some(Compatibility::LikelyIncompatible) {
            let _ = writeln!(out, "  warning: version is likely incompatible with audio-separator");
        }

        if let Some(installed) = self.package_installed {
            let _ = writeln!(
                out,
                "audio-separator: {}",
                if installed { "installed" } else { "NOT installed" }
            );
        }

        match &self.helper_check {
            Ok(()) => {
                let _ = writeln!(out, "Helper check: passed");
            }
            Err(reason) => {
                let _ = writeln!(out, "Helper check: FAILED\n  {}", reason.replace('\n', "\n  "));
            }
        }

        let _ = writeln!(
            out,
            "ffmpeg: {}",
            if self.ffmpeg_available { "found" } else { "NOT found" }
        );

        if !self.candidates.is_empty() {
            let _ = writeln!(out, "Candidates:");
            for report in &self.candidates {
                match &report.outcome {
                    Ok(version) => {
                        let _ = writeln!(out, "  [ok]   {} ({})", report.candidate, version);
                    }
                    Err(failure) => {
                        let _ = writeln!(out, "  [fail] {}: {}", report.candidate, failure);
                    }
                }
            }
        }

        out
    }

    /// True when Python resolved and the helper is ready.
    pub fn is_healthy(&self) -> bool {
        self.resolution.is_resolved() && self.helper_check.is_ok()
    }
}

/// Diagnose the current installation without changing anything.
pub fn run_check(ctx: &ActionContext<'_>, probe_all: bool) -> DiagnosticsReport {
    let settings = ctx.settings();
    let resolver = ctx.resolver(&settings);
    let resolution = ctx.resolve(&settings);

    let compatibility = resolution
        .interpreter()
        .map(|interpreter| CompatibilityPolicy::new(settings.incompatible_minor).check(interpreter.version));

    let package_installed = resolution.interpreter().map(|interpreter| {
        PackageInstaller::new(ctx.runner, interpreter.path.as_str())
            .with_probe_timeout(settings.probe_timeout())
            .separator_installed()
    });

    let helper_check = match resolution.interpreter() {
        Some(interpreter) => ctx
            .helper(&settings, &interpreter.path)
            .check()
            .map_err(|e| e.to_string()),
        None => Err("skipped: no working Python interpreter".to_string()),
    };

    let ffmpeg_available = ToolchainVerifier::new(ctx.runner, settings.probe_timeout()).verify();

    let candidates = if probe_all {
        resolver
            .candidates(
                ctx.environment.platform,
                &ctx.environment.home,
                &ctx.environment.script_dir,
            )
            .into_iter()
            .map(|candidate| {
                let outcome = resolver.probe(&candidate);
                CandidateReport { candidate, outcome }
            })
            .collect()
    } else {
        Vec::new()
    };

    DiagnosticsReport {
        configured_path: settings.python_path,
        resolution,
        compatibility,
        package_installed,
        helper_check,
        ffmpeg_available,
        candidates,
    }
}
