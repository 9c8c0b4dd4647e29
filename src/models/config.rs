use crate::config::{ExtStateError, ExtStateStore};
use crate::models::Stem;
use std::time::Duration;

/// Extension-state section all STEMwerk keys live under.
pub const SECTION: &str = "STEMwerk";

pub const KEY_PYTHON_PATH: &str = "pythonPath";
pub const KEY_SEPARATOR_SCRIPT: &str = "separatorScript";
pub const KEY_DEBUG_MODE: &str = "debugMode";
/// Older releases stored the debug flag under this key.
pub const KEY_DEBUG_LEGACY: &str = "debug";
pub const KEY_QUICK_RUN: &str = "quick_run";
pub const KEY_QUICK_PRESET: &str = "quick_preset";
pub const KEY_MODEL: &str = "model";
pub const KEY_DEVICE: &str = "device";
pub const KEY_PROBE_TIMEOUT: &str = "probeTimeout";
pub const KEY_SEPARATION_TIMEOUT: &str = "separationTimeout";
pub const KEY_INSTALL_TIMEOUT: &str = "installTimeout";
pub const KEY_INCOMPATIBLE_MINOR: &str = "incompatibleMinor";

/// Every key the launcher reads or writes.
pub const KNOWN_KEYS: &[&str] = &[
    KEY_PYTHON_PATH,
    KEY_SEPARATOR_SCRIPT,
    KEY_DEBUG_MODE,
    KEY_DEBUG_LEGACY,
    KEY_QUICK_RUN,
    KEY_QUICK_PRESET,
    KEY_MODEL,
    KEY_DEVICE,
    KEY_PROBE_TIMEOUT,
    KEY_SEPARATION_TIMEOUT,
    KEY_INSTALL_TIMEOUT,
    KEY_INCOMPATIBLE_MINOR,
];

/// Typed view over the `STEMwerk` extension-state section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemwerkSettings {
    /// Configured interpreter override; empty means unset.
    pub python_path: String,

    /// Path to the separation helper script; empty means "next to the actions".
    pub separator_script: String,

    pub debug_mode: bool,

    pub quick_run: bool,

    pub quick_preset: Stem,

    pub model: String,

    pub device: String,

    /// Seconds allowed for each interpreter / toolchain probe.
    pub probe_timeout_secs: u64,

    /// Seconds allowed for a full separation run.
    pub separation_timeout_secs: u64,

    /// Seconds allowed for `pip install` of the separation package.
    pub install_timeout_secs: u64,

    /// Python 3 minor version from which the separation package is known to break.
    pub incompatible_minor: u32,
}

impl Default for StemwerkSettings {
    fn default() -> Self {
        Self {
            python_path: String::new(),
            separator_script: String::new(),
            debug_mode: false,
            quick_run: false,
            quick_preset: Stem::All,
            model: default_model(),
            device: default_device(),
            probe_timeout_secs: default_probe_timeout(),
            separation_timeout_secs: default_separation_timeout(),
            install_timeout_secs: default_install_timeout(),
            incompatible_minor: default_incompatible_minor(),
        }
    }
}

fn default_model() -> String {
    "htdemucs".to_string()
}

fn default_device() -> String {
    "auto".to_string()
}

fn default_probe_timeout() -> u64 {
    15
}

fn default_separation_timeout() -> u64 {
    3600
}

fn default_install_timeout() -> u64 {
    900
}

fn default_incompatible_minor() -> u32 {
    14
}

/// Host stores booleans as "1"/"0"; accept the usual spellings too.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn flag_value(flag: bool) -> &'static str {
    if flag { "1" } else { "0" }
}

fn read_parsed<T, F>(store: &dyn ExtStateStore, key: &str, default: T, parse: F) -> T
where
    F: FnOnce(&str) -> Option<T>,
{
    match store.get(SECTION, key) {
        Some(raw) => parse(&raw).unwrap_or_else(|| {
            tracing::warn!("Ignoring invalid value '{}' for {}, using default", raw, key);
            default
        }),
        None => default,
    }
}

impl StemwerkSettings {
    /// Read settings from the store, falling back to defaults per key.
    pub fn load(store: &dyn ExtStateStore) -> Self {
        let defaults = Self::default();

        let debug_mode = match store.get(SECTION, KEY_DEBUG_MODE) {
            Some(_) => read_parsed(store, KEY_DEBUG_MODE, false, parse_flag),
            None => read_parsed(store, KEY_DEBUG_LEGACY, false, parse_flag),
        };

        Self {
            python_path: store.get(SECTION, KEY_PYTHON_PATH).unwrap_or_default(),
            separator_script: store.get(SECTION, KEY_SEPARATOR_SCRIPT).unwrap_or_default(),
            debug_mode,
            quick_run: read_parsed(store, KEY_QUICK_RUN, defaults.quick_run, parse_flag),
            quick_preset: read_parsed(store, KEY_QUICK_PRESET, defaults.quick_preset, |v| {
                v.parse::<Stem>().ok()
            }),
            model: store.get(SECTION, KEY_MODEL).unwrap_or(defaults.model),
            device: store.get(SECTION, KEY_DEVICE).unwrap_or(defaults.device),
            probe_timeout_secs: read_parsed(
                store,
                KEY_PROBE_TIMEOUT,
                defaults.probe_timeout_secs,
                |v| v.trim().parse::<u64>().ok().filter(|secs| *secs > 0),
            ),
            separation_timeout_secs: read_parsed(
                store,
                KEY_SEPARATION_TIMEOUT,
                defaults.separation_timeout_secs,
                |v| v.trim().parse::<u64>().ok().filter(|secs| *secs > 0),
            ),
            install_timeout_secs: read_parsed(
                store,
                KEY_INSTALL_TIMEOUT,
                defaults.install_timeout_secs,
                |v| v.trim().parse::<u64>().ok().filter(|secs| *secs > 0),
            ),
            incompatible_minor: read_parsed(
                store,
                KEY_INCOMPATIBLE_MINOR,
                defaults.incompatible_minor,
                |v| v.trim().parse::<u32>().ok(),
            ),
        }
    }

    /// Write every setting back to the store.
    pub fn save(&self, store: &mut dyn ExtStateStore) -> Result<(), ExtStateError> {
        store.set(SECTION, KEY_PYTHON_PATH, &self.python_path)?;
        store.set(SECTION, KEY_SEPARATOR_SCRIPT, &self.separator_script)?;
        store.set(SECTION, KEY_DEBUG_MODE, flag_value(self.debug_mode))?;
        store.set(SECTION, KEY_QUICK_RUN, flag_value(self.quick_run))?;
        store.set(SECTION, KEY_QUICK_PRESET, self.quick_preset.as_str())?;
        store.set(SECTION, KEY_MODEL, &self.model)?;
        store.set(SECTION, KEY_DEVICE, &self.device)?;
        store.set(SECTION, KEY_PROBE_TIMEOUT, &self.probe_timeout_secs.to_string())?;
        store.set(
            SECTION,
            KEY_SEPARATION_TIMEOUT,
            &self.separation_timeout_secs.to_string(),
        )?;
        store.set(SECTION, KEY_INSTALL_TIMEOUT, &self.install_timeout_secs.to_string())?;
        store.set(
            SECTION,
            KEY_INCOMPATIBLE_MINOR,
            &self.incompatible_minor.to_string(),
        )?;
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn separation_timeout(&self) -> Duration {
        Duration::from_secs(self.separation_timeout_secs)
    }

    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    /// Persist only the interpreter path, leaving other keys untouched.
    pub fn store_python_path(
        store: &mut dyn ExtStateStore,
        python_path: &str,
    ) -> Result<(), ExtStateError> {
        store.set(SECTION, KEY_PYTHON_PATH, python_path)
    }

    /// Flip debug mode and return the new value.
    pub fn toggle_debug(store: &mut dyn ExtStateStore) -> Result<bool, ExtStateError> {
        let enabled = !Self::load(store).debug_mode;
        store.set(SECTION, KEY_DEBUG_MODE, flag_value(enabled))?;
        Ok(enabled)
    }
}
