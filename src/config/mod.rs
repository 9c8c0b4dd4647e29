pub mod ext_state;

pub use ext_state::{ExtStateError, ExtStateStore, MemoryExtStateStore, YamlExtStateStore};

use crate::services::CandidatePolicy;
use anyhow::{Context, Result, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use directories::ProjectDirs;
use std::fs;

/// File the extension-state store is persisted to.
pub const EXT_STATE_FILE: &str = "extstate.yaml";

/// Optional user override of the interpreter search order.
pub const CANDIDATES_FILE: &str = "candidates.yaml";

/// Configuration manager owning the configuration directory.
///
/// Manages:
/// - Extension state (`extstate.yaml`): the host-style section/key/value store
/// - Candidate policy (`candidates.yaml`, optional): replaces the built-in search order
/// - Log directory (`logs/`) used by [`crate::logging`]
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    ext_state_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// The directory is created if it doesn't exist.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            ext_state_path: config_dir.join(EXT_STATE_FILE),
            config_dir,
        })
    }

    /// Per-user configuration directory for this platform.
    ///
    /// Linux: `~/.config/stemwerk`, macOS: `~/Library/Application Support/org.STEMwerk.stemwerk`,
    /// Windows: `%APPDATA%\STEMwerk\stemwerk\config`.
    pub fn default_config_dir() -> Result<Utf8PathBuf> {
        let dirs = ProjectDirs::from("org", "STEMwerk", "stemwerk")
            .ok_or_else(|| anyhow!("Could not determine a home directory for configuration"))?;

        Utf8PathBuf::from_path_buf(dirs.config_dir().to_path_buf())
            .map_err(|p| anyhow!("Configuration directory is not valid UTF-8: {}", p.display()))
    }

    /// Open the extension-state store backing all settings.
    pub fn open_ext_state(&self) -> Result<YamlExtStateStore> {
        let store = YamlExtStateStore::open(&self.ext_state_path)
            .with_context(|| format!("Failed to open extension state: {}", self.ext_state_path))?;

        tracing::info!("Opened extension state at {}", self.ext_state_path);
        Ok(store)
    }

    /// Load the user's candidate policy, if `candidates.yaml` exists.
    ///
    /// `None` means the built-in per-platform search order applies.
    pub fn load_candidate_policy(&self) -> Result<Option<CandidatePolicy>> {
        let path = self.candidate_policy_path();
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read candidate policy: {}", path))?;
        let policy: CandidatePolicy = serde_yaml_ng::from_str(&contents)
            .with_context(|| format!("Failed to parse candidate policy: {}", path))?;

        if policy.templates.is_empty() {
            tracing::warn!("{} lists no candidates, using the built-in search order", path);
            return Ok(None);
        }

        tracing::info!("Loaded {} interpreter candidates from {}", policy.templates.len(), path);
        Ok(Some(policy))
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn ext_state_path(&self) -> &Utf8Path {
        &self.ext_state_path
    }

    pub fn candidate_policy_path(&self) -> Utf8PathBuf {
        self.config_dir.join(CANDIDATES_FILE)
    }

    pub fn log_dir(&self) -> Utf8PathBuf {
        self.config_dir.join("logs")
    }
}
