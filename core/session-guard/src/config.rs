//! Guard configuration: defaults, validation, and TOML loading.
//!
//! Config lives at `~/.session-guard/config.toml`. Every field is optional;
//! a missing file yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{GuardError, Result};

const DEFAULT_CONFIG_RELATIVE_PATH: &str = ".session-guard/config.toml";

pub const DEFAULT_WARNING_DELAY_MS: u64 = 900_000; // 15 minutes
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 60_000;
pub const DEFAULT_ACTIVITY_THROTTLE_MS: u64 = 1_000;

/// Timing for one guard instance. Immutable once the guard is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTimeoutConfig {
    /// Idle time after the last activity before the warning is shown.
    #[serde(default = "default_warning_delay_ms")]
    pub warning_delay_ms: u64,
    /// Time between the warning being shown and the forced logout.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Warning delay used instead of `warning_delay_ms` while a modal is open.
    #[serde(default)]
    pub activity_override_ms: Option<u64>,
}

impl Default for SessionTimeoutConfig {
    fn default() -> Self {
        Self {
            warning_delay_ms: DEFAULT_WARNING_DELAY_MS,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            enabled: true,
            activity_override_ms: None,
        }
    }
}

impl SessionTimeoutConfig {
    pub fn validate(&self) -> Result<()> {
        if self.warning_delay_ms == 0 {
            return Err(invalid("warning_delay_ms", "must be greater than zero"));
        }
        if self.grace_period_ms == 0 {
            return Err(invalid("grace_period_ms", "must be greater than zero"));
        }
        if self.activity_override_ms == Some(0) {
            return Err(invalid(
                "activity_override_ms",
                "must be greater than zero when set",
            ));
        }
        Ok(())
    }

    pub fn effective_warning_delay_ms(&self, modal_open: bool) -> u64 {
        match self.activity_override_ms {
            Some(override_ms) if modal_open => override_ms,
            _ => self.warning_delay_ms,
        }
    }

    /// Countdown shown when the warning first appears.
    pub fn initial_countdown_secs(&self) -> u64 {
        ceil_secs(self.grace_period_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Refractory window after an emitted activity. Zero disables throttling.
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            throttle_ms: DEFAULT_ACTIVITY_THROTTLE_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub session_timeout: SessionTimeoutConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl GuardConfig {
    pub fn validate(&self) -> Result<()> {
        self.session_timeout.validate()
    }
}

fn default_warning_delay_ms() -> u64 {
    DEFAULT_WARNING_DELAY_MS
}

fn default_grace_period_ms() -> u64 {
    DEFAULT_GRACE_PERIOD_MS
}

fn default_enabled() -> bool {
    true
}

fn default_throttle_ms() -> u64 {
    DEFAULT_ACTIVITY_THROTTLE_MS
}

fn invalid(field: &'static str, reason: &str) -> GuardError {
    GuardError::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}

pub(crate) fn ceil_secs(ms: u64) -> u64 {
    ms.div_ceil(1_000)
}

/// Returns the path to the guard configuration file.
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or(GuardError::HomeDirNotFound)?;
    Ok(home.join(DEFAULT_CONFIG_RELATIVE_PATH))
}

/// Loads and validates the guard configuration.
///
/// `None` resolves the default path. A missing file is not an error.
pub fn load_config(path: Option<PathBuf>) -> Result<GuardConfig> {
    let config_path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };

    let config = if config_path.exists() {
        read_config(&config_path)?
    } else {
        tracing::debug!(path = %config_path.display(), "No guard config found; using defaults");
        GuardConfig::default()
    };

    config.validate()?;
    Ok(config)
}

fn read_config(path: &Path) -> Result<GuardConfig> {
    let content = fs_err::read_to_string(path).map_err(|source| GuardError::Io {
        context: format!("Failed to read guard config {}", path.display()),
        source,
    })?;
    toml::from_str::<GuardConfig>(&content).map_err(|err| GuardError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}
