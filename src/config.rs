//! # Configuration Management
//!
//! Tag keeps two plain-text files in its configuration directory
//! (`~/.tag/` by default, or `$TAG_CONFIG_DIR`):
//!
//! - `config` - `key=value` options; only `sync` is consumed
//! - `sync` - `name,path` sync locations (see [`crate::manifest`])
//!
//! [`Config`] is built once at startup and passed by reference to every
//! operation. It is immutable: whether sync runs is decided here, from the
//! config directory, the platform, the `sync` option and any per-invocation
//! `-nosync` override. The sync manifest is *not* cached; it is re-read by
//! every operation that needs it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{Result, TagError};
use crate::manifest::{self, OPTION_DELIMITER};

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "TAG_CONFIG_DIR";

pub const CONFIG_FILE: &str = "config";
pub const SYNC_FILE: &str = "sync";

/// The only option the core reads.
pub const SYNC_OPTION: &str = "sync";

const PLATFORM_SUPPORTED: bool = cfg!(any(unix, windows));

/// Why sync is off for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncDisabled {
    NoConfigDir,
    UnsupportedPlatform,
    ConfigMissing(PathBuf),
    ConfigMalformed(PathBuf),
    DisabledInConfig,
    Override,
}

impl fmt::Display for SyncDisabled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDisabled::NoConfigDir => f.write_str("no home or config directory found"),
            SyncDisabled::UnsupportedPlatform => f.write_str("sync is not supported on this platform"),
            SyncDisabled::ConfigMissing(path) => write!(f, "no config file at {}", path.display()),
            SyncDisabled::ConfigMalformed(path) => write!(f, "config file {} is malformed", path.display()),
            SyncDisabled::DisabledInConfig => f.write_str("sync=disabled in config"),
            SyncDisabled::Override => f.write_str("-nosync requested"),
        }
    }
}

/// Sync state derived once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Enabled,
    Disabled(SyncDisabled),
}

/// Immutable run configuration.
#[derive(Debug, Clone)]
pub struct Config {
    config_dir: Option<PathBuf>,
    options: BTreeMap<String, String>,
    sync: SyncState,
}

impl Config {
    /// Resolve the configuration directory and load the config file.
    pub async fn load(nosync: bool) -> Self {
        Self::load_from(Self::default_dir(), nosync).await
    }

    /// Load from an explicit directory; used by tests and [`Config::load`].
    pub async fn from_dir(config_dir: impl Into<PathBuf>, nosync: bool) -> Self {
        Self::load_from(Some(config_dir.into()), nosync).await
    }

    async fn load_from(config_dir: Option<PathBuf>, nosync: bool) -> Self {
        let Some(config_dir) = config_dir else {
            return Self {
                config_dir: None,
                options: BTreeMap::new(),
                sync: SyncState::Disabled(SyncDisabled::NoConfigDir),
            };
        };

        let config_file = config_dir.join(CONFIG_FILE);
        let (options, file_state) =
            match manifest::parse_manifest(&config_file, OPTION_DELIMITER).await {
                Ok(parsed) if parsed.is_malformed() => {
                    warn!("Ignoring malformed config {}", config_file.display());
                    (parsed.entries, Some(SyncDisabled::ConfigMalformed(config_file)))
                }
                Ok(parsed) => (parsed.entries, None),
                Err(e) => {
                    debug!("No usable config: {}", e);
                    (BTreeMap::new(), Some(SyncDisabled::ConfigMissing(config_file)))
                }
            };

        let sync = if !PLATFORM_SUPPORTED {
            SyncState::Disabled(SyncDisabled::UnsupportedPlatform)
        } else if let Some(reason) = file_state {
            SyncState::Disabled(reason)
        } else if options.get(SYNC_OPTION).map(String::as_str) == Some("disabled") {
            SyncState::Disabled(SyncDisabled::DisabledInConfig)
        } else if nosync {
            SyncState::Disabled(SyncDisabled::Override)
        } else {
            SyncState::Enabled
        };

        debug!("Config dir {}: sync {:?}", config_dir.display(), sync);
        Self {
            config_dir: Some(config_dir),
            options,
            sync,
        }
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    pub fn sync_enabled(&self) -> bool {
        self.sync == SyncState::Enabled
    }

    /// Raw option value, including keys the core does not interpret.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    /// Location of the sync manifest.
    pub fn sync_manifest_path(&self) -> Result<PathBuf> {
        self.config_dir
            .as_ref()
            .map(|dir| dir.join(SYNC_FILE))
            .ok_or(TagError::NoConfigDir)
    }

    fn default_dir() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
            return Some(PathBuf::from(dir));
        }
        dirs::home_dir().map(|home| home.join(".tag"))
    }
}
