use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::store::{StaticCredentials, StoreConfig};

pub const DEFAULT_BUCKET: &str = "animl-images-serving-dev";
pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_PROFILE: &str = "animl";

/// Persistent defaults, read from `~/.imgpull/config.json` when present.
/// Every field is optional in the file; command-line flags win over it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub bucket: String,
    pub region: String,
    pub profile: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
    pub max_workers: Option<usize>,
    /// Where failure files go when no explicit path is given.
    pub failures_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            region: DEFAULT_REGION.to_string(),
            profile: Some(DEFAULT_PROFILE.to_string()),
            access_key_id: None,
            secret_access_key: None,
            endpoint_url: None,
            force_path_style: false,
            max_workers: None,
            failures_dir: None,
        }
    }
}

impl Config {
    /// `~/.imgpull`, or `./.imgpull` when no home directory can be found.
    pub fn app_dir() -> PathBuf {
        let base = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join(".".to_owned() + env!("CARGO_PKG_NAME"))
    }

    pub fn default_path() -> PathBuf {
        Self::app_dir().join("config.json")
    }

    /// Read `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Io { path: path.to_path_buf(), source }),
        };
        serde_json::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn failures_dir(&self) -> PathBuf {
        self.failures_dir.clone().unwrap_or_else(|| Self::app_dir().join("logs"))
    }

    /// The explicit store configuration handed to the store constructor.
    pub fn store_config(&self) -> StoreConfig {
        let credentials = match (&self.access_key_id, &self.secret_access_key) {
            (Some(id), Some(secret)) => Some(StaticCredentials {
                access_key_id: id.clone(),
                secret_access_key: secret.clone(),
            }),
            _ => None,
        };
        StoreConfig {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            profile: self.profile.clone(),
            credentials,
            endpoint_url: self.endpoint_url.clone(),
            force_path_style: self.force_path_style,
        }
    }
}
