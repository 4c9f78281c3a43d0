//! Configuration types for sheetconv

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Input validation configuration (size limit, accepted extensions)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum accepted file size in bytes (default: 10 MiB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Accepted file extensions, lowercase, without the leading dot
    /// (default: common spreadsheet extensions)
    #[serde(default = "default_accepted_extensions")]
    pub accepted_extensions: BTreeSet<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            accepted_extensions: default_accepted_extensions(),
        }
    }
}

/// Transfer behavior configuration (timeout, upload chunking)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Overall request timeout (default: 120s)
    #[serde(default = "default_request_timeout", with = "duration_secs")]
    pub request_timeout: Duration,

    /// Upload chunk size in bytes; byte-level progress is reported once per
    /// chunk sent (default: 64 KiB)
    #[serde(default = "default_upload_chunk_size")]
    pub upload_chunk_size: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            upload_chunk_size: default_upload_chunk_size(),
        }
    }
}

/// Artifact download configuration (destination, release grace)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory converted files are saved into (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Grace delay between triggering a save and releasing a transient
    /// artifact URL (default: 100ms). A policy constant, not a correctness
    /// requirement: the release path tolerates any value without corrupting
    /// an in-progress save.
    #[serde(default = "default_release_grace", with = "duration_millis")]
    pub release_grace: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            release_grace: default_release_grace(),
        }
    }
}

/// Top-level library configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Conversion backend endpoint the file payload is POSTed to
    #[serde(default = "default_endpoint")]
    pub endpoint: Url,

    /// Input validation settings
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Transfer settings
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Artifact download settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Capacity of the lifecycle event broadcast channel (default: 256)
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            validation: ValidationConfig::default(),
            transfer: TransferConfig::default(),
            download: DownloadConfig::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

impl Config {
    /// Validate the configuration, returning a descriptive error for the
    /// first invalid setting found
    pub fn validate(&self) -> Result<()> {
        if self.validation.accepted_extensions.is_empty() {
            return Err(Error::Config {
                message: "accepted_extensions must not be empty".to_string(),
                key: Some("validation.accepted_extensions".to_string()),
            });
        }
        if self.validation.max_file_size == 0 {
            return Err(Error::Config {
                message: "max_file_size must be greater than zero".to_string(),
                key: Some("validation.max_file_size".to_string()),
            });
        }
        if self.transfer.upload_chunk_size == 0 {
            return Err(Error::Config {
                message: "upload_chunk_size must be greater than zero".to_string(),
                key: Some("transfer.upload_chunk_size".to_string()),
            });
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::Config {
                message: "event_channel_capacity must be greater than zero".to_string(),
                key: Some("event_channel_capacity".to_string()),
            });
        }
        Ok(())
    }
}

fn default_endpoint() -> Url {
    // Unwrap is safe: the literal is a valid URL
    #[allow(clippy::unwrap_used)]
    Url::parse("http://127.0.0.1:9090/api/convert").unwrap()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_accepted_extensions() -> BTreeSet<String> {
    ["xls", "xlsx", "xlsm", "xlsb", "ods", "csv", "tsv"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_upload_chunk_size() -> usize {
    64 * 1024
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_release_grace() -> Duration {
    Duration::from_millis(100)
}

fn default_event_channel_capacity() -> usize {
    256
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
