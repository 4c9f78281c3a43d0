//! Core types for sheetconv

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

use crate::error::Result;

/// A user-selected candidate file awaiting conversion
///
/// Owns its byte payload exclusively; re-selection replaces the value
/// wholesale. The extension is derived from the declared name, not sniffed
/// from the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectedFile {
    /// Declared file name, including extension (e.g., "report.xlsx")
    pub name: String,
    /// Raw file contents
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Create a selected file from a name and its raw contents
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk into a selected file
    ///
    /// The file name is taken from the final path component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { name, bytes })
    }

    /// Size of the payload in bytes
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Extension derived from the name: the lowercased substring after the
    /// last `.`, or `None` when the name contains no dot
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// File name without its extension ("report.xlsx" → "report")
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) => stem,
            None => &self.name,
        }
    }
}

/// Immutable description of a supported output format
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    /// Stable identifier sent to the backend (e.g., "csv")
    pub id: String,
    /// Display name (e.g., "CSV")
    pub name: String,
    /// Output file extension including the leading dot (e.g., ".csv")
    pub extension: String,
    /// Human-readable description for selection UIs
    pub description: String,
}

/// One conversion attempt: a validated file paired with a catalog format
///
/// Ephemeral; exists only for the duration of the attempt and is never
/// persisted.
#[derive(Clone, Debug)]
pub struct ConversionRequest {
    /// The validated input file
    pub file: SelectedFile,
    /// The requested output format
    pub format: FormatDescriptor,
}

impl ConversionRequest {
    /// Output filename derived from the input name and the target format:
    /// `<name-without-extension><format.extension>`
    ///
    /// Used when the backend does not supply a filename of its own.
    pub fn derived_file_name(&self) -> String {
        format!("{}{}", self.file.stem(), self.format.extension)
    }
}

/// Logical phase of a conversion, each owning a sub-range of the 0–100 scale
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Transferring the file to the backend — percent in [0, 60)
    Uploading,
    /// Backend is converting — percent in [60, 90)
    ServerProcessing,
    /// Reconciling the reply into an outcome — percent in [90, 100)
    Finalizing,
    /// Terminal — percent is exactly 100
    Done,
}

impl Phase {
    /// Map a percentage to its phase
    ///
    /// Values above 100 are clamped into `Done`.
    pub fn for_percent(percent: u8) -> Self {
        match percent {
            0..=59 => Phase::Uploading,
            60..=89 => Phase::ServerProcessing,
            90..=99 => Phase::Finalizing,
            _ => Phase::Done,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Phase::Uploading => "Uploading",
            Phase::ServerProcessing => "Server processing",
            Phase::Finalizing => "Finalizing",
            Phase::Done => "Done",
        };
        write!(f, "{}", label)
    }
}

/// A single progress report delivered to the `on_progress` callback
///
/// Percentages are non-decreasing per request and 100 is reported exactly
/// once, as the final report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Progress {
    /// Percentage in [0, 100]
    pub percent: u8,
    /// Phase the percentage falls in
    pub phase: Phase,
}

impl Progress {
    /// Build a progress value, deriving the phase from the percentage
    pub fn at(percent: u8) -> Self {
        Self {
            percent,
            phase: Phase::for_percent(percent),
        }
    }
}

/// Why a conversion attempt failed
///
/// All variants are recoverable at the session level: the same file/format
/// pair may be retried after any of them.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FailureReason {
    /// Transport-level failure: connection refused, timeout, or abort
    #[error("network error: {0}")]
    Network(String),

    /// Backend replied with a non-success status
    #[error("server returned status {code}")]
    Server {
        /// HTTP status code (or transport-equivalent) from the backend
        code: u16,
    },

    /// Backend replied with a success status but an unusable body
    #[error("malformed server response")]
    MalformedResponse,

    /// The attempt was cancelled before it settled
    #[error("conversion cancelled")]
    Cancelled,
}

/// Reference to a converted file returned by the backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    /// Where the converted bytes can be retrieved
    pub url: ArtifactUrl,
    /// Filename to save the artifact under
    pub file_name: String,
}

/// Retrievable artifact location, tagged by lifetime
///
/// Transient URLs are session-scoped and must be released exactly once by
/// the downloader after the save has been triggered; durable URLs are never
/// released.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtifactUrl {
    /// Long-lived remote URL; no release required
    Durable(Url),
    /// Short-lived, session-scoped URL; release after use
    Transient(Url),
}

impl ArtifactUrl {
    /// The underlying URL, regardless of lifetime
    pub fn as_url(&self) -> &Url {
        match self {
            ArtifactUrl::Durable(url) | ArtifactUrl::Transient(url) => url,
        }
    }

    /// Whether this URL must be released after use
    pub fn is_transient(&self) -> bool {
        matches!(self, ArtifactUrl::Transient(_))
    }
}

/// Terminal result of one conversion attempt
///
/// Exactly one outcome is delivered per started request, never both.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// Conversion succeeded; the artifact is ready for retrieval
    Success(Artifact),
    /// Conversion failed with a typed reason
    Failed(FailureReason),
}

impl ConversionOutcome {
    /// The artifact, if the attempt succeeded
    pub fn artifact(&self) -> Option<&Artifact> {
        match self {
            ConversionOutcome::Success(artifact) => Some(artifact),
            ConversionOutcome::Failed(_) => None,
        }
    }

    /// The failure reason, if the attempt failed
    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            ConversionOutcome::Success(_) => None,
            ConversionOutcome::Failed(reason) => Some(reason),
        }
    }
}

/// Event emitted during the conversion lifecycle
///
/// Broadcast alongside the `on_progress` callback so that multiple
/// subscribers can observe a session without owning the callback.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum Event {
    /// A conversion request was accepted and is now in flight
    Started {
        /// Input file name
        file_name: String,
        /// Target format identifier
        format_id: String,
    },

    /// Progress update
    Progress {
        /// Percentage in [0, 100]
        percent: u8,
        /// Current phase
        phase: Phase,
    },

    /// The request settled successfully
    Completed {
        /// Artifact URL as a string
        url: String,
        /// Artifact filename
        file_name: String,
    },

    /// The request settled with a failure
    Failed {
        /// The typed failure reason
        reason: FailureReason,
    },
}
