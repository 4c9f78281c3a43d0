//! # sheetconv
//!
//! Client-side library for driving spreadsheet conversions against a remote
//! conversion backend.
//!
//! ## Design Philosophy
//!
//! sheetconv is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Outcome-typed** - Every conversion attempt settles to exactly one
//!   [`ConversionOutcome`]; failures never escape the `start` boundary
//! - **Transport-agnostic** - A real multipart upload and a simulated local
//!   mode implement the same phase-based progress contract
//! - **Event-driven** - Progress flows through a callback plus a broadcast
//!   channel, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use sheetconv::{
//!     ArtifactDownloader, Config, ConversionOrchestrator, ConversionOutcome, SelectedFile,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let orchestrator = ConversionOrchestrator::http(&config)?;
//!
//!     let file = SelectedFile::from_path("report.xlsx").await?;
//!     let format = orchestrator
//!         .catalog()
//!         .find("csv")
//!         .cloned()
//!         .ok_or("unknown format")?;
//!
//!     let handle = orchestrator.start(file, &format, |progress| {
//!         println!("{}% — {}", progress.percent, progress.phase);
//!     })?;
//!
//!     match handle.outcome().await {
//!         ConversionOutcome::Success(artifact) => {
//!             ArtifactDownloader::new(&config.download).save(artifact);
//!         }
//!         ConversionOutcome::Failed(reason) => eprintln!("conversion failed: {reason}"),
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Format registry
pub mod catalog;
/// Configuration types
pub mod config;
/// Artifact retrieval and transient-URL release
pub mod downloader;
/// Error types
pub mod error;
/// Conversion orchestration
pub mod orchestrator;
/// Pluggable conversion transports
pub mod transport;
/// Core types and events
pub mod types;
/// Pre-flight file validation
pub mod validator;

// Re-export commonly used types
pub use catalog::FormatCatalog;
pub use config::{Config, DownloadConfig, TransferConfig, ValidationConfig};
pub use downloader::{ArtifactDownloader, FileSaver, HttpFileSaver, HttpUrlReleaser, UrlReleaser};
pub use error::{Error, Result, TransportError, ValidationError};
pub use orchestrator::{ConversionHandle, ConversionOrchestrator};
pub use transport::{
    ConversionTransport, HttpTransport, ResponseBody, SimulatedReply, SimulatedTransport,
    TransportReply, UploadProgressFn,
};
pub use types::{
    Artifact, ArtifactUrl, ConversionOutcome, ConversionRequest, Event, FailureReason,
    FormatDescriptor, Phase, Progress, SelectedFile,
};
pub use validator::FileValidator;
