//! Pre-flight file validation

use tracing::debug;

use crate::config::ValidationConfig;
use crate::error::ValidationError;
use crate::types::SelectedFile;

/// Gates candidate files against size and type constraints before a
/// conversion request may be constructed
///
/// Validation is pure: rejection never mutates held selection state, and
/// repeated validation of the same file is deterministic.
#[derive(Clone, Debug)]
pub struct FileValidator {
    config: ValidationConfig,
}

impl FileValidator {
    /// Create a validator from validation configuration
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Check a candidate file against the configured constraints
    ///
    /// Rules are evaluated in order and short-circuit on the first failure:
    /// 1. size above the configured maximum → [`ValidationError::TooLarge`]
    /// 2. extension (case-insensitive, after the last `.`) outside the
    ///    accepted set → [`ValidationError::UnsupportedType`]
    pub fn validate(&self, file: &SelectedFile) -> Result<(), ValidationError> {
        let size = file.size();
        if size > self.config.max_file_size {
            debug!(name = %file.name, size, max = self.config.max_file_size, "file too large");
            return Err(ValidationError::TooLarge {
                size,
                max_size: self.config.max_file_size,
            });
        }

        let extension = file.extension().unwrap_or_default();
        if !self.config.accepted_extensions.contains(&extension) {
            debug!(name = %file.name, extension = %extension, "unsupported file type");
            return Err(ValidationError::UnsupportedType { extension });
        }

        Ok(())
    }
}
