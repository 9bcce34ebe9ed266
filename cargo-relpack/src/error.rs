use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelpackError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Configuration error at {path}: {message}")]
    Config { path: String, message: String },

    #[error("Failed to resolve package metadata from {manifest}: {reason}")]
    Metadata { manifest: String, reason: String },

    #[error("Toolchain query failed: {0}")]
    Toolchain(String),

    #[error("Build failed for target {target} (exit code {code})")]
    BuildFailed { target: String, code: i32 },

    #[error("Expected build artifact not found: {}", path.display())]
    MissingArtifact { path: PathBuf },

    #[error("Archive creation failed for {archive}: {reason}")]
    Archive { archive: String, reason: String },

    #[error("Checksum generation failed for {file}: {reason}")]
    Checksum { file: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelpackError>;

impl RelpackError {
    /// Process exit code for this failure.
    ///
    /// A failed build hands back the compiler's own code; every other step
    /// gets a sysexits-style code of its own.
    pub fn exit_code(&self) -> i32 {
        match self {
            RelpackError::BuildFailed { code, .. } => *code,
            RelpackError::Usage(_) => 64,
            RelpackError::Toolchain(_) => 69,
            RelpackError::MissingArtifact { .. } | RelpackError::Archive { .. } => 73,
            RelpackError::Checksum { .. } => 74,
            RelpackError::Config { .. } | RelpackError::Metadata { .. } => 78,
            RelpackError::Io(_) => 1,
        }
    }

    pub(crate) fn archive(archive: &std::path::Path, reason: impl ToString) -> Self {
        RelpackError::Archive {
            archive: archive.display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn checksum(file: &std::path::Path, reason: impl ToString) -> Self {
        RelpackError::Checksum {
            file: file.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
