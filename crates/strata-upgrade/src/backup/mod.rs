//! Pre-upgrade database backup capability
//!
//! Steps never create backup content. They validate the handle they were
//! given, rebuild it from a tag when validation fails, and restore from it.

mod command;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

pub use command::{CommandBackup, DB_DUMP_FILE};

/// Errors raised by the backup capability
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// The backup is missing or incomplete
    #[error("backup at {location} is not usable: {reason}")]
    Invalid {
        /// Where the backup was expected
        location: String,
        /// What is wrong with it
        reason: String,
    },

    /// The external backup tool failed
    #[error("backup {operation} failed: {message}")]
    Command {
        /// Operation being performed (build, restore)
        operation: String,
        /// Tool output or failure description
        message: String,
    },

    /// I/O error while launching or inspecting the backup
    #[error("backup i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackupError {
    /// Create an invalid-backup error
    pub fn invalid(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create a command failure error
    pub fn command(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Handle to a database snapshot taken before the upgrade began
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Backup: Send + Sync {
    /// Check that the snapshot exists and is complete
    async fn validate(&self) -> Result<(), BackupError>;

    /// Build a fresh handle for the snapshot identified by `tag`
    async fn build_from_tag(&self, tag: &str) -> Result<Box<dyn Backup>, BackupError>;

    /// Restore the database from the snapshot
    async fn restore_db(&self) -> Result<(), BackupError>;
}
