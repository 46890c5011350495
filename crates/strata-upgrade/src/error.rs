//! Upgrade step error types
//!
//! One variant per failure class of the migration step. Every variant
//! keeps its cause as `source`, so the underlying failure reaches the
//! driver unchanged.

use std::time::Duration;

use crate::backup::BackupError;

/// Errors returned by upgrade steps
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    /// The cluster client could not be constructed
    #[error("failed to construct cluster client: {0}")]
    Client(#[source] strata_common::Error),

    /// Upgrade configuration could not be resolved
    #[error("failed to load upgrade configuration: {0}")]
    Configuration(#[source] strata_common::Error),

    /// Upgrade manifests could not be rendered
    #[error("failed to render upgrade resources: {0}")]
    Render(#[source] strata_common::Error),

    /// A rendered resource could not be created or updated
    #[error("failed to apply {kind} {name}: {source}")]
    Apply {
        /// Kind of the resource
        kind: String,
        /// Name of the resource
        name: String,
        /// Underlying client error
        source: strata_common::Error,
    },

    /// The migration Job could not be fetched while waiting for it
    #[error("failed to fetch job {name}: {source}")]
    Fetch {
        /// Job name
        name: String,
        /// Underlying client error
        source: strata_common::Error,
    },

    /// The migration Job reported failed pods
    #[error("job failed, {failed}")]
    JobFailed {
        /// Number of failed pods reported by the Job
        failed: i32,
    },

    /// The migration Job did not reach a terminal state in time
    #[error("timed out after {timeout:?} waiting for job {name}")]
    Timeout {
        /// Job name
        name: String,
        /// Configured timeout
        timeout: Duration,
    },

    /// No usable backup could be obtained for the restore
    #[error("backup unavailable: {0}")]
    Backup(#[source] BackupError),

    /// Restoring the database from the backup failed
    #[error("database restore failed: {0}")]
    Restore(#[source] BackupError),

    /// Poll interval and timeout are inconsistent
    #[error("invalid poll timing: interval {interval:?} must be non-zero and below timeout {timeout:?}")]
    InvalidTiming {
        /// Poll interval
        interval: Duration,
        /// Overall timeout
        timeout: Duration,
    },
}

impl UpgradeError {
    /// Short phase label for logs
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Client(_) => "client",
            Self::Configuration(_) => "configure",
            Self::Render(_) => "render",
            Self::Apply { .. } => "apply",
            Self::Fetch { .. } | Self::JobFailed { .. } | Self::Timeout { .. } => "await",
            Self::Backup(_) => "backup",
            Self::Restore(_) => "restore",
            Self::InvalidTiming { .. } => "setup",
        }
    }
}
