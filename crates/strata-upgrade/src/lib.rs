//! Reversible upgrade steps for strata platforms
//!
//! The database migration step runs a migration Job rendered from the
//! upgrade templates, waits for it to finish, and on rollback removes the
//! Job and its pods before restoring the pre-upgrade database backup.
//!
//! Every external collaborator sits behind a trait:
//! - [`ClientTools`] / [`ClusterClient`]: the Kubernetes API
//! - [`ConfigurationProvider`]: upgrade-scoped template properties
//! - [`ManifestRenderer`]: the upgrade templates
//! - [`Backup`]: the pre-upgrade database snapshot

#![deny(missing_docs)]

pub mod backup;
pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod migration;
pub mod render;
pub mod step;

pub use backup::{Backup, BackupError, CommandBackup};
pub use client::{ClientTools, ClusterClient, KubeClientTools, KubeClusterClient};
pub use config::{ConfigurationProvider, TemplateConfigProvider, UpgradeConfig};
pub use error::UpgradeError;
pub use job::{JobProgress, PollTiming};
pub use migration::{MigrationStep, UpgradeContext};
pub use render::{ManifestRenderer, TemplateDirRenderer};
pub use step::{Step, StepState};

/// Name of the database migration Job
pub const MIGRATION_JOB_NAME: &str = "upgrade-db-migration";

/// Label selector matching the pods of the migration Job
pub const MIGRATION_POD_SELECTOR: &str = "job-name=upgrade-db-migration";

/// Template directory holding the upgrade manifests
pub const UPGRADE_TEMPLATE_DIR: &str = "./upgrade";

/// Tag used to rebuild a backup handle that failed validation
pub const DEFAULT_OPERATOR_TAG: &str = env!("CARGO_PKG_VERSION");
