//! Backup capability backed by an external backup tool
//!
//! The tool is invoked as:
//! - `<program> build --tag <tag> --output <dir>`
//! - `<program> restore --input <dir>`

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::{Backup, BackupError};

/// File a complete backup directory must contain
pub const DB_DUMP_FILE: &str = "db.dump";

/// A backup directory managed by an external tool
#[derive(Clone, Debug)]
pub struct CommandBackup {
    program: PathBuf,
    root: PathBuf,
    dir: PathBuf,
}

impl CommandBackup {
    /// Handle for the backup in `dir`; rebuilt backups are placed under `root`
    pub fn new(program: impl Into<PathBuf>, root: impl Into<PathBuf>, dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            root: root.into(),
            dir: dir.into(),
        }
    }

    /// Directory holding this backup
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn invoke(&self, operation: &str, args: Vec<OsString>) -> Result<(), BackupError> {
        debug!(program = %self.program.display(), operation, "invoking backup tool");
        let output = Command::new(&self.program)
            .arg(operation)
            .args(args)
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(BackupError::command(
                operation,
                format!("{} ({})", stderr.trim(), output.status),
            ))
        }
    }
}

#[async_trait]
impl Backup for CommandBackup {
    async fn validate(&self) -> Result<(), BackupError> {
        let location = self.dir.display().to_string();
        let meta = match tokio::fs::metadata(&self.dir).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BackupError::invalid(location, "directory does not exist"))
            }
            Err(e) => return Err(e.into()),
        };
        if !meta.is_dir() {
            return Err(BackupError::invalid(location, "not a directory"));
        }

        match tokio::fs::metadata(self.dir.join(DB_DUMP_FILE)).await {
            Ok(dump) if dump.len() > 0 => Ok(()),
            Ok(_) => Err(BackupError::invalid(location, format!("{} is empty", DB_DUMP_FILE))),
            Err(_) => Err(BackupError::invalid(location, format!("{} is missing", DB_DUMP_FILE))),
        }
    }

    async fn build_from_tag(&self, tag: &str) -> Result<Box<dyn Backup>, BackupError> {
        let dir = self.root.join(tag);
        info!(tag, dir = %dir.display(), "building backup from tag");
        self.invoke(
            "build",
            vec!["--tag".into(), tag.into(), "--output".into(), dir.clone().into()],
        )
        .await?;

        let rebuilt = CommandBackup::new(self.program.clone(), self.root.clone(), dir);
        rebuilt.validate().await?;
        Ok(Box::new(rebuilt))
    }

    async fn restore_db(&self) -> Result<(), BackupError> {
        info!(dir = %self.dir.display(), "restoring database from backup");
        self.invoke("restore", vec!["--input".into(), self.dir.clone().into()])
            .await
    }
}
