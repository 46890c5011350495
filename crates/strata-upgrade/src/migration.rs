//! Database migration upgrade step
//!
//! Forward: resolve configuration, render the upgrade manifests, apply
//! them into the platform namespace, then wait for the migration Job.
//!
//! Rollback: remove the Job and its pods, make sure a usable backup is
//! at hand, and restore the database from it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use strata_common::crd::Platform;
use strata_common::kube_utils::{kind_of, set_namespace_and_owner};

use crate::backup::Backup;
use crate::client::{ClientTools, ClusterClient};
use crate::config::ConfigurationProvider;
use crate::error::UpgradeError;
use crate::job::{wait_for_job, PollTiming};
use crate::render::ManifestRenderer;
use crate::step::{Step, StepState};
use crate::{DEFAULT_OPERATOR_TAG, MIGRATION_JOB_NAME, MIGRATION_POD_SELECTOR, UPGRADE_TEMPLATE_DIR};

/// Collaborators shared by the steps of one upgrade
#[derive(Clone)]
pub struct UpgradeContext {
    /// Namespace the platform lives in
    pub namespace: String,
    /// Source of cluster clients
    pub tools: Arc<dyn ClientTools>,
    /// Upgrade template properties
    pub configuration: Arc<dyn ConfigurationProvider>,
    /// Upgrade manifest renderer
    pub renderer: Arc<dyn ManifestRenderer>,
}

/// Runs the database migration Job and restores the backup on rollback
pub struct MigrationStep {
    name: String,
    state: StepState,
    job_name: String,
    platform: Platform,
    backup: Box<dyn Backup>,
    timing: PollTiming,
    ctx: UpgradeContext,
}

impl MigrationStep {
    /// Create the step for `platform` with the default poll timing
    pub fn new(ctx: UpgradeContext, platform: Platform, backup: Box<dyn Backup>) -> Self {
        Self {
            name: "Database migration".to_string(),
            state: StepState::NotStarted,
            job_name: MIGRATION_JOB_NAME.to_string(),
            platform,
            backup,
            timing: PollTiming::default(),
            ctx,
        }
    }

    /// Override the poll timing
    pub fn with_timing(mut self, timing: PollTiming) -> Self {
        self.timing = timing;
        self
    }

    async fn db_migration(&self) -> Result<(), UpgradeError> {
        let client = self
            .ctx
            .tools
            .cluster_client()
            .await
            .map_err(UpgradeError::Client)?;

        let config = self
            .ctx
            .configuration
            .properties(client.clone(), &self.platform)
            .await
            .map_err(UpgradeError::Configuration)?;

        let resources = self
            .ctx
            .renderer
            .render(UPGRADE_TEMPLATE_DIR, &config)
            .map_err(UpgradeError::Render)?;

        for mut resource in resources {
            let kind = kind_of(&resource).to_string();
            let name = resource.metadata.name.clone().unwrap_or_default();

            let outcome = match set_namespace_and_owner(&mut resource, &self.platform, &self.ctx.namespace) {
                Ok(()) => client.create_or_update(&resource).await,
                Err(e) => Err(e),
            }
            .map_err(|source| UpgradeError::Apply {
                kind: kind.clone(),
                name: name.clone(),
                source,
            })?;

            info!(kind = %kind, name = %name, created = outcome.created(), updated = outcome.updated(), "applied upgrade resource");
        }

        wait_for_job(client.as_ref(), &self.ctx.namespace, &self.job_name, self.timing).await
    }

    async fn cleanup(&self, client: &dyn ClusterClient) {
        let namespace = &self.ctx.namespace;

        info!(job = %self.job_name, namespace = %namespace, "cleaning up migration job");
        match client.delete_job(namespace, &self.job_name).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(job = %self.job_name, error = %e, "failed to delete migration job"),
        }

        info!(selector = MIGRATION_POD_SELECTOR, namespace = %namespace, "cleaning up migration pods");
        if let Err(e) = client.delete_pods(namespace, MIGRATION_POD_SELECTOR).await {
            warn!(selector = MIGRATION_POD_SELECTOR, error = %e, "failed to delete migration pods");
        }
    }

    async fn ensure_backup(&mut self) -> Result<(), UpgradeError> {
        if let Err(e) = self.backup.validate().await {
            warn!(error = %e, tag = DEFAULT_OPERATOR_TAG, "backup failed validation, rebuilding");
            self.backup = self
                .backup
                .build_from_tag(DEFAULT_OPERATOR_TAG)
                .await
                .map_err(UpgradeError::Backup)?;
        }
        Ok(())
    }

    async fn restore(&mut self) -> Result<(), UpgradeError> {
        let client = self
            .ctx
            .tools
            .cluster_client()
            .await
            .map_err(UpgradeError::Client)?;

        self.cleanup(client.as_ref()).await;
        self.ensure_backup().await?;
        self.backup.restore_db().await.map_err(UpgradeError::Restore)
    }
}

#[async_trait]
impl Step for MigrationStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> StepState {
        self.state
    }

    async fn run(&mut self) -> Result<(), UpgradeError> {
        self.state = StepState::Attempted;

        let result = self.db_migration().await;
        if let Err(e) = &result {
            error!(step = %self.name, phase = e.phase(), error = %e, "upgrade step failed");
        }
        result
    }

    async fn rollback(&mut self) -> Result<(), UpgradeError> {
        self.state = StepState::RolledBack;

        let result = self.restore().await;
        match &result {
            Ok(()) => info!(step = %self.name, "rollback finished"),
            Err(e) => error!(step = %self.name, phase = e.phase(), error = %e, "rollback failed"),
        }
        result
    }
}
