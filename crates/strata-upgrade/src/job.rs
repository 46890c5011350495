//! Migration Job observation and polling

use std::time::Duration;

use chrono::{DateTime, Utc};
use k8s_openapi::api::batch::v1::Job;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::client::ClusterClient;
use crate::error::UpgradeError;

/// Default spacing between Job observations
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default bound on the total wait for the Job
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(240);

/// Poll spacing and overall deadline for waiting on a Job
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollTiming {
    interval: Duration,
    timeout: Duration,
}

impl PollTiming {
    /// Create timing parameters; `interval` must be non-zero and below `timeout`
    pub fn new(interval: Duration, timeout: Duration) -> Result<Self, UpgradeError> {
        if interval.is_zero() || interval >= timeout {
            return Err(UpgradeError::InvalidTiming { interval, timeout });
        }
        Ok(Self { interval, timeout })
    }

    /// Spacing between observations
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Maximum total wait
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

/// Point-in-time classification of a Job's status
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobProgress {
    /// No success or failure reported yet
    Running {
        /// Active pod count
        active: i32,
        /// Time since the Job started, if it has
        running_time: Option<Duration>,
    },
    /// At least one pod succeeded and none failed
    Succeeded {
        /// Succeeded pod count
        succeeded: i32,
        /// Time since the Job started, if known
        running_time: Option<Duration>,
    },
    /// At least one pod failed
    Failed {
        /// Failed pod count
        failed: i32,
    },
}

impl JobProgress {
    /// Whether polling can stop
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running { .. })
    }
}

/// Classify a Job's status; failures win over successes
pub fn job_progress(job: &Job, now: DateTime<Utc>) -> JobProgress {
    let Some(status) = job.status.as_ref() else {
        return JobProgress::Running {
            active: 0,
            running_time: None,
        };
    };

    let running_time = status
        .start_time
        .as_ref()
        .and_then(|start| (now - start.0).to_std().ok());

    let failed = status.failed.unwrap_or(0);
    let succeeded = status.succeeded.unwrap_or(0);

    if failed > 0 {
        JobProgress::Failed { failed }
    } else if succeeded > 0 {
        JobProgress::Succeeded {
            succeeded,
            running_time,
        }
    } else {
        JobProgress::Running {
            active: status.active.unwrap_or(0),
            running_time,
        }
    }
}

/// Poll the named Job until it succeeds, fails, or `timing` runs out
///
/// The first observation happens one interval after the call. A fetch
/// error ends the wait immediately.
///
/// The deadline is checked only after each fetch returns, so the wait
/// ends within `timeout + interval` plus the duration of the last fetch.
/// A slow API server can push it past `timeout + interval`.
pub async fn wait_for_job(
    client: &dyn ClusterClient,
    namespace: &str,
    name: &str,
    timing: PollTiming,
) -> Result<(), UpgradeError> {
    let start = Instant::now();

    loop {
        tokio::time::sleep(timing.interval).await;

        let job = client
            .get_job(namespace, name)
            .await
            .map_err(|source| UpgradeError::Fetch {
                name: name.to_string(),
                source,
            })?;

        match job_progress(&job, Utc::now()) {
            JobProgress::Failed { failed } => {
                return Err(UpgradeError::JobFailed { failed });
            }
            JobProgress::Succeeded {
                succeeded,
                running_time,
            } => {
                info!(
                    job = %name,
                    succeeded,
                    running_time = ?running_time,
                    "database migration job successfully finished"
                );
                return Ok(());
            }
            JobProgress::Running {
                active,
                running_time,
            } => {
                info!(
                    job = %name,
                    active,
                    running_time = ?running_time,
                    "waiting for database migration to finish"
                );
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= timing.timeout {
            debug!(job = %name, ?elapsed, "gave up waiting for job");
            return Err(UpgradeError::Timeout {
                name: name.to_string(),
                timeout: timing.timeout,
            });
        }
    }
}
