//! strata - database migration upgrade step for strata platforms

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use kube::{Api, CustomResourceExt};

use strata_common::crd::Platform;
use strata_common::telemetry::{init_telemetry, TelemetryConfig};
use strata_upgrade::{
    CommandBackup, KubeClientTools, MigrationStep, PollTiming, Step, TemplateConfigProvider,
    TemplateDirRenderer, UpgradeContext,
};

/// strata - run or roll back the database migration of a platform upgrade
#[derive(Parser, Debug)]
#[command(name = "strata", version, about, long_about = None)]
struct Cli {
    /// Print the Platform CRD manifest and exit
    #[arg(long)]
    crd: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the database migration Job and wait for it
    Migrate {
        #[command(flatten)]
        step: StepArgs,

        /// Roll back immediately if the migration fails
        #[arg(long)]
        rollback_on_failure: bool,
    },

    /// Remove migration artifacts and restore the pre-upgrade backup
    Rollback {
        #[command(flatten)]
        step: StepArgs,
    },
}

/// Arguments shared by every step command
#[derive(Args, Debug)]
struct StepArgs {
    /// Path to kubeconfig (in-cluster config or KUBECONFIG when unset)
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Namespace of the Platform being upgraded
    #[arg(short, long, env = "STRATA_NAMESPACE")]
    namespace: String,

    /// Name of the Platform being upgraded
    #[arg(long, env = "STRATA_PLATFORM")]
    platform: String,

    /// Root directory of the upgrade templates
    #[arg(long, env = "STRATA_TEMPLATES", default_value = "/etc/strata/templates")]
    templates: PathBuf,

    /// YAML file with default template properties
    #[arg(long, env = "STRATA_TEMPLATE_CONFIG", default_value = "/etc/strata/config.yaml")]
    template_config: PathBuf,

    /// Directory holding the pre-upgrade database backup
    #[arg(long, env = "STRATA_BACKUP_DIR")]
    backup_dir: PathBuf,

    /// Backup tool used to rebuild and restore backups
    #[arg(long, env = "STRATA_BACKUP_COMMAND", default_value = "strata-backup")]
    backup_command: PathBuf,

    /// Seconds between migration Job observations
    #[arg(long, default_value_t = 10)]
    interval_secs: u64,

    /// Seconds to wait for the migration Job before giving up
    #[arg(long, default_value_t = 240)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&Platform::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    init_telemetry(TelemetryConfig {
        service_name: "strata-upgrade".to_string(),
        ..Default::default()
    })?;

    match cli.command {
        Some(Commands::Migrate {
            step,
            rollback_on_failure,
        }) => {
            let mut migration = build_step(&step).await?;
            if let Err(e) = migration.run().await {
                if rollback_on_failure {
                    tracing::warn!(step = migration.name(), "migration failed, rolling back");
                    migration.rollback().await?;
                }
                return Err(e.into());
            }
            Ok(())
        }
        Some(Commands::Rollback { step }) => {
            let mut migration = build_step(&step).await?;
            migration.rollback().await?;
            Ok(())
        }
        None => Err(anyhow::anyhow!(
            "no command given; use `strata migrate`, `strata rollback` or `strata --crd`"
        )),
    }
}

/// Wire the real collaborators into a migration step
async fn build_step(args: &StepArgs) -> anyhow::Result<MigrationStep> {
    let timing = PollTiming::new(
        Duration::from_secs(args.interval_secs),
        Duration::from_secs(args.timeout_secs),
    )?;

    let tools = Arc::new(KubeClientTools::new(args.kubeconfig.clone()));
    let platforms: Api<Platform> = Api::namespaced(tools.kube_client().await?, &args.namespace);
    let platform = platforms.get(&args.platform).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to fetch Platform {}/{}: {}",
            args.namespace,
            args.platform,
            e
        )
    })?;

    let backup_root = args
        .backup_dir
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let backup = CommandBackup::new(&args.backup_command, backup_root, &args.backup_dir);

    let ctx = UpgradeContext {
        namespace: args.namespace.clone(),
        tools,
        configuration: Arc::new(TemplateConfigProvider::new(&args.template_config)),
        renderer: Arc::new(TemplateDirRenderer::new(&args.templates)),
    };

    Ok(MigrationStep::new(ctx, platform, Box::new(backup)).with_timing(timing))
}
