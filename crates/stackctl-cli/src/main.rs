//! stackctl CLI
//!
//! Deploys, tears down and health-checks the application stack.

mod commands;

use clap::{Parser, Subcommand};
use stackctl_core::{CleanupTarget, DeployTarget, HealthTarget, Mode, StackConfig};
use stackctl_network::{HttpCheck, InterruptHandle};
use stackctl_orchestrator::{
    AutoConfirm, ConfirmationGate, InteractiveGate, Orchestrator, OrchestratorConfig, StackCheck,
};
use stackctl_runtime::{Executor, StackExecutor, SystemRunner};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::OutputFormat;

/// stackctl - declarative deployment orchestrator
#[derive(Parser, Debug)]
#[command(name = "stackctl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./stackctl.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or update the stack
    Deploy {
        /// Environment tag
        #[arg(default_value = "production")]
        environment: String,

        /// Deployment type (docker, kubernetes|k8s, aws, full)
        #[arg(default_value = "docker")]
        target: DeployTarget,
    },

    /// Tear the stack down
    Cleanup {
        /// Environment tag
        #[arg(default_value = "production")]
        environment: String,

        /// Cleanup type (docker, kubernetes|k8s, aws|terraform, cloudformation|cfn, all)
        #[arg(default_value = "docker")]
        target: CleanupTarget,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Inspect the running stack without changing it
    HealthCheck {
        /// Environment tag
        #[arg(default_value = "production")]
        environment: String,

        /// Target type (docker, kubernetes|k8s, aws)
        #[arg(default_value = "docker")]
        target: HealthTarget,
    },
}

impl Commands {
    /// Environment, mode and whether confirmation is forced
    fn into_run(self) -> (String, Mode, bool) {
        match self {
            Commands::Deploy {
                environment,
                target,
            } => (environment, Mode::Deploy(target), false),
            Commands::Cleanup {
                environment,
                target,
                yes,
            } => (environment, Mode::Cleanup(target), yes),
            Commands::HealthCheck {
                environment,
                target,
            } => (environment, Mode::HealthCheck(target), false),
        }
    }
}

fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir()?;
    let config = StackConfig::discover(cli.config.as_deref(), &cwd)?;
    init_logging(cli.verbose, &config.logging.level);

    let (environment, mode, force) = cli.command.into_run();
    debug!(mode = %mode, environment = %environment, "Configuration loaded");

    let runner = Arc::new(SystemRunner::new());
    let executor: Arc<dyn Executor> =
        Arc::new(StackExecutor::new(&config, &environment, runner));
    let check = Arc::new(StackCheck::new(
        HttpCheck::new(config.probes.interval())?,
        executor.clone(),
    ));
    let (handle, interrupt) = InterruptHandle::new();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the run");
            handle.trigger();
        }
    });

    let gate: Arc<dyn ConfirmationGate> = if force {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(InteractiveGate::new().with_interrupt(interrupt.clone()))
    };

    let orchestrator = Orchestrator::new(
        OrchestratorConfig::new(environment, config),
        executor,
        check,
        gate,
    )
    .with_interrupt(interrupt);

    let report = orchestrator.run(mode).await?;
    commands::render(&report, cli.format)?;

    std::process::exit(report.verdict.exit_code());
}
