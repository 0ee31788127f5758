//! Kubernetes workload resource reporter CLI
//!
//! Lists deployments, daemon sets, stateful sets and jobs, and reports
//! their aggregated resource requests, limits and QoS class per workload.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use report_lib::{DefaultsPolicy, WorkloadKind};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Kubernetes workload resource reporter
#[derive(Parser)]
#[command(name = "k8s-reporter")]
#[command(author, version, about = "Kubernetes workload resource reporter", long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file (uses default if not specified)
    #[arg(long, env = "KUBECONFIG", global = true)]
    pub kubeconfig: Option<String>,

    /// Only report workloads in this namespace (all namespaces if not specified)
    #[arg(long, short, global = true)]
    pub namespace: Option<String>,

    /// Workbook file to write, merging with existing sheets [default: k8s_report.xlsx]
    #[arg(long, short, global = true)]
    pub output: Option<PathBuf>,

    /// Stdout rendering: a sheet summary table, or the whole workbook as JSON
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    /// What to do when a namespace default cannot be fetched (degrade or fail)
    #[arg(long, global = true)]
    pub on_default_error: Option<DefaultsPolicy>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Copy)]
pub enum Commands {
    /// Report deployments
    Deployments,

    /// Report daemon sets
    Daemonsets,

    /// Report stateful sets
    Statefulsets,

    /// Report jobs
    Jobs,

    /// Report every workload kind, stopping at the first failure
    RunAll,
}

impl Commands {
    /// Workload kinds covered by the command, in report order
    pub fn kinds(&self) -> Vec<WorkloadKind> {
        match self {
            Commands::Deployments => vec![WorkloadKind::Deployment],
            Commands::Daemonsets => vec![WorkloadKind::DaemonSet],
            Commands::Statefulsets => vec![WorkloadKind::StatefulSet],
            Commands::Jobs => vec![WorkloadKind::Job],
            Commands::RunAll => WorkloadKind::ALL.to_vec(),
        }
    }
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config = config::ReporterConfig::load()?;
    let settings = config::Settings::resolve(&cli, config);

    let client = client::connect(cli.kubeconfig.as_deref()).await?;
    commands::report::run(client, &cli.command.kinds(), &settings).await
}
