//! Report commands

use anyhow::{Context, Result};
use kube::Client;
use report_lib::{
    ClusterClient, LimitRangeSource, NamespaceDefaultResolver, ReportGenerator, Workbook,
    WorkloadKind, WorkloadSource,
};
use std::path::Path;
use tracing::info;

use crate::config::Settings;
use crate::output::{print_info, print_success, print_summary, render_workbook, OutputFormat};

/// Generate sheets for `kinds`, save the workbook and print the result
pub async fn run(client: Client, kinds: &[WorkloadKind], settings: &Settings) -> Result<()> {
    let cluster = ClusterClient::new(client);
    let resolver = NamespaceDefaultResolver::new(cluster.limit_ranges(), settings.policy);

    let (workbook, total) = generate_report(&cluster, &resolver, kinds, settings).await?;

    match settings.format {
        OutputFormat::Table => {
            print_summary(&workbook);
            if total == 0 {
                print_info("No workloads found");
            }
            print_success(&format!(
                "Report written to {} ({} rows)",
                settings.output.display(),
                total
            ));
        }
        OutputFormat::Json => println!("{}", render_workbook(&workbook, settings.format)?),
    }

    Ok(())
}

/// Merge the sheets for `kinds` into the report file and save it.
///
/// The file is only written once every kind has been generated.
pub async fn generate_report<W: WorkloadSource, S: LimitRangeSource>(
    workloads: &W,
    resolver: &NamespaceDefaultResolver<S>,
    kinds: &[WorkloadKind],
    settings: &Settings,
) -> Result<(Workbook, usize)> {
    let path: &Path = &settings.output;
    let mut workbook = Workbook::open_or_create(path)
        .with_context(|| format!("Failed to open report {}", path.display()))?;

    info!(policy = ?settings.policy, namespace = ?settings.namespace, "Generating report");
    let total = ReportGenerator::new(workloads, resolver)
        .with_namespace(settings.namespace.clone())
        .write_all(kinds, &mut workbook)
        .await
        .context("Failed to generate report")?;

    workbook
        .save(path)
        .with_context(|| format!("Failed to save report {}", path.display()))?;
    Ok((workbook, total))
}
