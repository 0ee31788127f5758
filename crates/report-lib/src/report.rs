//! Per-kind report generation
//!
//! Fetches one workload kind, builds every row, then writes the sheet.
//! Rows are built before the workbook is touched, so a failure leaves the
//! workbook as it was.

use crate::defaults::{LimitRangeSource, NamespaceDefaultResolver};
use crate::error::Result;
use crate::rows::{ReportRow, RowBuilder};
use crate::workbook::Workbook;
use crate::workload::{Workload, WorkloadKind};
use async_trait::async_trait;
use tracing::info;

/// Source of workloads to report on
#[async_trait]
pub trait WorkloadSource: Send + Sync {
    /// List workloads of `kind`, in one namespace or across all of them
    async fn workloads(&self, kind: WorkloadKind, namespace: Option<&str>) -> Result<Vec<Workload>>;
}

/// Generates report sheets into a caller-owned workbook
pub struct ReportGenerator<'a, W, S> {
    workloads: &'a W,
    resolver: &'a NamespaceDefaultResolver<S>,
    namespace: Option<String>,
}

impl<'a, W: WorkloadSource, S: LimitRangeSource> ReportGenerator<'a, W, S> {
    pub fn new(workloads: &'a W, resolver: &'a NamespaceDefaultResolver<S>) -> Self {
        Self {
            workloads,
            resolver,
            namespace: None,
        }
    }

    /// Restrict listing to a single namespace
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    /// Build the rows of one kind without writing them anywhere
    pub async fn rows(&self, kind: WorkloadKind) -> Result<Vec<ReportRow>> {
        info!(kind = %kind, "Fetching workloads from Kubernetes cluster");
        let workloads = self
            .workloads
            .workloads(kind, self.namespace.as_deref())
            .await?;
        info!(kind = %kind, count = workloads.len(), "Fetched workloads");

        let builder = RowBuilder::new(self.resolver);
        let mut rows = Vec::with_capacity(workloads.len());
        for workload in &workloads {
            rows.push(builder.build(workload).await?);
        }
        Ok(rows)
    }

    /// Fetch one kind and write its sheet; returns the number of rows
    pub async fn write_sheet(&self, kind: WorkloadKind, workbook: &mut Workbook) -> Result<usize> {
        let rows = self.rows(kind).await?;
        let sheet = kind.sheet_name();

        info!(sheet = %sheet, "Writing workloads to sheet");
        workbook.add_sheet(sheet, ReportRow::headers(kind));
        workbook.write_rows(sheet, rows.iter().map(ReportRow::cells).collect())?;
        Ok(rows.len())
    }

    /// Write several kinds in order, stopping at the first failure
    pub async fn write_all(
        &self,
        kinds: &[WorkloadKind],
        workbook: &mut Workbook,
    ) -> Result<usize> {
        let mut total = 0;
        for kind in kinds {
            total += self.write_sheet(*kind, workbook).await?;
        }
        info!(rows = total, sheets = kinds.len(), "Report generated");
        Ok(total)
    }
}
