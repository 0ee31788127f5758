//! Workload resource reporting library
//!
//! This crate provides the core functionality for:
//! - Parsing and summing Kubernetes resource quantities
//! - Resolving namespace default requests/limits from limit ranges
//! - Aggregating container requests/limits per workload
//! - QoS classification of pod templates
//! - Building report rows and writing them to a workbook

pub mod aggregate;
pub mod cluster;
pub mod defaults;
pub mod error;
pub mod format;
pub mod qos;
pub mod quantity;
pub mod report;
pub mod rows;
pub mod workbook;
pub mod workload;

pub use aggregate::{aggregate, sum_declared, AggregatedResources, WorkloadResourceProfile};
pub use cluster::{ClusterClient, KubeLimitRanges};
pub use defaults::{
    BoundKind, DefaultsPolicy, LimitRangeSource, NamespaceDefaultResolver, NamespaceDefaults,
};
pub use error::{ReportError, Result};
pub use qos::{classify, QosClass};
pub use quantity::{ResourceKind, ResourceQuantity};
pub use report::{ReportGenerator, WorkloadSource};
pub use rows::{ReportRow, RowBuilder};
pub use workbook::{Sheet, Workbook, DEFAULT_REPORT_FILE};
pub use workload::{ContainerResourceSpec, Workload, WorkloadKind};
