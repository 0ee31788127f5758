//! Report rows, one per workload
//!
//! Column order is fixed per workload kind. Multi-replica kinds carry the
//! replica count columns; jobs do not.

use crate::aggregate::WorkloadResourceProfile;
use crate::defaults::{LimitRangeSource, NamespaceDefaultResolver};
use crate::error::Result;
use crate::qos::QosClass;
use crate::workload::{ContainerResourceSpec, OwnerRef, ReplicaCounts, Workload, WorkloadKind};
use std::borrow::Cow;
use std::collections::BTreeMap;
use tabled::Tabled;

/// Tag reported for images without an explicit tag
pub const DEFAULT_IMAGE_TAG: &str = "latest";

const UNKNOWN_COUNT: &str = "unknown";

/// Replica count columns
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct ReplicaColumns {
    #[tabled(rename = "Desired")]
    pub desired: String,
    #[tabled(rename = "Current")]
    pub current: String,
    #[tabled(rename = "Ready")]
    pub ready: String,
    #[tabled(rename = "Up-to-date")]
    pub up_to_date: String,
    #[tabled(rename = "Available")]
    pub available: String,
}

impl From<&ReplicaCounts> for ReplicaColumns {
    fn from(counts: &ReplicaCounts) -> Self {
        let render = |count: Option<i32>| {
            count
                .map(|c| c.to_string())
                .unwrap_or_else(|| UNKNOWN_COUNT.to_string())
        };
        Self {
            desired: render(counts.desired),
            current: render(counts.current),
            ready: render(counts.ready),
            up_to_date: render(counts.up_to_date),
            available: render(counts.available),
        }
    }
}

/// Pod template columns shared by every kind
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct TemplateColumns {
    #[tabled(rename = "Node Selector")]
    pub node_selector: String,
    #[tabled(rename = "CPU Requests")]
    pub cpu_requests: String,
    #[tabled(rename = "Memory Requests")]
    pub memory_requests: String,
    #[tabled(rename = "CPU Limits")]
    pub cpu_limits: String,
    #[tabled(rename = "Memory Limits")]
    pub memory_limits: String,
    #[tabled(rename = "CPU Diff")]
    pub cpu_diff: String,
    #[tabled(rename = "Memory Diff")]
    pub memory_diff: String,
    #[tabled(rename = "Memory diff > 2 x Request")]
    pub memory_over_provisioned: bool,
    #[tabled(rename = "Image Versions")]
    pub image_versions: String,
    #[tabled(rename = "QoS Class")]
    pub qos_class: QosClass,
}

impl TemplateColumns {
    pub fn new(workload: &Workload, profile: &WorkloadResourceProfile) -> Self {
        Self {
            node_selector: format_node_selector(&workload.node_selector),
            cpu_requests: profile.cpu_requests(),
            memory_requests: profile.memory_requests(),
            cpu_limits: profile.cpu_limits(),
            memory_limits: profile.memory_limits(),
            cpu_diff: profile.cpu_diff(),
            memory_diff: profile.memory_diff(),
            memory_over_provisioned: profile.memory_over_provisioned(),
            image_versions: image_versions(&workload.containers),
            qos_class: profile.qos_class,
        }
    }
}

/// Row for deployments, daemon sets and stateful sets
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct ReplicatedRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Namespace")]
    pub namespace: String,
    #[tabled(inline)]
    pub replicas: ReplicaColumns,
    #[tabled(inline)]
    pub template: TemplateColumns,
    #[tabled(rename = "Owner")]
    pub owner: String,
}

/// Row for jobs
#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct JobRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Namespace")]
    pub namespace: String,
    #[tabled(inline)]
    pub template: TemplateColumns,
    #[tabled(rename = "Owner")]
    pub owner: String,
}

/// A row of either shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRow {
    Replicated(ReplicatedRow),
    Job(JobRow),
}

impl ReportRow {
    /// Column headers for a workload kind
    pub fn headers(kind: WorkloadKind) -> Vec<String> {
        let headers: Vec<Cow<'static, str>> = if kind.has_replica_counts() {
            ReplicatedRow::headers()
        } else {
            JobRow::headers()
        };
        headers.into_iter().map(Cow::into_owned).collect()
    }

    /// Cell values in header order
    pub fn cells(&self) -> Vec<String> {
        let fields = match self {
            ReportRow::Replicated(row) => row.fields(),
            ReportRow::Job(row) => row.fields(),
        };
        fields.into_iter().map(Cow::into_owned).collect()
    }

    pub fn name(&self) -> &str {
        match self {
            ReportRow::Replicated(row) => &row.name,
            ReportRow::Job(row) => &row.name,
        }
    }
}

/// Builds report rows, resolving namespace defaults as needed
pub struct RowBuilder<'a, S> {
    resolver: &'a NamespaceDefaultResolver<S>,
}

impl<'a, S: LimitRangeSource> RowBuilder<'a, S> {
    pub fn new(resolver: &'a NamespaceDefaultResolver<S>) -> Self {
        Self { resolver }
    }

    /// Compose the row for one workload
    pub async fn build(&self, workload: &Workload) -> Result<ReportRow> {
        let profile = WorkloadResourceProfile::compute(
            &workload.containers,
            &workload.namespace,
            self.resolver,
        )
        .await?;
        let template = TemplateColumns::new(workload, &profile);
        let owner = format_owners(&workload.owners);

        let row = if workload.kind.has_replica_counts() {
            let counts = workload.replicas.clone().unwrap_or_default();
            ReportRow::Replicated(ReplicatedRow {
                name: workload.name.clone(),
                namespace: workload.namespace.clone(),
                replicas: ReplicaColumns::from(&counts),
                template,
                owner,
            })
        } else {
            ReportRow::Job(JobRow {
                name: workload.name.clone(),
                namespace: workload.namespace.clone(),
                template,
                owner,
            })
        };

        Ok(row)
    }
}

/// Render a node selector as `key=value` pairs in key order
pub fn format_node_selector(node_selector: &BTreeMap<String, String>) -> String {
    node_selector
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extract the version of an image reference
///
/// The tag is the text after the last `:` that follows the last `/`, so a
/// registry port is never taken for a tag. A digest is reported only when
/// there is no tag; references with neither report `latest`.
///
/// This departs from a plain "text after the last `:`" rule on purpose:
/// `registry.io:5000/app` gives `latest` rather than `5000/app`,
/// `app@sha256:abcd` gives the digest, and an empty tag (`app:`) gives
/// `latest`.
pub fn image_version(image: &str) -> String {
    let (name, digest) = match image.split_once('@') {
        Some((name, digest)) => (name, Some(digest)),
        None => (image, None),
    };
    let last_segment = name.rsplit('/').next().unwrap_or(name);

    match (last_segment.rsplit_once(':'), digest) {
        (Some((_, tag)), _) if !tag.is_empty() => tag.to_string(),
        (_, Some(digest)) if !digest.is_empty() => digest.to_string(),
        _ => DEFAULT_IMAGE_TAG.to_string(),
    }
}

/// Versions of all containers' images, in container order
pub fn image_versions(containers: &[ContainerResourceSpec]) -> String {
    containers
        .iter()
        .map(|c| image_version(&c.image))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_owners(owners: &[OwnerRef]) -> String {
    owners
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::tests::{limit_range, StaticLimitRanges};
    use crate::defaults::DefaultsPolicy;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::batch::v1::Job;
    use serde_json::json;

    #[test]
    fn test_image_version() {
        assert_eq!(image_version("nginx:1.25"), "1.25");
        assert_eq!(image_version("nginx"), "latest");
        assert_eq!(image_version("registry.io/app:v2:beta"), "beta");
        assert_eq!(image_version("registry.io:5000/team/app"), "latest");
        assert_eq!(image_version("registry.io:5000/team/app:3.1"), "3.1");
        assert_eq!(image_version("app@sha256:abcd"), "sha256:abcd");
        assert_eq!(image_version("app:2.0@sha256:abcd"), "2.0");
        assert_eq!(image_version("app:"), "latest");
        assert_eq!(image_version(""), "latest");
    }

    #[test]
    fn test_node_selector_is_sorted() {
        let selector: BTreeMap<String, String> = [("zone", "a"), ("disk", "ssd"), ("arch", "arm64")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(format_node_selector(&selector), "arch=arm64, disk=ssd, zone=a");
        assert_eq!(format_node_selector(&BTreeMap::new()), "");
    }

    #[test]
    fn test_headers_per_kind() {
        let headers = ReportRow::headers(WorkloadKind::Deployment);
        assert_eq!(
            headers,
            vec![
                "Name",
                "Namespace",
                "Desired",
                "Current",
                "Ready",
                "Up-to-date",
                "Available",
                "Node Selector",
                "CPU Requests",
                "Memory Requests",
                "CPU Limits",
                "Memory Limits",
                "CPU Diff",
                "Memory Diff",
                "Memory diff > 2 x Request",
                "Image Versions",
                "QoS Class",
                "Owner",
            ]
        );

        let job_headers = ReportRow::headers(WorkloadKind::Job);
        assert_eq!(job_headers.len(), headers.len() - 5);
        assert!(!job_headers.iter().any(|h| h == "Desired"));
    }

    #[tokio::test]
    async fn test_deployment_row() {
        let deployment: Deployment = serde_json::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": "web", "namespace": "ns1" },
            "spec": {
                "selector": {},
                "template": {
                    "spec": {
                        "nodeSelector": { "zone": "b", "disk": "ssd" },
                        "containers": [
                            {
                                "name": "web",
                                "image": "nginx:1.25",
                                "resources": {
                                    "requests": { "memory": "100Mi" },
                                    "limits": { "memory": "300Mi" }
                                }
                            },
                            { "name": "sidecar", "image": "envoy" }
                        ]
                    }
                }
            },
            "status": {
                "replicas": 2,
                "readyReplicas": 2,
                "updatedReplicas": 2,
                "availableReplicas": 2
            }
        }))
        .unwrap();

        let source = StaticLimitRanges::new().with(
            "ns1",
            limit_range(json!([{ "type": "Container", "defaultRequest": { "cpu": "100m" } }])),
        );
        let resolver = NamespaceDefaultResolver::new(source, DefaultsPolicy::Fail);
        let workload = Workload::from_deployment(&deployment).unwrap();
        let row = RowBuilder::new(&resolver).build(&workload).await.unwrap();

        assert_eq!(
            row.cells(),
            vec![
                "web",
                "ns1",
                "unknown",
                "2",
                "2",
                "2",
                "2",
                "disk=ssd, zone=b",
                "100m",
                "100Mi",
                "0m",
                "300Mi",
                "-100m",
                "200Mi",
                "true",
                "1.25, latest",
                "Burstable",
                "",
            ]
        );
    }

    #[tokio::test]
    async fn test_job_row() {
        let job: Job = serde_json::from_value(json!({
            "apiVersion": "batch/v1",
            "kind": "Job",
            "metadata": {
                "name": "report",
                "namespace": "batch",
                "ownerReferences": [{
                    "apiVersion": "batch/v1",
                    "kind": "CronJob",
                    "name": "nightly",
                    "uid": "42"
                }]
            },
            "spec": {
                "template": {
                    "spec": {
                        "containers": [{
                            "name": "report",
                            "image": "reporter:2",
                            "resources": {
                                "requests": { "cpu": "200m", "memory": "256Mi" },
                                "limits": { "cpu": "200m", "memory": "256Mi" }
                            }
                        }]
                    }
                }
            }
        }))
        .unwrap();

        let resolver =
            NamespaceDefaultResolver::new(StaticLimitRanges::new(), DefaultsPolicy::Fail);
        let workload = Workload::from_job(&job).unwrap();
        let row = RowBuilder::new(&resolver).build(&workload).await.unwrap();

        assert!(matches!(row, ReportRow::Job(_)));
        assert_eq!(row.name(), "report");
        let cells = row.cells();
        assert_eq!(cells.len(), ReportRow::headers(WorkloadKind::Job).len());
        assert_eq!(
            cells,
            vec![
                "report",
                "batch",
                "",
                "200m",
                "256Mi",
                "200m",
                "256Mi",
                "0m",
                "0Mi",
                "false",
                "2",
                "Guaranteed",
                "CronJob/nightly",
            ]
        );
    }
}
