//! Domain model for reported workloads
//!
//! Cluster objects are converted once into [`Workload`] values. Quantities
//! are parsed during conversion so the aggregation and classification steps
//! work on typed values and never touch the source objects.

use crate::error::Result;
use crate::quantity::{ResourceKind, ResourceQuantity};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Container, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::trace;

/// Workload kinds covered by the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadKind {
    Deployment,
    DaemonSet,
    StatefulSet,
    Job,
}

impl WorkloadKind {
    pub const ALL: [WorkloadKind; 4] = [
        WorkloadKind::Deployment,
        WorkloadKind::DaemonSet,
        WorkloadKind::StatefulSet,
        WorkloadKind::Job,
    ];

    /// Sheet the kind is written to
    pub fn sheet_name(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "Deployments",
            WorkloadKind::DaemonSet => "DaemonSets",
            WorkloadKind::StatefulSet => "Statefulsets",
            WorkloadKind::Job => "Jobs",
        }
    }

    /// Whether rows of this kind carry replica count columns
    pub fn has_replica_counts(&self) -> bool {
        !matches!(self, WorkloadKind::Job)
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkloadKind::Deployment => "Deployment",
            WorkloadKind::DaemonSet => "DaemonSet",
            WorkloadKind::StatefulSet => "StatefulSet",
            WorkloadKind::Job => "Job",
        };
        f.write_str(name)
    }
}

/// Declared quantities of one container's requests or limits
///
/// A key that is not declared is absent, which is different from zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceList {
    entries: BTreeMap<String, ResourceQuantity>,
}

impl ResourceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declared quantity
    pub fn with(mut self, kind: ResourceKind, quantity: ResourceQuantity) -> Self {
        self.entries.insert(kind.as_str().to_string(), quantity);
        self
    }

    pub fn get(&self, kind: ResourceKind) -> Option<&ResourceQuantity> {
        self.entries.get(kind.as_str())
    }

    /// True when nothing at all is declared, including other resource names
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parse an API resource map
    pub fn from_api(map: Option<&BTreeMap<String, Quantity>>) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (name, quantity) in map.into_iter().flatten() {
            entries.insert(name.clone(), ResourceQuantity::parse(name, &quantity.0)?);
        }
        Ok(Self { entries })
    }
}

/// Resources and image of a single container in a pod template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerResourceSpec {
    pub name: String,
    pub image: String,
    pub requests: ResourceList,
    pub limits: ResourceList,
}

impl ContainerResourceSpec {
    pub fn from_container(container: &Container) -> Result<Self> {
        let resources = container.resources.as_ref();
        let spec = Self {
            name: container.name.clone(),
            image: container.image.clone().unwrap_or_default(),
            requests: ResourceList::from_api(resources.and_then(|r| r.requests.as_ref()))?,
            limits: ResourceList::from_api(resources.and_then(|r| r.limits.as_ref()))?,
        };
        trace!(container = %spec.name, image = %spec.image, "Parsed container resources");
        Ok(spec)
    }
}

/// Replica counts shown for multi-replica kinds; `None` renders as "unknown"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaCounts {
    pub desired: Option<i32>,
    pub current: Option<i32>,
    pub ready: Option<i32>,
    pub up_to_date: Option<i32>,
    pub available: Option<i32>,
}

/// An owner reference, rendered as `Kind/name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRef {
    pub kind: String,
    pub name: String,
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.name)
    }
}

/// A workload reduced to the fields the report needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    pub kind: WorkloadKind,
    pub name: String,
    pub namespace: String,
    pub replicas: Option<ReplicaCounts>,
    pub node_selector: BTreeMap<String, String>,
    pub containers: Vec<ContainerResourceSpec>,
    pub owners: Vec<OwnerRef>,
}

impl Workload {
    pub fn from_deployment(deployment: &Deployment) -> Result<Self> {
        let spec = deployment.spec.as_ref();
        let status = deployment.status.as_ref();
        let replicas = ReplicaCounts {
            desired: spec.and_then(|s| s.replicas),
            current: status.map(|s| s.replicas.unwrap_or(0)),
            ready: status.map(|s| s.ready_replicas.unwrap_or(0)),
            up_to_date: status.map(|s| s.updated_replicas.unwrap_or(0)),
            available: status.map(|s| s.available_replicas.unwrap_or(0)),
        };
        Self::build(
            WorkloadKind::Deployment,
            &deployment.metadata,
            Some(replicas),
            spec.map(|s| &s.template),
        )
    }

    pub fn from_daemon_set(daemon_set: &DaemonSet) -> Result<Self> {
        let status = daemon_set.status.as_ref();
        let replicas = ReplicaCounts {
            desired: status.map(|s| s.desired_number_scheduled),
            current: status.map(|s| s.current_number_scheduled),
            ready: status.map(|s| s.number_ready),
            up_to_date: status.map(|s| s.updated_number_scheduled.unwrap_or(0)),
            available: status.map(|s| s.number_available.unwrap_or(0)),
        };
        Self::build(
            WorkloadKind::DaemonSet,
            &daemon_set.metadata,
            Some(replicas),
            daemon_set.spec.as_ref().map(|s| &s.template),
        )
    }

    pub fn from_stateful_set(stateful_set: &StatefulSet) -> Result<Self> {
        let spec = stateful_set.spec.as_ref();
        let status = stateful_set.status.as_ref();
        let replicas = ReplicaCounts {
            desired: spec.and_then(|s| s.replicas),
            current: status.map(|s| s.replicas),
            ready: status.map(|s| s.ready_replicas.unwrap_or(0)),
            up_to_date: status.map(|s| s.updated_replicas.unwrap_or(0)),
            available: status.map(|s| s.available_replicas.unwrap_or(0)),
        };
        Self::build(
            WorkloadKind::StatefulSet,
            &stateful_set.metadata,
            Some(replicas),
            spec.map(|s| &s.template),
        )
    }

    pub fn from_job(job: &Job) -> Result<Self> {
        Self::build(
            WorkloadKind::Job,
            &job.metadata,
            None,
            job.spec.as_ref().map(|s| &s.template),
        )
    }

    fn build(
        kind: WorkloadKind,
        metadata: &ObjectMeta,
        replicas: Option<ReplicaCounts>,
        template: Option<&PodTemplateSpec>,
    ) -> Result<Self> {
        let pod_spec = template.and_then(|t| t.spec.as_ref());
        let containers = pod_spec
            .map(|spec| {
                spec.containers
                    .iter()
                    .map(ContainerResourceSpec::from_container)
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let owners = metadata
            .owner_references
            .iter()
            .flatten()
            .map(|owner| OwnerRef {
                kind: owner.kind.clone(),
                name: owner.name.clone(),
            })
            .collect();

        Ok(Self {
            kind,
            name: metadata.name.clone().unwrap_or_default(),
            namespace: metadata.namespace.clone().unwrap_or_default(),
            replicas,
            node_selector: pod_spec
                .and_then(|spec| spec.node_selector.clone())
                .unwrap_or_default(),
            containers,
            owners,
        })
    }
}
