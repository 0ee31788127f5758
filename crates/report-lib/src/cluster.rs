//! Kubernetes API collaborators
//!
//! Thin wrappers over `kube` that list workloads and limit ranges and map
//! API failures onto [`ReportError`]. A 404 is the absence signal; every
//! other failure is a fetch error.

use crate::defaults::LimitRangeSource;
use crate::error::{ReportError, Result};
use crate::report::WorkloadSource;
use crate::workload::{Workload, WorkloadKind};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::LimitRange;
use k8s_openapi::NamespaceResourceScope;
use kube::api::ListParams;
use kube::{Api, Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, error, info};

/// Lists workloads from the cluster
#[derive(Clone)]
pub struct ClusterClient {
    client: Client,
}

impl ClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Limit range source sharing this client
    pub fn limit_ranges(&self) -> KubeLimitRanges {
        KubeLimitRanges::new(self.client.clone())
    }

    /// List objects of a namespaced kind in one namespace, or in all of them
    pub async fn list<K>(&self, namespace: Option<&str>) -> Result<Vec<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let kind = K::kind(&Default::default()).to_string();
        let api: Api<K> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };

        let list = api.list(&ListParams::default()).await.map_err(|e| {
            error!(kind = %kind, error = %e, "Failed to list objects");
            map_api_error(e, kind.clone(), namespace.unwrap_or("*"))
        })?;

        info!(kind = %kind, count = list.items.len(), "Fetched objects");
        Ok(list.items)
    }
}

#[async_trait]
impl WorkloadSource for ClusterClient {
    async fn workloads(
        &self,
        kind: WorkloadKind,
        namespace: Option<&str>,
    ) -> Result<Vec<Workload>> {
        match kind {
            WorkloadKind::Deployment => self
                .list::<Deployment>(namespace)
                .await?
                .iter()
                .map(Workload::from_deployment)
                .collect(),
            WorkloadKind::DaemonSet => self
                .list::<DaemonSet>(namespace)
                .await?
                .iter()
                .map(Workload::from_daemon_set)
                .collect(),
            WorkloadKind::StatefulSet => self
                .list::<StatefulSet>(namespace)
                .await?
                .iter()
                .map(Workload::from_stateful_set)
                .collect(),
            WorkloadKind::Job => self
                .list::<Job>(namespace)
                .await?
                .iter()
                .map(Workload::from_job)
                .collect(),
        }
    }
}

/// Limit ranges read through the Kubernetes API
#[derive(Clone)]
pub struct KubeLimitRanges {
    client: Client,
}

impl KubeLimitRanges {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LimitRangeSource for KubeLimitRanges {
    async fn limit_ranges(&self, namespace: &str) -> Result<Vec<LimitRange>> {
        let api: Api<LimitRange> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| map_api_error(e, "LimitRange".to_string(), namespace))?;

        debug!(namespace = %namespace, count = list.items.len(), "Fetched LimitRanges");
        Ok(list.items)
    }
}

fn map_api_error(err: kube::Error, what: String, namespace: &str) -> ReportError {
    match err {
        kube::Error::Api(response) if response.code == 404 => ReportError::NotFound {
            what,
            namespace: namespace.to_string(),
        },
        other => ReportError::fetch(format!("{} in namespace {}", what, namespace), other),
    }
}
