//! Namespace default requests and limits
//!
//! Defaults come from the `Container` entries of a namespace's limit range.
//! Only the first limit range returned for a namespace is consulted.
//! A missing limit range or a missing default is not an error: it resolves
//! to a zero quantity. Other lookup failures are handled according to the
//! configured [`DefaultsPolicy`].

use crate::error::Result;
use crate::format::format_quantity;
use crate::quantity::{ResourceKind, ResourceQuantity};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::LimitRange;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Limit range item type that scopes defaults to containers
pub const CONTAINER_LIMIT_TYPE: &str = "Container";

/// Whether a default is looked up for a request or a limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundKind {
    Request,
    Limit,
}

impl fmt::Display for BoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundKind::Request => f.write_str("request"),
            BoundKind::Limit => f.write_str("limit"),
        }
    }
}

/// What to do when a default lookup fails for a reason other than absence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultsPolicy {
    /// Log a warning and use a zero quantity
    #[default]
    Degrade,
    /// Propagate the error and abort the report
    Fail,
}

impl FromStr for DefaultsPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "degrade" => Ok(DefaultsPolicy::Degrade),
            "fail" => Ok(DefaultsPolicy::Fail),
            other => Err(format!(
                "unknown policy {:?}, expected \"degrade\" or \"fail\"",
                other
            )),
        }
    }
}

/// Source of namespace limit ranges
#[async_trait]
pub trait LimitRangeSource: Send + Sync {
    /// List the limit ranges of a namespace
    ///
    /// Returns [`crate::error::ReportError::NotFound`] when the namespace has
    /// none to offer and [`crate::error::ReportError::Fetch`] for any other
    /// failure.
    async fn limit_ranges(&self, namespace: &str) -> Result<Vec<LimitRange>>;
}

/// Container defaults configured for a namespace; each may be unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceDefaults {
    pub default_cpu_request: Option<ResourceQuantity>,
    pub default_memory_request: Option<ResourceQuantity>,
    pub default_cpu_limit: Option<ResourceQuantity>,
    pub default_memory_limit: Option<ResourceQuantity>,
}

impl NamespaceDefaults {
    /// Extract container defaults from a limit range
    ///
    /// When several `Container` items set the same default, the first wins.
    pub fn from_limit_range(limit_range: &LimitRange) -> Result<Self> {
        let mut defaults = Self::default();
        let items = limit_range.spec.iter().flat_map(|spec| spec.limits.iter());

        for item in items.filter(|item| item.type_ == CONTAINER_LIMIT_TYPE) {
            for kind in ResourceKind::ALL {
                if let Some(q) = lookup(item.default_request.as_ref(), kind)? {
                    defaults.slot(kind, BoundKind::Request).get_or_insert(q);
                }
                if let Some(q) = lookup(item.default.as_ref(), kind)? {
                    defaults.slot(kind, BoundKind::Limit).get_or_insert(q);
                }
            }
        }

        Ok(defaults)
    }

    pub fn get(&self, kind: ResourceKind, bound: BoundKind) -> Option<ResourceQuantity> {
        match (kind, bound) {
            (ResourceKind::Cpu, BoundKind::Request) => self.default_cpu_request,
            (ResourceKind::Memory, BoundKind::Request) => self.default_memory_request,
            (ResourceKind::Cpu, BoundKind::Limit) => self.default_cpu_limit,
            (ResourceKind::Memory, BoundKind::Limit) => self.default_memory_limit,
        }
    }

    fn slot(&mut self, kind: ResourceKind, bound: BoundKind) -> &mut Option<ResourceQuantity> {
        match (kind, bound) {
            (ResourceKind::Cpu, BoundKind::Request) => &mut self.default_cpu_request,
            (ResourceKind::Memory, BoundKind::Request) => &mut self.default_memory_request,
            (ResourceKind::Cpu, BoundKind::Limit) => &mut self.default_cpu_limit,
            (ResourceKind::Memory, BoundKind::Limit) => &mut self.default_memory_limit,
        }
    }
}

fn lookup(
    map: Option<&BTreeMap<String, Quantity>>,
    kind: ResourceKind,
) -> Result<Option<ResourceQuantity>> {
    map.and_then(|m| m.get(kind.as_str()))
        .map(|q| ResourceQuantity::parse(kind.as_str(), &q.0))
        .transpose()
}

/// Resolves namespace defaults for the aggregator
pub struct NamespaceDefaultResolver<S> {
    source: S,
    policy: DefaultsPolicy,
}

impl<S: LimitRangeSource> NamespaceDefaultResolver<S> {
    pub fn new(source: S, policy: DefaultsPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> DefaultsPolicy {
        self.policy
    }

    /// Fetch the container defaults of a namespace
    ///
    /// Absence of a limit range yields empty defaults. Fetch failures and
    /// unparseable default quantities are returned as errors.
    pub async fn namespace_defaults(&self, namespace: &str) -> Result<NamespaceDefaults> {
        let limit_ranges = match self.source.limit_ranges(namespace).await {
            Ok(ranges) => ranges,
            Err(e) if e.is_not_found() => {
                info!(namespace = %namespace, "No LimitRange found in namespace");
                return Ok(NamespaceDefaults::default());
            }
            Err(e) => return Err(e),
        };

        match limit_ranges.first() {
            Some(first) => {
                if limit_ranges.len() > 1 {
                    debug!(
                        namespace = %namespace,
                        count = limit_ranges.len(),
                        "Multiple LimitRanges found, using the first"
                    );
                }
                NamespaceDefaults::from_limit_range(first)
            }
            None => {
                info!(namespace = %namespace, "No LimitRange items found in namespace");
                Ok(NamespaceDefaults::default())
            }
        }
    }

    /// Resolve one default, returning zero when it is not configured
    pub async fn resolve_default(
        &self,
        namespace: &str,
        kind: ResourceKind,
        bound: BoundKind,
    ) -> Result<ResourceQuantity> {
        let defaults = self.namespace_defaults(namespace).await?;
        match defaults.get(kind, bound) {
            Some(quantity) => {
                debug!(
                    namespace = %namespace,
                    resource = %kind,
                    bound = %bound,
                    default = %format_quantity(&quantity, kind),
                    "Resolved namespace default"
                );
                Ok(quantity)
            }
            None => {
                info!(
                    namespace = %namespace,
                    resource = %kind,
                    bound = %bound,
                    "Default not found in namespace"
                );
                Ok(ResourceQuantity::zero())
            }
        }
    }

    /// Resolve one default and apply the failure policy
    pub async fn effective_default(
        &self,
        namespace: &str,
        kind: ResourceKind,
        bound: BoundKind,
    ) -> Result<ResourceQuantity> {
        match self.resolve_default(namespace, kind, bound).await {
            Ok(quantity) => Ok(quantity),
            Err(e) if self.policy == DefaultsPolicy::Degrade => {
                warn!(
                    namespace = %namespace,
                    resource = %kind,
                    bound = %bound,
                    error = %e,
                    "Namespace default lookup failed, using zero"
                );
                Ok(ResourceQuantity::zero())
            }
            Err(e) => Err(e),
        }
    }
}
