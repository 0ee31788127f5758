//! Resource aggregation across a pod template's containers

use crate::defaults::{BoundKind, LimitRangeSource, NamespaceDefaultResolver};
use crate::error::Result;
use crate::format::{format_cpu, format_memory};
use crate::qos::QosClass;
use crate::quantity::{ResourceKind, ResourceQuantity};
use crate::workload::ContainerResourceSpec;
use tracing::{debug, trace};

/// Summed requests and limits of one workload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregatedResources {
    pub cpu_request: ResourceQuantity,
    pub memory_request: ResourceQuantity,
    pub cpu_limit: ResourceQuantity,
    pub memory_limit: ResourceQuantity,
}

impl AggregatedResources {
    pub fn get(&self, kind: ResourceKind, bound: BoundKind) -> ResourceQuantity {
        match (kind, bound) {
            (ResourceKind::Cpu, BoundKind::Request) => self.cpu_request,
            (ResourceKind::Memory, BoundKind::Request) => self.memory_request,
            (ResourceKind::Cpu, BoundKind::Limit) => self.cpu_limit,
            (ResourceKind::Memory, BoundKind::Limit) => self.memory_limit,
        }
    }

    fn slot(&mut self, kind: ResourceKind, bound: BoundKind) -> &mut ResourceQuantity {
        match (kind, bound) {
            (ResourceKind::Cpu, BoundKind::Request) => &mut self.cpu_request,
            (ResourceKind::Memory, BoundKind::Request) => &mut self.memory_request,
            (ResourceKind::Cpu, BoundKind::Limit) => &mut self.cpu_limit,
            (ResourceKind::Memory, BoundKind::Limit) => &mut self.memory_limit,
        }
    }

    /// CPU limit minus CPU request; may be negative
    pub fn cpu_diff(&self) -> ResourceQuantity {
        self.cpu_limit - self.cpu_request
    }

    /// Memory limit minus memory request; may be negative
    pub fn memory_diff(&self) -> ResourceQuantity {
        self.memory_limit - self.memory_request
    }

    /// True when the memory limit is strictly more than twice the request
    pub fn memory_over_provisioned(&self) -> bool {
        self.memory_limit.milli_value() > 2 * self.memory_request.milli_value()
    }
}

/// Sum the declared requests and limits of all containers
///
/// Keys a container does not declare contribute nothing.
pub fn sum_declared(containers: &[ContainerResourceSpec]) -> AggregatedResources {
    let mut totals = AggregatedResources::default();

    for container in containers {
        for kind in ResourceKind::ALL {
            for (bound, list) in [
                (BoundKind::Request, &container.requests),
                (BoundKind::Limit, &container.limits),
            ] {
                match list.get(kind) {
                    Some(quantity) => *totals.slot(kind, bound) += *quantity,
                    None => trace!(
                        container = %container.name,
                        resource = %kind,
                        bound = %bound,
                        "No value specified for container"
                    ),
                }
            }
        }
    }

    totals
}

/// Aggregate a workload's containers, filling zero totals from namespace defaults
///
/// Each of the four totals is checked independently: a total that is exactly
/// zero after summing is replaced by the namespace default for that resource
/// and bound. Lookup failures follow the resolver's policy.
pub async fn aggregate<S: LimitRangeSource>(
    containers: &[ContainerResourceSpec],
    namespace: &str,
    resolver: &NamespaceDefaultResolver<S>,
) -> Result<AggregatedResources> {
    let mut totals = sum_declared(containers);

    for kind in ResourceKind::ALL {
        for bound in [BoundKind::Request, BoundKind::Limit] {
            if totals.get(kind, bound).is_zero() {
                debug!(
                    namespace = %namespace,
                    resource = %kind,
                    bound = %bound,
                    "Total is zero, getting namespace default"
                );
                *totals.slot(kind, bound) =
                    resolver.effective_default(namespace, kind, bound).await?;
            }
        }
    }

    debug!(
        cpu_requests = %format_cpu(&totals.cpu_request),
        memory_requests = %format_memory(&totals.memory_request),
        cpu_limits = %format_cpu(&totals.cpu_limit),
        memory_limits = %format_memory(&totals.memory_limit),
        cpu_diff = %format_cpu(&totals.cpu_diff()),
        memory_diff = %format_memory(&totals.memory_diff()),
        "Extracted resources"
    );
    if totals.memory_over_provisioned() {
        debug!(namespace = %namespace, "Memory limit is more than twice the request");
    }

    Ok(totals)
}

/// Resource posture of one workload, derived fresh for each report row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadResourceProfile {
    pub resources: AggregatedResources,
    pub qos_class: QosClass,
}

impl WorkloadResourceProfile {
    /// Aggregate and classify a workload's containers
    pub async fn compute<S: LimitRangeSource>(
        containers: &[ContainerResourceSpec],
        namespace: &str,
        resolver: &NamespaceDefaultResolver<S>,
    ) -> Result<Self> {
        let resources = aggregate(containers, namespace, resolver).await?;
        Ok(Self {
            resources,
            qos_class: crate::qos::classify(containers),
        })
    }

    pub fn cpu_requests(&self) -> String {
        format_cpu(&self.resources.cpu_request)
    }

    pub fn memory_requests(&self) -> String {
        format_memory(&self.resources.memory_request)
    }

    pub fn cpu_limits(&self) -> String {
        format_cpu(&self.resources.cpu_limit)
    }

    pub fn memory_limits(&self) -> String {
        format_memory(&self.resources.memory_limit)
    }

    pub fn cpu_diff(&self) -> String {
        format_cpu(&self.resources.cpu_diff())
    }

    pub fn memory_diff(&self) -> String {
        format_memory(&self.resources.memory_diff())
    }

    pub fn memory_over_provisioned(&self) -> bool {
        self.resources.memory_over_provisioned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::tests::{limit_range, StaticLimitRanges};
    use crate::defaults::DefaultsPolicy;
    use crate::workload::ResourceList;
    use serde_json::json;

    fn q(s: &str) -> ResourceQuantity {
        s.parse().unwrap()
    }

    fn container(
        name: &str,
        requests: &[(ResourceKind, &str)],
        limits: &[(ResourceKind, &str)],
    ) -> ContainerResourceSpec {
        let list = |entries: &[(ResourceKind, &str)]| {
            entries
                .iter()
                .fold(ResourceList::new(), |list, (kind, value)| list.with(*kind, q(value)))
        };
        ContainerResourceSpec {
            name: name.to_string(),
            image: format!("{}:1.0", name),
            requests: list(requests),
            limits: list(limits),
        }
    }

    fn no_defaults() -> NamespaceDefaultResolver<StaticLimitRanges> {
        NamespaceDefaultResolver::new(StaticLimitRanges::new(), DefaultsPolicy::Fail)
    }

    #[test]
    fn test_sum_skips_absent_keys() {
        let containers = vec![
            container("a", &[(ResourceKind::Cpu, "100m")], &[(ResourceKind::Memory, "128Mi")]),
            container("b", &[(ResourceKind::Cpu, "250m"), (ResourceKind::Memory, "64Mi")], &[]),
        ];
        let totals = sum_declared(&containers);
        assert_eq!(totals.cpu_request, q("350m"));
        assert_eq!(totals.memory_request, q("64Mi"));
        assert!(totals.cpu_limit.is_zero());
        assert_eq!(totals.memory_limit, q("128Mi"));
    }

    #[test]
    fn test_sum_is_order_independent() {
        let containers = vec![
            container("a", &[(ResourceKind::Cpu, "100m")], &[(ResourceKind::Cpu, "1")]),
            container("b", &[(ResourceKind::Memory, "1Gi")], &[(ResourceKind::Memory, "2Gi")]),
            container("c", &[(ResourceKind::Cpu, "1.5")], &[]),
        ];
        let expected = sum_declared(&containers);

        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let permuted: Vec<_> = order.iter().map(|&i| containers[i].clone()).collect();
            assert_eq!(sum_declared(&permuted), expected, "order {:?}", order);
        }
    }

    #[tokio::test]
    async fn test_namespace_default_fills_missing_cpu_request() {
        let source = StaticLimitRanges::new().with(
            "ns1",
            limit_range(json!([{ "type": "Container", "defaultRequest": { "cpu": "100m" } }])),
        );
        let resolver = NamespaceDefaultResolver::new(source, DefaultsPolicy::Fail);
        let containers = vec![container("w1", &[(ResourceKind::Memory, "64Mi")], &[])];

        let profile = WorkloadResourceProfile::compute(&containers, "ns1", &resolver)
            .await
            .unwrap();
        assert_eq!(profile.cpu_requests(), "100m");
        assert_eq!(profile.memory_requests(), "64Mi");
        assert_eq!(profile.cpu_limits(), "0m");
    }

    #[tokio::test]
    async fn test_declared_total_is_never_replaced_by_default() {
        let source = StaticLimitRanges::new().with(
            "ns1",
            limit_range(json!([{ "type": "Container", "defaultRequest": { "cpu": "1" } }])),
        );
        let resolver = NamespaceDefaultResolver::new(source, DefaultsPolicy::Fail);
        // Only one of the two containers declares a CPU request
        let containers = vec![
            container("a", &[(ResourceKind::Cpu, "200m")], &[]),
            container("b", &[], &[]),
        ];

        let totals = aggregate(&containers, "ns1", &resolver).await.unwrap();
        assert_eq!(totals.cpu_request, q("200m"));
    }

    #[tokio::test]
    async fn test_zero_containers_use_all_defaults() {
        let source = StaticLimitRanges::new().with(
            "ns1",
            limit_range(json!([{
                "type": "Container",
                "defaultRequest": { "cpu": "100m", "memory": "128Mi" },
                "default": { "cpu": "200m", "memory": "512Mi" }
            }])),
        );
        let resolver = NamespaceDefaultResolver::new(source, DefaultsPolicy::Fail);

        let totals = aggregate(&[], "ns1", &resolver).await.unwrap();
        assert_eq!(totals.cpu_request, q("100m"));
        assert_eq!(totals.memory_request, q("128Mi"));
        assert_eq!(totals.cpu_limit, q("200m"));
        assert_eq!(totals.memory_limit, q("512Mi"));
        // 512Mi > 2 x 128Mi, computed after substitution
        assert!(totals.memory_over_provisioned());
    }

    #[tokio::test]
    async fn test_guaranteed_workload_has_zero_diffs() {
        let containers = vec![container(
            "w2",
            &[(ResourceKind::Cpu, "200m"), (ResourceKind::Memory, "256Mi")],
            &[(ResourceKind::Cpu, "200m"), (ResourceKind::Memory, "256Mi")],
        )];

        let profile = WorkloadResourceProfile::compute(&containers, "default", &no_defaults())
            .await
            .unwrap();
        assert_eq!(profile.qos_class, QosClass::Guaranteed);
        assert_eq!(profile.cpu_diff(), "0m");
        assert_eq!(profile.memory_diff(), "0Mi");
        assert!(!profile.memory_over_provisioned());
    }

    #[tokio::test]
    async fn test_memory_over_provisioned_is_strict() {
        let w3 = vec![container(
            "w3",
            &[(ResourceKind::Memory, "100Mi")],
            &[(ResourceKind::Memory, "300Mi")],
        )];
        let profile = WorkloadResourceProfile::compute(&w3, "default", &no_defaults())
            .await
            .unwrap();
        assert_eq!(profile.memory_diff(), "200Mi");
        assert!(profile.memory_over_provisioned());

        let exactly_double = vec![container(
            "edge",
            &[(ResourceKind::Memory, "100Mi")],
            &[(ResourceKind::Memory, "200Mi")],
        )];
        let profile = WorkloadResourceProfile::compute(&exactly_double, "default", &no_defaults())
            .await
            .unwrap();
        assert!(!profile.memory_over_provisioned());
    }

    #[tokio::test]
    async fn test_negative_diff_keeps_sign() {
        let containers = vec![container(
            "inverted",
            &[(ResourceKind::Cpu, "500m"), (ResourceKind::Memory, "512Mi")],
            &[(ResourceKind::Cpu, "250m"), (ResourceKind::Memory, "256Mi")],
        )];
        let profile = WorkloadResourceProfile::compute(&containers, "default", &no_defaults())
            .await
            .unwrap();
        assert_eq!(profile.cpu_diff(), "-250m");
        assert_eq!(profile.memory_diff(), "-256Mi");
    }

    #[tokio::test]
    async fn test_default_lookup_failure_follows_policy() {
        let source = StaticLimitRanges::new().fail("locked", "connection refused");
        let containers = vec![container("a", &[], &[])];

        let degrade = NamespaceDefaultResolver::new(source.clone(), DefaultsPolicy::Degrade);
        let totals = aggregate(&containers, "locked", &degrade).await.unwrap();
        assert_eq!(totals, AggregatedResources::default());

        let fail = NamespaceDefaultResolver::new(source, DefaultsPolicy::Fail);
        assert!(aggregate(&containers, "locked", &fail).await.is_err());
    }
}
