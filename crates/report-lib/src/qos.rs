//! Quality-of-service classification of pod templates
//!
//! Classification only looks at the values each container declares;
//! namespace defaults never take part.

use crate::quantity::ResourceKind;
use crate::workload::ContainerResourceSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// QoS tier of a workload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QosClass {
    Guaranteed,
    Burstable,
    BestEffort,
}

impl QosClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            QosClass::Guaranteed => "Guaranteed",
            QosClass::Burstable => "Burstable",
            QosClass::BestEffort => "BestEffort",
        }
    }
}

impl fmt::Display for QosClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a workload from its containers' declared requests and limits
///
/// `Guaranteed` requires every container to declare CPU and memory limits
/// that numerically equal its requests. Otherwise the workload is
/// `Burstable` if any container requests CPU or memory, else `BestEffort`.
pub fn classify(containers: &[ContainerResourceSpec]) -> QosClass {
    let mut guaranteed = true;
    let mut burstable = false;

    for container in containers {
        let requests = &container.requests;
        let limits = &container.limits;

        if requests.is_empty() && limits.is_empty() {
            guaranteed = false;
            continue;
        }

        for kind in ResourceKind::ALL {
            let request = requests.get(kind);
            if request.is_some() {
                burstable = true;
            }
            match (request, limits.get(kind)) {
                (Some(request), Some(limit)) if request == limit => {}
                _ => guaranteed = false,
            }
        }
    }

    if guaranteed {
        QosClass::Guaranteed
    } else if burstable {
        QosClass::Burstable
    } else {
        QosClass::BestEffort
    }
}
