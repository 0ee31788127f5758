//! Quantity rendering for report cells

use crate::quantity::{ResourceKind, ResourceQuantity};

/// Format a CPU quantity as whole millicores, e.g. `250m`
pub fn format_cpu(quantity: &ResourceQuantity) -> String {
    format!("{}m", quantity.milli_value())
}

/// Format a memory quantity in mebibytes, e.g. `256Mi`
///
/// Values that are not whole mebibytes are rounded up in magnitude.
/// Negative differences keep their sign.
pub fn format_memory(quantity: &ResourceQuantity) -> String {
    format!("{}Mi", quantity.mebibytes())
}

/// Format a quantity with the rule for its resource kind
pub fn format_quantity(quantity: &ResourceQuantity, kind: ResourceKind) -> String {
    match kind {
        ResourceKind::Cpu => format_cpu(quantity),
        ResourceKind::Memory => format_memory(quantity),
    }
}
