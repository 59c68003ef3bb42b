//! Virtual machine health summary.

use std::sync::Arc;

use crate::collector::TableCollector;
use crate::error::ConfigurationError;
use crate::mapping::{Cardinality, ClassTable, FieldMapping};
use crate::source::CounterSource;

/// Collector name.
pub const NAME: &str = "health";

/// Counter classes read by the `health` collector.
pub static CLASSES: &[ClassTable] = &[ClassTable {
    class: "Win32_PerfRawData_VmmsVirtualMachineStats_HyperVVirtualMachineHealthSummary",
    subsystem: "health",
    cardinality: Cardinality::Single,
    fields: &[
        FieldMapping::gauge(
            "HealthCritical",
            "critical",
            "Number of virtual machines with critical health",
        ),
        FieldMapping::gauge("HealthOk", "ok", "Number of virtual machines with ok health"),
    ],
}];

/// Builds the `health` collector.
pub fn collector(source: Arc<dyn CounterSource>) -> Result<TableCollector, ConfigurationError> {
    TableCollector::new(source, CLASSES)
}
