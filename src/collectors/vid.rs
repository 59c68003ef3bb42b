//! Virtualization infrastructure driver partition counters, per virtual
//! machine.

use std::sync::Arc;

use crate::collector::TableCollector;
use crate::error::ConfigurationError;
use crate::mapping::{Cardinality, ClassTable, FieldMapping};
use crate::source::CounterSource;

/// Collector name.
pub const NAME: &str = "vid";

/// Counter classes read by the `vid` collector.
pub static CLASSES: &[ClassTable] = &[ClassTable {
    class: "Win32_PerfRawData_VidPerfProvider_HyperVVMVidPartition",
    subsystem: "vid",
    cardinality: Cardinality::PerInstance,
    fields: &[
        FieldMapping::gauge(
            "PhysicalPagesAllocated",
            "physical_pages_allocated",
            "Number of physical pages allocated",
        ),
        FieldMapping::gauge(
            "PreferredNUMANodeIndex",
            "preferred_numa_node_index",
            "Preferred NUMA node index associated with this partition",
        ),
        FieldMapping::gauge(
            "RemotePhysicalPages",
            "remote_physical_pages",
            "Number of physical pages not allocated from the preferred NUMA node",
        ),
    ],
}];

/// Builds the `vid` collector.
pub fn collector(source: Arc<dyn CounterSource>) -> Result<TableCollector, ConfigurationError> {
    TableCollector::new(source, CLASSES)
}
