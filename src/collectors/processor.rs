//! Hypervisor virtual processor run times, per virtual processor.

use std::sync::Arc;

use crate::collector::TableCollector;
use crate::error::ConfigurationError;
use crate::mapping::{Cardinality, ClassTable, FieldMapping};
use crate::source::CounterSource;

/// Collector name.
pub const NAME: &str = "processor";

/// Counter classes read by the `processor` collector.
pub static CLASSES: &[ClassTable] = &[
    ClassTable {
        class: "Win32_PerfRawData_HvStats_HyperVHypervisorVirtualProcessor",
        subsystem: "processor",
        cardinality: Cardinality::PerInstance,
        fields: &[
            FieldMapping::gauge(
                "PercentGuestRunTime",
                "guest_run_time",
                "Raw time the guest code was running on the virtual processor",
            ),
            FieldMapping::gauge(
                "PercentHypervisorRunTime",
                "hypervisor_run_time",
                "Raw time the hypervisor was running on behalf of the virtual processor",
            ),
            FieldMapping::gauge(
                "PercentRemoteRunTime",
                "remote_run_time",
                "Raw time the virtual processor was running on a remote NUMA node",
            ),
            FieldMapping::gauge(
                "PercentTotalRunTime",
                "total_run_time",
                "Raw time spent by the virtual processor in guest and hypervisor code",
            ),
        ],
    },
    ClassTable {
        class: "Win32_PerfRawData_HvStats_HyperVHypervisorRootVirtualProcessor",
        subsystem: "processor",
        cardinality: Cardinality::PerInstance,
        fields: &[
            FieldMapping::gauge(
                "PercentGuestRunTime",
                "root_guest_run_time",
                "Raw time the root partition was running guest code on the virtual processor",
            ),
            FieldMapping::gauge(
                "PercentHypervisorRunTime",
                "root_hypervisor_run_time",
                "Raw time the hypervisor was running on behalf of the root virtual processor",
            ),
            FieldMapping::gauge(
                "PercentRemoteRunTime",
                "root_remote_run_time",
                "Raw time the root virtual processor was running on a remote NUMA node",
            ),
            FieldMapping::gauge(
                "PercentTotalRunTime",
                "root_total_run_time",
                "Raw time spent by the root virtual processor in guest and hypervisor code",
            ),
        ],
    },
];

/// Builds the `processor` collector.
pub fn collector(source: Arc<dyn CounterSource>) -> Result<TableCollector, ConfigurationError> {
    TableCollector::new(source, CLASSES)
}
