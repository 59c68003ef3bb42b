//! Hypervisor and root partition counters.

use std::sync::Arc;

use crate::collector::TableCollector;
use crate::error::ConfigurationError;
use crate::mapping::{Cardinality, ClassTable, FieldMapping};
use crate::source::CounterSource;

/// Collector name.
pub const NAME: &str = "hv";

/// Counter classes read by the `hv` collector.
pub static CLASSES: &[ClassTable] = &[
    ClassTable {
        class: "Win32_PerfRawData_HvStats_HyperVHypervisor",
        subsystem: "hv",
        cardinality: Cardinality::Single,
        fields: &[
            FieldMapping::gauge(
                "LogicalProcessors",
                "logical_processors",
                "Number of logical processors present in the system",
            ),
            FieldMapping::gauge(
                "VirtualProcessors",
                "virtual_processors",
                "Number of virtual processors present in the system",
            ),
        ],
    },
    ClassTable {
        class: "Win32_PerfRawData_HvStats_HyperVHypervisorRootPartition",
        subsystem: "hv",
        cardinality: Cardinality::Single,
        fields: &[
            FieldMapping::gauge(
                "AddressSpaces",
                "address_spaces",
                "Number of address spaces in the virtual TLB of the partition",
            ),
            FieldMapping::gauge(
                "AttachedDevices",
                "attached_devices",
                "Number of devices attached to the partition",
            ),
            FieldMapping::gauge(
                "DepositedPages",
                "deposited_pages",
                "Number of pages deposited into the partition",
            ),
            FieldMapping::gauge(
                "DeviceDMAErrors",
                "device_dma_errors",
                "Number of DMA requests rejected due to missing translations",
            ),
            FieldMapping::gauge(
                "DeviceInterruptErrors",
                "device_interrupt_errors",
                "Number of interrupts rejected due to missing mappings",
            ),
            FieldMapping::gauge(
                "DeviceInterruptMappings",
                "device_interrupt_mappings",
                "Number of device interrupt mappings used by the partition",
            ),
            FieldMapping::gauge(
                "DeviceInterruptThrottleEvents",
                "device_interrupt_throttle_events",
                "Number of times an interrupt from a device assigned to the partition was throttled",
            ),
            FieldMapping::gauge(
                "GPAPages",
                "gpa_pages",
                "Number of pages present in the guest physical address space of the partition",
            ),
            FieldMapping::gauge(
                "GPASpaceModifications",
                "gpa_space_modifications",
                "Modifications made to the guest physical address space of the partition",
            ),
            FieldMapping::gauge(
                "IOTLBFlushCost",
                "io_tlb_flush_cost",
                "Average time in nanoseconds spent processing an I/O TLB flush",
            ),
            FieldMapping::gauge(
                "IOTLBFlushes",
                "io_tlb_flushes",
                "Number of I/O TLB flushes for the partition",
            ),
            FieldMapping::gauge(
                "RecommendedVirtualTLBSize",
                "recommended_virtual_tlb_size",
                "Recommended number of pages to be deposited for the virtual TLB",
            ),
            FieldMapping::gauge(
                "SkippedTimerTicks",
                "skipped_timer_ticks",
                "Number of timer interrupts skipped for the partition",
            ),
            FieldMapping::gauge(
                "Value1Gdevicepages",
                "device_pages_1g",
                "Number of 1G pages present in the device space of the partition",
            ),
            FieldMapping::gauge(
                "Value1GGPApages",
                "gpa_pages_1g",
                "Number of 1G pages present in the guest physical address space of the partition",
            ),
            FieldMapping::gauge(
                "Value2Mdevicepages",
                "device_pages_2m",
                "Number of 2M pages present in the device space of the partition",
            ),
            FieldMapping::gauge(
                "Value2MGPApages",
                "gpa_pages_2m",
                "Number of 2M pages present in the guest physical address space of the partition",
            ),
            FieldMapping::gauge(
                "Value4Kdevicepages",
                "device_pages_4k",
                "Number of 4K pages present in the device space of the partition",
            ),
            FieldMapping::gauge(
                "Value4KGPApages",
                "gpa_pages_4k",
                "Number of 4K pages present in the guest physical address space of the partition",
            ),
            // The provider spells this property "Entires".
            FieldMapping::gauge(
                "VirtualTLBFlushEntires",
                "virtual_tlb_flush_entries",
                "Flushes of the entire virtual TLB",
            ),
            FieldMapping::gauge(
                "VirtualTLBPages",
                "virtual_tlb_pages",
                "Number of pages used by the virtual TLB of the partition",
            ),
        ],
    },
];

/// Builds the `hv` collector.
pub fn collector(source: Arc<dyn CounterSource>) -> Result<TableCollector, ConfigurationError> {
    TableCollector::new(source, CLASSES)
}
