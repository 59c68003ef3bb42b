//! Operating system memory, process and clock counters.

use std::sync::Arc;

use crate::collector::TableCollector;
use crate::error::ConfigurationError;
use crate::mapping::{Cardinality, ClassTable, FieldMapping};
use crate::source::CounterSource;

/// Collector name.
pub const NAME: &str = "os";

/// Counter classes read by the `os` collector.
pub static CLASSES: &[ClassTable] = &[ClassTable {
    class: "Win32_OperatingSystem",
    subsystem: "os",
    cardinality: Cardinality::Single,
    fields: &[
        FieldMapping::kibibytes(
            "FreePhysicalMemory",
            "physical_memory_free_bytes",
            "Bytes of physical memory currently unused and available",
        ),
        FieldMapping::kibibytes(
            "TotalVisibleMemorySize",
            "visible_memory_bytes",
            "Total bytes of physical memory available to the operating system",
        ),
        FieldMapping::kibibytes(
            "FreeVirtualMemory",
            "virtual_memory_free_bytes",
            "Bytes of virtual memory currently unused and available",
        ),
        FieldMapping::kibibytes(
            "TotalVirtualMemorySize",
            "virtual_memory_bytes",
            "Total bytes of virtual memory",
        ),
        FieldMapping::kibibytes(
            "FreeSpaceInPagingFiles",
            "paging_free_bytes",
            "Bytes that can be mapped into the paging files without swapping other pages out",
        ),
        FieldMapping::kibibytes(
            "SizeStoredInPagingFiles",
            "paging_limit_bytes",
            "Total bytes that can be stored in the paging files",
        ),
        FieldMapping::kibibytes(
            "MaxProcessMemorySize",
            "process_memory_limit_bytes",
            "Maximum bytes of memory that can be allocated to a process",
        ),
        FieldMapping::gauge(
            "NumberOfProcesses",
            "processes",
            "Number of process contexts currently loaded or running",
        ),
        FieldMapping::gauge(
            "MaxNumberOfProcesses",
            "processes_limit",
            "Maximum number of process contexts the operating system supports",
        ),
        FieldMapping::gauge(
            "NumberOfUsers",
            "users",
            "Number of user sessions the operating system stores state for",
        ),
        FieldMapping::timestamp(
            "LocalDateTime",
            "time",
            "Operating system local time as seconds since the Unix epoch",
            "timezone",
            "Operating system UTC offset, carried by the timezone label as +hh:mm",
        ),
    ],
}];

/// Builds the `os` collector.
pub fn collector(source: Arc<dyn CounterSource>) -> Result<TableCollector, ConfigurationError> {
    TableCollector::new(source, CLASSES)
}
