//! Virtual network adapter traffic, per adapter.
//!
//! The provider reports cumulative raw counters; they are exposed as-is and
//! rates are left to the query side.

use std::sync::Arc;

use crate::collector::TableCollector;
use crate::error::ConfigurationError;
use crate::mapping::{Cardinality, ClassTable, FieldMapping};
use crate::source::CounterSource;

/// Collector name.
pub const NAME: &str = "rate";

/// Counter classes read by the `rate` collector.
pub static CLASSES: &[ClassTable] = &[ClassTable {
    class: "Win32_PerfRawData_NvspNicStats_HyperVVirtualNetworkAdapter",
    subsystem: "rate",
    cardinality: Cardinality::PerInstance,
    fields: &[
        FieldMapping::gauge(
            "BytesReceivedPersec",
            "adapter_bytes_received",
            "Bytes received by the virtual network adapter",
        ),
        FieldMapping::gauge(
            "BytesSentPersec",
            "adapter_bytes_sent",
            "Bytes sent by the virtual network adapter",
        ),
        FieldMapping::gauge(
            "PacketsReceivedPersec",
            "adapter_packets_received",
            "Packets received by the virtual network adapter",
        ),
        FieldMapping::gauge(
            "PacketsSentPersec",
            "adapter_packets_sent",
            "Packets sent by the virtual network adapter",
        ),
        FieldMapping::gauge(
            "DroppedPacketsIncomingPersec",
            "adapter_dropped_packets_incoming",
            "Incoming packets dropped by the virtual network adapter",
        ),
        FieldMapping::gauge(
            "DroppedPacketsOutgoingPersec",
            "adapter_dropped_packets_outgoing",
            "Outgoing packets dropped by the virtual network adapter",
        ),
    ],
}];

/// Builds the `rate` collector.
pub fn collector(source: Arc<dyn CounterSource>) -> Result<TableCollector, ConfigurationError> {
    TableCollector::new(source, CLASSES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::sample::SampleSink;
    use crate::source::fixture::FixtureSource;
    use crate::source::CounterRow;

    #[test]
    fn raw_counters_pass_through() {
        let row = CLASSES[0]
            .fields
            .iter()
            .fold(
                CounterRow::new().with("Name", "vmA_Network Adapter_1"),
                |row, mapping| row.with(mapping.field, "18446744073709551615"),
            );
        let source = FixtureSource::inline().with_class(CLASSES[0].class, vec![row]);
        let sink = SampleSink::new();
        collector(Arc::new(source)).unwrap().collect(&sink).unwrap();

        let samples = sink.into_samples();
        assert_eq!(6, samples.len());
        for sample in samples {
            assert_eq!(u64::MAX as f64, sample.value());
            assert_eq!(Some("vmA_Network Adapter_1"), sample.label("instance"));
        }
    }
}
