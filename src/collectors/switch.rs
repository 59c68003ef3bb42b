//! Virtual switch traffic, per switch.

use std::sync::Arc;

use crate::collector::TableCollector;
use crate::error::ConfigurationError;
use crate::mapping::{Cardinality, ClassTable, FieldMapping};
use crate::source::CounterSource;

/// Collector name.
pub const NAME: &str = "switch";

/// Counter classes read by the `switch` collector.
pub static CLASSES: &[ClassTable] = &[ClassTable {
    class: "Win32_PerfRawData_NvspSwitchStats_HyperVVirtualSwitch",
    subsystem: "switch",
    cardinality: Cardinality::PerInstance,
    fields: &[
        FieldMapping::gauge(
            "BroadcastPacketsReceivedPersec",
            "broadcast_packets_received",
            "Broadcast packets received by the virtual switch",
        ),
        FieldMapping::gauge(
            "BroadcastPacketsSentPersec",
            "broadcast_packets_sent",
            "Broadcast packets sent by the virtual switch",
        ),
        FieldMapping::gauge("BytesPersec", "bytes", "Bytes traversing the virtual switch"),
        FieldMapping::gauge(
            "BytesReceivedPersec",
            "bytes_received",
            "Bytes received by the virtual switch",
        ),
        FieldMapping::gauge(
            "BytesSentPersec",
            "bytes_sent",
            "Bytes sent by the virtual switch",
        ),
        FieldMapping::gauge(
            "DirectedPacketsReceivedPersec",
            "directed_packets_received",
            "Directed packets received by the virtual switch",
        ),
        FieldMapping::gauge(
            "DirectedPacketsSentPersec",
            "directed_packets_sent",
            "Directed packets sent by the virtual switch",
        ),
        FieldMapping::gauge(
            "DroppedPacketsIncomingPersec",
            "dropped_packets_incoming",
            "Incoming packets dropped by the virtual switch",
        ),
        FieldMapping::gauge(
            "DroppedPacketsOutgoingPersec",
            "dropped_packets_outgoing",
            "Outgoing packets dropped by the virtual switch",
        ),
        FieldMapping::gauge(
            "ExtensionsDroppedPacketsIncomingPersec",
            "extensions_dropped_packets_incoming",
            "Incoming packets dropped by virtual switch extensions",
        ),
        FieldMapping::gauge(
            "ExtensionsDroppedPacketsOutgoingPersec",
            "extensions_dropped_packets_outgoing",
            "Outgoing packets dropped by virtual switch extensions",
        ),
        FieldMapping::gauge(
            "LearnedMacAddresses",
            "learned_mac_addresses",
            "MAC addresses learned by the virtual switch",
        ),
        FieldMapping::gauge(
            "MulticastPacketsReceivedPersec",
            "multicast_packets_received",
            "Multicast packets received by the virtual switch",
        ),
        FieldMapping::gauge(
            "MulticastPacketsSentPersec",
            "multicast_packets_sent",
            "Multicast packets sent by the virtual switch",
        ),
        FieldMapping::gauge(
            "NumberofSendChannelMovesPersec",
            "send_channel_moves",
            "Send channel moves performed by the virtual switch",
        ),
        FieldMapping::gauge(
            "NumberofVMQMovesPersec",
            "vmq_moves",
            "Virtual machine queue moves performed by the virtual switch",
        ),
        FieldMapping::gauge(
            "PacketsFlooded",
            "packets_flooded",
            "Packets flooded by the virtual switch",
        ),
        FieldMapping::gauge("PacketsPersec", "packets", "Packets traversing the virtual switch"),
        FieldMapping::gauge(
            "PacketsReceivedPersec",
            "packets_received",
            "Packets received by the virtual switch",
        ),
        FieldMapping::gauge(
            "PacketsSentPersec",
            "packets_sent",
            "Packets sent by the virtual switch",
        ),
        FieldMapping::gauge(
            "PurgedMacAddresses",
            "purged_mac_addresses",
            "MAC addresses purged by the virtual switch",
        ),
    ],
}];

/// Builds the `switch` collector.
pub fn collector(source: Arc<dyn CounterSource>) -> Result<TableCollector, ConfigurationError> {
    TableCollector::new(source, CLASSES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::error::CollectError;
    use crate::sample::SampleSink;
    use crate::source::fixture::FixtureSource;
    use crate::source::CounterRow;

    fn switch(name: &str) -> CounterRow {
        CLASSES[0]
            .fields
            .iter()
            .enumerate()
            .fold(CounterRow::new().with("Name", name), |row, (i, mapping)| {
                row.with(mapping.field, i as u64)
            })
    }

    #[test]
    fn every_switch_gets_a_full_sample_set() {
        let source = FixtureSource::inline().with_class(
            CLASSES[0].class,
            vec![switch("Default Switch"), switch("External")],
        );
        let sink = SampleSink::new();
        collector(Arc::new(source)).unwrap().collect(&sink).unwrap();

        let samples = sink.into_samples();
        let fields = CLASSES[0].fields.len();
        assert_eq!(2 * fields, samples.len());
        assert!(samples[..fields]
            .iter()
            .all(|s| s.label("instance") == Some("Default Switch")));
        assert!(samples[fields..]
            .iter()
            .all(|s| s.label("instance") == Some("External")));
        assert_eq!(
            (0..fields).map(|i| i as f64).collect::<Vec<_>>(),
            samples[fields..].iter().map(|s| s.value()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn null_counter_is_malformed() {
        let mut row = switch("Default Switch");
        row.insert("PacketsFlooded", crate::source::RawValue::Null);
        let source = FixtureSource::inline().with_class(CLASSES[0].class, vec![row]);

        let err = collector(Arc::new(source))
            .unwrap()
            .collect(&SampleSink::new())
            .unwrap_err();
        assert!(matches!(
            err,
            CollectError::MalformedField { field, .. } if field == "PacketsFlooded"
        ));
    }
}
