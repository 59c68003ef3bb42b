//! Declarative row mapping.
//!
//! Each counter class is described by a [`ClassTable`]: which class to query,
//! the subsystem its metrics live in, whether it yields one system-wide row
//! or one row per live instance, and a list of [`FieldMapping`]s naming the
//! field to read, the metric it feeds and the [`Transform`] to apply.
//!
//! [`ClassMapper::bind`] registers the table's descriptors once. Afterwards
//! [`ClassMapper::map_rows`] turns the rows of any scrape into [`Sample`]s.

use std::sync::Arc;

use chrono::FixedOffset;

use crate::error::{CollectError, ConfigurationError};
use crate::registry::{Descriptor, DescriptorRegistry};
use crate::sample::Sample;
use crate::source::{CounterRow, RawValue};

/// Label carrying the row's `Name` field on per-instance metrics.
pub const INSTANCE_LABEL: &str = "instance";

/// Label carrying the time zone on timestamp indicator metrics.
pub const TIMEZONE_LABEL: &str = "timezone";

/// Number of rows a counter class yields.
///
/// The policy is declared per class and never inferred from a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one system-wide row. Zero rows is a
    /// [`CollectError::MissingRow`].
    Single,
    /// One row per live instance, labeled by its `Name` field. Zero rows
    /// yields zero samples.
    PerInstance,
}

impl Cardinality {
    /// Label names carried by every metric of a class with this cardinality.
    pub fn label_names(&self) -> &'static [&'static str] {
        match self {
            Cardinality::Single => &[],
            Cardinality::PerInstance => &[INSTANCE_LABEL],
        }
    }
}

/// Numeric conversion applied to a field before exposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Counts, percentages and page counts, passed through unchanged.
    Identity,
    /// Kibibytes, exposed as bytes.
    Kibibytes,
    /// Absolute wall-clock time, exposed as seconds since the Unix epoch.
    /// The time's UTC offset, rendered `+hh:mm`, is exposed on a separate
    /// indicator metric with value `1` and a `timezone` label.
    EpochSeconds {
        /// Name of the indicator metric within the class's subsystem.
        zone_metric: &'static str,
        /// Help text of the indicator metric.
        zone_help: &'static str,
    },
}

/// Result of applying a [`Transform`] to a raw field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converted {
    /// The exposed value.
    pub value: f64,
    /// The originating offset of a timestamp.
    pub offset: Option<FixedOffset>,
}

impl Transform {
    /// Converts a raw field value. The error is a human readable reason.
    pub fn apply(&self, raw: &RawValue) -> Result<Converted, String> {
        match self {
            Transform::Identity => Ok(Converted {
                value: as_u64(raw)? as f64,
                offset: None,
            }),
            Transform::Kibibytes => Ok(Converted {
                value: kibibytes_to_bytes(as_u64(raw)?),
                offset: None,
            }),
            Transform::EpochSeconds { .. } => {
                let time = raw
                    .as_timestamp()
                    .ok_or_else(|| format!("expected a datetime, got {}", raw.kind()))?;
                Ok(Converted {
                    value: time.timestamp() as f64,
                    offset: Some(*time.offset()),
                })
            }
        }
    }
}

fn as_u64(raw: &RawValue) -> Result<u64, String> {
    raw.as_u64()
        .ok_or_else(|| format!("expected an unsigned integer, got {}", raw.kind()))
}

/// Converts kibibytes to bytes.
pub fn kibibytes_to_bytes(kib: u64) -> f64 {
    kib as f64 * 1024.0
}

/// Renders an offset as the `timezone` label value, e.g. `+02:00`.
pub fn zone_label(offset: &FixedOffset) -> String {
    offset.to_string()
}

/// Maps one field of a counter row onto one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    /// Field name in the counter row.
    pub field: &'static str,
    /// Metric name within the class's subsystem.
    pub metric: &'static str,
    /// Help text.
    pub help: &'static str,
    /// Conversion applied to the field.
    pub transform: Transform,
}

impl FieldMapping {
    /// A field exposed unchanged.
    pub const fn gauge(field: &'static str, metric: &'static str, help: &'static str) -> Self {
        Self {
            field,
            metric,
            help,
            transform: Transform::Identity,
        }
    }

    /// A field reported in kibibytes, exposed in bytes.
    pub const fn kibibytes(field: &'static str, metric: &'static str, help: &'static str) -> Self {
        Self {
            field,
            metric,
            help,
            transform: Transform::Kibibytes,
        }
    }

    /// A datetime field, exposed as epoch seconds plus a time zone indicator.
    pub const fn timestamp(
        field: &'static str,
        metric: &'static str,
        help: &'static str,
        zone_metric: &'static str,
        zone_help: &'static str,
    ) -> Self {
        Self {
            field,
            metric,
            help,
            transform: Transform::EpochSeconds {
                zone_metric,
                zone_help,
            },
        }
    }
}

/// Declarative shape of one counter class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassTable {
    /// Class to query.
    pub class: &'static str,
    /// Subsystem the class's metrics are named under.
    pub subsystem: &'static str,
    /// Row cardinality policy.
    pub cardinality: Cardinality,
    /// Fields to expose, in emission order.
    pub fields: &'static [FieldMapping],
}

#[derive(Debug)]
struct BoundField {
    mapping: &'static FieldMapping,
    descriptor: Arc<Descriptor>,
    zone: Option<Arc<Descriptor>>,
}

/// A [`ClassTable`] whose descriptors have been registered.
#[derive(Debug)]
pub struct ClassMapper {
    table: &'static ClassTable,
    fields: Vec<BoundField>,
}

impl ClassMapper {
    /// Registers a descriptor for every field of `table`.
    pub fn bind(
        table: &'static ClassTable,
        registry: &mut DescriptorRegistry,
    ) -> Result<Self, ConfigurationError> {
        let labels = table.cardinality.label_names();
        let fields = table
            .fields
            .iter()
            .map(|mapping| -> Result<BoundField, ConfigurationError> {
                let descriptor = registry.register(
                    &logical_name(table.subsystem, mapping.metric),
                    table.subsystem,
                    mapping.metric,
                    mapping.help,
                    labels,
                )?;

                let zone = match mapping.transform {
                    Transform::EpochSeconds {
                        zone_metric,
                        zone_help,
                    } => {
                        let mut zone_labels = labels.to_vec();
                        zone_labels.push(TIMEZONE_LABEL);
                        Some(registry.register(
                            &logical_name(table.subsystem, zone_metric),
                            table.subsystem,
                            zone_metric,
                            zone_help,
                            &zone_labels,
                        )?)
                    }
                    Transform::Identity | Transform::Kibibytes => None,
                };

                Ok(BoundField {
                    mapping,
                    descriptor,
                    zone,
                })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        Ok(Self { table, fields })
    }

    /// The class this mapper reads.
    pub fn class(&self) -> &'static str {
        self.table.class
    }

    /// Maps the rows of one query.
    ///
    /// Fails without producing samples if any mapped field of any considered
    /// row is missing or has the wrong type.
    pub fn map_rows(&self, rows: &[CounterRow]) -> Result<Vec<Sample>, CollectError> {
        let mut samples = Vec::new();
        match self.table.cardinality {
            Cardinality::Single => {
                let row = rows.first().ok_or_else(|| CollectError::MissingRow {
                    class: self.table.class.to_string(),
                })?;
                if rows.len() > 1 {
                    tracing::debug!(
                        class = self.table.class,
                        rows = rows.len(),
                        "system-wide class returned several rows, mapping the first"
                    );
                }
                self.map_row(row, &[], &mut samples)?;
            }
            Cardinality::PerInstance => {
                for row in rows {
                    let instance = row
                        .name()
                        .ok_or_else(|| self.malformed("Name", "instance name missing"))?;
                    self.map_row(row, &[instance.to_string()], &mut samples)?;
                }
            }
        }
        Ok(samples)
    }

    fn map_row(
        &self,
        row: &CounterRow,
        labels: &[String],
        samples: &mut Vec<Sample>,
    ) -> Result<(), CollectError> {
        for bound in &self.fields {
            let field = bound.mapping.field;
            let raw = row
                .get(field)
                .ok_or_else(|| self.malformed(field, "field missing"))?;
            let converted = bound
                .mapping
                .transform
                .apply(raw)
                .map_err(|reason| self.malformed(field, reason))?;

            samples.push(Sample::new(
                bound.descriptor.clone(),
                converted.value,
                labels.to_vec(),
            )?);

            if let (Some(zone), Some(offset)) = (&bound.zone, converted.offset) {
                let mut zone_labels = labels.to_vec();
                zone_labels.push(zone_label(&offset));
                samples.push(Sample::new(zone.clone(), 1.0, zone_labels)?);
            }
        }
        Ok(())
    }

    fn malformed(&self, field: &str, reason: impl Into<String>) -> CollectError {
        CollectError::MalformedField {
            class: self.table.class.to_string(),
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

fn logical_name(subsystem: &str, metric: &str) -> String {
    format!("{subsystem}_{metric}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NAMESPACE;
    use quickcheck::{quickcheck, TestResult};

    static SWITCH: ClassTable = ClassTable {
        class: "Switch",
        subsystem: "switch",
        cardinality: Cardinality::PerInstance,
        fields: &[
            FieldMapping::gauge("BytesPersec", "bytes", "Bytes"),
            FieldMapping::gauge("PacketsFlooded", "packets_flooded", "Flooded"),
        ],
    };

    static OS: ClassTable = ClassTable {
        class: "OS",
        subsystem: "os",
        cardinality: Cardinality::Single,
        fields: &[
            FieldMapping::kibibytes("FreePhysicalMemory", "physical_memory_free_bytes", "Free"),
            FieldMapping::timestamp("LocalDateTime", "time", "Time", "timezone", "Zone"),
        ],
    };

    fn bind(table: &'static ClassTable) -> ClassMapper {
        ClassMapper::bind(table, &mut DescriptorRegistry::new(NAMESPACE)).unwrap()
    }

    fn switch_row(name: &str, bytes: u64) -> CounterRow {
        CounterRow::new()
            .with("Name", name)
            .with("BytesPersec", bytes)
            .with("PacketsFlooded", 1u64)
    }

    #[test]
    fn per_instance_rows_are_labeled_independently() {
        let mapper = bind(&SWITCH);
        let mut rows = vec![switch_row("vmA", 10), switch_row("vmB", 20)];

        let first = mapper.map_rows(&rows).unwrap();
        assert_eq!(4, first.len());
        let by_instance = |samples: &[Sample], instance: &str| -> Vec<f64> {
            samples
                .iter()
                .filter(|s| s.label(INSTANCE_LABEL) == Some(instance))
                .map(Sample::value)
                .collect()
        };
        assert_eq!(vec![10.0, 1.0], by_instance(&first, "vmA"));
        assert_eq!(vec![20.0, 1.0], by_instance(&first, "vmB"));

        rows[1].insert("BytesPersec", 99u64);
        let second = mapper.map_rows(&rows).unwrap();
        assert_eq!(vec![10.0, 1.0], by_instance(&second, "vmA"));
        assert_eq!(vec![99.0, 1.0], by_instance(&second, "vmB"));
    }

    #[test]
    fn per_instance_without_rows_is_empty() {
        assert!(bind(&SWITCH).map_rows(&[]).unwrap().is_empty());
    }

    #[test]
    fn per_instance_requires_name() {
        let row = CounterRow::new()
            .with("BytesPersec", 1u64)
            .with("PacketsFlooded", 1u64);
        assert!(matches!(
            bind(&SWITCH).map_rows(&[row]),
            Err(CollectError::MalformedField { field, .. }) if field == "Name"
        ));
    }

    #[test]
    fn single_without_rows_is_missing_row() {
        assert!(matches!(
            bind(&OS).map_rows(&[]),
            Err(CollectError::MissingRow { class }) if class == "OS"
        ));
    }

    #[test]
    fn single_maps_first_row_only() {
        let row = |kib: u64| {
            CounterRow::new()
                .with("FreePhysicalMemory", kib)
                .with("LocalDateTime", "20230101020000.000000+120")
        };
        let samples = bind(&OS).map_rows(&[row(1), row(2)]).unwrap();
        assert_eq!(3, samples.len());
        assert_eq!(1024.0, samples[0].value());
    }

    #[test]
    fn timestamp_emits_zone_indicator() {
        let row = CounterRow::new()
            .with("FreePhysicalMemory", 2048u64)
            .with("LocalDateTime", "20230101020000.000000+120");
        let samples = bind(&OS).map_rows(&[row]).unwrap();

        let summary: Vec<(&str, f64, Vec<String>)> = samples
            .iter()
            .map(|s| (s.descriptor().name(), s.value(), s.label_values().to_vec()))
            .collect();
        assert_eq!(
            vec![
                ("hyperv_os_physical_memory_free_bytes", 2_097_152.0, vec![]),
                ("hyperv_os_time", 1_672_531_200.0, vec![]),
                ("hyperv_os_timezone", 1.0, vec!["+02:00".to_string()]),
            ],
            summary
        );
    }

    #[test]
    fn wrong_types_are_malformed() {
        let row = CounterRow::new()
            .with("FreePhysicalMemory", "lots")
            .with("LocalDateTime", "20230101020000.000000+120");
        assert!(matches!(
            bind(&OS).map_rows(&[row]),
            Err(CollectError::MalformedField { field, .. }) if field == "FreePhysicalMemory"
        ));

        let row = CounterRow::new()
            .with("FreePhysicalMemory", 1u64)
            .with("LocalDateTime", 5u64);
        assert!(matches!(
            bind(&OS).map_rows(&[row]),
            Err(CollectError::MalformedField { field, .. }) if field == "LocalDateTime"
        ));

        let row = CounterRow::new().with("LocalDateTime", "20230101020000.000000+120");
        assert!(matches!(
            bind(&OS).map_rows(&[row]),
            Err(CollectError::MalformedField { reason, .. }) if reason == "field missing"
        ));
    }

    #[test]
    fn binding_twice_into_one_registry_is_rejected() {
        let mut registry = DescriptorRegistry::new(NAMESPACE);
        ClassMapper::bind(&OS, &mut registry).unwrap();
        assert!(matches!(
            ClassMapper::bind(&OS, &mut registry),
            Err(ConfigurationError::DuplicateDescriptor(_))
        ));
    }

    #[test]
    fn kibibytes_are_exactly_scaled() {
        fn prop(kib: u32) -> bool {
            let raw = RawValue::Unsigned(kib.into());
            let first = Transform::Kibibytes.apply(&raw).unwrap();
            let second = Transform::Kibibytes.apply(&raw).unwrap();
            first == second && first.value as u64 == u64::from(kib) * 1024
        }

        quickcheck(prop as fn(_) -> _);
    }

    #[test]
    fn samples_conform_to_label_schema() {
        fn prop(instances: Vec<(String, u64, u64)>) -> TestResult {
            let mapper = bind(&SWITCH);
            let rows: Vec<CounterRow> = instances
                .iter()
                .map(|(name, bytes, flooded)| {
                    CounterRow::new()
                        .with("Name", name.as_str())
                        .with("BytesPersec", *bytes)
                        .with("PacketsFlooded", *flooded)
                })
                .collect();

            let samples = match mapper.map_rows(&rows) {
                Ok(samples) => samples,
                Err(_) => return TestResult::failed(),
            };

            TestResult::from_bool(
                samples.len() == rows.len() * SWITCH.fields.len()
                    && samples.iter().all(|s| {
                        s.label_values().len() == s.descriptor().label_names().len()
                    })
                    && samples
                        .chunks(SWITCH.fields.len())
                        .zip(instances.iter())
                        .all(|(chunk, (name, _, _))| {
                            chunk.iter().all(|s| s.label(INSTANCE_LABEL) == Some(name.as_str()))
                        }),
            )
        }

        quickcheck(prop as fn(_) -> _);
    }
}
