//! Metric collector implementation.
//!
//! See [`Collector`] for details.

use std::sync::Arc;

use crate::error::{CollectError, ConfigurationError};
use crate::mapping::{ClassMapper, ClassTable};
use crate::registry::{Descriptor, DescriptorRegistry, NAMESPACE};
use crate::sample::SampleSink;
use crate::source::CounterSource;

/// The [`Collector`] abstraction lets the [`Scraper`](crate::scrape::Scraper)
/// run every domain collector the same way on each scrape.
///
/// ```
/// # use std::sync::Arc;
/// # use hyperv_exporter::collector::Collector;
/// # use hyperv_exporter::error::{CollectError, ConfigurationError};
/// # use hyperv_exporter::registry::{Descriptor, DescriptorRegistry, NAMESPACE};
/// # use hyperv_exporter::sample::SampleSink;
/// #
/// #[derive(Debug)]
/// struct UptimeCollector {
///     uptime: Arc<Descriptor>,
/// }
///
/// impl UptimeCollector {
///     fn new() -> Result<Self, ConfigurationError> {
///         let mut registry = DescriptorRegistry::new(NAMESPACE);
///         let uptime = registry.register("uptime", "host", "uptime_seconds", "Uptime", &[])?;
///         Ok(Self { uptime })
///     }
/// }
///
/// impl Collector for UptimeCollector {
///     fn collect(&self, sink: &SampleSink) -> Result<(), CollectError> {
///         sink.emit(&self.uptime, 42.0, vec![])?;
///         Ok(())
///     }
/// }
///
/// let sink = SampleSink::new();
/// UptimeCollector::new().unwrap().collect(&sink).unwrap();
/// assert_eq!(1, sink.len());
/// ```
pub trait Collector: std::fmt::Debug + Send + Sync + 'static {
    /// Called once per scrape. Writes this collector's samples to `sink`.
    ///
    /// On error, samples written before the failure stay in the sink.
    fn collect(&self, sink: &SampleSink) -> Result<(), CollectError>;
}

/// A domain collector driven by [`ClassTable`]s.
///
/// Queries each class in table order, maps the rows and writes each class's
/// samples as one batch. The first failing class aborts the collection; there
/// are no retries at this level.
#[derive(Debug)]
pub struct TableCollector {
    source: Arc<dyn CounterSource>,
    registry: DescriptorRegistry,
    classes: Vec<ClassMapper>,
}

impl TableCollector {
    /// Builds the collector's descriptor registry from `tables`.
    pub fn new(
        source: Arc<dyn CounterSource>,
        tables: &'static [ClassTable],
    ) -> Result<Self, ConfigurationError> {
        let mut registry = DescriptorRegistry::new(NAMESPACE);
        let classes = tables
            .iter()
            .map(|table| ClassMapper::bind(table, &mut registry))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source,
            registry,
            classes,
        })
    }

    /// Every descriptor this collector can emit.
    pub fn descriptors(&self) -> impl Iterator<Item = &Arc<Descriptor>> {
        self.registry.iter()
    }

    /// Counter classes queried, in query order.
    pub fn classes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.classes.iter().map(ClassMapper::class)
    }
}

impl Collector for TableCollector {
    fn collect(&self, sink: &SampleSink) -> Result<(), CollectError> {
        for mapper in &self.classes {
            let rows = self
                .source
                .query(mapper.class())
                .map_err(|source| CollectError::QueryFailed {
                    class: mapper.class().to_string(),
                    source,
                })?;
            let samples = mapper.map_rows(&rows)?;

            tracing::trace!(
                class = mapper.class(),
                rows = rows.len(),
                samples = samples.len(),
                "mapped counter class"
            );
            sink.extend(samples);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::mapping::{Cardinality, FieldMapping};
    use crate::source::fixture::FixtureSource;
    use crate::source::CounterRow;

    static TABLES: &[ClassTable] = &[
        ClassTable {
            class: "First",
            subsystem: "first",
            cardinality: Cardinality::Single,
            fields: &[FieldMapping::gauge("A", "a", "A")],
        },
        ClassTable {
            class: "Second",
            subsystem: "second",
            cardinality: Cardinality::PerInstance,
            fields: &[FieldMapping::gauge("B", "b", "B")],
        },
    ];

    #[derive(Debug)]
    struct Unreachable;

    impl CounterSource for Unreachable {
        fn query(&self, _class: &str) -> Result<Vec<CounterRow>, SourceError> {
            Err(SourceError::Unavailable("no session".to_string()))
        }
    }

    #[test]
    fn collects_classes_in_order() {
        let source = FixtureSource::inline()
            .with_class("First", vec![CounterRow::new().with("A", 1u64)])
            .with_class(
                "Second",
                vec![
                    CounterRow::new().with("Name", "x").with("B", 2u64),
                    CounterRow::new().with("Name", "y").with("B", 3u64),
                ],
            );
        let collector = TableCollector::new(Arc::new(source), TABLES).unwrap();
        assert_eq!(vec!["First", "Second"], collector.classes().collect::<Vec<_>>());
        assert_eq!(2, collector.descriptors().count());

        let sink = SampleSink::new();
        collector.collect(&sink).unwrap();
        let values: Vec<f64> = sink.into_samples().iter().map(|s| s.value()).collect();
        assert_eq!(vec![1.0, 2.0, 3.0], values);
    }

    #[test]
    fn source_failure_is_query_failed() {
        let collector = TableCollector::new(Arc::new(Unreachable), TABLES).unwrap();
        let sink = SampleSink::new();

        let err = collector.collect(&sink).unwrap_err();
        assert!(err.is_source_failure());
        assert!(matches!(
            err,
            CollectError::QueryFailed { class, source: SourceError::Unavailable(_) } if class == "First"
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn later_failure_keeps_earlier_batches() {
        let source = FixtureSource::inline()
            .with_class("First", vec![CounterRow::new().with("A", 1u64)])
            .with_class("Second", vec![CounterRow::new().with("B", 2u64)]);
        let collector = TableCollector::new(Arc::new(source), TABLES).unwrap();
        let sink = SampleSink::new();

        assert!(matches!(
            collector.collect(&sink),
            Err(CollectError::MalformedField { .. })
        ));
        assert_eq!(1, sink.len());
    }
}
