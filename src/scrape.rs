//! Scrape orchestration.
//!
//! See [`Scraper`] for details.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::collector::Collector;
use crate::error::{CollectError, ConfigurationError, LabelMismatch};
use crate::registry::{Descriptor, DescriptorRegistry, NAMESPACE};
use crate::sample::{Sample, SampleSink};

/// Subsystem of the exporter's own meta-metrics.
pub const EXPORTER_SUBSYSTEM: &str = "exporter";

/// Label carrying the collector name on meta-metrics.
pub const COLLECTOR_LABEL: &str = "collector";

/// Runs every registered [`Collector`] once per scrape.
///
/// Collectors run concurrently, one thread each, and write into the same
/// [`SampleSink`]. Whatever a collector does, including panicking, the scrape
/// goes on and the collector gets its two meta-samples:
///
/// - `hyperv_exporter_collector_duration_seconds{collector}`
/// - `hyperv_exporter_collector_success{collector}`
///
/// The collector set is fixed at construction, so one [`Scraper`] can serve
/// concurrent scrapes from behind an [`Arc`].
///
/// ```
/// # use hyperv_exporter::collectors;
/// # use hyperv_exporter::sample::SampleSink;
/// # use hyperv_exporter::scrape::Scraper;
/// # use hyperv_exporter::source::fixture::FixtureSource;
/// # use std::sync::Arc;
/// let source = Arc::new(FixtureSource::inline());
/// let scraper = Scraper::new([(
///     "health".to_string(),
///     collectors::build("health", source).unwrap(),
/// )])
/// .unwrap();
///
/// let sink = SampleSink::new();
/// let outcomes = scraper.scrape(&sink);
///
/// // No virtual machine health summary, so the collector fails ...
/// assert!(outcomes[0].result.is_err());
/// // ... but still reports its duration and success.
/// assert_eq!(2, sink.len());
/// ```
#[derive(Debug)]
pub struct Scraper {
    collectors: BTreeMap<String, Box<dyn Collector>>,
    duration: Arc<Descriptor>,
    success: Arc<Descriptor>,
}

/// What happened to one collector during a scrape.
#[derive(Debug)]
pub struct CollectorOutcome {
    /// Collector name.
    pub name: String,
    /// Wall-clock time spent in the collector.
    pub duration: Duration,
    /// The collector's result.
    pub result: Result<(), CollectError>,
}

impl CollectorOutcome {
    /// Returns `true` if the collector succeeded.
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

impl Scraper {
    /// Creates a scraper over the given named collectors.
    ///
    /// Fails on a repeated collector name or an empty collector set.
    pub fn new(
        collectors: impl IntoIterator<Item = (String, Box<dyn Collector>)>,
    ) -> Result<Self, ConfigurationError> {
        let mut registered = BTreeMap::new();
        for (name, collector) in collectors {
            if registered.contains_key(&name) {
                return Err(ConfigurationError::DuplicateCollector(name));
            }
            registered.insert(name, collector);
        }
        if registered.is_empty() {
            return Err(ConfigurationError::NoCollectors);
        }

        let mut registry = DescriptorRegistry::new(NAMESPACE);
        let duration = registry.register(
            "collector_duration_seconds",
            EXPORTER_SUBSYSTEM,
            "collector_duration_seconds",
            "hyperv_exporter: Duration of a collection",
            &[COLLECTOR_LABEL],
        )?;
        let success = registry.register(
            "collector_success",
            EXPORTER_SUBSYSTEM,
            "collector_success",
            "hyperv_exporter: Whether the collector was successful",
            &[COLLECTOR_LABEL],
        )?;

        Ok(Self {
            collectors: registered,
            duration,
            success,
        })
    }

    /// Registered collector names, sorted.
    pub fn collector_names(&self) -> impl Iterator<Item = &str> {
        self.collectors.keys().map(String::as_str)
    }

    /// Descriptors of the two meta-metrics, duration first.
    pub fn meta_descriptors(&self) -> [&Arc<Descriptor>; 2] {
        [&self.duration, &self.success]
    }

    /// Runs all collectors into `sink` and waits for every one of them.
    ///
    /// Returns one outcome per collector, in collector name order.
    pub fn scrape(&self, sink: &SampleSink) -> Vec<CollectorOutcome> {
        thread::scope(|scope| {
            let pending: Vec<_> = self
                .collectors
                .iter()
                .map(|(name, collector)| {
                    let spawned = thread::Builder::new()
                        .name(format!("collector-{name}"))
                        .spawn_scoped(scope, move || self.run(name, collector.as_ref(), sink));
                    match spawned {
                        Ok(handle) => Pending::Running(name, handle),
                        Err(error) => {
                            tracing::warn!(collector = %name, %error, "running collector inline");
                            Pending::Done(self.run(name, collector.as_ref(), sink))
                        }
                    }
                })
                .collect();

            pending
                .into_iter()
                .map(|pending| match pending {
                    Pending::Done(outcome) => outcome,
                    Pending::Running(name, handle) => handle
                        .join()
                        .unwrap_or_else(|payload| self.escaped(name, payload.as_ref(), sink)),
                })
                .collect()
        })
    }

    fn run(&self, name: &str, collector: &dyn Collector, sink: &SampleSink) -> CollectorOutcome {
        let start = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| collector.collect(sink)))
            .unwrap_or_else(|payload| Err(CollectError::Panicked(panic_message(payload.as_ref()))));
        let duration = start.elapsed();

        match &result {
            Ok(()) => tracing::debug!(
                collector = %name,
                duration_secs = duration.as_secs_f64(),
                "collector succeeded"
            ),
            Err(error) => tracing::error!(
                collector = %name,
                duration_secs = duration.as_secs_f64(),
                %error,
                "collector failed"
            ),
        }

        if let Err(error) = self.emit_meta(name, duration, result.is_ok(), sink) {
            tracing::error!(collector = %name, %error, "dropping meta-samples");
        }

        CollectorOutcome {
            name: name.to_string(),
            duration,
            result,
        }
    }

    /// Outcome of a collector thread that unwound past [`Scraper::run`].
    fn escaped(
        &self,
        name: &str,
        payload: &(dyn Any + Send),
        sink: &SampleSink,
    ) -> CollectorOutcome {
        let error = CollectError::Panicked(panic_message(payload));
        tracing::error!(collector = %name, %error, "collector thread panicked");
        if let Err(error) = self.emit_meta(name, Duration::ZERO, false, sink) {
            tracing::error!(collector = %name, %error, "dropping meta-samples");
        }

        CollectorOutcome {
            name: name.to_string(),
            duration: Duration::ZERO,
            result: Err(error),
        }
    }

    fn emit_meta(
        &self,
        name: &str,
        duration: Duration,
        success: bool,
        sink: &SampleSink,
    ) -> Result<(), LabelMismatch> {
        let success = if success { 1.0 } else { 0.0 };
        let samples = [
            Sample::new(
                self.duration.clone(),
                duration.as_secs_f64(),
                vec![name.to_string()],
            )?,
            Sample::new(self.success.clone(), success, vec![name.to_string()])?,
        ];
        sink.extend(samples);
        Ok(())
    }
}

enum Pending<'scope, 'a> {
    Running(&'a String, thread::ScopedJoinHandle<'scope, CollectorOutcome>),
    Done(CollectorOutcome),
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
