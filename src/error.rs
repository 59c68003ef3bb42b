//! Error taxonomy.
//!
//! Errors are split by the boundary at which they surface:
//!
//! - [`ConfigurationError`] is raised while descriptors, collectors and the
//!   exporter configuration are assembled. It is fatal at startup and never
//!   produced at scrape time.
//! - [`SourceError`] is returned by a
//!   [`CounterSource`](crate::source::CounterSource) query.
//! - [`CollectError`] is what a [`Collector`](crate::collector::Collector)
//!   reports for one scrape. The [`Scraper`](crate::scrape::Scraper) turns it
//!   into a `collector_success` value of `0` and moves on.

use thiserror::Error;

/// Failure to obtain rows from the counter subsystem.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The counter subsystem could not be reached.
    #[error("counter source unavailable: {0}")]
    Unavailable(String),
    /// The query succeeded but returned data that cannot be interpreted.
    #[error("malformed counter schema: {0}")]
    MalformedSchema(String),
}

/// A sample was built with a label-value count that differs from its
/// descriptor's label-name count.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{metric} declares {expected} label(s) but {actual} value(s) were supplied")]
pub struct LabelMismatch {
    /// Fully-qualified metric name.
    pub metric: String,
    /// Number of label names declared by the descriptor.
    pub expected: usize,
    /// Number of label values supplied.
    pub actual: usize,
}

/// Failure of a single collector during one scrape.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The counter source failed for the given class.
    #[error("query for {class} failed: {source}")]
    QueryFailed {
        /// Counter class that was queried.
        class: String,
        /// Underlying source failure.
        #[source]
        source: SourceError,
    },
    /// A system-wide class returned no rows.
    #[error("{class} returned no rows, expected exactly one")]
    MissingRow {
        /// Counter class that was queried.
        class: String,
    },
    /// A row lacked a mapped field or carried a value of the wrong type.
    #[error("{class}.{field}: {reason}")]
    MalformedField {
        /// Counter class the row belongs to.
        class: String,
        /// Field that could not be interpreted.
        field: String,
        /// Human readable reason.
        reason: String,
    },
    /// A sample violated its descriptor's label schema.
    #[error(transparent)]
    LabelMismatch(#[from] LabelMismatch),
    /// The collector panicked. The panic is contained at the collector
    /// boundary.
    #[error("collector panicked: {0}")]
    Panicked(String),
}

impl CollectError {
    /// Returns `true` if the error originates from the counter source rather
    /// than from row mapping.
    pub fn is_source_failure(&self) -> bool {
        matches!(self, CollectError::QueryFailed { .. })
    }
}

/// Error raised while assembling descriptors, collectors or configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Two descriptors share a logical or fully-qualified name.
    #[error("duplicate descriptor {0}")]
    DuplicateDescriptor(String),
    /// A metric name does not match `[a-zA-Z_:][a-zA-Z0-9_:]*`.
    #[error("invalid metric name {0:?}")]
    InvalidMetricName(String),
    /// A label name does not match `[a-zA-Z_][a-zA-Z0-9_]*` or is reserved.
    #[error("invalid label name {0:?}")]
    InvalidLabelName(String),
    /// A descriptor declares the same label name twice.
    #[error("{metric} declares label {label:?} more than once")]
    DuplicateLabel {
        /// Fully-qualified metric name.
        metric: String,
        /// The repeated label name.
        label: String,
    },
    /// No collector with this name exists.
    #[error("unknown collector {0:?}")]
    UnknownCollector(String),
    /// A collector name was registered more than once.
    #[error("collector {0:?} registered twice")]
    DuplicateCollector(String),
    /// The enabled collector set is empty.
    #[error("no collectors enabled")]
    NoCollectors,
    /// The metrics path is not an absolute path or collides with another route.
    #[error("invalid metrics path {0:?}")]
    InvalidMetricsPath(String),
    /// The listen address could not be parsed.
    #[error("invalid listen address {0:?}")]
    InvalidListenAddress(String),
    /// The selected counter source is not available on this platform.
    #[error("counter source {0} is not supported on this platform")]
    UnsupportedSource(&'static str),
}
