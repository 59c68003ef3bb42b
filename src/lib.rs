#![deny(dead_code)]
#![deny(missing_docs)]
#![deny(unused)]
#![forbid(unsafe_code)]
#![warn(missing_debug_implementations)]

//! Re-exposes Hyper-V performance counters as labeled
//! [Prometheus](https://prometheus.io/) gauges.
//!
//! A scrape runs every enabled [`Collector`](collector::Collector). Each
//! collector queries its counter classes through a
//! [`CounterSource`](source::CounterSource), maps the rows to
//! [`Sample`](sample::Sample)s and writes them to a shared
//! [`SampleSink`](sample::SampleSink). The [`Scraper`](scrape::Scraper)
//! isolates collector failures and adds a duration and a success sample per
//! collector.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use hyperv_exporter::collectors;
//! use hyperv_exporter::encoding::text::encode;
//! use hyperv_exporter::sample::SampleSink;
//! use hyperv_exporter::scrape::Scraper;
//! use hyperv_exporter::source::fixture::FixtureSource;
//! use hyperv_exporter::source::CounterRow;
//!
//! // Counter rows as the host would report them.
//! let source = Arc::new(FixtureSource::inline().with_class(
//!     "Win32_PerfRawData_VidPerfProvider_HyperVVMVidPartition",
//!     vec![CounterRow::new()
//!         .with("Name", "vmA")
//!         .with("PhysicalPagesAllocated", 1024u64)
//!         .with("PreferredNUMANodeIndex", 0u64)
//!         .with("RemotePhysicalPages", 0u64)],
//! ));
//!
//! let scraper = Scraper::new([(
//!     "vid".to_string(),
//!     collectors::build("vid", source).unwrap(),
//! )])
//! .unwrap();
//!
//! // One scrape, rendered in the text format.
//! let sink = SampleSink::new();
//! scraper.scrape(&sink);
//! let mut buffer = String::new();
//! encode(&mut buffer, &sink.into_samples()).unwrap();
//!
//! assert!(buffer.contains("hyperv_vid_physical_pages_allocated{instance=\"vmA\"} 1024\n"));
//! assert!(buffer.contains("hyperv_exporter_collector_success{collector=\"vid\"} 1\n"));
//! ```

pub mod collector;
pub mod collectors;
pub mod config;
pub mod encoding;
pub mod error;
pub mod mapping;
pub mod registry;
pub mod sample;
pub mod scrape;
pub mod source;
