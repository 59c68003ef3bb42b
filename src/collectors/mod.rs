//! Hyper-V domain collectors.
//!
//! Each collector is a [`TableCollector`](crate::collector::TableCollector)
//! over the counter classes of its domain. [`build`] turns a configured
//! collector name into a ready collector.

use std::sync::Arc;

use crate::collector::Collector;
use crate::error::ConfigurationError;
use crate::source::CounterSource;

pub mod health;
pub mod hv;
pub mod os;
pub mod processor;
pub mod rate;
pub mod switch;
pub mod vid;

/// Names of all available collectors, in alphabetical order.
pub const COLLECTOR_NAMES: &[&str] = &[
    health::NAME,
    hv::NAME,
    os::NAME,
    processor::NAME,
    rate::NAME,
    switch::NAME,
    vid::NAME,
];

/// Builds the collector called `name` on top of `source`.
pub fn build(
    name: &str,
    source: Arc<dyn CounterSource>,
) -> Result<Box<dyn Collector>, ConfigurationError> {
    let collector = match name {
        health::NAME => health::collector(source)?,
        hv::NAME => hv::collector(source)?,
        os::NAME => os::collector(source)?,
        processor::NAME => processor::collector(source)?,
        rate::NAME => rate::collector(source)?,
        switch::NAME => switch::collector(source)?,
        vid::NAME => vid::collector(source)?,
        unknown => return Err(ConfigurationError::UnknownCollector(unknown.to_string())),
    };
    Ok(Box::new(collector))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::collector::TableCollector;
    use crate::source::fixture::FixtureSource;

    #[test]
    fn every_name_builds() {
        let source: Arc<dyn CounterSource> = Arc::new(FixtureSource::inline());
        for name in COLLECTOR_NAMES {
            build(name, source.clone()).unwrap();
        }
        assert!(matches!(
            build("cpu", source),
            Err(ConfigurationError::UnknownCollector(name)) if name == "cpu"
        ));
    }

    #[test]
    fn metric_names_are_unique_across_collectors() {
        let source: Arc<dyn CounterSource> = Arc::new(FixtureSource::inline());
        let collectors: Vec<TableCollector> = vec![
            health::collector(source.clone()).unwrap(),
            hv::collector(source.clone()).unwrap(),
            os::collector(source.clone()).unwrap(),
            processor::collector(source.clone()).unwrap(),
            rate::collector(source.clone()).unwrap(),
            switch::collector(source.clone()).unwrap(),
            vid::collector(source).unwrap(),
        ];

        let mut seen = HashSet::new();
        for collector in &collectors {
            for descriptor in collector.descriptors() {
                assert!(
                    seen.insert(descriptor.name().to_string()),
                    "{} registered twice",
                    descriptor.name()
                );
            }
        }
    }
}
