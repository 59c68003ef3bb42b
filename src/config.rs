//! Exporter configuration.
//!
//! [`ExporterConfig`] is what the binary assembles from its command line. It
//! decides which counter source to use and which collectors run, and builds
//! the [`Scraper`] accordingly.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::sync::Arc;

use crate::collectors::{self, COLLECTOR_NAMES};
use crate::error::ConfigurationError;
use crate::scrape::Scraper;
use crate::source::fixture::FixtureSource;
use crate::source::CounterSource;

/// Default listen address, in the `:port` shorthand.
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9182";

/// Default path serving the exposition.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";

/// Paths owned by the exporter itself.
const RESERVED_PATHS: &[&str] = &["/", "/health"];

/// Where counter rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// The host's WMI performance counter classes.
    Wmi,
    /// A JSON fixture document, re-read on every query.
    Fixture(PathBuf),
}

/// Configuration of one exporter process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExporterConfig {
    /// Address the HTTP server binds to.
    pub listen_address: SocketAddr,
    /// Path serving the exposition.
    pub metrics_path: String,
    /// Enabled collectors.
    pub collectors: Vec<String>,
    /// Counter source.
    pub source: SourceKind,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from(([0, 0, 0, 0], 9182)),
            metrics_path: DEFAULT_METRICS_PATH.to_string(),
            collectors: COLLECTOR_NAMES.iter().map(|name| name.to_string()).collect(),
            source: SourceKind::Wmi,
        }
    }
}

impl ExporterConfig {
    /// Checks the metrics path and the collector selection.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.metrics_path.starts_with('/') || RESERVED_PATHS.contains(&self.metrics_path.as_str())
        {
            return Err(ConfigurationError::InvalidMetricsPath(
                self.metrics_path.clone(),
            ));
        }
        check_collectors(&self.collectors)
    }

    /// Opens the configured counter source.
    pub fn build_source(&self) -> Result<Arc<dyn CounterSource>, ConfigurationError> {
        match &self.source {
            SourceKind::Fixture(path) => Ok(Arc::new(FixtureSource::open(path.clone()))),
            #[cfg(windows)]
            SourceKind::Wmi => Ok(Arc::new(crate::source::wmi::WmiSource::default())),
            #[cfg(not(windows))]
            SourceKind::Wmi => Err(ConfigurationError::UnsupportedSource("wmi")),
        }
    }

    /// Builds a scraper running the enabled collectors over `source`.
    pub fn build_scraper(
        &self,
        source: Arc<dyn CounterSource>,
    ) -> Result<Scraper, ConfigurationError> {
        self.validate()?;
        let collectors = self
            .collectors
            .iter()
            .map(|name| {
                collectors::build(name, source.clone()).map(|collector| (name.clone(), collector))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Scraper::new(collectors)
    }
}

/// Parses a listen address. A bare `:port` binds all interfaces.
///
/// ```
/// # use hyperv_exporter::config::parse_listen_address;
/// assert_eq!("0.0.0.0:9182", parse_listen_address(":9182").unwrap().to_string());
/// assert_eq!("127.0.0.1:80", parse_listen_address("127.0.0.1:80").unwrap().to_string());
/// ```
pub fn parse_listen_address(address: &str) -> Result<SocketAddr, ConfigurationError> {
    let address = address.trim();
    let invalid = || ConfigurationError::InvalidListenAddress(address.to_string());
    let qualified = match address.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => address.to_string(),
    };

    if let Ok(parsed) = qualified.parse() {
        return Ok(parsed);
    }
    qualified
        .to_socket_addrs()
        .map_err(|_| invalid())?
        .next()
        .ok_or_else(invalid)
}

/// Parses a comma separated collector list.
///
/// Blank entries are skipped. Unknown and repeated names are rejected, as is
/// an empty list.
pub fn parse_collectors(list: &str) -> Result<Vec<String>, ConfigurationError> {
    let collectors: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    check_collectors(&collectors)?;
    Ok(collectors)
}

fn check_collectors(collectors: &[String]) -> Result<(), ConfigurationError> {
    if collectors.is_empty() {
        return Err(ConfigurationError::NoCollectors);
    }
    for (i, name) in collectors.iter().enumerate() {
        if !COLLECTOR_NAMES.contains(&name.as_str()) {
            return Err(ConfigurationError::UnknownCollector(name.clone()));
        }
        if collectors[..i].contains(name) {
            return Err(ConfigurationError::DuplicateCollector(name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ExporterConfig::default();
        config.validate().unwrap();
        assert_eq!("0.0.0.0:9182", config.listen_address.to_string());
        assert_eq!(
            parse_listen_address(DEFAULT_LISTEN_ADDRESS).unwrap(),
            config.listen_address
        );
        assert_eq!(7, config.collectors.len());
    }

    #[test]
    fn listen_addresses() {
        assert_eq!(
            "[::1]:9182",
            parse_listen_address("[::1]:9182").unwrap().to_string()
        );
        for bad in ["", ":", ":port", "9182", "0.0.0.0:99999"] {
            assert_eq!(
                Err(ConfigurationError::InvalidListenAddress(bad.to_string())),
                parse_listen_address(bad),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn collector_lists() {
        assert_eq!(
            vec!["os".to_string(), "vid".to_string()],
            parse_collectors(" os, ,vid ").unwrap()
        );
        assert_eq!(
            Err(ConfigurationError::UnknownCollector("cpu".to_string())),
            parse_collectors("os,cpu")
        );
        assert_eq!(
            Err(ConfigurationError::DuplicateCollector("os".to_string())),
            parse_collectors("os,hv,os")
        );
        assert_eq!(Err(ConfigurationError::NoCollectors), parse_collectors(" , "));
    }

    #[test]
    fn metrics_path_must_be_free_and_absolute() {
        for path in ["metrics", "", "/", "/health"] {
            let config = ExporterConfig {
                metrics_path: path.to_string(),
                ..Default::default()
            };
            assert_eq!(
                Err(ConfigurationError::InvalidMetricsPath(path.to_string())),
                config.validate()
            );
        }
    }

    #[test]
    fn fixture_source_builds_every_collector() {
        let config = ExporterConfig {
            source: SourceKind::Fixture(PathBuf::from("does-not-exist.json")),
            ..Default::default()
        };
        let source = config.build_source().unwrap();
        let scraper = config.build_scraper(source).unwrap();
        assert_eq!(
            COLLECTOR_NAMES.to_vec(),
            scraper.collector_names().collect::<Vec<_>>()
        );
    }

    #[cfg(not(windows))]
    #[test]
    fn wmi_needs_windows() {
        assert_eq!(
            Err(ConfigurationError::UnsupportedSource("wmi")),
            ExporterConfig::default().build_source().map(|_| ())
        );
    }
}
