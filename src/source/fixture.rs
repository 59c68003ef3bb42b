//! Counter source backed by a JSON document.
//!
//! The document maps class names to arrays of rows:
//!
//! ```json
//! {
//!   "Win32_OperatingSystem": [
//!     { "FreePhysicalMemory": 2048, "LocalDateTime": "20230101020000.000000+120" }
//!   ],
//!   "Win32_PerfRawData_VidPerfProvider_HyperVVMVidPartition": [
//!     { "Name": "vmA", "PhysicalPagesAllocated": 1024 }
//!   ]
//! }
//! ```
//!
//! Non-negative integers become [`RawValue::Unsigned`], strings
//! [`RawValue::String`] and `null` [`RawValue::Null`]. A class missing from
//! the document has no live instances.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::RwLock;
use serde::Deserialize;

use crate::error::SourceError;
use crate::source::{CounterRow, CounterSource, RawValue};

/// A [`CounterSource`] answering from a JSON document.
///
/// [`FixtureSource::open`] re-reads the file on every query, so the file may
/// be edited while the exporter runs. [`FixtureSource::inline`] serves
/// in-memory rows that can be replaced with [`FixtureSource::set_class`].
#[derive(Debug)]
pub struct FixtureSource {
    origin: Origin,
}

#[derive(Debug)]
enum Origin {
    File(PathBuf),
    Inline(RwLock<HashMap<String, Vec<CounterRow>>>),
}

impl FixtureSource {
    /// Serves the document stored at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::File(path.into()),
        }
    }

    /// Serves in-memory rows.
    pub fn inline() -> Self {
        Self {
            origin: Origin::Inline(RwLock::new(HashMap::new())),
        }
    }

    /// Builder style [`FixtureSource::set_class`].
    pub fn with_class(self, class: impl Into<String>, rows: Vec<CounterRow>) -> Self {
        self.set_class(class, rows);
        self
    }

    /// Replaces the rows of `class`. Has no effect on file backed sources.
    pub fn set_class(&self, class: impl Into<String>, rows: Vec<CounterRow>) {
        match &self.origin {
            Origin::Inline(classes) => {
                classes.write().insert(class.into(), rows);
            }
            Origin::File(path) => {
                tracing::warn!(path = %path.display(), "ignoring rows set on file backed fixture");
            }
        }
    }

    /// Parses a whole fixture document.
    pub fn parse(document: &str) -> Result<HashMap<String, Vec<CounterRow>>, SourceError> {
        let classes: HashMap<String, Vec<HashMap<String, FixtureValue>>> =
            serde_json::from_str(document).map_err(|e| {
                SourceError::MalformedSchema(format!("invalid fixture document: {e}"))
            })?;

        Ok(classes
            .into_iter()
            .map(|(class, rows)| {
                let rows = rows
                    .into_iter()
                    .map(|fields| {
                        fields
                            .into_iter()
                            .map(|(field, value)| (field, RawValue::from(value)))
                            .collect::<CounterRow>()
                    })
                    .collect::<Vec<_>>();
                (class, rows)
            })
            .collect())
    }
}

impl CounterSource for FixtureSource {
    fn query(&self, class: &str) -> Result<Vec<CounterRow>, SourceError> {
        match &self.origin {
            Origin::Inline(classes) => Ok(classes.read().get(class).cloned().unwrap_or_default()),
            Origin::File(path) => {
                let document = std::fs::read_to_string(path).map_err(|e| {
                    SourceError::Unavailable(format!("reading {}: {e}", path.display()))
                })?;
                let mut classes = Self::parse(&document)?;
                Ok(classes.remove(class).unwrap_or_default())
            }
        }
    }
}

/// A field value as it may appear in a fixture document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FixtureValue {
    Unsigned(u64),
    String(String),
    Null,
}

impl From<FixtureValue> for RawValue {
    fn from(value: FixtureValue) -> Self {
        match value {
            FixtureValue::Unsigned(v) => RawValue::Unsigned(v),
            FixtureValue::String(s) => RawValue::String(s),
            FixtureValue::Null => RawValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "Win32_OperatingSystem": [
            { "FreePhysicalMemory": 2048, "LocalDateTime": "20230101020000.000000+120" }
        ],
        "Win32_PerfRawData_NvspSwitchStats_HyperVVirtualSwitch": [
            { "Name": "external", "BytesPersec": "18446744073709551615" },
            { "Name": "internal", "BytesPersec": 7, "PacketsFlooded": null }
        ]
    }"#;

    #[test]
    fn parses_classes_and_rows() {
        let classes = FixtureSource::parse(DOCUMENT).unwrap();
        assert_eq!(2, classes.len());

        let os = &classes["Win32_OperatingSystem"];
        assert_eq!(1, os.len());
        assert_eq!(Some(2048), os[0].get("FreePhysicalMemory").and_then(RawValue::as_u64));

        let switches = &classes["Win32_PerfRawData_NvspSwitchStats_HyperVVirtualSwitch"];
        assert_eq!(Some("internal"), switches[1].name());
        assert_eq!(Some(&RawValue::Null), switches[1].get("PacketsFlooded"));
    }

    #[test]
    fn rejects_unsupported_values() {
        for document in [
            r#"[]"#,
            r#"{ "A": {} }"#,
            r#"{ "A": [1] }"#,
            r#"{ "A": [{ "F": -1 }] }"#,
            r#"{ "A": [{ "F": 1.5 }] }"#,
            r#"{ "A": [{ "F": true }] }"#,
            r#"{ "A": "#,
        ] {
            assert!(
                matches!(
                    FixtureSource::parse(document),
                    Err(SourceError::MalformedSchema(_))
                ),
                "{document}"
            );
        }
    }

    #[test]
    fn missing_class_has_no_rows() {
        let source = FixtureSource::inline();
        assert_eq!(Vec::<CounterRow>::new(), source.query("Anything").unwrap());
    }

    #[test]
    fn inline_rows_can_be_replaced() {
        let source = FixtureSource::inline().with_class(
            "A",
            vec![CounterRow::new().with("Name", "one")],
        );
        assert_eq!(1, source.query("A").unwrap().len());

        source.set_class("A", vec![]);
        assert!(source.query("A").unwrap().is_empty());
    }

    #[test]
    fn file_source_reads_on_every_query() {
        let path = std::env::temp_dir().join(format!(
            "hyperv-exporter-fixture-{}.json",
            std::process::id()
        ));
        let source = FixtureSource::open(&path);

        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            source.query("Win32_OperatingSystem"),
            Err(SourceError::Unavailable(_))
        ));

        std::fs::write(&path, DOCUMENT).unwrap();
        assert_eq!(1, source.query("Win32_OperatingSystem").unwrap().len());

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            source.query("Win32_OperatingSystem"),
            Err(SourceError::MalformedSchema(_))
        ));

        std::fs::remove_file(&path).unwrap();
    }
}
