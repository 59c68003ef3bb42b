//! WMI backed counter source (Windows only).

use std::collections::HashMap;

use ::wmi::{COMLibrary, Variant, WMIConnection};

use crate::error::SourceError;
use crate::source::{CounterRow, CounterSource, RawValue};

/// Default WMI namespace holding the performance counter classes.
pub const DEFAULT_NAMESPACE: &str = r"root\cimv2";

/// Queries counter classes with `SELECT * FROM <class>`.
///
/// COM connections are bound to the thread that created them, so every
/// query opens its own connection on the calling thread.
#[derive(Debug, Clone)]
pub struct WmiSource {
    namespace: String,
}

impl Default for WmiSource {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl WmiSource {
    /// Creates a source querying the given WMI namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    fn connect(&self) -> Result<WMIConnection, SourceError> {
        let com = COMLibrary::new()
            .or_else(|_| COMLibrary::without_security())
            .map_err(|e| SourceError::Unavailable(format!("initializing COM: {e}")))?;
        WMIConnection::with_namespace_path(&self.namespace, com).map_err(|e| {
            SourceError::Unavailable(format!("connecting to {}: {e}", self.namespace))
        })
    }
}

impl CounterSource for WmiSource {
    fn query(&self, class: &str) -> Result<Vec<CounterRow>, SourceError> {
        if !class.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(SourceError::MalformedSchema(format!(
                "invalid class name {class:?}"
            )));
        }

        let connection = self.connect()?;
        let rows: Vec<HashMap<String, Variant>> = connection
            .raw_query(format!("SELECT * FROM {class}"))
            .map_err(|e| SourceError::Unavailable(format!("querying {class}: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(field, value)| (field, convert(value)))
                    .collect::<CounterRow>()
            })
            .collect())
    }
}

/// Maps a WMI variant onto the counter value model.
///
/// Types the mappers never consume become strings or [`RawValue::Null`]; a
/// mapper asking for such a field as a number reports a malformed field.
fn convert(value: Variant) -> RawValue {
    match value {
        Variant::Empty | Variant::Null => RawValue::Null,
        Variant::String(s) => RawValue::String(s),
        Variant::UI1(v) => RawValue::Unsigned(v.into()),
        Variant::UI2(v) => RawValue::Unsigned(v.into()),
        Variant::UI4(v) => RawValue::Unsigned(v.into()),
        Variant::UI8(v) => RawValue::Unsigned(v),
        Variant::I1(v) => signed(v.into()),
        Variant::I2(v) => signed(v.into()),
        Variant::I4(v) => signed(v.into()),
        Variant::I8(v) => signed(v),
        Variant::Bool(v) => RawValue::Unsigned(v.into()),
        Variant::R4(v) => RawValue::String(v.to_string()),
        Variant::R8(v) => RawValue::String(v.to_string()),
        _ => RawValue::Null,
    }
}

fn signed(v: i64) -> RawValue {
    u64::try_from(v)
        .map(RawValue::Unsigned)
        .unwrap_or_else(|_| RawValue::String(v.to_string()))
}
