//! Counter source abstraction.
//!
//! A [`CounterSource`] answers queries for a named counter class with zero or
//! more [`CounterRow`]s. Row order is whatever the source produces and carries
//! no meaning; instance identity comes from the row's `Name` field.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};

use crate::error::SourceError;

pub mod fixture;
#[cfg(windows)]
pub mod wmi;

/// Field holding the instance name of per-instance classes.
pub const NAME_FIELD: &str = "Name";

/// A typed scalar read from a counter row.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Unsigned integer.
    Unsigned(u64),
    /// Free-form string. Sources may deliver 64-bit integers and datetimes as
    /// strings, see [`RawValue::as_u64`] and [`RawValue::as_timestamp`].
    String(String),
    /// Absolute wall-clock time together with its originating offset.
    Timestamp(DateTime<FixedOffset>),
    /// The field is present but has no value.
    Null,
}

impl RawValue {
    /// Interprets the value as an unsigned integer.
    ///
    /// Decimal strings are accepted, the WMI provider returns `uint64`
    /// properties that way.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            RawValue::Unsigned(v) => Some(*v),
            RawValue::String(s) => s.trim().parse().ok(),
            RawValue::Timestamp(_) | RawValue::Null => None,
        }
    }

    /// Interprets the value as an absolute time.
    ///
    /// Strings are parsed as CIM datetimes first and as RFC 3339 second.
    pub fn as_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            RawValue::Timestamp(t) => Some(*t),
            RawValue::String(s) => parse_cim_datetime(s)
                .or_else(|| DateTime::parse_from_rfc3339(s.trim()).ok()),
            RawValue::Unsigned(_) | RawValue::Null => None,
        }
    }

    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the value's type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Unsigned(_) => "unsigned",
            RawValue::String(_) => "string",
            RawValue::Timestamp(_) => "timestamp",
            RawValue::Null => "null",
        }
    }
}

impl From<u64> for RawValue {
    fn from(v: u64) -> Self {
        RawValue::Unsigned(v)
    }
}

impl From<u32> for RawValue {
    fn from(v: u32) -> Self {
        RawValue::Unsigned(v.into())
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        RawValue::String(v.to_string())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        RawValue::String(v)
    }
}

impl From<DateTime<FixedOffset>> for RawValue {
    fn from(v: DateTime<FixedOffset>) -> Self {
        RawValue::Timestamp(v)
    }
}

/// One instance of a queried counter class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterRow {
    fields: HashMap<String, RawValue>,
}

impl CounterRow {
    /// Creates a row without fields.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style [`CounterRow::insert`].
    pub fn with(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(field, value);
        self
    }

    /// Sets a field, replacing any previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Looks up a field.
    pub fn get(&self, field: &str) -> Option<&RawValue> {
        self.fields.get(field)
    }

    /// The row's instance name, i.e. its `Name` field.
    pub fn name(&self) -> Option<&str> {
        self.get(NAME_FIELD).and_then(RawValue::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, RawValue)> for CounterRow {
    fn from_iter<I: IntoIterator<Item = (K, RawValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Read access to the host's counter subsystem.
///
/// Implementations must tolerate concurrent queries for different classes.
/// Returning an empty sequence is a successful answer for a class without
/// live instances.
pub trait CounterSource: std::fmt::Debug + Send + Sync {
    /// Returns all rows of `class`.
    fn query(&self, class: &str) -> Result<Vec<CounterRow>, SourceError>;
}

impl<T: CounterSource + ?Sized> CounterSource for Arc<T> {
    fn query(&self, class: &str) -> Result<Vec<CounterRow>, SourceError> {
        (**self).query(class)
    }
}

impl<T: CounterSource + ?Sized> CounterSource for Box<T> {
    fn query(&self, class: &str) -> Result<Vec<CounterRow>, SourceError> {
        (**self).query(class)
    }
}

/// Parses a CIM datetime (`yyyymmddHHMMSS.mmmmmmsUUU`).
///
/// The trailing `sUUU` is the offset from UTC in minutes. The returned value
/// keeps that offset.
///
/// ```
/// # use hyperv_exporter::source::parse_cim_datetime;
/// let t = parse_cim_datetime("20230101020000.000000+120").unwrap();
/// assert_eq!(1672531200, t.timestamp());
/// assert_eq!(7200, t.offset().local_minus_utc());
/// ```
pub fn parse_cim_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if s.len() != 25 || !s.is_ascii() {
        return None;
    }

    let (local, offset) = s.split_at(21);
    let naive = NaiveDateTime::parse_from_str(local, "%Y%m%d%H%M%S%.f").ok()?;
    let sign = match &offset[..1] {
        "+" => 1,
        "-" => -1,
        _ => return None,
    };
    let minutes: i32 = offset[1..].parse().ok()?;
    let offset = FixedOffset::east_opt(sign * minutes * 60)?;
    offset.from_local_datetime(&naive).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cim_datetime_keeps_offset() {
        let t = parse_cim_datetime("20230101020000.000000+120").unwrap();
        assert_eq!(1_672_531_200, t.timestamp());
        assert_eq!("+02:00", t.offset().to_string());

        let t = parse_cim_datetime("20221231190000.500000-300").unwrap();
        assert_eq!(1_672_531_200, t.timestamp());
        assert_eq!(-5 * 3600, t.offset().local_minus_utc());
    }

    #[test]
    fn cim_datetime_rejects_garbage() {
        assert!(parse_cim_datetime("").is_none());
        assert!(parse_cim_datetime("20230101020000.000000*120").is_none());
        assert!(parse_cim_datetime("2023-01-01T02:00:00+02:00").is_none());
        assert!(parse_cim_datetime("20231301020000.000000+000").is_none());
    }

    #[test]
    fn raw_value_conversions() {
        assert_eq!(Some(42), RawValue::Unsigned(42).as_u64());
        assert_eq!(Some(18_446_744_073_709_551_615), RawValue::from("18446744073709551615").as_u64());
        assert_eq!(None, RawValue::from("vmA").as_u64());
        assert_eq!(None, RawValue::Null.as_u64());

        let rfc = RawValue::from("2023-01-01T02:00:00+02:00").as_timestamp().unwrap();
        assert_eq!(1_672_531_200, rfc.timestamp());
        assert!(RawValue::Unsigned(1).as_timestamp().is_none());
    }

    #[test]
    fn row_name_is_the_name_field() {
        let row = CounterRow::new().with("Name", "vmA").with("HealthOk", 3u64);
        assert_eq!(Some("vmA"), row.name());
        assert_eq!(2, row.len());

        let unnamed = CounterRow::new().with("Name", 1u64);
        assert_eq!(None, unnamed.name());
    }
}
