use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

use crate::types::DataType;

/// A single scalar value. Literals in VALUES rows, computed defaults, and
/// static partition constants all flow through `Datum`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    Null,
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    /// Fixed-point decimal: mantissa × 10^(-scale).
    Decimal(i128, u8),
    Text(String),
    /// Days since Unix epoch (1970-01-01).
    Date(i32),
    /// Microseconds since Unix epoch.
    Timestamp(i64),
    Jsonb(JsonValue),
}

impl Datum {
    /// The type of this value. NULL carries the dedicated NULL type, which
    /// never matches a declared column type.
    pub fn data_type(&self) -> DataType {
        match self {
            Datum::Null => DataType::Null,
            Datum::Boolean(_) => DataType::Boolean,
            Datum::Int32(_) => DataType::Int32,
            Datum::Int64(_) => DataType::Int64,
            Datum::Float64(_) => DataType::Float64,
            Datum::Decimal(_, scale) => DataType::Decimal(38, *scale),
            Datum::Text(_) => DataType::Varchar,
            Datum::Date(_) => DataType::Date,
            Datum::Timestamp(_) => DataType::Timestamp,
            Datum::Jsonb(_) => DataType::Jsonb,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Datum::Int32(v) => Some(*v as i64),
            Datum::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Boolean(b) => write!(f, "{}", b),
            Datum::Int32(v) => write!(f, "{}", v),
            Datum::Int64(v) => write!(f, "{}", v),
            Datum::Float64(v) => write!(f, "{}", v),
            Datum::Decimal(m, s) => {
                write!(f, "{}", *m as f64 / 10f64.powi(*s as i32))
            }
            Datum::Text(s) => write!(f, "'{}'", s),
            Datum::Date(days) => {
                let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
                    .unwrap_or(chrono::NaiveDate::MIN);
                match epoch.checked_add_signed(chrono::Duration::days(*days as i64)) {
                    Some(d) => write!(f, "{}", d.format("%Y-%m-%d")),
                    None => write!(f, "{}", days),
                }
            }
            Datum::Timestamp(us) => {
                let secs = us / 1_000_000;
                let nsecs = ((us % 1_000_000) * 1000) as u32;
                match chrono::DateTime::from_timestamp(secs, nsecs) {
                    Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
                    None => write!(f, "{}", us),
                }
            }
            Datum::Jsonb(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_datum_has_null_type() {
        assert_eq!(Datum::Null.data_type(), DataType::Null);
        assert!(Datum::Null.is_null());
    }

    #[test]
    fn test_typed_datums() {
        assert_eq!(Datum::Int64(7).data_type(), DataType::Int64);
        assert_eq!(Datum::Text("x".into()).data_type(), DataType::Varchar);
        assert_eq!(Datum::Int32(7).as_i64(), Some(7));
    }

    #[test]
    fn test_date_display() {
        assert_eq!(Datum::Date(0).to_string(), "1970-01-01");
    }
}
