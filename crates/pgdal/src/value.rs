//! Scalar values exchanged with the database.
//!
//! [`Value`] is what callers put into a [`ColumnValues`](crate::ColumnValues) and
//! what every result column is normalized into. Binding goes through
//! `tokio_postgres`' [`ToSql`], converting to whatever type the server inferred
//! for the placeholder (text is parsed, integers are range-checked).

use crate::columns::Record;
use crate::error::{DalError, OperationResult};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// JSON / JSONB document
    Json(serde_json::Value),
}

impl Value {
    /// Runtime type tag, used in messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Json(_) => "json",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text that integer-parses becomes [`Value::Int`]; anything else is returned as is.
    pub fn coerce_integer(self) -> Value {
        match self {
            Value::Text(s) => match s.trim().parse::<i64>() {
                Ok(i) => Value::Int(i),
                Err(_) => Value::Text(s),
            },
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Text(s) => f.write_str(s),
            Value::Json(j) => write!(f, "{j}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Json(j) => j.serialize(serializer),
        }
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

fn mismatch(value: &Value, ty: &Type) -> BoxError {
    format!("cannot bind {} value to parameter of type {}", value.type_name(), ty).into()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "y" | "yes" | "on" | "1" => Some(true),
        "f" | "false" | "n" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn is_text_type(ty: &Type) -> bool {
    matches!(*ty, Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN)
}

impl Value {
    fn int_to_sql(&self, i: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match *ty {
            Type::INT2 => i16::try_from(i)?.to_sql(ty, out),
            Type::INT4 => i32::try_from(i)?.to_sql(ty, out),
            Type::INT8 => i.to_sql(ty, out),
            Type::OID => u32::try_from(i)?.to_sql(ty, out),
            Type::FLOAT4 => (i as f32).to_sql(ty, out),
            Type::FLOAT8 => (i as f64).to_sql(ty, out),
            Type::NUMERIC => Decimal::from(i).to_sql(ty, out),
            Type::BOOL => (i != 0).to_sql(ty, out),
            Type::JSON | Type::JSONB => serde_json::Value::from(i).to_sql(ty, out),
            _ if is_text_type(ty) => i.to_string().to_sql(ty, out),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn float_to_sql(&self, x: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match *ty {
            Type::FLOAT4 => (x as f32).to_sql(ty, out),
            Type::FLOAT8 => x.to_sql(ty, out),
            Type::NUMERIC => Decimal::try_from(x)?.to_sql(ty, out),
            Type::JSON | Type::JSONB => serde_json::to_value(x)?.to_sql(ty, out),
            _ if is_text_type(ty) => format!("{x:?}").to_sql(ty, out),
            _ => Err(mismatch(self, ty)),
        }
    }

    fn text_to_sql(&self, s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match *ty {
            Type::INT2 => s.trim().parse::<i16>()?.to_sql(ty, out),
            Type::INT4 => s.trim().parse::<i32>()?.to_sql(ty, out),
            Type::INT8 => s.trim().parse::<i64>()?.to_sql(ty, out),
            Type::OID => s.trim().parse::<u32>()?.to_sql(ty, out),
            Type::FLOAT4 => s.trim().parse::<f32>()?.to_sql(ty, out),
            Type::FLOAT8 => s.trim().parse::<f64>()?.to_sql(ty, out),
            Type::NUMERIC => Decimal::from_str(s.trim())?.to_sql(ty, out),
            Type::BOOL => parse_bool(s)
                .ok_or_else(|| format!("invalid boolean literal '{s}'"))?
                .to_sql(ty, out),
            Type::UUID => Uuid::parse_str(s.trim())?.to_sql(ty, out),
            Type::DATE => NaiveDate::from_str(s.trim())?.to_sql(ty, out),
            Type::TIME => NaiveTime::from_str(s.trim())?.to_sql(ty, out),
            Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
            Type::TIMESTAMPTZ => DateTime::parse_from_rfc3339(s.trim())?
                .with_timezone(&Utc)
                .to_sql(ty, out),
            Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
            _ => s.to_sql(ty, out),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                Type::JSON | Type::JSONB => serde_json::Value::Bool(*b).to_sql(ty, out),
                _ if is_text_type(ty) => b.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
            Value::Int(i) => self.int_to_sql(*i, ty, out),
            Value::Float(x) => self.float_to_sql(*x, ty, out),
            Value::Text(s) => self.text_to_sql(s, ty, out),
            Value::Json(j) => match *ty {
                Type::JSON | Type::JSONB => j.to_sql(ty, out),
                _ if is_text_type(ty) => j.to_string().to_sql(ty, out),
                _ => Err(mismatch(self, ty)),
            },
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn timestamp_text(t: NaiveDateTime) -> String {
    t.format(TIMESTAMP_FORMAT).to_string()
}

/// Accepts both the `T` and the space separator Postgres prints.
fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
}

/// A NUMERIC rendered exactly as Postgres prints it.
///
/// `Decimal` holds 28 significant digits and no NaN/Infinity, so result
/// columns are decoded from the wire digits instead. Binding text back into a
/// NUMERIC parameter still goes through `Decimal`.
struct NumericText(String);

impl<'a> FromSql<'a> for NumericText {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let word = |i: usize| -> Result<u16, BoxError> {
            raw.get(i..i + 2)
                .map(|b| u16::from_be_bytes([b[0], b[1]]))
                .ok_or_else(|| "truncated numeric value".into())
        };
        let ndigits = usize::from(word(0)?);
        let weight = i32::from(word(2)? as i16);
        let sign = word(4)?;
        let dscale = usize::from(word(6)?);
        let digits = (0..ndigits)
            .map(|i| word(8 + 2 * i))
            .collect::<Result<Vec<_>, _>>()?;

        let negative = match sign {
            0x0000 => false,
            0x4000 => true,
            0xC000 => return Ok(Self("NaN".to_string())),
            0xD000 => return Ok(Self("Infinity".to_string())),
            0xF000 => return Ok(Self("-Infinity".to_string())),
            other => return Err(format!("invalid numeric sign 0x{other:04x}").into()),
        };
        let digit = |pos: i32| -> u16 {
            usize::try_from(pos)
                .ok()
                .and_then(|p| digits.get(p).copied())
                .unwrap_or(0)
        };

        let mut out = String::new();
        if negative {
            out.push('-');
        }
        if weight < 0 {
            out.push('0');
        } else {
            for pos in 0..=weight {
                if pos == 0 {
                    out.push_str(&digit(pos).to_string());
                } else {
                    out.push_str(&format!("{:04}", digit(pos)));
                }
            }
        }
        if dscale > 0 {
            let mut frac = String::new();
            let mut pos = weight + 1;
            while frac.len() < dscale {
                frac.push_str(&format!("{:04}", digit(pos)));
                pos += 1;
            }
            frac.truncate(dscale);
            out.push('.');
            out.push_str(&frac);
        }
        Ok(Self(out))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

fn get<'a, T>(row: &'a Row, idx: usize) -> OperationResult<Option<T>>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| DalError::decode(row.columns()[idx].name(), e.to_string()))
}

fn decode_column(row: &Row, idx: usize) -> OperationResult<Value> {
    let column = &row.columns()[idx];
    let value = match *column.type_() {
        Type::BOOL => get::<bool>(row, idx)?.map(Value::Bool),
        Type::INT2 => get::<i16>(row, idx)?.map(Value::from),
        Type::INT4 => get::<i32>(row, idx)?.map(Value::from),
        Type::INT8 => get::<i64>(row, idx)?.map(Value::Int),
        Type::OID => get::<u32>(row, idx)?.map(Value::from),
        Type::FLOAT4 => get::<f32>(row, idx)?.map(Value::from),
        Type::FLOAT8 => get::<f64>(row, idx)?.map(Value::Float),
        Type::NUMERIC => get::<NumericText>(row, idx)?.map(|n| Value::Text(n.0)),
        Type::JSON | Type::JSONB => get::<serde_json::Value>(row, idx)?.map(Value::Json),
        Type::UUID => get::<Uuid>(row, idx)?.map(|u| Value::Text(u.to_string())),
        Type::DATE => get::<NaiveDate>(row, idx)?.map(|d| Value::Text(d.to_string())),
        Type::TIME => get::<NaiveTime>(row, idx)?.map(|t| Value::Text(t.to_string())),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx)?.map(|t| Value::Text(timestamp_text(t))),
        Type::TIMESTAMPTZ => {
            get::<DateTime<Utc>>(row, idx)?.map(|t| Value::Text(t.to_rfc3339()))
        }
        _ => get::<String>(row, idx)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Normalize a driver row into a [`Record`], keeping column order.
pub fn record_from_row(row: &Row) -> OperationResult<Record> {
    let mut record = Record::new();
    for (idx, column) in row.columns().iter().enumerate() {
        record.insert(column.name(), decode_column(row, idx)?);
    }
    Ok(record)
}
