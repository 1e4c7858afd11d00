//! Purpose: Dynamically-typed values exchanged between records, maps and the coercion engine.
//! Exports: `Value`, `EnumValue`, `Calendar`, `ValueMap`, `FieldValue`, JSON bridge helpers.
//! Role: The one runtime representation every field passes through during a copy.
//! Invariants: `Value::tag` is the runtime type tag used to key coercion rules.
//! Invariants: `Null` is absence; it is never written into a destination field.
use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde_json::{Map, Number, Value as JsonValue};
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};

use crate::core::error::{Error, ErrorKind};
use crate::core::kind::{EnumDescriptor, KindTag, SemanticKind};

pub type ValueMap = BTreeMap<String, Value>;

/// A point in time that remembers the offset it was observed in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Calendar(pub OffsetDateTime);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EnumValue {
    pub descriptor: &'static EnumDescriptor,
    pub symbol: &'static str,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    BigInt(i128),
    Decimal(Decimal),
    Date(Date),
    Time(Time),
    DateTime(PrimitiveDateTime),
    Instant(OffsetDateTime),
    Calendar(Calendar),
    String(String),
    Enum(EnumValue),
}

impl Value {
    pub fn tag(&self) -> Option<KindTag> {
        let tag = match self {
            Value::Null => return None,
            Value::Bool(_) => KindTag::Bool,
            Value::Char(_) => KindTag::Char,
            Value::I8(_) => KindTag::Int8,
            Value::I16(_) => KindTag::Int16,
            Value::I32(_) => KindTag::Int32,
            Value::I64(_) => KindTag::Int64,
            Value::F32(_) => KindTag::Float32,
            Value::F64(_) => KindTag::Float64,
            Value::BigInt(_) => KindTag::BigInteger,
            Value::Decimal(_) => KindTag::BigDecimal,
            Value::Date(_) => KindTag::DateOnly,
            Value::Time(_) => KindTag::TimeOnly,
            Value::DateTime(_) => KindTag::DateTime,
            Value::Instant(_) => KindTag::Instant,
            Value::Calendar(_) => KindTag::CalendarLike,
            Value::String(_) => KindTag::String,
            Value::Enum(_) => KindTag::Enum,
        };
        Some(tag)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True when the value can be stored in a field of `kind` without conversion.
    pub fn is_assignable_to(&self, kind: SemanticKind) -> bool {
        match (self, kind) {
            (Value::Enum(value), SemanticKind::Enum(descriptor)) => value.descriptor == descriptor,
            _ => self.tag() == Some(kind.tag()),
        }
    }

    /// Short rendering for diagnostics; strings are quoted.
    pub fn describe(&self) -> String {
        match self {
            Value::String(text) => format!("{text:?}"),
            Value::Char(ch) => format!("{ch:?}"),
            other => other.to_string(),
        }
    }

    pub fn from_json(value: &JsonValue) -> Result<Self, Error> {
        match value {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(flag) => Ok(Value::Bool(*flag)),
            JsonValue::Number(number) => {
                if let Some(n) = number.as_i64() {
                    Ok(Value::I64(n))
                } else if let Some(n) = number.as_u64() {
                    Ok(Value::BigInt(i128::from(n)))
                } else {
                    Ok(Value::F64(number.as_f64().unwrap_or(f64::NAN)))
                }
            }
            JsonValue::String(text) => Ok(Value::String(text.clone())),
            JsonValue::Array(_) | JsonValue::Object(_) => Err(Error::new(ErrorKind::InvalidArgument)
                .with_message("nested JSON arrays and objects are not field values")
                .with_hint("Flatten the input so every field holds a scalar.")),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Null => JsonValue::Null,
            Value::Bool(flag) => JsonValue::Bool(*flag),
            Value::I8(n) => JsonValue::from(*n),
            Value::I16(n) => JsonValue::from(*n),
            Value::I32(n) => JsonValue::from(*n),
            Value::I64(n) => JsonValue::from(*n),
            Value::F32(n) => Number::from_f64(f64::from(*n))
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::F64(n) => Number::from_f64(*n)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Value::BigInt(n) => match i64::try_from(*n) {
                Ok(small) => JsonValue::from(small),
                Err(_) => JsonValue::String(n.to_string()),
            },
            other => JsonValue::String(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(flag) => write!(f, "{flag}"),
            Value::Char(ch) => write!(f, "{ch}"),
            Value::I8(n) => write!(f, "{n}"),
            Value::I16(n) => write!(f, "{n}"),
            Value::I32(n) => write!(f, "{n}"),
            Value::I64(n) => write!(f, "{n}"),
            Value::F32(n) => write!(f, "{n}"),
            Value::F64(n) => write!(f, "{n}"),
            Value::BigInt(n) => write!(f, "{n}"),
            Value::Decimal(n) => write!(f, "{n}"),
            Value::Date(date) => {
                let text = date
                    .format(format_description!("[year]-[month]-[day]"))
                    .map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
            Value::Time(time) => {
                let text = time
                    .format(format_description!("[hour]:[minute]:[second]"))
                    .map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
            Value::DateTime(datetime) => {
                let text = datetime
                    .format(format_description!(
                        "[year]-[month]-[day] [hour]:[minute]:[second]"
                    ))
                    .map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
            Value::Instant(moment) | Value::Calendar(Calendar(moment)) => {
                write_moment(f, *moment)
            }
            Value::String(text) => f.write_str(text),
            Value::Enum(value) => f.write_str(value.symbol),
        }
    }
}

// RFC 3339 shape without its limits: any year and any offset (seconds included) render.
fn write_moment(f: &mut fmt::Formatter<'_>, moment: OffsetDateTime) -> fmt::Result {
    let stamp = if moment.nanosecond() == 0 {
        moment.format(format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"))
    } else {
        moment.format(format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"
        ))
    }
    .map_err(|_| fmt::Error)?;
    let offset = moment.offset();
    let zone = if offset.is_utc() {
        "Z".to_string()
    } else if offset.seconds_past_minute() == 0 {
        offset
            .format(format_description!("[offset_hour sign:mandatory]:[offset_minute]"))
            .map_err(|_| fmt::Error)?
    } else {
        offset
            .format(format_description!(
                "[offset_hour sign:mandatory]:[offset_minute]:[offset_second]"
            ))
            .map_err(|_| fmt::Error)?
    };
    write!(f, "{stamp}{zone}")
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

pub fn map_from_json(object: &Map<String, JsonValue>) -> Result<ValueMap, Error> {
    object
        .iter()
        .map(|(key, value)| {
            Value::from_json(value)
                .map(|value| (key.clone(), value))
                .map_err(|err| err.with_field(key.clone()))
        })
        .collect()
}

pub fn map_to_json(map: &ValueMap) -> Map<String, JsonValue> {
    map.iter()
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

/// Bridges a Rust field type to the dynamic `Value` representation.
pub trait FieldValue: Sized {
    fn kind() -> SemanticKind;

    fn to_value(&self) -> Value;

    /// Returns `None` when `value` is not of this field's kind.
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! field_value {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl FieldValue for $ty {
            fn kind() -> SemanticKind {
                SemanticKind::$kind
            }

            fn to_value(&self) -> Value {
                Value::$variant(Clone::clone(self))
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::$variant(value)
            }
        }
    };
}

field_value!(bool, Bool, Bool);
field_value!(char, Char, Char);
field_value!(i8, Int8, I8);
field_value!(i16, Int16, I16);
field_value!(i32, Int32, I32);
field_value!(i64, Int64, I64);
field_value!(f32, Float32, F32);
field_value!(f64, Float64, F64);
field_value!(i128, BigInteger, BigInt);
field_value!(Decimal, BigDecimal, Decimal);
field_value!(Date, DateOnly, Date);
field_value!(Time, TimeOnly, Time);
field_value!(PrimitiveDateTime, DateTime, DateTime);
field_value!(OffsetDateTime, Instant, Instant);
field_value!(Calendar, CalendarLike, Calendar);
field_value!(String, String, String);

impl<T: FieldValue> FieldValue for Option<T> {
    fn kind() -> SemanticKind {
        T::kind()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Option<Self> {
        T::from_value(value).map(Some)
    }
}
