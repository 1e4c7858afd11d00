//! Purpose: Convert one dynamic value into a requested semantic kind.
//! Exports: `convert`, `convert_to`, `CoercionTable`, `Rule`.
//! Role: Decision table consulted for every field a mapping copies.
//! Invariants: Null and empty text are absence (`Ok(None)`), never zero values or errors.
//! Invariants: Each (source tag, target tag) pair has at most one rule; unmatched pairs are
//! `Ok(None)`, malformed input for a matched pair is a `ConversionFailure`.
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::OnceLock;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use time::macros::date;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::core::context::ConversionContext;
use crate::core::error::{Error, ErrorKind};
use crate::core::kind::{KindTag, SemanticKind};
use crate::core::pattern::{self, DATE_FORMAT, TIME_FORMAT};
use crate::core::value::{Calendar, EnumValue, FieldValue, Value};

/// A coercion for one (source, target) pair; only called for present, non-identity values.
pub type Rule = fn(&Value, SemanticKind, &ConversionContext) -> Result<Value, Error>;

pub struct CoercionTable {
    rules: HashMap<(KindTag, KindTag), Rule>,
    overlaps: Vec<(KindTag, KindTag)>,
}

impl CoercionTable {
    pub fn global() -> &'static CoercionTable {
        static TABLE: OnceLock<CoercionTable> = OnceLock::new();
        TABLE.get_or_init(CoercionTable::build)
    }

    pub fn lookup(&self, source: KindTag, target: KindTag) -> Option<Rule> {
        self.rules.get(&(source, target)).copied()
    }

    /// Every registered pair, ordered by (source, target).
    pub fn pairs(&self) -> Vec<(KindTag, KindTag)> {
        let mut pairs: Vec<_> = self.rules.keys().copied().collect();
        pairs.sort();
        pairs
    }

    /// Pairs registered more than once while building; empty for a well-formed table.
    pub fn overlaps(&self) -> &[(KindTag, KindTag)] {
        &self.overlaps
    }

    fn build() -> Self {
        let mut table = Self {
            rules: HashMap::new(),
            overlaps: Vec::new(),
        };
        let numeric = KindTag::NUMERIC;
        let numeric_or_text = [&numeric[..], &[KindTag::String][..]].concat();

        table.register(&numeric_or_text, KindTag::Bool, to_bool);
        table.register(&[KindTag::String], KindTag::Char, to_char);
        table.register(&numeric_or_text, KindTag::Int8, to_int8);
        table.register(&numeric_or_text, KindTag::Int16, to_int16);
        table.register(&numeric_or_text, KindTag::Int32, to_int32);
        table.register(&numeric_or_text, KindTag::Int64, to_int64);
        table.register(&numeric_or_text, KindTag::Float32, to_float32);
        table.register(&numeric_or_text, KindTag::Float64, to_float64);
        table.register(&numeric_or_text, KindTag::BigInteger, to_big_integer);
        table.register(&numeric_or_text, KindTag::BigDecimal, to_big_decimal);

        let absolute = [
            KindTag::DateOnly,
            KindTag::DateTime,
            KindTag::Instant,
            KindTag::CalendarLike,
        ];
        table.register(&absolute, KindTag::Int64, to_epoch_millis);
        for target in KindTag::DATE_FAMILY {
            let sources: Vec<KindTag> = absolute
                .iter()
                .copied()
                .filter(|source| *source != target)
                .filter(|source| target != KindTag::TimeOnly || *source != KindTag::DateOnly)
                .chain([KindTag::Int64, KindTag::String])
                .collect();
            table.register(&sources, target, to_date_family);
        }

        let everything_else: Vec<KindTag> = KindTag::ALL
            .iter()
            .copied()
            .filter(|source| *source != KindTag::String)
            .collect();
        table.register(&everything_else, KindTag::String, to_text);
        table.register(&[KindTag::String, KindTag::Enum], KindTag::Enum, to_enum);

        table
    }

    fn register(&mut self, sources: &[KindTag], target: KindTag, rule: Rule) {
        for source in sources {
            if self.rules.insert((*source, target), rule).is_some() {
                self.overlaps.push((*source, target));
            }
        }
    }
}

/// Converts `value` to `target`, returning `Ok(None)` when there is nothing to assign.
pub fn convert(
    value: Value,
    target: SemanticKind,
    ctx: &ConversionContext,
) -> Result<Option<Value>, Error> {
    let Some(source) = value.tag() else {
        return Ok(None);
    };
    if value.is_assignable_to(target) {
        return Ok(Some(value));
    }
    if matches!(&value, Value::String(text) if text.is_empty()) {
        return Ok(None);
    }

    let Some(rule) = CoercionTable::global().lookup(source, target.tag()) else {
        tracing::trace!(%source, %target, "no coercion rule; treating as absent");
        return Ok(None);
    };
    rule(&value, target, ctx)
        .map(Some)
        .map_err(|err| err.with_value(value.describe()).with_target(target))
}

/// Typed form of `convert` for callers that know the Rust type they want.
pub fn convert_to<T: FieldValue>(
    value: Value,
    ctx: &ConversionContext,
) -> Result<Option<T>, Error> {
    let target = T::kind();
    match convert(value, target, ctx)? {
        None => Ok(None),
        Some(converted) => T::from_value(converted).map(Some).ok_or_else(|| {
            Error::new(ErrorKind::Internal)
                .with_message("coerced value does not fit the requested type")
                .with_target(target)
        }),
    }
}

#[derive(Clone, Copy)]
enum Number {
    Int(i128),
    Float(f64),
    Decimal(Decimal),
}

fn number(value: &Value) -> Option<Number> {
    let number = match value {
        Value::I8(n) => Number::Int(i128::from(*n)),
        Value::I16(n) => Number::Int(i128::from(*n)),
        Value::I32(n) => Number::Int(i128::from(*n)),
        Value::I64(n) => Number::Int(i128::from(*n)),
        Value::BigInt(n) => Number::Int(*n),
        Value::F32(n) => Number::Float(f64::from(*n)),
        Value::F64(n) => Number::Float(*n),
        Value::Decimal(n) => Number::Decimal(*n),
        _ => return None,
    };
    Some(number)
}

fn truncated(decimal: Decimal) -> i128 {
    decimal.trunc().to_i128().unwrap_or_default()
}

// Integer narrowing keeps the low bits. Floats saturate into `$via` (NaN becomes zero),
// then wrap into `$ty`, so 300.0 as an i8 is 44.
macro_rules! narrow {
    ($number:expr, $ty:ty, $via:ty) => {
        match $number {
            Number::Int(n) => n as $ty,
            Number::Float(n) => (n as $via) as $ty,
            Number::Decimal(n) => truncated(n) as $ty,
        }
    };
}

macro_rules! integer_rule {
    ($name:ident, $ty:ty, $via:ty, $variant:ident) => {
        fn $name(value: &Value, _: SemanticKind, _: &ConversionContext) -> Result<Value, Error> {
            if let Some(number) = number(value) {
                return Ok(Value::$variant(narrow!(number, $ty, $via)));
            }
            match value {
                Value::String(text) => text.parse::<$ty>().map(Value::$variant).map_err(|err| {
                    failure(concat!("invalid ", stringify!($ty), " text")).with_source(err)
                }),
                _ => Err(misrouted()),
            }
        }
    };
}

integer_rule!(to_int8, i8, i32, I8);
integer_rule!(to_int16, i16, i32, I16);
integer_rule!(to_int32, i32, i32, I32);
integer_rule!(to_int64, i64, i64, I64);

fn to_float32(value: &Value, _: SemanticKind, _: &ConversionContext) -> Result<Value, Error> {
    match (number(value), value) {
        (Some(Number::Int(n)), _) => Ok(Value::F32(n as f32)),
        (Some(Number::Float(n)), _) => Ok(Value::F32(n as f32)),
        (Some(Number::Decimal(n)), _) => Ok(Value::F32(n.to_f32().unwrap_or_default())),
        (None, Value::String(text)) => text
            .trim()
            .parse::<f32>()
            .map(Value::F32)
            .map_err(|err| failure("invalid f32 text").with_source(err)),
        _ => Err(misrouted()),
    }
}

fn to_float64(value: &Value, _: SemanticKind, _: &ConversionContext) -> Result<Value, Error> {
    match (number(value), value) {
        (Some(Number::Int(n)), _) => Ok(Value::F64(n as f64)),
        (Some(Number::Float(n)), _) => Ok(Value::F64(n)),
        (Some(Number::Decimal(n)), _) => Ok(Value::F64(n.to_f64().unwrap_or_default())),
        (None, Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .map(Value::F64)
            .map_err(|err| failure("invalid f64 text").with_source(err)),
        _ => Err(misrouted()),
    }
}

fn to_bool(value: &Value, _: SemanticKind, _: &ConversionContext) -> Result<Value, Error> {
    if let Some(number) = number(value) {
        return Ok(Value::Bool(narrow!(number, i32, i32) != 0));
    }
    match value {
        Value::String(text) => Ok(Value::Bool(text.eq_ignore_ascii_case("true"))),
        _ => Err(misrouted()),
    }
}

fn to_char(value: &Value, _: SemanticKind, _: &ConversionContext) -> Result<Value, Error> {
    match value {
        Value::String(text) => text
            .chars()
            .next()
            .map(Value::Char)
            .ok_or_else(|| failure("empty text has no first character")),
        _ => Err(misrouted()),
    }
}

fn to_big_integer(value: &Value, _: SemanticKind, _: &ConversionContext) -> Result<Value, Error> {
    match (number(value), value) {
        (Some(Number::Decimal(n)), _) => Ok(Value::BigInt(truncated(n))),
        (Some(Number::Int(n)), _) => Ok(Value::BigInt(n)),
        (Some(Number::Float(n)), _) => Ok(Value::BigInt(i128::from(n as i64))),
        (None, Value::String(text)) => parse_decimal(text).map(|n| Value::BigInt(truncated(n))),
        _ => Err(misrouted()),
    }
}

fn to_big_decimal(value: &Value, _: SemanticKind, ctx: &ConversionContext) -> Result<Value, Error> {
    let decimal = match (number(value), value) {
        (Some(Number::Decimal(n)), _) => n,
        (Some(Number::Int(n)), _) => Decimal::from_i128(n)
            .ok_or_else(|| failure("integer is outside the decimal range"))?,
        (Some(Number::Float(n)), _) => {
            if !n.is_finite() {
                return Err(failure("non-finite float has no decimal form"));
            }
            // Shortest text of the original width: 0.1f32 is 0.1, not its f64 widening.
            let text = match value {
                Value::F32(single) => single.to_string(),
                _ => n.to_string(),
            };
            parse_decimal(&text)?
        }
        (None, Value::String(text)) => parse_decimal(text)?,
        _ => return Err(misrouted()),
    };
    Ok(Value::Decimal(scaled(decimal, ctx)))
}

fn parse_decimal(text: &str) -> Result<Decimal, Error> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|err| failure("invalid decimal text").with_source(err))
}

/// Rounds half-up to the scope's scale (padding with zeros); unset scale keeps precision.
fn scaled(decimal: Decimal, ctx: &ConversionContext) -> Decimal {
    match ctx.decimal_scale() {
        None => decimal,
        Some(scale) => {
            let mut rounded =
                decimal.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(scale);
            rounded
        }
    }
}

enum Moment {
    Local(PrimitiveDateTime),
    Absolute(OffsetDateTime),
}

impl Moment {
    fn of(value: &Value, ctx: &ConversionContext) -> Result<Self, Error> {
        let moment = match value {
            Value::String(text) => Moment::Local(pattern::parse_local(text, ctx.lenient())?),
            Value::I64(millis) => Moment::Absolute(
                OffsetDateTime::from_unix_timestamp_nanos(i128::from(*millis) * 1_000_000)
                    .map_err(|err| failure("epoch milliseconds out of range").with_source(err))?,
            ),
            Value::Date(date) => Moment::Local(date.midnight()),
            Value::DateTime(datetime) => Moment::Local(*datetime),
            Value::Instant(instant) => Moment::Absolute(*instant),
            Value::Calendar(Calendar(moment)) => Moment::Absolute(*moment),
            _ => return Err(misrouted()),
        };
        Ok(moment)
    }

    fn local(&self, offset: UtcOffset) -> Result<PrimitiveDateTime, Error> {
        match self {
            Moment::Local(datetime) => Ok(*datetime),
            Moment::Absolute(moment) => local_in(*moment, offset),
        }
    }

    fn absolute(&self, offset: UtcOffset) -> Result<OffsetDateTime, Error> {
        match self {
            Moment::Local(datetime) => Ok(datetime.assume_offset(offset)),
            Moment::Absolute(moment) => Ok(*moment),
        }
    }
}

/// Wall-clock reading of `moment` at `offset`, without the panicking `to_offset`.
fn local_in(moment: OffsetDateTime, offset: UtcOffset) -> Result<PrimitiveDateTime, Error> {
    let shift = i64::from(offset.whole_seconds()) - i64::from(moment.offset().whole_seconds());
    PrimitiveDateTime::new(moment.date(), moment.time())
        .checked_add(Duration::seconds(shift))
        .ok_or_else(|| failure("moment is outside the supported date range"))
}

fn to_date_family(
    value: &Value,
    target: SemanticKind,
    ctx: &ConversionContext,
) -> Result<Value, Error> {
    let moment = Moment::of(value, ctx)?;
    let offset = ctx.offset();
    let converted = match target {
        SemanticKind::DateOnly => Value::Date(moment.local(offset)?.date()),
        SemanticKind::TimeOnly => Value::Time(moment.local(offset)?.time()),
        SemanticKind::DateTime => Value::DateTime(moment.local(offset)?),
        SemanticKind::Instant => {
            let absolute = moment.absolute(offset)?;
            Value::Instant(local_in(absolute, UtcOffset::UTC)?.assume_utc())
        }
        SemanticKind::CalendarLike => {
            let absolute = moment.absolute(offset)?;
            Value::Calendar(Calendar(local_in(absolute, offset)?.assume_offset(offset)))
        }
        _ => return Err(misrouted()),
    };
    Ok(converted)
}

fn to_epoch_millis(
    value: &Value,
    _: SemanticKind,
    ctx: &ConversionContext,
) -> Result<Value, Error> {
    let absolute = Moment::of(value, ctx)?.absolute(ctx.offset())?;
    let millis = absolute.unix_timestamp_nanos().div_euclid(1_000_000);
    i64::try_from(millis)
        .map(Value::I64)
        .map_err(|err| failure("epoch milliseconds overflow").with_source(err))
}

fn to_text(value: &Value, _: SemanticKind, ctx: &ConversionContext) -> Result<Value, Error> {
    let text = match value {
        Value::Date(date) => {
            let pattern = ctx.explicit_date_pattern().unwrap_or(DATE_FORMAT);
            pattern::format_local(date.midnight(), pattern)?
        }
        Value::Time(time) => {
            pattern::format_local(PrimitiveDateTime::new(date!(1970-01-01), *time), TIME_FORMAT)?
        }
        Value::DateTime(datetime) => pattern::format_local(*datetime, ctx.date_pattern())?,
        Value::Instant(moment) | Value::Calendar(Calendar(moment)) => {
            pattern::format_local(local_in(*moment, ctx.offset())?, ctx.date_pattern())?
        }
        Value::Decimal(decimal) => scaled(*decimal, ctx).to_string(),
        other => other.to_string(),
    };
    Ok(Value::String(text))
}

fn to_enum(value: &Value, target: SemanticKind, _: &ConversionContext) -> Result<Value, Error> {
    let SemanticKind::Enum(descriptor) = target else {
        return Err(misrouted());
    };
    let symbol = match value {
        Value::String(text) => text.as_str(),
        Value::Enum(other) => other.symbol,
        _ => return Err(misrouted()),
    };
    descriptor
        .symbol(symbol)
        .map(|symbol| Value::Enum(EnumValue { descriptor, symbol }))
        .ok_or_else(|| failure(format!("`{symbol}` is not a symbol of {}", descriptor.name)))
}

fn failure(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::ConversionFailure).with_message(message)
}

fn misrouted() -> Error {
    Error::new(ErrorKind::Internal)
        .with_message("coercion rule received a value it was not registered for")
}
