//! Purpose: Name the closed set of semantic kinds the coercion engine converts between.
//! Exports: `KindTag`, `SemanticKind`, `EnumDescriptor`.
//! Role: Shared vocabulary for values (runtime tags), fields (declared kinds) and rules.
//! Invariants: `KindTag` is payload-free so it can key the static rule table.
//! Invariants: Enum descriptors compare by identity, one static per enum.
//! Invariants: Enum symbols are case-sensitive.
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::core::error::{Error, ErrorKind};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum KindTag {
    Bool,
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    BigInteger,
    BigDecimal,
    DateOnly,
    TimeOnly,
    DateTime,
    Instant,
    CalendarLike,
    String,
    Enum,
}

impl KindTag {
    pub const ALL: [KindTag; 17] = [
        KindTag::Bool,
        KindTag::Char,
        KindTag::Int8,
        KindTag::Int16,
        KindTag::Int32,
        KindTag::Int64,
        KindTag::Float32,
        KindTag::Float64,
        KindTag::BigInteger,
        KindTag::BigDecimal,
        KindTag::DateOnly,
        KindTag::TimeOnly,
        KindTag::DateTime,
        KindTag::Instant,
        KindTag::CalendarLike,
        KindTag::String,
        KindTag::Enum,
    ];

    pub const NUMERIC: [KindTag; 8] = [
        KindTag::Int8,
        KindTag::Int16,
        KindTag::Int32,
        KindTag::Int64,
        KindTag::Float32,
        KindTag::Float64,
        KindTag::BigInteger,
        KindTag::BigDecimal,
    ];

    pub const DATE_FAMILY: [KindTag; 5] = [
        KindTag::DateOnly,
        KindTag::TimeOnly,
        KindTag::DateTime,
        KindTag::Instant,
        KindTag::CalendarLike,
    ];

    pub fn label(self) -> &'static str {
        match self {
            KindTag::Bool => "bool",
            KindTag::Char => "char",
            KindTag::Int8 => "int8",
            KindTag::Int16 => "int16",
            KindTag::Int32 => "int32",
            KindTag::Int64 => "int64",
            KindTag::Float32 => "float32",
            KindTag::Float64 => "float64",
            KindTag::BigInteger => "big-integer",
            KindTag::BigDecimal => "big-decimal",
            KindTag::DateOnly => "date",
            KindTag::TimeOnly => "time",
            KindTag::DateTime => "date-time",
            KindTag::Instant => "instant",
            KindTag::CalendarLike => "calendar",
            KindTag::String => "string",
            KindTag::Enum => "enum",
        }
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Static description of a symbolic enum: its name and its ordered symbols.
#[derive(Debug)]
pub struct EnumDescriptor {
    pub name: &'static str,
    pub symbols: &'static [&'static str],
}

impl EnumDescriptor {
    pub fn symbol(&self, symbol: &str) -> Option<&'static str> {
        self.symbols.iter().copied().find(|candidate| *candidate == symbol)
    }
}

// Two enums may share a name and symbols; only the same static is the same enum.
impl PartialEq for EnumDescriptor {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl Eq for EnumDescriptor {}

impl Hash for EnumDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(self, state);
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SemanticKind {
    Bool,
    Char,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    BigInteger,
    BigDecimal,
    DateOnly,
    TimeOnly,
    DateTime,
    Instant,
    CalendarLike,
    String,
    Enum(&'static EnumDescriptor),
}

impl SemanticKind {
    pub fn tag(self) -> KindTag {
        match self {
            SemanticKind::Bool => KindTag::Bool,
            SemanticKind::Char => KindTag::Char,
            SemanticKind::Int8 => KindTag::Int8,
            SemanticKind::Int16 => KindTag::Int16,
            SemanticKind::Int32 => KindTag::Int32,
            SemanticKind::Int64 => KindTag::Int64,
            SemanticKind::Float32 => KindTag::Float32,
            SemanticKind::Float64 => KindTag::Float64,
            SemanticKind::BigInteger => KindTag::BigInteger,
            SemanticKind::BigDecimal => KindTag::BigDecimal,
            SemanticKind::DateOnly => KindTag::DateOnly,
            SemanticKind::TimeOnly => KindTag::TimeOnly,
            SemanticKind::DateTime => KindTag::DateTime,
            SemanticKind::Instant => KindTag::Instant,
            SemanticKind::CalendarLike => KindTag::CalendarLike,
            SemanticKind::String => KindTag::String,
            SemanticKind::Enum(_) => KindTag::Enum,
        }
    }

    /// Inverse of `tag` for every kind except `Enum`, which needs a descriptor.
    pub fn from_tag(tag: KindTag) -> Option<Self> {
        let kind = match tag {
            KindTag::Bool => SemanticKind::Bool,
            KindTag::Char => SemanticKind::Char,
            KindTag::Int8 => SemanticKind::Int8,
            KindTag::Int16 => SemanticKind::Int16,
            KindTag::Int32 => SemanticKind::Int32,
            KindTag::Int64 => SemanticKind::Int64,
            KindTag::Float32 => SemanticKind::Float32,
            KindTag::Float64 => SemanticKind::Float64,
            KindTag::BigInteger => SemanticKind::BigInteger,
            KindTag::BigDecimal => SemanticKind::BigDecimal,
            KindTag::DateOnly => SemanticKind::DateOnly,
            KindTag::TimeOnly => SemanticKind::TimeOnly,
            KindTag::DateTime => SemanticKind::DateTime,
            KindTag::Instant => SemanticKind::Instant,
            KindTag::CalendarLike => SemanticKind::CalendarLike,
            KindTag::String => SemanticKind::String,
            KindTag::Enum => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for SemanticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticKind::Enum(descriptor) => write!(f, "enum({})", descriptor.name),
            other => f.write_str(other.tag().label()),
        }
    }
}

impl FromStr for SemanticKind {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        KindTag::ALL
            .iter()
            .find(|tag| tag.label() == input)
            .and_then(|tag| SemanticKind::from_tag(*tag))
            .ok_or_else(|| {
                Error::new(ErrorKind::InvalidArgument)
                    .with_message(format!("unknown kind `{input}`"))
                    .with_hint(
                        "Use one of: bool, char, int8, int16, int32, int64, float32, float64, \
                         big-integer, big-decimal, date, time, date-time, instant, calendar, string",
                    )
            })
    }
}
