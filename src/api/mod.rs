//! Purpose: Define the stable public Rust API boundary for recast.
//! Exports: Values, kinds, the mapper, coercion and key helpers needed by the CLI and callers.
//! Role: Public, additive-only surface over `core`.
//! Invariants: New operations are added here before callers depend on them.

#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::coerce::{convert, convert_to};
pub use crate::core::context::{ConversionContext, DEFAULT_DATE_PATTERN, with_context};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::keys::{normalize_key, normalize_keys, normalize_keys_all, to_camel_case};
pub use crate::core::kind::{EnumDescriptor, KindTag, SemanticKind};
pub use crate::core::mapper::Mapper;
pub use crate::core::pattern::{
    DATE_FORMAT, DATETIME_FORMAT, FULLTIME_FORMAT, TIME_FORMAT, TIMESTAMP_FORMAT,
};
pub use crate::core::presence::{
    assert_no_null_fields, assert_present, check_no_null_fields, check_present,
};
pub use crate::core::record::SymbolicEnum;
pub use crate::core::reflect::{
    FieldDescriptor, FieldReflector, FieldSet, FieldSource, Record, RecordLayout,
};
pub use crate::core::value::{
    Calendar, EnumValue, FieldValue, Value, ValueMap, map_from_json, map_to_json,
};
pub use crate::{record, symbolic_enum};
