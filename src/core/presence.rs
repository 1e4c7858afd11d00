//! Purpose: Null checks over loose values and over the fields of typed records.
//! Exports: `check_present`, `assert_present`, `check_no_null_fields`, `assert_no_null_fields`.
//! Role: Guards callers run before handing records to code that needs every field filled.
//! Invariants: `check_*` never fail; `assert_*` report the first null as `InvalidArgument`.
use crate::core::error::{Error, ErrorKind};
use crate::core::reflect::{FieldDescriptor, FieldReflector, Record};
use crate::core::value::Value;

pub fn check_present(values: &[Value]) -> bool {
    values.iter().all(|value| !value.is_null())
}

pub fn assert_present(values: &[Value]) -> Result<(), Error> {
    match values.iter().position(Value::is_null) {
        None => Ok(()),
        Some(index) => Err(Error::new(ErrorKind::InvalidArgument)
            .with_message("required value is null")
            .with_index(index)),
    }
}

/// With `include_ancestors`, fields inherited from ancestor records are checked too.
pub fn check_no_null_fields<R: Record>(record: &R, include_ancestors: bool) -> bool {
    first_null_field(record, include_ancestors).is_none()
}

pub fn assert_no_null_fields<R: Record>(record: &R, include_ancestors: bool) -> Result<(), Error> {
    match first_null_field(record, include_ancestors) {
        None => Ok(()),
        Some(field) => Err(Error::new(ErrorKind::InvalidArgument)
            .with_message(format!("field `{}` of {} is null", field.name, type_name::<R>()))
            .with_field(field.name)
            .with_target(field.kind)),
    }
}

fn first_null_field<R: Record>(record: &R, include_ancestors: bool) -> Option<FieldDescriptor> {
    let fields = FieldReflector::global().fields_of::<R>();
    let candidates = if include_ancestors {
        fields.readable()
    } else {
        fields.declared()
    };
    candidates
        .iter()
        .find(|field| record.read(field.name).is_none_or(|value| value.is_null()))
        .copied()
}

fn type_name<R: Record>() -> &'static str {
    FieldReflector::global().fields_of::<R>().type_name()
}
