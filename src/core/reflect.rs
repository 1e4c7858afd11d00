//! Purpose: Describe the fields of typed records and cache those descriptions per type.
//! Exports: `FieldDescriptor`, `RecordLayout`, `FieldSet`, `FieldSource`, `Record`,
//! `FieldReflector`, `store`, `unknown_field`.
//! Role: Tells the mapper which fields exist, in what order, and which may be assigned.
//! Invariants: Ancestor fields come first; a redeclared name keeps its ancestor position.
//! Invariants: Final fields are readable but never listed as assignment targets.
//! Invariants: A type's field set is computed at most once per reflector and then shared.
use std::any::TypeId;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::core::error::{Error, ErrorKind};
use crate::core::kind::SemanticKind;
use crate::core::value::{FieldValue, Value, ValueMap};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: SemanticKind,
    pub is_final: bool,
}

/// Static shape of one record type: its own fields plus its ancestor's layout.
#[derive(Clone, Debug)]
pub struct RecordLayout {
    pub type_name: &'static str,
    pub fields: Vec<FieldDescriptor>,
    pub parent: Option<Box<RecordLayout>>,
}

/// Anything whose values can be looked up by exact field name.
pub trait FieldSource {
    /// `None` means the source has no such name; a present null is `Some(Value::Null)`.
    fn read(&self, name: &str) -> Option<Value>;
}

impl FieldSource for ValueMap {
    fn read(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }
}

/// A typed record whose fields can be enumerated and assigned by name.
///
/// Usually implemented through the `record!` macro.
pub trait Record: FieldSource + 'static {
    fn layout() -> RecordLayout
    where
        Self: Sized;

    /// Stores an already-coerced value; the value must have the field's kind.
    fn write(&mut self, name: &str, value: Value) -> Result<(), Error>;
}

#[derive(Debug)]
pub struct FieldSet {
    type_name: &'static str,
    declared: Vec<FieldDescriptor>,
    fields: Vec<FieldDescriptor>,
}

impl FieldSet {
    pub fn from_layout(layout: &RecordLayout) -> Self {
        let mut chain = Vec::new();
        let mut current = Some(layout);
        while let Some(level) = current {
            chain.push(level);
            current = level.parent.as_deref();
        }

        let mut fields: Vec<FieldDescriptor> = Vec::new();
        for level in chain.iter().rev() {
            for field in &level.fields {
                match fields.iter_mut().find(|existing| existing.name == field.name) {
                    Some(existing) => *existing = *field,
                    None => fields.push(*field),
                }
            }
        }

        Self {
            type_name: layout.type_name,
            declared: layout.fields.clone(),
            fields,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Non-final fields, ancestors first.
    pub fn assignable(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| !field.is_final)
    }

    /// Every field, final or not, ancestors first.
    pub fn readable(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Fields declared by the type itself, without ancestors.
    pub fn declared(&self) -> &[FieldDescriptor] {
        &self.declared
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Read-through cache of field sets keyed by record type.
#[derive(Default)]
pub struct FieldReflector {
    cache: RwLock<HashMap<TypeId, Arc<FieldSet>>>,
}

impl FieldReflector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static FieldReflector {
        static REFLECTOR: OnceLock<FieldReflector> = OnceLock::new();
        REFLECTOR.get_or_init(FieldReflector::new)
    }

    pub fn fields_of<R: Record>(&self) -> Arc<FieldSet> {
        let key = TypeId::of::<R>();
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(fields) = cache.get(&key) {
                return Arc::clone(fields);
            }
        }

        // Built outside the lock; a racing builder's result is discarded.
        let built = Arc::new(FieldSet::from_layout(&R::layout()));
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        match cache.entry(key) {
            Entry::Occupied(existing) => Arc::clone(existing.get()),
            Entry::Vacant(slot) => {
                tracing::debug!(
                    record = built.type_name(),
                    fields = built.readable().len(),
                    "cached record fields"
                );
                Arc::clone(slot.insert(built))
            }
        }
    }

    pub fn cached_types(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Assigns `value` into a typed field slot; used by `record!`-generated `write`.
pub fn store<T: FieldValue>(
    slot: &mut T,
    is_final: bool,
    record: &'static str,
    field: &'static str,
    value: Value,
) -> Result<(), Error> {
    if is_final {
        return Err(Error::new(ErrorKind::InvalidArgument)
            .with_message(format!("field `{field}` of {record} is read-only"))
            .with_field(field));
    }
    let kind = T::kind();
    let rendered = value.describe();
    *slot = T::from_value(value).ok_or_else(|| {
        Error::new(ErrorKind::Internal)
            .with_message(format!("value does not fit field `{field}` of {record}"))
            .with_field(field)
            .with_value(rendered)
            .with_target(kind)
    })?;
    Ok(())
}

pub fn unknown_field(record: &'static str, field: &str) -> Error {
    Error::new(ErrorKind::InvalidArgument)
        .with_message(format!("{record} has no field named `{field}`"))
        .with_field(field)
}
