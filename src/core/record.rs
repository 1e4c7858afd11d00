//! Purpose: Declarative macros that turn plain structs and enums into mappable types.
//! Exports: `record!`, `symbolic_enum!`, `SymbolicEnum`.
//! Role: Supplies the field metadata Rust cannot discover at runtime.
//! Invariants: Generated `read`/`write` match field names exactly and fall back to `base`.
//! Invariants: `[readonly]` fields are reported final and refuse writes.
use crate::core::kind::EnumDescriptor;

/// A fieldless enum addressed by the exact names of its variants.
pub trait SymbolicEnum: Sized + 'static {
    fn descriptor() -> &'static EnumDescriptor;

    fn symbol(&self) -> &'static str;

    fn from_symbol(symbol: &str) -> Option<Self>;
}

/// Declares a struct together with its `Record` and `FieldSource` impls.
///
/// ```
/// recast::record! {
///     #[derive(Debug, Default)]
///     pub struct Person {
///         pub id: i64 [readonly],
///         pub name: String,
///     }
/// }
///
/// recast::record! {
///     #[derive(Debug, Default)]
///     pub struct Employee: Person {
///         pub salary: Option<rust_decimal::Decimal>,
///     }
/// }
/// ```
///
/// A `Child: Parent` declaration embeds the parent as a `pub base` field; the parent's fields
/// are read and written through the child.
#[macro_export]
macro_rules! record {
    (@final) => {
        false
    };
    (@final readonly) => {
        true
    };
    (@parent_layout) => {
        ::std::option::Option::None
    };
    (@parent_layout $parent:ty) => {
        ::std::option::Option::Some(::std::boxed::Box::new(
            <$parent as $crate::core::reflect::Record>::layout(),
        ))
    };
    (@parent_read $this:ident, $field:ident) => {
        ::std::option::Option::None
    };
    (@parent_read $this:ident, $field:ident, $parent:ty) => {
        $crate::core::reflect::FieldSource::read(&$this.base, $field)
    };
    (@parent_write $this:ident, $record:ident, $field:ident, $value:ident) => {
        ::std::result::Result::Err($crate::core::reflect::unknown_field(
            stringify!($record),
            $field,
        ))
    };
    (@parent_write $this:ident, $record:ident, $field:ident, $value:ident, $parent:ty) => {
        $crate::core::reflect::Record::write(&mut $this.base, $field, $value)
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident $(: $parent:ty)? {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty $([$flag:ident])?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(pub base: $parent,)?
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::core::reflect::FieldSource for $name {
            fn read(&self, name: &str) -> ::std::option::Option<$crate::core::value::Value> {
                match name {
                    $(
                        stringify!($field) => ::std::option::Option::Some(
                            $crate::core::value::FieldValue::to_value(&self.$field),
                        ),
                    )*
                    _ => $crate::record!(@parent_read self, name $(, $parent)?),
                }
            }
        }

        impl $crate::core::reflect::Record for $name {
            fn layout() -> $crate::core::reflect::RecordLayout {
                $crate::core::reflect::RecordLayout {
                    type_name: stringify!($name),
                    fields: ::std::vec![
                        $(
                            $crate::core::reflect::FieldDescriptor {
                                name: stringify!($field),
                                kind: <$ty as $crate::core::value::FieldValue>::kind(),
                                is_final: $crate::record!(@final $($flag)?),
                            },
                        )*
                    ],
                    parent: $crate::record!(@parent_layout $($parent)?),
                }
            }

            fn write(
                &mut self,
                name: &str,
                value: $crate::core::value::Value,
            ) -> ::std::result::Result<(), $crate::core::error::Error> {
                match name {
                    $(
                        stringify!($field) => $crate::core::reflect::store(
                            &mut self.$field,
                            $crate::record!(@final $($flag)?),
                            stringify!($name),
                            stringify!($field),
                            value,
                        ),
                    )*
                    _ => $crate::record!(@parent_write self, $name, name, value $(, $parent)?),
                }
            }
        }
    };
}

/// Declares a fieldless enum usable as a record field of kind `Enum`.
///
/// Derives are left to the caller; symbols are the variant names verbatim.
#[macro_export]
macro_rules! symbolic_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )+
        }

        impl $crate::core::record::SymbolicEnum for $name {
            fn descriptor() -> &'static $crate::core::kind::EnumDescriptor {
                static DESCRIPTOR: $crate::core::kind::EnumDescriptor =
                    $crate::core::kind::EnumDescriptor {
                        name: stringify!($name),
                        symbols: &[$(stringify!($variant)),+],
                    };
                &DESCRIPTOR
            }

            fn symbol(&self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)+
                }
            }

            fn from_symbol(symbol: &str) -> ::std::option::Option<Self> {
                match symbol {
                    $(stringify!($variant) => ::std::option::Option::Some(Self::$variant),)+
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl $crate::core::value::FieldValue for $name {
            fn kind() -> $crate::core::kind::SemanticKind {
                $crate::core::kind::SemanticKind::Enum(
                    <Self as $crate::core::record::SymbolicEnum>::descriptor(),
                )
            }

            fn to_value(&self) -> $crate::core::value::Value {
                $crate::core::value::Value::Enum($crate::core::value::EnumValue {
                    descriptor: <Self as $crate::core::record::SymbolicEnum>::descriptor(),
                    symbol: $crate::core::record::SymbolicEnum::symbol(self),
                })
            }

            fn from_value(value: $crate::core::value::Value) -> ::std::option::Option<Self> {
                match value {
                    $crate::core::value::Value::Enum(inner)
                        if inner.descriptor
                            == <Self as $crate::core::record::SymbolicEnum>::descriptor() =>
                    {
                        <Self as $crate::core::record::SymbolicEnum>::from_symbol(inner.symbol)
                    }
                    _ => ::std::option::Option::None,
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::SymbolicEnum;
    use crate::core::kind::SemanticKind;
    use crate::core::value::{EnumValue, FieldValue, Value};

    crate::symbolic_enum! {
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
        enum Status {
            #[default]
            Active,
            Suspended,
        }
    }

    crate::symbolic_enum! {
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        enum Phase {
            Active,
        }
    }

    #[test]
    fn descriptor_lists_variants_in_order() {
        let descriptor = Status::descriptor();
        assert_eq!(descriptor.name, "Status");
        assert_eq!(descriptor.symbols, ["Active", "Suspended"]);
        assert!(std::ptr::eq(descriptor, Status::descriptor()));
        assert_eq!(Status::kind(), SemanticKind::Enum(descriptor));
    }

    #[test]
    fn symbols_round_trip_through_values() {
        assert_eq!(Status::Suspended.symbol(), "Suspended");
        assert_eq!(Status::from_symbol("Active"), Some(Status::Active));
        assert_eq!(Status::from_symbol("active"), None);
        let value = Status::Suspended.to_value();
        assert_eq!(Status::from_value(value), Some(Status::Suspended));
    }

    #[test]
    fn foreign_enum_values_do_not_fit() {
        let phase = Value::Enum(EnumValue {
            descriptor: Phase::descriptor(),
            symbol: "Active",
        });
        assert_eq!(Status::from_value(phase), None);
        assert_eq!(Phase::from_value(Value::from("Active")), None);
    }
}
