// Core modules implementing values, coercion, reflection and mapping.
pub mod coerce;
pub mod context;
pub mod error;
pub mod keys;
pub mod kind;
pub mod mapper;
pub mod pattern;
pub mod presence;
pub mod record;
pub mod reflect;
pub mod value;
