//! Purpose: Shared library crate used by the `recast` CLI and tests.
//! Exports: `api` (stable surface), `core` (values, coercion, reflection, mapping).
//! Role: Record/map mapping engine; `record!` and `symbolic_enum!` are exported at the root.
//! Invariants: Prefer `api` paths; `core` is public so the macros can reach it.
//! Invariants: Core modules take their configuration as explicit inputs, never hidden state.
pub mod api;
pub mod core;
