//! Purpose: Per-caller formatting and precision preferences for one mapping scope.
//! Exports: `ConversionContext`, `with_context`, `DEFAULT_DATE_PATTERN`.
//! Role: Parameterizes the coercion engine; owned by exactly one caller at a time.
//! Invariants: Reads never clear settings; only the end of a scope (or `reset`) does.
//! Invariants: `with_context` releases the settings on every exit path, including panics.
use time::UtcOffset;

use crate::core::pattern::DATETIME_FORMAT;

pub const DEFAULT_DATE_PATTERN: &str = DATETIME_FORMAT;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConversionContext {
    date_pattern: Option<String>,
    decimal_scale: Option<u32>,
    lenient: bool,
    offset: Option<UtcOffset>,
}

impl ConversionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.set_date_pattern(pattern);
        self
    }

    pub fn with_decimal_scale(mut self, scale: u32) -> Self {
        self.set_decimal_scale(scale);
        self
    }

    pub fn with_lenient(mut self, lenient: bool) -> Self {
        self.set_lenient(lenient);
        self
    }

    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.set_offset(offset);
        self
    }

    pub fn set_date_pattern(&mut self, pattern: impl Into<String>) {
        self.date_pattern = Some(pattern.into());
    }

    pub fn set_decimal_scale(&mut self, scale: u32) {
        self.decimal_scale = Some(scale);
    }

    pub fn set_lenient(&mut self, lenient: bool) {
        self.lenient = lenient;
    }

    pub fn set_offset(&mut self, offset: UtcOffset) {
        self.offset = Some(offset);
    }

    /// The pattern for rendering date-times: the override, else `yyyy-MM-dd HH:mm:ss`.
    pub fn date_pattern(&self) -> &str {
        self.date_pattern.as_deref().unwrap_or(DEFAULT_DATE_PATTERN)
    }

    pub fn explicit_date_pattern(&self) -> Option<&str> {
        self.date_pattern.as_deref()
    }

    /// `None` means decimals keep their full precision.
    pub fn decimal_scale(&self) -> Option<u32> {
        self.decimal_scale
    }

    pub fn lenient(&self) -> bool {
        self.lenient
    }

    pub fn offset(&self) -> UtcOffset {
        self.offset.unwrap_or(UtcOffset::UTC)
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Runs `scope` against the settings in `ctx`, leaving `ctx` reset afterwards.
///
/// The settings are moved out before `scope` runs, so nothing `scope` does (including
/// failing or unwinding) can leave them behind for the next call.
pub fn with_context<T>(
    ctx: &mut ConversionContext,
    scope: impl FnOnce(&ConversionContext) -> T,
) -> T {
    let active = std::mem::take(ctx);
    scope(&active)
}
