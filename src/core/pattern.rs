//! Purpose: Translate `yyyy-MM-dd HH:mm:ss`-style patterns onto the `time` crate and pick
//! patterns from the shape of date text.
//! Exports: pattern constants, `detect_pattern`, `parse_local`, `parse_with_pattern`,
//! `format_local`.
//! Role: The only place that talks to the date/time collaborator for text parse/format.
//! Invariants: Strict parsing rejects calendar-invalid dates; lenient parsing lets the day of
//! month spill into following months. Per-component ranges are always enforced by `time`.
//! Invariants: Missing components default to 1970-01-01 00:00:00.000.
use std::num::NonZeroU8;

use time::parsing::Parsed;
use time::{Date, Duration, Month, PrimitiveDateTime, Time};

use crate::core::error::{Error, ErrorKind};

pub const DATE_FORMAT: &str = "yyyy-MM-dd";
pub const TIME_FORMAT: &str = "HH:mm:ss";
pub const DATETIME_FORMAT: &str = "yyyy-MM-dd HH:mm:ss";
pub const FULLTIME_FORMAT: &str = "yyyy-MM-dd HH:mm:ss.SSS";
pub const TIMESTAMP_FORMAT: &str = "yyyyMMddHHmmssSSS";

const EPOCH_YEAR: i32 = 1970;

/// Picks a pattern from the punctuation of `text` (expected trimmed).
pub fn detect_pattern(text: &str) -> Result<&'static str, Error> {
    if text.contains(' ') {
        if text.contains('.') {
            Ok(FULLTIME_FORMAT)
        } else {
            Ok(DATETIME_FORMAT)
        }
    } else if text.contains('-') {
        Ok(DATE_FORMAT)
    } else if text.contains(':') {
        Ok(TIME_FORMAT)
    } else if text.bytes().all(|byte| byte.is_ascii_digit())
        && (4..=TIMESTAMP_FORMAT.len()).contains(&text.len())
    {
        Ok(&TIMESTAMP_FORMAT[..text.len()])
    } else {
        Err(Error::new(ErrorKind::ConversionFailure)
            .with_message("date text matches no known layout")
            .with_value(format!("{text:?}"))
            .with_hint("Compact timestamps are 4 to 17 digits (yyyyMMddHHmmssSSS)."))
    }
}

pub fn parse_local(text: &str, lenient: bool) -> Result<PrimitiveDateTime, Error> {
    let text = text.trim();
    let pattern = detect_pattern(text)?;
    parse_with_pattern(text, pattern, lenient)
}

pub fn parse_with_pattern(
    text: &str,
    pattern: &str,
    lenient: bool,
) -> Result<PrimitiveDateTime, Error> {
    let description = translate(pattern)?;
    let items = time::format_description::parse(&description)
        .map_err(|err| invalid_pattern(pattern).with_source(err))?;

    let mut parsed = Parsed::new();
    let rest = parsed
        .parse_items(text.as_bytes(), &items)
        .map_err(|err| unparseable(text, pattern).with_source(err))?;
    if !rest.is_empty() {
        return Err(unparseable(text, pattern).with_message(format!(
            "date text has trailing characters after `{pattern}`"
        )));
    }

    let year = match (parsed.year(), parsed.year_last_two()) {
        (Some(year), _) => year,
        (None, Some(last_two)) => 2000 + i32::from(last_two),
        (None, None) => EPOCH_YEAR,
    };
    let month = parsed.month().unwrap_or(Month::January);
    let day = parsed.day().map(NonZeroU8::get).unwrap_or(1);

    let date = if lenient {
        Date::from_calendar_date(year, month, 1)
            .ok()
            .and_then(|first| first.checked_add(Duration::days(i64::from(day) - 1)))
            .ok_or_else(|| calendar_invalid(text))?
    } else {
        Date::from_calendar_date(year, month, day)
            .map_err(|err| calendar_invalid(text).with_source(err))?
    };

    let time = Time::from_hms_nano(
        parsed.hour_24().unwrap_or(0),
        parsed.minute().unwrap_or(0),
        parsed.second().unwrap_or(0),
        parsed.subsecond().unwrap_or(0),
    )
    .map_err(|err| calendar_invalid(text).with_source(err))?;

    Ok(PrimitiveDateTime::new(date, time))
}

pub fn format_local(datetime: PrimitiveDateTime, pattern: &str) -> Result<String, Error> {
    let description = translate(pattern)?;
    let items = time::format_description::parse(&description)
        .map_err(|err| invalid_pattern(pattern).with_source(err))?;
    datetime.format(&items).map_err(|err| {
        invalid_pattern(pattern)
            .with_message(format!("cannot render a date with `{pattern}`"))
            .with_source(err)
    })
}

/// Rewrites a letter pattern into a `time` format description (version 1 syntax).
fn translate(pattern: &str) -> Result<String, Error> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 4);
    let mut idx = 0;

    while idx < chars.len() {
        let ch = chars[idx];

        if ch == '\'' {
            idx += 1;
            if chars.get(idx) == Some(&'\'') {
                out.push('\'');
                idx += 1;
                continue;
            }
            loop {
                match chars.get(idx) {
                    None => {
                        return Err(invalid_pattern(pattern).with_message("unterminated quote"));
                    }
                    Some('\'') if chars.get(idx + 1) == Some(&'\'') => {
                        out.push('\'');
                        idx += 2;
                    }
                    Some('\'') => {
                        idx += 1;
                        break;
                    }
                    Some(literal) => {
                        push_literal(&mut out, *literal);
                        idx += 1;
                    }
                }
            }
            continue;
        }

        if !ch.is_ascii_alphabetic() {
            push_literal(&mut out, ch);
            idx += 1;
            continue;
        }

        let run = chars[idx..].iter().take_while(|next| **next == ch).count();
        let component = match (ch, run) {
            ('y', 4) => "[year]".to_string(),
            ('y', 2) => "[year repr:last_two]".to_string(),
            ('M', 1) => "[month padding:none]".to_string(),
            ('M', 2) => "[month]".to_string(),
            ('M', 3) => "[month repr:short]".to_string(),
            ('M', _) => "[month repr:long]".to_string(),
            ('d', 1) => "[day padding:none]".to_string(),
            ('d', 2) => "[day]".to_string(),
            ('H', 1) => "[hour padding:none]".to_string(),
            ('H', 2) => "[hour]".to_string(),
            ('m', 1) => "[minute padding:none]".to_string(),
            ('m', 2) => "[minute]".to_string(),
            ('s', 1) => "[second padding:none]".to_string(),
            ('s', 2) => "[second]".to_string(),
            ('S', 1..=9) => format!("[subsecond digits:{run}]"),
            _ => {
                return Err(invalid_pattern(pattern).with_message(format!(
                    "unsupported pattern field `{}`",
                    ch.to_string().repeat(run)
                )));
            }
        };
        out.push_str(&component);
        idx += run;
    }

    Ok(out)
}

fn push_literal(out: &mut String, ch: char) {
    if ch == '[' {
        out.push_str("[[");
    } else {
        out.push(ch);
    }
}

fn invalid_pattern(pattern: &str) -> Error {
    Error::new(ErrorKind::InvalidArgument)
        .with_message(format!("invalid date pattern `{pattern}`"))
        .with_hint("Patterns use y, M, d, H, m, s, S and quoted literals, e.g. yyyy-MM-dd'T'HH:mm:ss.")
}

fn unparseable(text: &str, pattern: &str) -> Error {
    Error::new(ErrorKind::ConversionFailure)
        .with_message(format!("date text does not match `{pattern}`"))
        .with_value(format!("{text:?}"))
}

fn calendar_invalid(text: &str) -> Error {
    Error::new(ErrorKind::ConversionFailure)
        .with_message("date text names a day the calendar does not have")
        .with_value(format!("{text:?}"))
        .with_hint("Enable lenient parsing to roll overflowing days into the next month.")
}
