//! Purpose: `recast` CLI entry point: coerce values and reshape JSON records from the shell.
//! Role: Binary crate root; parses args, runs one command, emits JSON on stdout.
//! Invariants: Errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Scope flags apply to exactly one command run.
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue, json};
use time::UtcOffset;
use time::macros::format_description;
use tracing_subscriber::EnvFilter;

use recast::api::{
    ConversionContext, Error, ErrorKind, SemanticKind, Value, ValueMap, convert, map_from_json,
    normalize_keys, to_exit_code, with_context,
};

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "recast",
    version,
    about = "Coerce values and reshape JSON records",
    after_help = r#"EXAMPLES
  $ recast convert 2024-01-31 --to date --date-pattern dd/MM/yyyy
  $ recast convert 2.345 --to big-decimal --scale 2
  $ echo '{"USER_NAME":"ann"}' | recast normalize-keys
  $ recast stringify rows.json --date-pattern yyyyMMdd

Set RUST_LOG=debug to see scope and field tracing on stderr."#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(flatten)]
    scope: ScopeArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct ScopeArgs {
    #[arg(
        long,
        global = true,
        help = "Pattern for rendering date-times (default: yyyy-MM-dd HH:mm:ss)"
    )]
    date_pattern: Option<String>,
    #[arg(long, global = true, help = "Round decimals half-up to this many places")]
    scale: Option<u32>,
    #[arg(long, global = true, help = "Let out-of-range days roll into following months")]
    lenient: bool,
    #[arg(
        long,
        global = true,
        value_parser = parse_offset,
        allow_hyphen_values = true,
        help = "Zone offset bridging local and absolute times, e.g. +02:00 (default: UTC)"
    )]
    offset: Option<UtcOffset>,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Coerce one text value to a kind and print its text form")]
    Convert {
        #[arg(help = "Input text", allow_hyphen_values = true)]
        value: String,
        #[arg(
            long,
            help = "Target kind: bool, char, int8..int64, float32, float64, big-integer, \
                    big-decimal, date, time, date-time, instant, calendar, string"
        )]
        to: SemanticKind,
    },
    #[command(about = "Rewrite object keys to lower camel case")]
    NormalizeKeys {
        #[arg(
            help = "JSON file (object or array of objects); stdin when omitted",
            value_hint = ValueHint::FilePath
        )]
        file: Option<PathBuf>,
    },
    #[command(about = "Render every value of JSON object(s) as text")]
    Stringify {
        #[arg(
            help = "JSON file (object or array of objects); stdin when omitted",
            value_hint = ValueHint::FilePath
        )]
        file: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct Converted {
    kind: String,
    value: Option<String>,
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(code);
            }
            _ => {
                return Err(Error::new(ErrorKind::InvalidArgument)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `recast --help` for usage."));
            }
        },
    };

    let mut ctx = cli.scope.context();
    let output = match cli.command {
        Command::Convert { value, to } => {
            with_context(&mut ctx, |ctx| convert_one(value, to, ctx))?
        }
        Command::NormalizeKeys { file } => {
            let input = read_json(file.as_deref())?;
            for_each_object(input, |object| {
                let mut keyed: BTreeMap<String, JsonValue> = object.into_iter().collect();
                normalize_keys(&mut keyed);
                Ok(JsonValue::Object(keyed.into_iter().collect()))
            })?
        }
        Command::Stringify { file } => {
            let input = read_json(file.as_deref())?;
            with_context(&mut ctx, |ctx| {
                for_each_object(input, |object| {
                    let map = map_from_json(&object)?;
                    stringify(&map, ctx)
                })
            })?
        }
    };

    let text = serde_json::to_string(&output).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode output")
            .with_source(err)
    })?;
    println!("{text}");
    Ok(0)
}

impl ScopeArgs {
    fn context(&self) -> ConversionContext {
        let mut ctx = ConversionContext::new().with_lenient(self.lenient);
        if let Some(pattern) = &self.date_pattern {
            ctx.set_date_pattern(pattern.clone());
        }
        if let Some(scale) = self.scale {
            ctx.set_decimal_scale(scale);
        }
        if let Some(offset) = self.offset {
            ctx.set_offset(offset);
        }
        ctx
    }
}

fn parse_offset(input: &str) -> Result<UtcOffset, String> {
    if input.eq_ignore_ascii_case("utc") || input == "Z" {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(
        input,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|err| format!("expected an offset like +02:00 ({err})"))
}

fn convert_one(
    text: String,
    to: SemanticKind,
    ctx: &ConversionContext,
) -> Result<JsonValue, Error> {
    let rendered = match convert(Value::String(text), to, ctx)? {
        Some(value) => render(value, ctx)?,
        None => None,
    };
    let converted = Converted {
        kind: to.to_string(),
        value: rendered,
    };
    serde_json::to_value(converted).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode result")
            .with_source(err)
    })
}

fn render(value: Value, ctx: &ConversionContext) -> Result<Option<String>, Error> {
    match convert(value, SemanticKind::String, ctx)? {
        Some(Value::String(text)) => Ok(Some(text)),
        Some(other) => Ok(Some(other.to_string())),
        None => Ok(None),
    }
}

fn stringify(map: &ValueMap, ctx: &ConversionContext) -> Result<JsonValue, Error> {
    let mut out = Map::new();
    for (key, value) in map {
        if value.is_null() {
            continue;
        }
        let text = render(value.clone(), ctx).map_err(|err| err.with_field(key.clone()))?;
        if let Some(text) = text {
            out.insert(key.clone(), JsonValue::String(text));
        }
    }
    Ok(JsonValue::Object(out))
}

fn read_json(path: Option<&Path>) -> Result<JsonValue, Error> {
    let text = match path {
        Some(path) => fs::read_to_string(path).map_err(|err| {
            Error::new(ErrorKind::InvalidArgument)
                .with_message(format!("cannot read {}", path.display()))
                .with_source(err)
        })?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).map_err(|err| {
                Error::new(ErrorKind::Internal)
                    .with_message("failed to read stdin")
                    .with_source(err)
            })?;
            buf
        }
    };
    serde_json::from_str(&text).map_err(|err| {
        Error::new(ErrorKind::InvalidArgument)
            .with_message("input is not valid JSON")
            .with_hint("Pass a JSON object or an array of objects.")
            .with_source(err)
    })
}

fn for_each_object(
    input: JsonValue,
    mut each: impl FnMut(Map<String, JsonValue>) -> Result<JsonValue, Error>,
) -> Result<JsonValue, Error> {
    match input {
        JsonValue::Object(object) => each(object),
        JsonValue::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                JsonValue::Object(object) => each(object).map_err(|err| err.with_index(index)),
                _ => Err(not_an_object().with_index(index)),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(JsonValue::Array),
        _ => Err(not_an_object()),
    }
}

fn not_an_object() -> Error {
    Error::new(ErrorKind::InvalidArgument)
        .with_message("expected a JSON object")
        .with_hint("Pass a JSON object or an array of objects.")
}

fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.trim_start_matches("error:").trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn emit_error(err: &Error) {
    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::InvalidArgument => "invalid argument".to_string(),
        ErrorKind::ConversionFailure => "conversion failed".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> JsonValue {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(field) = err.field() {
        inner.insert("field".to_string(), json!(field));
    }
    if let Some(value) = err.value() {
        inner.insert("value".to_string(), json!(value));
    }
    if let Some(target) = err.target() {
        inner.insert("target".to_string(), json!(target.to_string()));
    }
    if let Some(index) = err.index() {
        inner.insert("index".to_string(), json!(index));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), JsonValue::Object(inner));
    JsonValue::Object(outer)
}
