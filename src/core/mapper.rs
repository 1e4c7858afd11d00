//! Purpose: Copy values between typed records and key/value maps, singly or in batches.
//! Exports: `Mapper`.
//! Role: Orchestrates the field reflector and the coercion engine under one context scope.
//! Invariants: Each top-level call consumes the pending context exactly once, on every path.
//! Invariants: Absent or unconvertible source values never overwrite destination fields.
//! Invariants: A failure aborts the remaining fields and elements; earlier writes stay.
use crate::core::coerce;
use crate::core::context::{ConversionContext, with_context};
use crate::core::error::Error;
use crate::core::kind::SemanticKind;
use crate::core::reflect::{FieldReflector, FieldSource, Record};
use crate::core::value::{Value, ValueMap};
use time::UtcOffset;

/// Entry point for mapping calls.
///
/// Settings made through the setters apply to the next top-level call only; every mapping
/// method releases them when it returns, whether it succeeds or fails. A batch call applies
/// them to all of its elements.
#[derive(Debug, Default)]
pub struct Mapper {
    context: ConversionContext,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_date_pattern(&mut self, pattern: impl Into<String>) -> &mut Self {
        self.context.set_date_pattern(pattern);
        self
    }

    pub fn set_decimal_scale(&mut self, scale: u32) -> &mut Self {
        self.context.set_decimal_scale(scale);
        self
    }

    pub fn set_lenient(&mut self, lenient: bool) -> &mut Self {
        self.context.set_lenient(lenient);
        self
    }

    pub fn set_offset(&mut self, offset: UtcOffset) -> &mut Self {
        self.context.set_offset(offset);
        self
    }

    /// Drops pending settings without running a mapping call.
    pub fn reset_scope(&mut self) {
        self.context.reset();
    }

    /// Settings waiting for the next top-level call.
    pub fn pending(&self) -> &ConversionContext {
        &self.context
    }

    /// Converts one value under the pending settings.
    pub fn convert(&mut self, value: Value, target: SemanticKind) -> Result<Option<Value>, Error> {
        with_context(&mut self.context, |ctx| coerce::convert(value, target, ctx))
    }

    pub fn map_record_to_record<S, D>(
        &mut self,
        source: &S,
        destination: &mut D,
    ) -> Result<(), Error>
    where
        S: Record,
        D: Record,
    {
        with_context(&mut self.context, |ctx| copy_fields(source, destination, ctx))
    }

    /// Looks up each destination field by its exact name; keys are not normalized here.
    pub fn map_map_to_record<D: Record>(
        &mut self,
        source: &ValueMap,
        destination: &mut D,
    ) -> Result<(), Error> {
        with_context(&mut self.context, |ctx| copy_fields(source, destination, ctx))
    }

    pub fn map_to_new_record<S, D>(&mut self, source: &S) -> Result<D, Error>
    where
        S: FieldSource,
        D: Record + Default,
    {
        with_context(&mut self.context, |ctx| new_record(source, ctx))
    }

    pub fn map_records_to_new_records<S, D>(&mut self, sources: &[S]) -> Result<Vec<D>, Error>
    where
        S: FieldSource,
        D: Record + Default,
    {
        with_context(&mut self.context, |ctx| {
            batch(sources, ctx, |source, ctx| new_record(source, ctx))
        })
    }

    /// Every readable field becomes an entry; null values are left out.
    pub fn map_record_to_map<S: Record>(
        &mut self,
        source: &S,
        stringify: bool,
    ) -> Result<ValueMap, Error> {
        with_context(&mut self.context, |ctx| record_to_map(source, stringify, ctx))
    }

    pub fn map_records_to_maps<S: Record>(
        &mut self,
        sources: &[S],
        stringify: bool,
    ) -> Result<Vec<ValueMap>, Error> {
        with_context(&mut self.context, |ctx| {
            batch(sources, ctx, |source, ctx| record_to_map(source, stringify, ctx))
        })
    }
}

fn batch<S, T>(
    sources: &[S],
    ctx: &ConversionContext,
    mut each: impl FnMut(&S, &ConversionContext) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    tracing::debug!(elements = sources.len(), "batch scope opened");
    let mut out = Vec::with_capacity(sources.len());
    for (index, source) in sources.iter().enumerate() {
        let mapped = each(source, ctx).map_err(|err| {
            tracing::debug!(index, "batch aborted");
            err.with_index(index)
        })?;
        out.push(mapped);
    }
    tracing::debug!(elements = out.len(), "batch scope closed");
    Ok(out)
}

fn new_record<S, D>(source: &S, ctx: &ConversionContext) -> Result<D, Error>
where
    S: FieldSource + ?Sized,
    D: Record + Default,
{
    let mut destination = D::default();
    copy_fields(source, &mut destination, ctx)?;
    Ok(destination)
}

fn copy_fields<S, D>(source: &S, destination: &mut D, ctx: &ConversionContext) -> Result<(), Error>
where
    S: FieldSource + ?Sized,
    D: Record,
{
    let fields = FieldReflector::global().fields_of::<D>();
    for field in fields.assignable() {
        let Some(value) = source.read(field.name) else {
            tracing::trace!(field = field.name, "not in source");
            continue;
        };
        let converted = coerce::convert(value, field.kind, ctx)
            .map_err(|err| err.with_field(field.name))?;
        match converted {
            Some(converted) => {
                destination
                    .write(field.name, converted)
                    .map_err(|err| err.with_field(field.name))?;
                tracing::trace!(field = field.name, kind = %field.kind, "assigned");
            }
            None => tracing::trace!(field = field.name, kind = %field.kind, "left unchanged"),
        }
    }
    Ok(())
}

fn record_to_map<S: Record>(
    source: &S,
    stringify: bool,
    ctx: &ConversionContext,
) -> Result<ValueMap, Error> {
    let fields = FieldReflector::global().fields_of::<S>();
    let mut map = ValueMap::new();
    for field in fields.readable() {
        let value = match source.read(field.name) {
            Some(value) if !value.is_null() => value,
            _ => continue,
        };
        let value = if stringify {
            match coerce::convert(value, SemanticKind::String, ctx)
                .map_err(|err| err.with_field(field.name))?
            {
                Some(text) => text,
                None => continue,
            }
        } else {
            value
        };
        map.insert(field.name.to_string(), value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::Mapper;
    use crate::core::error::ErrorKind;
    use crate::core::kind::SemanticKind;
    use crate::core::value::{Value, ValueMap};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use time::macros::{date, datetime};

    crate::symbolic_enum! {
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
        enum Tier {
            #[default]
            Basic,
            Gold,
        }
    }

    crate::record! {
        #[derive(Clone, Debug, Default, PartialEq)]
        struct Account {
            id: i64 [readonly],
            owner: String,
            balance: Decimal,
            opened: Option<time::Date>,
        }
    }

    crate::record! {
        #[derive(Clone, Debug, Default, PartialEq)]
        struct Premium: Account {
            tier: Tier,
            visits: i32,
        }
    }

    crate::record! {
        #[derive(Clone, Debug, Default, PartialEq)]
        struct AccountView {
            id: String,
            owner: String,
            balance: String,
            opened: String,
            tier: Option<Tier>,
        }
    }

    fn dec(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    fn premium() -> Premium {
        Premium {
            base: Account {
                id: 7,
                owner: "ann".to_string(),
                balance: dec("10.125"),
                opened: Some(date!(2024-01-31)),
            },
            tier: Tier::Gold,
            visits: 3,
        }
    }

    fn map(entries: &[(&str, Value)]) -> ValueMap {
        entries
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn record_to_record_converts_by_name() {
        let mut mapper = Mapper::new();
        let mut view = AccountView::default();
        mapper.map_record_to_record(&premium(), &mut view).unwrap();
        assert_eq!(view.id, "7");
        assert_eq!(view.owner, "ann");
        assert_eq!(view.balance, "10.125");
        assert_eq!(view.opened, "2024-01-31");
        assert_eq!(view.tier, Some(Tier::Gold));
    }

    #[test]
    fn final_fields_are_never_targets() {
        let mut mapper = Mapper::new();
        let mut account = Account {
            id: 1,
            ..Account::default()
        };
        let source = map(&[("id", Value::I64(99)), ("owner", Value::from("bo"))]);
        mapper.map_map_to_record(&source, &mut account).unwrap();
        assert_eq!(account.id, 1);
        assert_eq!(account.owner, "bo");
    }

    #[test]
    fn absent_and_null_values_keep_destination() {
        let mut mapper = Mapper::new();
        let mut target = premium();
        let source = map(&[
            ("owner", Value::Null),
            ("balance", Value::from("")),
            ("visits", Value::Bool(true)),
        ]);
        mapper.map_map_to_record(&source, &mut target).unwrap();
        assert_eq!(target, premium());
    }

    #[test]
    fn map_lookup_is_exact() {
        let mut mapper = Mapper::new();
        let source = map(&[("Owner", Value::from("x")), ("visits", Value::from("12"))]);
        let premium: Premium = mapper.map_to_new_record(&source).unwrap();
        assert_eq!(premium.base.owner, "");
        assert_eq!(premium.visits, 12);
    }

    #[test]
    fn failure_names_the_field_and_releases_scope() {
        let mut mapper = Mapper::new();
        mapper.set_decimal_scale(1);
        let source = map(&[("visits", Value::from("many"))]);
        let err = mapper.map_to_new_record::<_, Premium>(&source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConversionFailure);
        assert_eq!(err.field(), Some("visits"));
        assert_eq!(err.target(), Some(SemanticKind::Int32));
        assert!(mapper.pending().is_default());
    }

    #[test]
    fn record_to_map_skips_nulls_and_can_stringify() {
        let mut mapper = Mapper::new();
        let mut source = premium();
        source.base.opened = None;

        let plain = mapper.map_record_to_map(&source, false).unwrap();
        assert_eq!(plain.get("id"), Some(&Value::I64(7)));
        assert_eq!(plain.get("balance"), Some(&Value::Decimal(dec("10.125"))));
        assert!(!plain.contains_key("opened"));
        assert_eq!(plain.len(), 5);

        mapper.set_decimal_scale(2);
        let text = mapper.map_record_to_map(&source, true).unwrap();
        assert_eq!(text.get("balance"), Some(&Value::from("10.13")));
        assert_eq!(text.get("tier"), Some(&Value::from("Gold")));
        assert_eq!(text.get("visits"), Some(&Value::from("3")));
    }

    #[test]
    fn batches_share_one_scope() {
        let mut mapper = Mapper::new();
        let sources: Vec<ValueMap> = ["1.23456", "2.5", "0.0005"]
            .iter()
            .map(|text| map(&[("balance", Value::from(*text))]))
            .collect();

        mapper.set_decimal_scale(3);
        let scaled: Vec<Account> = mapper.map_records_to_new_records(&sources).unwrap();
        let balances: Vec<_> = scaled.iter().map(|account| account.balance.to_string()).collect();
        assert_eq!(balances, ["1.235", "2.500", "0.001"]);

        let unscaled: Vec<Account> = mapper.map_records_to_new_records(&sources).unwrap();
        assert_eq!(unscaled[0].balance.to_string(), "1.23456");
    }

    #[test]
    fn batch_failure_reports_index_and_stops() {
        let mut mapper = Mapper::new();
        mapper.set_date_pattern("yyyy");
        let sources = vec![
            map(&[("opened", Value::from("2024-01-31"))]),
            map(&[("opened", Value::from("2024-02-30"))]),
        ];
        let err = mapper
            .map_records_to_new_records::<_, Account>(&sources)
            .unwrap_err();
        assert_eq!(err.index(), Some(1));
        assert_eq!(err.field(), Some("opened"));
        assert!(mapper.pending().is_default());
    }

    #[test]
    fn records_to_maps_and_single_convert() {
        let mut mapper = Mapper::new();
        let maps = mapper
            .map_records_to_maps(&[premium(), premium()], true)
            .unwrap();
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[1].get("opened"), Some(&Value::from("2024-01-31")));

        mapper.set_date_pattern("dd.MM.yyyy HH:mm");
        let text = mapper
            .convert(
                Value::DateTime(datetime!(2024-07-04 9:30)),
                SemanticKind::String,
            )
            .unwrap();
        assert_eq!(text, Some(Value::from("04.07.2024 09:30")));
        assert!(mapper.pending().is_default());
    }
}
