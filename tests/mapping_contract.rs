// Contract tests for mapping, coercion scope and key normalization through the public API.
use std::collections::BTreeMap;
use std::str::FromStr;
use std::thread;

use recast::api::{
    ConversionContext, ErrorKind, Mapper, SemanticKind, Value, ValueMap, convert, normalize_keys,
    to_camel_case,
};
use rust_decimal::Decimal;
use time::macros::{date, datetime};

recast::symbolic_enum! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    pub enum Role {
        #[default]
        Member,
        Admin,
    }
}

recast::record! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Person {
        pub name: String,
        pub age: i32,
        pub born: Option<time::Date>,
    }
}

recast::record! {
    #[derive(Clone, Debug, Default, PartialEq)]
    pub struct Employee: Person {
        pub salary: Decimal,
        pub hired: Option<time::PrimitiveDateTime>,
        pub role: Role,
        pub badge: i64 [readonly],
    }
}

fn dec(text: &str) -> Decimal {
    Decimal::from_str(text).expect("decimal literal")
}

fn employee(salary: &str) -> Employee {
    Employee {
        base: Person {
            name: "ann".to_string(),
            age: 41,
            born: Some(date!(1983-05-17)),
        },
        salary: dec(salary),
        hired: Some(datetime!(2020-02-29 09:15:00)),
        role: Role::Admin,
        badge: 0,
    }
}

#[test]
fn record_survives_a_map_round_trip() {
    let mut mapper = Mapper::new();
    let original = employee("5120.75");
    let map = mapper.map_record_to_map(&original, false).unwrap();
    let restored: Employee = mapper.map_to_new_record(&map).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn stringified_map_also_round_trips() {
    let mut mapper = Mapper::new();
    let original = employee("5120.75");
    let map = mapper.map_record_to_map(&original, true).unwrap();
    assert_eq!(map.get("hired"), Some(&Value::from("2020-02-29 09:15:00")));
    assert_eq!(map.get("born"), Some(&Value::from("1983-05-17")));
    assert_eq!(map.get("age"), Some(&Value::from("41")));
    let restored: Employee = mapper.map_to_new_record(&map).unwrap();
    assert_eq!(restored, original);
}

#[test]
fn null_and_missing_sources_leave_fields_alone() {
    let mut mapper = Mapper::new();
    let mut target = employee("1");
    let mut source = ValueMap::new();
    source.insert("name".to_string(), Value::Null);
    source.insert("born".to_string(), Value::from(""));
    mapper.map_map_to_record(&source, &mut target).unwrap();
    assert_eq!(target, employee("1"));

    let blank = Person::default();
    mapper
        .map_record_to_record(&blank, &mut target.base)
        .unwrap();
    assert_eq!(target.base.name, "");
    assert_eq!(target.base.born, Some(date!(1983-05-17)));
}

#[test]
fn decimal_rounding_is_half_up() {
    let ctx = ConversionContext::new().with_decimal_scale(2);
    for (input, expected) in [("2.345", "2.35"), ("2.344", "2.34"), ("-2.345", "-2.35")] {
        let decimal = convert(Value::from(input), SemanticKind::BigDecimal, &ctx)
            .unwrap()
            .unwrap();
        let text = convert(decimal, SemanticKind::String, &ctx).unwrap();
        assert_eq!(text, Some(Value::from(expected)), "{input}");
    }
}

#[test]
fn date_layouts_are_detected_from_text() {
    let mut mapper = Mapper::new();
    assert_eq!(
        mapper
            .convert(Value::from("2024-01-31"), SemanticKind::DateOnly)
            .unwrap(),
        Some(Value::Date(date!(2024-01-31)))
    );
    assert_eq!(
        mapper
            .convert(Value::from("2024-01-31 10:20:30"), SemanticKind::DateTime)
            .unwrap(),
        Some(Value::DateTime(datetime!(2024-01-31 10:20:30)))
    );
    assert_eq!(
        mapper
            .convert(Value::from("20240131"), SemanticKind::DateOnly)
            .unwrap(),
        Some(Value::Date(date!(2024-01-31)))
    );
}

#[test]
fn strict_mode_rejects_and_lenient_mode_rolls_over() {
    let mut mapper = Mapper::new();
    let err = mapper
        .convert(Value::from("2024-02-30"), SemanticKind::DateOnly)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailure);
    assert_eq!(err.target(), Some(SemanticKind::DateOnly));

    mapper.set_lenient(true);
    assert_eq!(
        mapper
            .convert(Value::from("2024-02-30"), SemanticKind::DateOnly)
            .unwrap(),
        Some(Value::Date(date!(2024-03-01)))
    );

    // Lenient mode was consumed by the previous call.
    assert!(
        mapper
            .convert(Value::from("2024-02-30"), SemanticKind::DateOnly)
            .is_err()
    );
}

#[test]
fn batch_shares_one_scope_and_releases_it() {
    let mut mapper = Mapper::new();
    let records: Vec<Employee> = ["1.23456", "2", "3.0005", "4.1", "5.99999"]
        .iter()
        .map(|salary| employee(salary))
        .collect();

    mapper.set_decimal_scale(3);
    let scaled = mapper.map_records_to_maps(&records, true).unwrap();
    let salaries: Vec<_> = scaled.iter().map(|map| map["salary"].clone()).collect();
    assert_eq!(
        salaries,
        ["1.235", "2.000", "3.001", "4.100", "6.000"].map(Value::from)
    );

    let later = mapper.map_record_to_map(&records[0], true).unwrap();
    assert_eq!(later["salary"], Value::from("1.23456"));
}

#[test]
fn failing_batch_reports_element_and_field() {
    let mut mapper = Mapper::new();
    mapper.set_decimal_scale(1);
    let rows: Vec<ValueMap> = ["40", "forty", "41"]
        .iter()
        .map(|age| ValueMap::from([("age".to_string(), Value::from(*age))]))
        .collect();
    let err = mapper
        .map_records_to_new_records::<_, Person>(&rows)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailure);
    assert_eq!(err.index(), Some(1));
    assert_eq!(err.field(), Some("age"));
    assert_eq!(err.value(), Some("\"forty\""));
    assert!(mapper.pending().is_default());
}

#[test]
fn enums_and_readonly_fields() {
    let mut mapper = Mapper::new();
    let source = ValueMap::from([
        ("role".to_string(), Value::from("Admin")),
        ("badge".to_string(), Value::I64(77)),
    ]);
    let hired: Employee = mapper.map_to_new_record(&source).unwrap();
    assert_eq!(hired.role, Role::Admin);
    assert_eq!(hired.badge, 0);

    let bad = ValueMap::from([("role".to_string(), Value::from("admin"))]);
    let err = mapper.map_to_new_record::<_, Employee>(&bad).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailure);
    assert_eq!(err.field(), Some("role"));
}

#[test]
fn scopes_do_not_cross_threads() {
    let handles: Vec<_> = (0..4u32)
        .map(|scale| {
            thread::spawn(move || {
                let mut mapper = Mapper::new();
                mapper.set_decimal_scale(scale);
                let map = mapper
                    .map_record_to_map(&employee("7.77777"), true)
                    .unwrap();
                (scale, map["salary"].clone())
            })
        })
        .collect();
    for handle in handles {
        let (scale, salary) = handle.join().unwrap();
        let mut expected = dec("7.77777")
            .round_dp_with_strategy(scale, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
        expected.rescale(scale);
        assert_eq!(salary, Value::String(expected.to_string()));
    }
}

#[test]
fn normalized_keys_collide_last_write_wins() {
    let mut map = BTreeMap::from([
        ("user_name".to_string(), Value::I64(1)),
        ("userName".to_string(), Value::I64(2)),
    ]);
    normalize_keys(&mut map);
    assert_eq!(map.len(), 1);
    assert_eq!(map["userName"], Value::I64(1));

    for key in ["user_name", "USER_NAME", "_a_b", "already", "x__y_z"] {
        let once = to_camel_case(key);
        assert_eq!(to_camel_case(&once), once);
    }
}

#[test]
fn normalized_rows_feed_the_mapper() {
    let mut mapper = Mapper::new();
    let mut row = ValueMap::from([
        ("NAME".to_string(), Value::from("bo")),
        ("AGE".to_string(), Value::I64(30)),
        ("born_on".to_string(), Value::from("1994-03-02")),
    ]);
    normalize_keys(&mut row);
    let person: Person = mapper.map_to_new_record(&row).unwrap();
    assert_eq!(person.name, "bo");
    assert_eq!(person.age, 30);
    assert_eq!(person.born, None);
}

mod intake {
    recast::symbolic_enum! {
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
        pub enum Status {
            #[default]
            Open,
            Closed,
        }
    }

    recast::record! {
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct Request {
            pub status: Status,
        }
    }
}

mod desk {
    recast::symbolic_enum! {
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
        pub enum Status {
            #[default]
            Open,
            Escalated,
        }
    }

    recast::record! {
        #[derive(Clone, Debug, Default, PartialEq)]
        pub struct Ticket {
            pub status: Status,
        }
    }
}

#[test]
fn same_named_enums_map_by_symbol() {
    let mut mapper = Mapper::new();
    let open = intake::Request {
        status: intake::Status::Open,
    };
    let ticket: desk::Ticket = mapper.map_to_new_record(&open).unwrap();
    assert_eq!(ticket.status, desk::Status::Open);

    let closed = intake::Request {
        status: intake::Status::Closed,
    };
    let err = mapper
        .map_to_new_record::<_, desk::Ticket>(&closed)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConversionFailure);
    assert_eq!(err.field(), Some("status"));
}
