//! Test keys spanning several fields.

use crate::e2e_tests::helpers::*;
use crate::schema::{Field, Record, TableSpec, Value};
use crate::{SchemaError, TreeError};

fn person_table() -> TableSpec {
    TableSpec::new(vec![
        Field::string("last", 12),
        Field::string("first", 12),
        Field::integer("age"),
    ])
    .expect("valid table")
}

fn person(last: &str, first: &str, age: i32) -> Record {
    vec![Value::from(last), Value::from(first), Value::Integer(age)]
}

fn name(last: &str, first: &str) -> Vec<Value> {
    vec![Value::from(last), Value::from(first)]
}

#[test]
fn test_composite_key_lookup() {
    let mut index = TestIndex::with_config(person_table(), &["last", "first"], small_capacities());
    let people = [
        ("Hopper", "Grace", 85),
        ("Lovelace", "Ada", 36),
        ("Hopper", "Edward", 40),
        ("Turing", "Alan", 41),
        ("Lovelace", "Byron", 99),
        ("Knuth", "Donald", 30),
        ("Hopper", "Aaron", 12),
        ("Ritchie", "Dennis", 70),
    ];
    index.insert_all(people.iter().map(|&(l, f, a)| person(l, f, a)));

    index.assert_valid();
    for (last, first, age) in people {
        assert_eq!(
            index.tree.find(&name(last, first)).expect("find"),
            Some(person(last, first, age))
        );
    }
    assert_eq!(index.tree.find(&name("Hopper", "Zed")).expect("find"), None);
}

#[test]
fn test_key_field_order_follows_key_spec() {
    // Key is (first, last) even though the table declares last first.
    let mut index = TestIndex::new(person_table(), &["first", "last"]);
    index.insert_all([person("Smith", "Ann", 1), person("Jones", "Bob", 2)]);

    assert_eq!(
        index.tree.find(&name("Ann", "Smith")).expect("find"),
        Some(person("Smith", "Ann", 1))
    );
    assert!(index.tree.find(&name("Smith", "Ann")).expect("find").is_none());
}

#[test]
fn test_key_field_subset_overwrites() {
    let mut index = TestIndex::new(person_table(), &["last"]);
    index.insert_all([person("Curie", "Marie", 66), person("Curie", "Pierre", 46)]);

    assert_eq!(
        index.tree.find(&[Value::from("Curie")]).expect("find"),
        Some(person("Curie", "Pierre", 46))
    );
}

#[test]
fn test_empty_key_rejected() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let no_fields: [&str; 0] = [];
    let result = crate::BPlusTree::create(dir.path(), INDEX_FILE, &no_fields, person_table());
    assert!(matches!(result, Err(TreeError::Schema(SchemaError::EmptyKey))));
}
