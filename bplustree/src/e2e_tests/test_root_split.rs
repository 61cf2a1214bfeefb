//! Test root growth as sequential keys overflow the root.

use crate::TreeConfig;
use crate::e2e_tests::helpers::*;

#[test]
fn test_hundred_keys_fit_default_root_leaf() {
    let mut index = TestIndex::new(id_table(), &["id"]);
    assert_eq!(index.tree.max_leaf_entries(), 252);

    index.insert_all((1..=100).map(id));

    index.assert_valid();
    assert_eq!(index.tree.height().expect("height"), 1);
    assert_eq!(index.tree.next_free_block(), 1);
}

#[test]
fn test_hundred_keys_split_small_root() {
    let config = TreeConfig::default()
        .with_max_leaf_entries(10)
        .with_max_internal_keys(10);
    let mut index = TestIndex::with_config(id_table(), &["id"], config);

    index.insert_all((1..=100).map(id));

    index.assert_valid();
    assert!(index.tree.height().expect("height") >= 2);
    let bytes = index.file_bytes();
    assert_eq!(bytes[1], 0, "root block should hold an internal node");
    for n in 1..=100 {
        assert_eq!(index.tree.find(&id(n)).expect("find"), Some(id(n)));
    }
}

#[test]
fn test_repeated_root_growth() {
    let mut index = TestIndex::with_config(id_table(), &["id"], small_capacities());

    for n in 1..=200 {
        index.tree.insert(id(n)).expect("insert");
        index.assert_valid();
    }

    // With 4 entries per leaf and 3 keys per internal node this needs
    // several levels.
    assert!(index.tree.height().expect("height") >= 4);
    for n in 1..=200 {
        assert_eq!(index.tree.find(&id(n)).expect("find"), Some(id(n)));
    }
}

#[test]
fn test_descending_inserts() {
    let mut index = TestIndex::with_config(employee_table(), &["id"], small_capacities());

    for n in (1..=60).rev() {
        index.tree.insert(employee(n)).expect("insert");
    }

    index.assert_valid();
    assert_eq!(index.tree.find(&id(33)).expect("find"), Some(employee(33)));
}
