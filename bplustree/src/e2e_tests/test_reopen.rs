//! Test that the tree survives closing and reopening the file.

use crate::e2e_tests::helpers::*;
use crate::schema::Value;

#[test]
fn test_thousand_keys_reopen_and_find() {
    let mut index = TestIndex::new(id_table(), &["id"]);
    index.insert_all((1..=1000).map(id));
    let next_free = index.tree.next_free_block();

    let mut index = index.reopen();

    assert_eq!(index.tree.next_free_block(), next_free);
    let found = index.tree.find(&id(153)).expect("find").expect("present");
    assert_eq!(found[0], Value::Integer(153));
    index.assert_valid();
}

#[test]
fn test_delete_after_reopen() {
    let mut index = TestIndex::new(id_table(), &["id"]);
    index.insert_all((1..=100).map(id));
    let mut index = index.reopen();

    assert_eq!(index.tree.delete(&id(73)).expect("delete"), Some(id(73)));

    index.assert_valid();
    assert_eq!(index.tree.find(&id(73)).expect("find"), None);
    assert_eq!(index.tree.find(&id(74)).expect("find"), Some(id(74)));
}

#[test]
fn test_delete_survives_reopen() {
    let mut index = TestIndex::with_config(employee_table(), &["id"], small_capacities());
    index.insert_all((1..=50).map(employee));
    for n in (1..=50).step_by(3) {
        assert!(index.tree.delete(&id(n)).expect("delete").is_some());
    }

    let mut index = index.reopen();

    index.assert_valid();
    for n in 1..=50 {
        let expected = (n % 3 != 1).then(|| employee(n));
        assert_eq!(index.tree.find(&id(n)).expect("find"), expected, "key {n}");
    }
}

#[test]
fn test_inserts_continue_after_reopen() {
    let mut index = TestIndex::with_config(id_table(), &["id"], small_capacities());
    index.insert_all((1..=30).map(id));
    let mut index = index.reopen();

    index.insert_all((31..=60).map(id));

    index.assert_valid();
    for n in 1..=60 {
        assert_eq!(index.tree.find(&id(n)).expect("find"), Some(id(n)));
    }
    assert_eq!(index.file_bytes().len() % 1024, 0);
}

#[test]
fn test_empty_file_reopens_empty() {
    let index = TestIndex::new(id_table(), &["id"]);
    let mut index = index.reopen();

    assert_eq!(index.tree.height().expect("height"), 0);
    assert!(index.file_bytes().is_empty());
    index.tree.insert(id(1)).expect("insert");
    assert_eq!(index.tree.find(&id(1)).expect("find"), Some(id(1)));
}
