//! Test the exact on-disk block layout.

use crate::TreeConfig;
use crate::e2e_tests::helpers::*;
use crate::storage::BLOCK_SIZE;

fn block(bytes: &[u8], pointer: usize) -> &[u8] {
    &bytes[pointer * BLOCK_SIZE..(pointer + 1) * BLOCK_SIZE]
}

#[test]
fn test_single_record_block() {
    let mut index = TestIndex::new(id_table(), &["id"]);
    index.tree.insert(id(7)).expect("insert");

    let index = index.reopen();
    let bytes = index.file_bytes();

    assert_eq!(bytes.len(), BLOCK_SIZE);
    assert_eq!(
        &bytes[..14],
        &[
            1, 1, // live, leaf
            0, 0, 0, 1, // one record
            0, 0, 0, 7, // id
            0, 0, 0, 0, // no sibling
        ]
    );
    assert!(bytes[14..].iter().all(|&b| b == 0));
}

#[test]
fn test_mixed_field_record_block() {
    let mut index = TestIndex::new(employee_table(), &["id"]);
    index.tree.insert(employee(258)).expect("insert");
    let bytes = index.file_bytes();

    assert_eq!(
        &bytes[..27],
        &[
            1, 1, // live, leaf
            0, 0, 0, 1, // one record
            0, 0, 1, 2, // id 258
            0, 0, 0, 4, b'e', b'2', b'5', b'8', // name
            0x43, 0xC1, 0x80, 0x00, // salary 387.0
            1,    // active
            0, 0, 0, 0, // no sibling
        ]
    );
}

#[test]
fn test_root_split_layout() {
    let config = TreeConfig::default()
        .with_max_leaf_entries(4)
        .with_max_internal_keys(4);
    let mut index = TestIndex::with_config(id_table(), &["id"], config);
    index.insert_all((1..=5).map(id));
    let bytes = index.file_bytes();

    assert_eq!(bytes.len(), 3 * BLOCK_SIZE);
    assert_eq!(u32::try_from(bytes.len() / BLOCK_SIZE), Ok(index.tree.next_free_block()));

    // New root: one separator over the relocated old root and its sibling.
    assert_eq!(
        &block(&bytes, 0)[..22],
        &[
            1, 0, // live, internal
            0, 0, 0, 1, // one key
            0, 0, 0, 3, // separator
            0, 0, 0, 2, // two children
            0, 0, 0, 2, // relocated old root
            0, 0, 0, 1, // split-off sibling
        ]
    );
    // Sibling keeps the upper half.
    assert_eq!(
        &block(&bytes, 1)[..22],
        &[1, 1, 0, 0, 0, 3, 0, 0, 0, 3, 0, 0, 0, 4, 0, 0, 0, 5, 0, 0, 0, 0]
    );
    // Old root keeps the lower half and links to its sibling.
    assert_eq!(
        &block(&bytes, 2)[..18],
        &[1, 1, 0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 1]
    );
}

#[test]
fn test_file_grows_in_whole_blocks() {
    let mut index = TestIndex::with_config(employee_table(), &["id"], small_capacities());
    for n in 0..120 {
        index.tree.insert(employee(n * 7 % 120)).expect("insert");
        let len = index.file_bytes().len();
        assert_eq!(len % BLOCK_SIZE, 0);
        assert_eq!(
            u32::try_from(len / BLOCK_SIZE),
            Ok(index.tree.next_free_block())
        );
    }
    assert_eq!(index.file_bytes()[1], 0);
}
