//! Test how the tree reacts to blocks it did not write itself.

use crate::btree::NodeError;
use crate::codec::put_u32;
use crate::e2e_tests::helpers::*;
use crate::schema::KeySpec;
use crate::simulation::SimulatedStorage;
use crate::storage::{Block, BlockKind, BlockStorage};
use crate::{BPlusTree, TreeConfig, TreeError};

fn open(storage: SimulatedStorage) -> Result<BPlusTree<SimulatedStorage>, TreeError> {
    let table = id_table();
    let key_spec = KeySpec::new(&["id"], &table).expect("valid key");
    BPlusTree::with_storage(storage, key_spec, table, &TreeConfig::default())
}

fn internal_block(keys: &[i32], children: &[u32]) -> Block {
    let mut payload = Vec::new();
    put_u32(&mut payload, u32::try_from(keys.len()).expect("small"));
    for &key in keys {
        payload.extend_from_slice(&key.to_be_bytes());
    }
    put_u32(&mut payload, u32::try_from(children.len()).expect("small"));
    for &child in children {
        put_u32(&mut payload, child);
    }
    Block::frame(BlockKind::Internal, &payload).expect("fits")
}

fn leaf_block(keys: &[i32]) -> Block {
    let mut payload = Vec::new();
    put_u32(&mut payload, u32::try_from(keys.len()).expect("small"));
    for &key in keys {
        payload.extend_from_slice(&key.to_be_bytes());
    }
    put_u32(&mut payload, 0);
    Block::frame(BlockKind::Leaf, &payload).expect("fits")
}

#[test]
fn test_descent_into_dead_block_fails() {
    let mut storage = SimulatedStorage::new(0);
    storage.write_block(0, &internal_block(&[10], &[1, 2])).expect("write");
    storage.write_block(1, &leaf_block(&[1, 5])).expect("write");
    storage.write_block(2, &Block::new()).expect("write");

    let mut tree = open(storage).expect("open");

    assert_eq!(tree.find(&id(5)).expect("find"), Some(id(5)));
    assert!(matches!(
        tree.find(&id(20)),
        Err(TreeError::Node(NodeError::DeadBlock(2)))
    ));
    assert!(matches!(
        tree.is_tree_valid(),
        Err(TreeError::Node(NodeError::DeadBlock(2)))
    ));
}

#[test]
fn test_invalid_root_kind_fails_open() {
    let mut storage = SimulatedStorage::new(0);
    let mut block = Block::new();
    block.as_bytes_mut()[0] = 1;
    block.as_bytes_mut()[1] = 9;
    storage.write_block(0, &block).expect("write");

    assert!(matches!(
        open(storage),
        Err(TreeError::Node(NodeError::InvalidKind {
            pointer: 0,
            kind: 9
        }))
    ));
}

#[test]
fn test_out_of_bounds_child_is_invalid() {
    let mut storage = SimulatedStorage::new(0);
    storage.write_block(0, &internal_block(&[10], &[1, 2])).expect("write");
    storage.write_block(1, &leaf_block(&[1, 5])).expect("write");
    // 7 belongs left of the separator.
    storage.write_block(2, &leaf_block(&[7, 12])).expect("write");

    let mut tree = open(storage).expect("open");
    assert!(!tree.is_tree_valid().expect("validate"));
}

#[test]
fn test_dead_root_starts_empty_on_block_zero() {
    let mut storage = SimulatedStorage::new(0);
    for pointer in 0..3 {
        storage.write_block(pointer, &Block::new()).expect("write");
    }

    let mut tree = open(storage).expect("open");
    assert_eq!(tree.height().expect("height"), 0);
    assert_eq!(tree.next_free_block(), 3);

    tree.insert(id(1)).expect("insert");

    assert_eq!(tree.next_free_block(), 3);
    let root = tree.storage().peek(0).expect("root written");
    assert!(root.is_live());
    assert_eq!(tree.find(&id(1)).expect("find"), Some(id(1)));
}

#[test]
fn test_child_pointer_back_to_root_fails() {
    let mut storage = SimulatedStorage::new(0);
    storage.write_block(0, &internal_block(&[10], &[0, 1])).expect("write");
    storage.write_block(1, &leaf_block(&[10, 12])).expect("write");

    let mut tree = open(storage).expect("open");

    assert!(matches!(
        tree.find(&id(3)),
        Err(TreeError::Node(NodeError::TooDeep { pointer: 0, .. }))
    ));
    assert!(matches!(
        tree.insert(id(3)),
        Err(TreeError::Node(NodeError::TooDeep { .. }))
    ));
    assert!(matches!(
        tree.is_tree_valid(),
        Err(TreeError::Node(NodeError::Revisited(0)))
    ));
    assert!(matches!(
        tree.height(),
        Err(TreeError::Node(NodeError::TooDeep { .. }))
    ));
    let mut dump = Vec::new();
    assert!(matches!(
        tree.write_tree(&mut dump),
        Err(TreeError::Node(NodeError::Revisited(0)))
    ));
    // The right subtree is still reachable.
    assert_eq!(tree.find(&id(12)).expect("find"), Some(id(12)));
}

#[test]
fn test_shared_child_is_rejected() {
    let mut storage = SimulatedStorage::new(0);
    storage.write_block(0, &internal_block(&[10, 20], &[1, 1, 2])).expect("write");
    storage.write_block(1, &leaf_block(&[1, 5])).expect("write");
    storage.write_block(2, &leaf_block(&[20, 25])).expect("write");

    let mut tree = open(storage).expect("open");
    assert!(matches!(
        tree.is_tree_valid(),
        Err(TreeError::Node(NodeError::Revisited(1)))
    ));
}
