// Life of an insert:
// 1. The record is checked against the table schema
// 2. Its key is derived from the key fields
// 3. The tree descends from the cached root, loading one block per level
// 4. The target leaf takes the record, splitting if it overflows
// 5. Each level writes its child back and folds in any promoted separator
// 6. A split root moves to a fresh block and a new root takes block 0
//
// System components:
//  - Schema and tuple codecs
//  - Node image of one block, with the recursive algorithms
//  - Block storage (file-backed, or simulated for tests)

pub mod btree;
pub mod codec;
pub mod config;
pub mod schema;
pub mod simulation;
pub mod storage;

#[cfg(test)]
mod e2e_tests;

pub use btree::{BPlusTree, TreeError, compare_keys};
pub use config::{ConfigError, TreeConfig};
pub use schema::{Field, FieldType, Key, KeySpec, Record, SchemaError, TableSpec, Value};
pub use storage::{BlockFile, BlockStorage, StorageError};
