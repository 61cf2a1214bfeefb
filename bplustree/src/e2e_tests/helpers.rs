//! Common helpers for end-to-end tests.

use tempfile::TempDir;

use crate::schema::{Field, Record, TableSpec, Value};
use crate::{BPlusTree, TreeConfig};

/// Name of the index file inside each test directory.
pub const INDEX_FILE: &str = "test.idx";

/// RAII guard that removes the index directory on drop.
pub struct TestIndex {
    pub tree: BPlusTree,
    dir: TempDir,
    table: TableSpec,
    key_fields: Vec<String>,
    config: TreeConfig,
}

impl TestIndex {
    /// Create a fresh index with block-derived capacities.
    #[must_use]
    pub fn new(table: TableSpec, key_fields: &[&str]) -> Self {
        Self::with_config(table, key_fields, TreeConfig::default())
    }

    /// Create a fresh index; the store directory is replaced by a temp dir.
    #[must_use]
    pub fn with_config(table: TableSpec, key_fields: &[&str], config: TreeConfig) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = TreeConfig {
            store_directory: dir.path().to_path_buf(),
            ..config
        };
        let key_fields: Vec<String> = key_fields.iter().map(ToString::to_string).collect();
        let tree = BPlusTree::open(&config, INDEX_FILE, &key_fields, table.clone())
            .expect("open tree");

        Self {
            tree,
            dir,
            table,
            key_fields,
            config,
        }
    }

    /// Close the tree and open the same file again.
    #[must_use]
    pub fn reopen(self) -> Self {
        let Self {
            tree,
            dir,
            table,
            key_fields,
            config,
        } = self;
        tree.close().expect("close tree");

        let tree = BPlusTree::open(&config, INDEX_FILE, &key_fields, table.clone())
            .expect("reopen tree");
        Self {
            tree,
            dir,
            table,
            key_fields,
            config,
        }
    }

    /// Raw contents of the index file.
    #[must_use]
    pub fn file_bytes(&self) -> Vec<u8> {
        std::fs::read(self.dir.path().join(INDEX_FILE)).expect("read index file")
    }

    pub fn insert_all(&mut self, records: impl IntoIterator<Item = Record>) {
        for record in records {
            self.tree.insert(record).expect("insert");
        }
    }

    pub fn assert_valid(&mut self) {
        assert!(self.tree.is_tree_valid().expect("validate"), "tree is invalid");
    }
}

/// Schema with a single integer key field.
#[must_use]
pub fn id_table() -> TableSpec {
    TableSpec::new(vec![Field::integer("id")]).expect("valid table")
}

/// Schema with an integer key and some payload fields.
#[must_use]
pub fn employee_table() -> TableSpec {
    TableSpec::new(vec![
        Field::integer("id"),
        Field::string("name", 8),
        Field::decimal("salary"),
        Field::boolean("active"),
    ])
    .expect("valid table")
}

#[must_use]
pub fn id(n: i32) -> Vec<Value> {
    vec![Value::Integer(n)]
}

#[must_use]
pub fn employee(n: i32) -> Record {
    #[allow(clippy::cast_precision_loss)]
    let salary = n as f32 * 1.5;
    vec![
        Value::Integer(n),
        Value::String(format!("e{n}")),
        Value::Decimal(salary),
        Value::Bool(n % 2 == 0),
    ]
}

/// Capacities small enough that a few dozen keys build a deep tree.
#[must_use]
pub fn small_capacities() -> TreeConfig {
    TreeConfig::default()
        .with_max_leaf_entries(4)
        .with_max_internal_keys(3)
}
