//! Tree configuration.
//!
//! # Environment Variables
//!
//! - `BPLUSTREE_STORE_DIRECTORY`: Directory holding index files (default: `.`)
//!
//! # Invariants
//!
//! - `store_directory` is always a path (it may not exist yet; opening a tree
//!   creates it)
//! - capacity caps, when set, are at least 2

use std::env::VarError;
use std::path::PathBuf;

/// Smallest node capacity for which a split leaves both halves within bounds.
pub const MIN_CAPACITY: usize = 2;

/// Configuration for opening a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeConfig {
    /// Directory where index files are stored.
    /// An empty path means the filename is used as given.
    pub store_directory: PathBuf,
    /// Upper bound on entries per leaf, below the block-derived capacity.
    pub max_leaf_entries: Option<usize>,
    /// Upper bound on keys per internal node, below the block-derived capacity.
    pub max_internal_keys: Option<usize>,
}

/// Error returned when loading or applying configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration value is invalid.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl TreeConfig {
    /// Default store directory.
    pub const DEFAULT_STORE_DIRECTORY: &'static str = ".";
    /// Environment variable naming the store directory.
    pub const STORE_DIRECTORY_VAR: &'static str = "BPLUSTREE_STORE_DIRECTORY";

    /// A config rooted at `store_directory` with block-derived capacities.
    #[must_use]
    pub fn new(store_directory: impl Into<PathBuf>) -> Self {
        Self {
            store_directory: store_directory.into(),
            max_leaf_entries: None,
            max_internal_keys: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `BPLUSTREE_STORE_DIRECTORY` is set but empty or
    /// not valid unicode.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name))
    }

    /// Load configuration through `lookup`, which resolves a variable name the
    /// way [`std::env::var`] does.
    ///
    /// # Errors
    ///
    /// As for [`from_env`](Self::from_env).
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        Ok(Self::new(Self::load_store_directory(&lookup)?))
    }

    fn load_store_directory<F>(lookup: &F) -> Result<PathBuf, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        match lookup(Self::STORE_DIRECTORY_VAR) {
            Ok(value) if value.is_empty() => Err(ConfigError::InvalidValue {
                name: Self::STORE_DIRECTORY_VAR.to_string(),
                message: "must not be empty".to_string(),
            }),
            Ok(value) => Ok(PathBuf::from(value)),
            Err(VarError::NotPresent) => {
                Ok(PathBuf::from(Self::DEFAULT_STORE_DIRECTORY))
            }
            Err(VarError::NotUnicode(_)) => Err(ConfigError::InvalidValue {
                name: Self::STORE_DIRECTORY_VAR.to_string(),
                message: "must be valid unicode".to_string(),
            }),
        }
    }

    /// Cap the number of entries per leaf.
    #[must_use]
    pub fn with_max_leaf_entries(mut self, entries: usize) -> Self {
        self.max_leaf_entries = Some(entries);
        self
    }

    /// Cap the number of keys per internal node.
    #[must_use]
    pub fn with_max_internal_keys(mut self, keys: usize) -> Self {
        self.max_internal_keys = Some(keys);
        self
    }

    /// Combine a block-derived capacity with an optional cap.
    ///
    /// # Errors
    ///
    /// Returns an error if the cap is below [`MIN_CAPACITY`].
    pub fn effective_capacity(
        name: &str,
        derived: usize,
        cap: Option<usize>,
    ) -> Result<usize, ConfigError> {
        match cap {
            Some(cap) if cap < MIN_CAPACITY => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("{cap} is below the minimum of {MIN_CAPACITY}"),
            }),
            Some(cap) => Ok(cap.min(derived)),
            None => Ok(derived),
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STORE_DIRECTORY)
    }
}
