//! End-to-end tests against real index files.
//!
//! Each test file covers a specific scenario, driving the public tree API
//! and reopening the file where persistence matters.

#![cfg(test)]

mod helpers;

mod test_composite_keys;
mod test_corruption;
mod test_file_format;
mod test_reopen;
mod test_root_split;
