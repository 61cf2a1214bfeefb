//! Key ordering.

use std::cmp::Ordering;

use crate::schema::Value;

/// Compare two keys lexicographically over their fields.
///
/// Each position compares by the natural order of its value type; the first
/// non-equal position decides.
#[must_use]
pub fn compare_keys(a: &[Value], b: &[Value]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.cmp(y))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}
