//! Document model helpers: key resolution, number parsing and text passes.
//!
//! Documents are plain [`serde_json::Value`] trees with no assumed schema.

pub mod normalize;
pub mod numbers;
pub mod resolver;

pub use numbers::{parse_number, value_as_number, value_to_text};
pub use resolver::{find, find_any, nkey, KeyMatch, PathSegment, RenameError};

use serde_json::Value;

/// Split a JSON input into a batch: a top-level array is a batch, anything else is one document.
pub fn into_batch(input: Value) -> Vec<Value> {
    match input {
        Value::Array(items) => items,
        other => vec![other],
    }
}
