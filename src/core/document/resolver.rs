//! Schema-agnostic field lookup over JSON documents.
//!
//! Field names are compared after folding case and diacritics, so
//! `"Descripción"`, `"descripcion"` and `" DESCRIPCION "` all resolve to the same
//! logical field. Every read or write an operation performs goes through a
//! [`KeyMatch`] handle produced here.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold a field name for comparison: NFD, strip combining marks, lowercase, trim.
pub fn nkey(raw: &str) -> String {
    raw.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenameError {
    #[error("field {0} no longer exists")]
    Missing(String),

    #[error("cannot rename {from}: {to} already exists")]
    Occupied { from: String, to: String },
}

/// One step from the document root towards a nested node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Reference to `key` inside the object reached by following `parent` from the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyMatch {
    pub parent: Vec<PathSegment>,
    pub key: String,
}

impl KeyMatch {
    pub fn new(parent: Vec<PathSegment>, key: impl Into<String>) -> Self {
        Self {
            parent,
            key: key.into(),
        }
    }

    pub fn container<'a>(&self, doc: &'a Value) -> Option<&'a Map<String, Value>> {
        navigate(doc, &self.parent)?.as_object()
    }

    pub fn container_mut<'a>(&self, doc: &'a mut Value) -> Option<&'a mut Map<String, Value>> {
        navigate_mut(doc, &self.parent)?.as_object_mut()
    }

    pub fn get<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
        self.container(doc)?.get(&self.key)
    }

    pub fn get_mut<'a>(&self, doc: &'a mut Value) -> Option<&'a mut Value> {
        self.container_mut(doc)?.get_mut(&self.key)
    }

    /// Replace the referenced value. Returns false when the match no longer resolves.
    pub fn set(&self, doc: &mut Value, value: Value) -> bool {
        match self.get_mut(doc) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Rename the key in place, keeping its position among its siblings.
    ///
    /// The document is left untouched when a sibling already holds `new_key`.
    pub fn rename(&self, doc: &mut Value, new_key: &str) -> Result<KeyMatch, RenameError> {
        let map = self
            .container_mut(doc)
            .filter(|map| map.contains_key(&self.key))
            .ok_or_else(|| RenameError::Missing(self.path()))?;
        if self.key != new_key {
            if map.contains_key(new_key) {
                return Err(RenameError::Occupied {
                    from: self.path(),
                    to: self.sibling(new_key).path(),
                });
            }
            let entries = std::mem::take(map);
            for (key, value) in entries {
                if key == self.key {
                    map.insert(new_key.to_string(), value);
                } else {
                    map.insert(key, value);
                }
            }
        }
        Ok(KeyMatch::new(self.parent.clone(), new_key))
    }

    /// Insert `key` next to this match unless the container already has it.
    pub fn insert_sibling(&self, doc: &mut Value, key: &str, value: Value) -> bool {
        match self.container_mut(doc) {
            Some(map) if !map.contains_key(key) => {
                map.insert(key.to_string(), value);
                true
            }
            _ => false,
        }
    }

    pub fn sibling(&self, key: impl Into<String>) -> KeyMatch {
        KeyMatch::new(self.parent.clone(), key)
    }

    /// Dotted path such as `items[2].largo`, used in logs and diagnostics.
    pub fn path(&self) -> String {
        let mut out = render_path(&self.parent);
        if !out.is_empty() {
            out.push('.');
        }
        out.push_str(&self.key);
        out
    }
}

impl fmt::Display for KeyMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

pub fn render_path(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            PathSegment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            PathSegment::Index(index) => {
                out.push_str(&format!("[{}]", index));
            }
        }
    }
    out
}

pub fn navigate<'a>(doc: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    let mut current = doc;
    for segment in path {
        current = match segment {
            PathSegment::Key(key) => current.as_object()?.get(key)?,
            PathSegment::Index(index) => current.as_array()?.get(*index)?,
        };
    }
    Some(current)
}

pub fn navigate_mut<'a>(doc: &'a mut Value, path: &[PathSegment]) -> Option<&'a mut Value> {
    let mut current = doc;
    for segment in path {
        current = match segment {
            PathSegment::Key(key) => current.as_object_mut()?.get_mut(key)?,
            PathSegment::Index(index) => current.as_array_mut()?.get_mut(*index)?,
        };
    }
    Some(current)
}

/// Visit every object node in pre-order, passing its path from the root.
pub fn walk_objects<'a, F>(doc: &'a Value, visit: &mut F)
where
    F: FnMut(&[PathSegment], &'a Map<String, Value>),
{
    let mut path = Vec::new();
    walk_inner(doc, &mut path, visit);
}

fn walk_inner<'a, F>(value: &'a Value, path: &mut Vec<PathSegment>, visit: &mut F)
where
    F: FnMut(&[PathSegment], &'a Map<String, Value>),
{
    match value {
        Value::Object(map) => {
            visit(path, map);
            for (key, child) in map {
                path.push(PathSegment::Key(key.clone()));
                walk_inner(child, path, visit);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                path.push(PathSegment::Index(index));
                walk_inner(child, path, visit);
                path.pop();
            }
        }
        _ => {}
    }
}

/// Every occurrence of `logical_name` anywhere in `doc`, in document order.
pub fn find(doc: &Value, logical_name: &str) -> Vec<KeyMatch> {
    let target = nkey(logical_name);
    let mut matches = Vec::new();
    if target.is_empty() {
        return matches;
    }
    walk_objects(doc, &mut |path, map| {
        for key in map.keys() {
            if nkey(key) == target {
                matches.push(KeyMatch::new(path.to_vec(), key.clone()));
            }
        }
    });
    matches
}

/// Union of [`find`] over several names, without duplicates.
pub fn find_any(doc: &Value, names: &[String]) -> Vec<KeyMatch> {
    let mut out: Vec<KeyMatch> = Vec::new();
    for name in names {
        for m in find(doc, name) {
            if !out.contains(&m) {
                out.push(m);
            }
        }
    }
    out
}

/// Paths of every scalar string in the document, including array elements.
pub fn string_paths(doc: &Value) -> Vec<Vec<PathSegment>> {
    fn rec(value: &Value, path: &mut Vec<PathSegment>, out: &mut Vec<Vec<PathSegment>>) {
        match value {
            Value::String(_) => out.push(path.clone()),
            Value::Object(map) => {
                for (key, child) in map {
                    path.push(PathSegment::Key(key.clone()));
                    rec(child, path, out);
                    path.pop();
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter().enumerate() {
                    path.push(PathSegment::Index(index));
                    rec(child, path, out);
                    path.pop();
                }
            }
            _ => {}
        }
    }
    let mut out = Vec::new();
    rec(doc, &mut Vec::new(), &mut out);
    out
}

/// Paths of the objects held in any `items` array.
pub fn items_nodes(doc: &Value) -> Vec<Vec<PathSegment>> {
    let mut nodes = Vec::new();
    for m in find(doc, "items") {
        if let Some(Value::Array(items)) = m.get(doc) {
            for (index, item) in items.iter().enumerate() {
                if item.is_object() {
                    let mut path = m.parent.clone();
                    path.push(PathSegment::Key(m.key.clone()));
                    path.push(PathSegment::Index(index));
                    nodes.push(path);
                }
            }
        }
    }
    nodes
}
