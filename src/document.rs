//! Section-level mutations of a module's JSON document.
//!
//! A module document is a JSON object whose top-level keys are section names.
//! Each section holds an ordered array of entries, and entries are addressed
//! by their own `id` field. Every function here works on a borrowed document
//! and returns the full replacement array for the touched section, which the
//! storage layer writes back with a single `jsonb_set`.

use serde_json::{Map, Value};
use thiserror::Error;

pub const CREATED_BY: &str = "createdBy";
pub const CREATED_ON: &str = "createdOn";
pub const UPDATED_BY: &str = "updatedBy";
pub const UPDATED_ON: &str = "updatedOn";
pub const DELETED_BY: &str = "deletedBy";
pub const DELETED_ON: &str = "deletedOn";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Document is not a JSON object")]
    NotAnObject,

    #[error("Section '{0}' not found")]
    SectionNotFound(String),

    #[error("Section '{0}' is not a list of entries")]
    SectionNotArray(String),

    #[error("ID '{id}' not found in section '{section}'")]
    EntryNotFound { section: String, id: String },
}

/// Audit fields stamped onto an entry by a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    Created,
    Updated,
    Deleted,
}

impl Stamp {
    fn keys(self) -> (&'static str, &'static str) {
        match self {
            Stamp::Created => (CREATED_BY, CREATED_ON),
            Stamp::Updated => (UPDATED_BY, UPDATED_ON),
            Stamp::Deleted => (DELETED_BY, DELETED_ON),
        }
    }

    /// Writes the `(…By, …On)` pair into `fields`, replacing existing values.
    pub fn apply(self, fields: &mut Map<String, Value>, by: &str, on: &str) {
        let (by_key, on_key) = self.keys();
        fields.insert(by_key.to_string(), Value::String(by.to_string()));
        fields.insert(on_key.to_string(), Value::String(on.to_string()));
    }
}

/// Returns the value stored under `name`, if the key exists.
pub fn section<'a>(doc: &'a Value, name: &str) -> Option<&'a Value> {
    doc.as_object().and_then(|obj| obj.get(name))
}

/// String form of an entry's `id`, or `None` when the entry cannot be
/// addressed by id.
///
/// Empty strings, `0`, `false` and `null` never address an entry. Integral
/// floats render without a fractional part so `3.0` and `3` both match `"3"`.
pub fn entry_id(entry: &Value) -> Option<String> {
    match entry.as_object()?.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                (i != 0).then(|| i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                if f == 0.0 || !f.is_finite() {
                    None
                } else if f.fract() == 0.0 && f.abs() < 1e21 {
                    Some(format!("{:.0}", f))
                } else {
                    Some(f.to_string())
                }
            }
        }
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn matches_id(entry: &Value, id: &str) -> bool {
    entry_id(entry).is_some_and(|entry_id| entry_id == id)
}

/// Falsy section values are treated as missing.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Appends `entry` to the end of `section_name`, creating the section when it
/// is missing or falsy. Returns the resulting section array.
pub fn append_entry(
    doc: &Value,
    section_name: &str,
    entry: Value,
) -> Result<Vec<Value>, DocumentError> {
    if !doc.is_object() {
        return Err(DocumentError::NotAnObject);
    }

    let mut entries = match section(doc, section_name) {
        Some(Value::Array(items)) => items.clone(),
        Some(value) if is_present(value) => {
            return Err(DocumentError::SectionNotArray(section_name.to_string()))
        }
        _ => Vec::new(),
    };
    entries.push(entry);

    Ok(entries)
}

/// Rewrites every entry of `section_name` whose id matches `id` with `f`.
///
/// Duplicate ids are all rewritten; at least one match is required.
fn map_matching<F>(
    doc: &Value,
    section_name: &str,
    id: &str,
    mut f: F,
) -> Result<Vec<Value>, DocumentError>
where
    F: FnMut(&mut Map<String, Value>),
{
    if !doc.is_object() {
        return Err(DocumentError::NotAnObject);
    }

    let items = match section(doc, section_name) {
        Some(value) if is_present(value) => value
            .as_array()
            .ok_or_else(|| DocumentError::SectionNotArray(section_name.to_string()))?,
        _ => return Err(DocumentError::SectionNotFound(section_name.to_string())),
    };

    let mut matched = false;
    let entries: Vec<Value> = items
        .iter()
        .map(|item| {
            let mut item = item.clone();
            if matches_id(&item, id) {
                if let Some(fields) = item.as_object_mut() {
                    f(fields);
                    matched = true;
                }
            }
            item
        })
        .collect();

    if !matched {
        return Err(DocumentError::EntryNotFound {
            section: section_name.to_string(),
            id: id.to_string(),
        });
    }

    Ok(entries)
}

/// Shallow-merges `patch` into every entry of `section_name` whose id matches.
/// Patch fields overwrite, fields absent from the patch are retained.
pub fn merge_entries(
    doc: &Value,
    section_name: &str,
    id: &str,
    patch: &Map<String, Value>,
) -> Result<Vec<Value>, DocumentError> {
    map_matching(doc, section_name, id, |fields| {
        for (key, value) in patch {
            fields.insert(key.clone(), value.clone());
        }
    })
}

/// Stamps deletion metadata on every matching entry. Entries are kept.
pub fn soft_delete_entries(
    doc: &Value,
    section_name: &str,
    id: &str,
    deleted_by: &str,
    deleted_on: &str,
) -> Result<Vec<Value>, DocumentError> {
    map_matching(doc, section_name, id, |fields| {
        Stamp::Deleted.apply(fields, deleted_by, deleted_on);
    })
}
