//! Patch recipes: how a `patch` action edits an existing file.
//!
//! A patch pairs a named [`PatchPreset`] (which decides how the file text is
//! parsed and re-serialised) with a [`Manipulator`] (the edit itself). The
//! preset engine lives behind the `Patcher` port; this module only holds the
//! recipe values and the pure edit helpers used to build them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::DomainError;

/// Named patch strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchPreset {
    /// Parse as JSON, edit the value tree, write back preserving layout.
    #[default]
    Json,
    /// Edit the raw text.
    Text,
}

impl PatchPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for PatchPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type JsonEdit = dyn Fn(&mut Value) -> Result<(), DomainError> + Send + Sync;
type TextEditFn = dyn Fn(String) -> Result<String, DomainError> + Send + Sync;

/// The edit a patch applies. Cheap to clone.
#[derive(Clone)]
pub enum Manipulator {
    /// Mutates the parsed JSON document in place.
    Json(Arc<JsonEdit>),
    /// Maps the old text to the new text.
    Text(Arc<TextEditFn>),
}

impl Manipulator {
    pub fn json<F>(edit: F) -> Self
    where
        F: Fn(&mut Value) -> Result<(), DomainError> + Send + Sync + 'static,
    {
        Self::Json(Arc::new(edit))
    }

    pub fn text<F>(edit: F) -> Self
    where
        F: Fn(String) -> Result<String, DomainError> + Send + Sync + 'static,
    {
        Self::Text(Arc::new(edit))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Json(_) => "json",
            Self::Text(_) => "text",
        }
    }
}

impl fmt::Debug for Manipulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Manipulator::{}(<fn>)", self.kind())
    }
}

/// One literal find/replace pair for text patches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextReplacement {
    pub find: String,
    pub with: String,
}

/// Apply an RFC 7386 JSON merge patch to `target`.
///
/// `null` in the patch deletes the key; objects merge recursively; every
/// other value replaces.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };

    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }

    if let Value::Object(target_map) = target {
        for (key, value) in patch_map {
            if value.is_null() {
                target_map.remove(key);
            } else {
                merge_patch(
                    target_map.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}

/// Apply text edits: replacements first, then prepend, then append.
pub fn edit_text(
    text: &str,
    prepend: Option<&str>,
    append: Option<&str>,
    replacements: &[TextReplacement],
) -> String {
    let mut out = text.to_string();
    for r in replacements {
        out = out.replace(&r.find, &r.with);
    }
    if let Some(prefix) = prepend {
        out.insert_str(0, prefix);
    }
    if let Some(suffix) = append {
        out.push_str(suffix);
    }
    out
}
