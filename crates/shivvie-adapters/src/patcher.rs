//! Preset patch engine.
//!
//! `json` parses the file, hands the value tree to the manipulator and
//! writes it back with the original indentation, key order and trailing
//! newline. Empty files patch as `null`. `text` passes the raw text through.

use std::path::Path;

use serde::Serialize;
use serde_json::{Value, ser::PrettyFormatter};
use tracing::instrument;

use shivvie_core::{
    application::{ApplicationError, ports::Patcher},
    domain::{DomainError, Manipulator, PatchPreset},
    error::ShivvieResult,
};

const DEFAULT_INDENT: &str = "  ";

#[derive(Debug, Default, Clone, Copy)]
pub struct PresetPatcher;

impl PresetPatcher {
    pub fn new() -> Self {
        Self
    }
}

impl Patcher for PresetPatcher {
    #[instrument(skip(self, text, manipulator), fields(preset = %preset))]
    fn patch(
        &self,
        path: &Path,
        preset: PatchPreset,
        text: &str,
        manipulator: &Manipulator,
    ) -> ShivvieResult<String> {
        match (preset, manipulator) {
            (PatchPreset::Json, Manipulator::Json(edit)) => {
                let failed = |reason: String| ApplicationError::PatchFailed {
                    path: path.to_path_buf(),
                    reason,
                };

                let mut doc = if text.trim().is_empty() {
                    Value::Null
                } else {
                    serde_json::from_str(text).map_err(|e| failed(e.to_string()))?
                };
                edit(&mut doc)?;

                let indent = detect_indent(text);
                let mut out = to_json(&doc, indent).map_err(|e| failed(e.to_string()))?;
                if text.is_empty() || text.ends_with('\n') {
                    out.push('\n');
                }
                Ok(out)
            }
            (PatchPreset::Text, Manipulator::Text(edit)) => Ok(edit(text.to_string())?),
            (preset, manipulator) => Err(DomainError::InvalidPatch {
                preset: preset.to_string(),
                manipulator: manipulator.kind(),
            }
            .into()),
        }
    }
}

/// Leading whitespace of the first indented line, or two spaces.
fn detect_indent(text: &str) -> &str {
    text.lines()
        .map(|line| {
            let trimmed = line.trim_start_matches([' ', '\t']);
            &line[..line.len() - trimmed.len()]
        })
        .find(|indent| !indent.is_empty())
        .unwrap_or(DEFAULT_INDENT)
}

fn to_json(value: &Value, indent: &str) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let mut ser =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(indent.as_bytes()));
    value.serialize(&mut ser)?;
    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shivvie_core::domain::merge_patch;
    use shivvie_core::error::ShivvieError;

    use super::*;

    fn merge(patch: Value) -> Manipulator {
        Manipulator::json(move |doc| {
            merge_patch(doc, &patch);
            Ok(())
        })
    }

    fn apply(preset: PatchPreset, text: &str, m: &Manipulator) -> ShivvieResult<String> {
        PresetPatcher::new().patch(Path::new("package.json"), preset, text, m)
    }

    #[test]
    fn json_keeps_order_indent_and_newline() {
        let original = "{\n    \"name\": \"app\",\n    \"version\": \"1.0.0\"\n}\n";
        let out = apply(PatchPreset::Json, original, &merge(json!({"private": true}))).unwrap();
        assert_eq!(
            out,
            "{\n    \"name\": \"app\",\n    \"version\": \"1.0.0\",\n    \"private\": true\n}\n"
        );
    }

    #[test]
    fn json_without_trailing_newline_stays_without() {
        let out = apply(PatchPreset::Json, "{\"a\": 1}", &merge(json!({"a": 2}))).unwrap();
        assert_eq!(out, "{\n  \"a\": 2\n}");
    }

    #[test]
    fn empty_file_patches_as_null() {
        let out = apply(PatchPreset::Json, "", &merge(json!({"scripts": {"test": "vitest"}}))).unwrap();
        assert_eq!(out, "{\n  \"scripts\": {\n    \"test\": \"vitest\"\n  }\n}\n");
    }

    #[test]
    fn tabs_are_detected() {
        let out = apply(PatchPreset::Json, "{\n\t\"a\": 1\n}\n", &merge(json!({"b": 2}))).unwrap();
        assert_eq!(out, "{\n\t\"a\": 1,\n\t\"b\": 2\n}\n");
    }

    #[test]
    fn invalid_json_is_a_patch_failure() {
        let err = apply(PatchPreset::Json, "{ nope", &merge(json!({}))).unwrap_err();
        assert!(matches!(
            err,
            ShivvieError::Application(ApplicationError::PatchFailed { .. })
        ));
    }

    #[test]
    fn text_preset_runs_text_manipulator() {
        let m = Manipulator::text(|s| Ok(s.replace("old", "new")));
        assert_eq!(apply(PatchPreset::Text, "old\n", &m).unwrap(), "new\n");
    }

    #[test]
    fn mismatched_manipulator_is_rejected() {
        let m = Manipulator::text(|s| Ok(s));
        let err = apply(PatchPreset::Json, "{}", &m).unwrap_err();
        assert!(matches!(
            err,
            ShivvieError::Domain(DomainError::InvalidPatch { manipulator: "text", .. })
        ));
    }
}
