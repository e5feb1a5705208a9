//! Data-only action requests.
//!
//! An [`ActionRequest`] is the serialisable form of the arguments a module
//! hands to the action builders. Requests come from untrusted places (a
//! manifest, the stdout of an external producer) so decoding goes through
//! [`ActionRequest::from_value`], which applies the narrow discriminator
//! first and only then decodes the payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::error::DomainError;
use crate::domain::patch::{PatchPreset, TextReplacement};

/// Every `kind` tag a request may carry.
pub const KINDS: [&str; 7] = [
    "render",
    "cascade",
    "script",
    "delegate",
    "patch",
    "install",
    "uninstall",
];

/// Arguments for one action builder call. String fields are templates,
/// rendered against the module input when the request is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionRequest {
    Render {
        from: String,
        /// Defaults to `from`.
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        data: Map<String, Value>,
    },
    Cascade {
        from: String,
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        ignore: Vec<String>,
        #[serde(default)]
        data: Map<String, Value>,
    },
    Script {
        /// Shell command lines, run one after another.
        run: Vec<String>,
        #[serde(default)]
        cwd: Option<String>,
    },
    Delegate {
        from: String,
        to: String,
        #[serde(default)]
        input: Map<String, Value>,
    },
    Patch {
        path: String,
        #[serde(default)]
        preset: PatchPreset,
        #[serde(default)]
        touch: bool,
        /// RFC 7386 merge patch (json preset).
        #[serde(default)]
        merge: Option<Value>,
        #[serde(default)]
        prepend: Option<String>,
        #[serde(default)]
        append: Option<String>,
        #[serde(default)]
        replace: Vec<TextReplacement>,
    },
    Install {
        #[serde(default)]
        cwd: Option<String>,
        #[serde(default)]
        names: Vec<String>,
        #[serde(default)]
        dev: bool,
    },
    Uninstall {
        #[serde(default)]
        cwd: Option<String>,
        #[serde(default)]
        names: Vec<String>,
    },
}

impl ActionRequest {
    /// Boundary check: an object whose `kind` is a string.
    ///
    /// Says nothing about whether the kind is known or the payload decodes.
    pub fn is_action_request(value: &Value) -> bool {
        value
            .as_object()
            .and_then(|obj| obj.get("kind"))
            .is_some_and(Value::is_string)
    }

    /// Decode an untrusted value.
    ///
    /// # Errors
    ///
    /// - [`DomainError::ActionProduction`] if the value is not an action
    ///   request or its payload does not decode.
    /// - [`DomainError::UnknownAction`] if `kind` is outside [`KINDS`].
    pub fn from_value(value: Value) -> Result<Self, DomainError> {
        if !Self::is_action_request(&value) {
            return Err(DomainError::ActionProduction {
                reason: format!("expected an action object with a \"kind\", got {}", brief(&value)),
            });
        }

        let kind = value["kind"].as_str().unwrap_or_default().to_string();
        if !KINDS.contains(&kind.as_str()) {
            return Err(DomainError::UnknownAction { tag: kind });
        }

        serde_json::from_value(value).map_err(|e| DomainError::ActionProduction {
            reason: format!("malformed '{kind}' action: {e}"),
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Render { .. } => "render",
            Self::Cascade { .. } => "cascade",
            Self::Script { .. } => "script",
            Self::Delegate { .. } => "delegate",
            Self::Patch { .. } => "patch",
            Self::Install { .. } => "install",
            Self::Uninstall { .. } => "uninstall",
        }
    }
}

fn brief(value: &Value) -> String {
    let text = value.to_string();
    match text.char_indices().nth(60) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text,
    }
}
