//! Callback targets invoked when a schedule fires.
//!
//! A callback is a tagged variant: the `type` discriminator selects the kind
//! and `details` carries the kind-specific fields.
//!
//! ```json
//! {"type": "http", "details": {"url": "http://example.com", "method": "POST"}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use url::Url;

use super::violation::FieldViolation;

const HTTP_METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];

/// Errors that can occur when decoding a raw callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    /// The raw value is not a JSON object.
    #[error("callback must be a JSON object")]
    NotAnObject,

    /// No string `type` discriminator.
    #[error("callback type is missing")]
    MissingType,

    /// Discriminator names no known callback kind.
    #[error("unknown callback type: {0}")]
    UnknownKind(String),

    /// No `details` object for the kind.
    #[error("callback details are missing for type {0}")]
    MissingDetails(CallbackKind),

    /// Details do not match the kind's shape.
    #[error("malformed {kind} callback details: {reason}")]
    Malformed { kind: CallbackKind, reason: String },
}

/// Discriminator of a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackKind {
    Http,
    EventBus,
}

impl CallbackKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CallbackKind::Http => "http",
            CallbackKind::EventBus => "event_bus",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "http" => Some(CallbackKind::Http),
            "event_bus" => Some(CallbackKind::EventBus),
            _ => None,
        }
    }
}

impl fmt::Display for CallbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP callback target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HttpCallback {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "POST".to_string()
}

/// Event-bus callback target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventBusCallback {
    pub topic: String,
    pub event_name: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// A callback target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details", rename_all = "snake_case")]
pub enum Callback {
    Http(HttpCallback),
    EventBus(EventBusCallback),
}

impl Callback {
    /// Decode a callback from its raw JSON form.
    ///
    /// Dispatches on the `type` discriminator and fails closed on a missing
    /// or unknown kind.
    pub fn from_raw(raw: &Value) -> Result<Self, CallbackError> {
        let object = raw.as_object().ok_or(CallbackError::NotAnObject)?;
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(CallbackError::MissingType)?;
        let kind = CallbackKind::parse(kind)
            .ok_or_else(|| CallbackError::UnknownKind(kind.to_string()))?;
        let details = object
            .get("details")
            .filter(|d| d.is_object())
            .cloned()
            .ok_or(CallbackError::MissingDetails(kind))?;

        let malformed = |e: serde_json::Error| CallbackError::Malformed {
            kind,
            reason: e.to_string(),
        };
        match kind {
            CallbackKind::Http => serde_json::from_value(details)
                .map(Callback::Http)
                .map_err(malformed),
            CallbackKind::EventBus => serde_json::from_value(details)
                .map(Callback::EventBus)
                .map_err(malformed),
        }
    }

    pub fn kind(&self) -> CallbackKind {
        match self {
            Callback::Http(_) => CallbackKind::Http,
            Callback::EventBus(_) => CallbackKind::EventBus,
        }
    }

    /// Check that the target is well formed.
    pub fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        match self {
            Callback::Http(http) => {
                match Url::parse(&http.url) {
                    Ok(url) => {
                        if !matches!(url.scheme(), "http" | "https") {
                            violations.push(FieldViolation::new(
                                "callback.details.url",
                                format!("unsupported scheme '{}'", url.scheme()),
                            ));
                        }
                        if url.host_str().is_none_or(str::is_empty) {
                            violations
                                .push(FieldViolation::new("callback.details.url", "host is missing"));
                        }
                    }
                    Err(e) => violations.push(FieldViolation::new(
                        "callback.details.url",
                        format!("invalid url '{}': {}", http.url, e),
                    )),
                }
                if !HTTP_METHODS.contains(&http.method.to_ascii_uppercase().as_str()) {
                    violations.push(FieldViolation::new(
                        "callback.details.method",
                        format!("unsupported http method '{}'", http.method),
                    ));
                }
            }
            Callback::EventBus(bus) => {
                if bus.topic.trim().is_empty() {
                    violations.push(FieldViolation::new("callback.details.topic", "is required"));
                }
                if bus.event_name.trim().is_empty() {
                    violations.push(FieldViolation::new(
                        "callback.details.eventName",
                        "is required",
                    ));
                }
            }
        }
        violations
    }
}
