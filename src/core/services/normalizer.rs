

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::core::error::{CheckError, Result};
use crate::core::models::{CheckParams, Identifier};
use crate::utils::split_list;


/// Text form of a JSON scalar. Strings and numbers qualify; everything else does not.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}


/// Parameters as they arrive, before validation. Both transports land here.
///
/// Fields stay untyped so that a wrong JSON type is judged per field, not as a broken payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawParams {
    #[serde(default)]
    pub token: Option<Value>,
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub username: Option<Value>,
    #[serde(default)]
    pub chat_id: Option<Value>,
    #[serde(default)]
    pub chat_ids: Option<Value>,
}

impl RawParams {
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        let text = |key: &str| query.get(key).map(|v| Value::String(v.clone()));
        Self {
            token: text("token"),
            user_id: text("user_id"),
            username: text("username"),
            chat_id: text("chat_id"),
            chat_ids: text("chat_ids"),
        }
    }

    /// An empty body carries no fields. Anything else must be a JSON object.
    pub fn from_body(body: &[u8]) -> Result<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let value: Value =
            serde_json::from_slice(body).map_err(|e| CheckError::InvalidPayload(e.to_string()))?;
        if !value.is_object() {
            return Err(CheckError::InvalidPayload(
                "expected a JSON object at the top level".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| CheckError::InvalidPayload(e.to_string()))
    }

    /// No recognized field at all: the caller gets the discovery document instead.
    pub fn is_blank(&self) -> bool {
        self.token.is_none()
            && self.user_id.is_none()
            && self.username.is_none()
            && self.chat_id.is_none()
            && self.chat_ids.is_none()
    }

    pub fn normalize(self) -> Result<CheckParams> {
        let credential = self
            .token
            .as_ref()
            .and_then(scalar_text)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(CheckError::MissingCredential)?;

        let subject = parse_subject(self.user_id, self.username)?;
        let targets = parse_targets(self.chat_id, self.chat_ids)?;

        Ok(CheckParams {
            credential,
            subject,
            targets,
        })
    }
}

/// Trimmed text of a subject field. `Ok(None)` when absent or empty.
fn subject_text(value: Option<Value>) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    match scalar_text(&value) {
        Some(text) => Ok(Some(text.trim().to_string()).filter(|t| !t.is_empty())),
        None => Err(CheckError::InvalidSubject(value.to_string())),
    }
}

fn parse_subject(user_id: Option<Value>, username: Option<Value>) -> Result<Identifier> {
    if let Some(raw) = subject_text(user_id)? {
        return Identifier::parse(&raw).ok_or(CheckError::InvalidSubject(raw));
    }

    if let Some(raw) = subject_text(username)? {
        let candidate = if raw.starts_with('@') {
            raw.clone()
        } else {
            format!("@{raw}")
        };
        return match Identifier::parse(&candidate) {
            Some(subject @ Identifier::Username(_)) => Ok(subject),
            _ => Err(CheckError::InvalidSubject(raw)),
        };
    }

    Err(CheckError::MissingSubject)
}

/// Raw target candidates. Non-scalar list items count as empty entries.
fn target_candidates(value: &Value) -> Vec<String> {
    match value {
        Value::String(text) => split_list(text),
        Value::Array(items) => items
            .iter()
            .map(|item| scalar_text(item).unwrap_or_default())
            .collect(),
        other => scalar_text(other).into_iter().collect(),
    }
}

fn parse_targets(chat_id: Option<Value>, chat_ids: Option<Value>) -> Result<Vec<Identifier>> {
    let candidates = match (chat_ids, chat_id) {
        (Some(list), _) => target_candidates(&list),
        (None, Some(single)) => scalar_text(&single).into_iter().collect(),
        (None, None) => Vec::new(),
    };

    let targets: Vec<Identifier> = candidates
        .iter()
        .filter_map(|raw| {
            let parsed = Identifier::parse(raw);
            if parsed.is_none() && !raw.trim().is_empty() {
                debug!("Discarding malformed chat identifier {:?}", raw);
            }
            parsed
        })
        .collect();

    if targets.is_empty() {
        return Err(CheckError::MissingTargets);
    }
    Ok(targets)
}
