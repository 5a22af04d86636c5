

use serde_json::{Value, json};
use thiserror::Error;

pub const ALLOWED_METHODS: [&str; 2] = ["GET", "POST"];


/// Request-level failures. Each one ends the request before any upstream call.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Bot token is required")]
    MissingCredential,

    #[error("User ID or username is required")]
    MissingSubject,

    #[error("User identifier is neither a numeric ID nor an @username: {0}")]
    InvalidSubject(String),

    #[error("At least one chat ID is required")]
    MissingTargets,

    #[error("Request body is not a valid JSON object: {0}")]
    InvalidPayload(String),

    #[error("Method {0} is not allowed")]
    MethodNotAllowed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CheckError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "MISSING_CREDENTIAL",
            Self::MissingSubject => "MISSING_SUBJECT",
            Self::InvalidSubject(_) => "INVALID_SUBJECT",
            Self::MissingTargets => "MISSING_TARGETS",
            Self::InvalidPayload(_) => "INVALID_PAYLOAD",
            Self::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            Self::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    pub fn is_validation(&self) -> bool {
        !matches!(self, Self::MethodNotAllowed(_) | Self::Internal(_))
    }

    /// Caller-facing message. Internal faults never leak their cause here.
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "An unexpected error occurred".to_string(),
            Self::MethodNotAllowed(_) => "Only GET and POST methods are allowed".to_string(),
            other => other.to_string(),
        }
    }

    pub fn details(&self, detailed_errors: bool) -> Option<Value> {
        match self {
            Self::MissingCredential => Some(json!({
                "parameter": "token",
                "expected_format": "Telegram bot token (string)",
            })),
            Self::MissingSubject => Some(json!({
                "parameter": "user_id or username",
                "expected_format": "Telegram user ID (number) or @username",
            })),
            Self::InvalidSubject(provided) => Some(json!({
                "parameter": "user_id or username",
                "provided": provided,
                "expected_format": "Telegram user ID (number) or @username",
            })),
            Self::MissingTargets => Some(json!({
                "parameter": "chat_id or chat_ids",
                "expected_format": "Single chat ID or @username, or a comma-separated list / JSON array of them",
            })),
            Self::InvalidPayload(reason) => Some(json!({
                "reason": reason,
                "expected_format": "JSON object",
            })),
            Self::MethodNotAllowed(method) => Some(json!({
                "method": method,
                "allowed_methods": ALLOWED_METHODS,
            })),
            Self::Internal(cause) if detailed_errors => Some(json!({ "error_message": cause })),
            Self::Internal(_) => None,
        }
    }
}


pub type Result<T> = std::result::Result<T, CheckError>;
