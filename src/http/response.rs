//! Response envelopes and status code selection.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use crate::core::error::{ALLOWED_METHODS, CheckError};
use crate::core::models::{ChatKind, ChatOutcome, ErrorKind, Identifier, LookupResult};
use crate::core::services::aggregator::{CheckReport, OverallStatus};


/// Static service block attached to every response body.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub repository: &'static str,
}

pub const SERVICE_INFO: ServiceInfo = ServiceInfo {
    name: env!("CARGO_PKG_NAME"),
    version: env!("CARGO_PKG_VERSION"),
    repository: env!("CARGO_PKG_REPOSITORY"),
};


pub fn report_status(status: OverallStatus) -> StatusCode {
    match status {
        OverallStatus::Success => StatusCode::OK,
        OverallStatus::PartialSuccess => StatusCode::MULTI_STATUS,
        OverallStatus::Error => StatusCode::FAILED_DEPENDENCY,
    }
}

pub fn error_status(err: &CheckError) -> StatusCode {
    match err {
        CheckError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
        CheckError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}


#[derive(Debug, Serialize)]
pub struct ResponseMetadata {
    pub user_id: Identifier,
    pub chats_checked: usize,
    pub chats_successful: usize,
    pub chats_failed: usize,
    pub is_member_in_all: bool,
    pub timestamp: DateTime<Utc>,
}


#[derive(Debug, Serialize)]
pub struct SuccessEntry {
    pub chat_id: String,
    pub success: bool,
    pub is_member: bool,
    pub is_admin: bool,
    pub user_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_type: Option<ChatKind>,
}


#[derive(Debug, Clone, Serialize)]
pub struct FailureEntry {
    pub chat_id: String,
    pub success: bool,
    pub code: ErrorKind,
    pub message: String,
    pub details: Value,
}


#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResultEntry {
    Success(SuccessEntry),
    Failure(FailureEntry),
}

impl From<&ChatOutcome> for ResultEntry {
    fn from(outcome: &ChatOutcome) -> Self {
        let chat_id = outcome.target.to_string();
        match &outcome.result {
            LookupResult::Success(membership) => Self::Success(SuccessEntry {
                chat_id,
                success: true,
                is_member: membership.is_member(),
                is_admin: membership.is_admin(),
                user_status: membership.role.as_str().to_string(),
                chat_title: membership.chat_title.clone(),
                chat_type: membership.chat_type,
            }),
            LookupResult::Failure(failure) => Self::Failure(FailureEntry {
                chat_id,
                success: false,
                code: failure.kind,
                message: failure.message.clone(),
                details: failure.details.clone(),
            }),
        }
    }
}


#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub status: OverallStatus,
    pub metadata: ResponseMetadata,
    pub results: Vec<ResultEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FailureEntry>>,
    pub service: ServiceInfo,
}

impl CheckResponse {
    pub fn from_report(report: &CheckReport, subject: &Identifier, timestamp: DateTime<Utc>) -> Self {
        let results: Vec<ResultEntry> = report.outcomes.iter().map(ResultEntry::from).collect();
        let errors: Vec<FailureEntry> = results
            .iter()
            .filter_map(|entry| match entry {
                ResultEntry::Failure(failure) => Some(failure.clone()),
                ResultEntry::Success(_) => None,
            })
            .collect();

        Self {
            status: report.overall_status,
            metadata: ResponseMetadata {
                user_id: subject.clone(),
                chats_checked: report.checked,
                chats_successful: report.successful,
                chats_failed: report.failed,
                is_member_in_all: report.is_member_in_all,
                timestamp,
            },
            results,
            errors: (!errors.is_empty()).then_some(errors),
            service: SERVICE_INFO,
        }
    }
}


#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub service: ServiceInfo,
}

impl ErrorResponse {
    pub fn from_error(err: &CheckError, detailed_errors: bool) -> Self {
        Self {
            status: "error",
            code: err.code(),
            message: err.public_message(),
            details: err.details(detailed_errors),
            service: SERVICE_INFO,
        }
    }
}


pub fn check_response(report: &CheckReport, subject: &Identifier, timestamp: DateTime<Utc>) -> Response {
    (
        report_status(report.overall_status),
        Json(CheckResponse::from_report(report, subject, timestamp)),
    )
        .into_response()
}

pub fn error_response(err: &CheckError, detailed_errors: bool) -> Response {
    let mut response = (
        error_status(err),
        Json(ErrorResponse::from_error(err, detailed_errors)),
    )
        .into_response();

    if matches!(err, CheckError::MethodNotAllowed(_)) {
        response.headers_mut().insert(
            header::ALLOW,
            HeaderValue::from_static("GET, POST"),
        );
    }
    response
}

pub fn discovery_document() -> Value {
    json!({
        "name": SERVICE_INFO.name,
        "version": SERVICE_INFO.version,
        "description": "Checks whether a Telegram user is a member of one or more chats",
        "endpoints": ["/", "/api/check"],
        "methods": ALLOWED_METHODS,
        "parameters": {
            "token": "Telegram bot token (required)",
            "user_id": "Numeric user ID or @username (required unless username is given)",
            "username": "@username of the user (alternative to user_id)",
            "chat_id": "Single chat ID or @username",
            "chat_ids": "Comma-separated chat IDs / @usernames, or a JSON array in POST bodies",
        },
        "example": "/api/check?token=<BOT_TOKEN>&user_id=123456789&chat_ids=@my_channel,-1001234567890",
        "service": SERVICE_INFO,
    })
}

pub fn discovery_response() -> Response {
    (StatusCode::OK, Json(discovery_document())).into_response()
}
