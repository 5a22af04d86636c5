//! HTTP route definitions and handlers.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::Method,
    response::Response,
    routing::{any, get},
};
use chrono::Utc;
use serde_json::{Value, json};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use super::response::{check_response, discovery_response, error_response};
use crate::core::config::CheckerConfig;
use crate::core::error::{CheckError, Result};
use crate::core::services::executor::MembershipChecker;
use crate::core::services::normalizer::RawParams;
use crate::directory::DirectoryConnector;
use crate::utils::mask_token;


#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn DirectoryConnector>,
    pub config: Arc<CheckerConfig>,
}

impl AppState {
    pub fn new(connector: Arc<dyn DirectoryConnector>, config: CheckerConfig) -> Self {
        Self {
            connector,
            config: Arc::new(config),
        }
    }
}


pub fn create_router(state: AppState) -> Router {
    let detailed_errors = state.config.detailed_errors;

    Router::new()
        .route("/", any(check_handler))
        .route("/api/check", any(check_handler))
        .route("/health", get(health_check))
        .layer(CatchPanicLayer::custom(
            move |panic: Box<dyn Any + Send + 'static>| panic_response(panic, detailed_errors),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn check_handler(
    State(state): State<AppState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Response {
    let span = info_span!("check", request_id = %Uuid::new_v4(), method = %method);

    match handle_check(&state, &method, &query, &body)
        .instrument(span)
        .await
    {
        Ok(response) => response,
        Err(err) => {
            match &err {
                CheckError::Internal(cause) => error!("Membership check failed: {}", cause),
                other => debug!("Rejected request: {} ({})", other.code(), other),
            }
            error_response(&err, state.config.detailed_errors)
        }
    }
}

async fn handle_check(
    state: &AppState,
    method: &Method,
    query: &HashMap<String, String>,
    body: &[u8],
) -> Result<Response> {
    let raw = if method == Method::GET {
        RawParams::from_query(query)
    } else if method == Method::POST {
        RawParams::from_body(body)?
    } else {
        return Err(CheckError::MethodNotAllowed(method.to_string()));
    };

    if raw.is_blank() {
        return Ok(discovery_response());
    }

    let params = raw.normalize()?;
    info!(
        "Checking {} in {} chat(s) with bot {}",
        params.subject,
        params.targets.len(),
        mask_token(&params.credential)
    );

    let directory = state.connector.connect(&params.credential);
    let checker = MembershipChecker::from_config(directory, &state.config);
    let report = checker.check(&params).await?;

    Ok(check_response(&report, &params.subject, Utc::now()))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>, detailed_errors: bool) -> Response {
    let cause = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "handler panicked".to_string()
    };

    error!("Request handler panicked: {}", cause);
    error_response(&CheckError::Internal(cause), detailed_errors)
}
