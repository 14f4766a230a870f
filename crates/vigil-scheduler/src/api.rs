//! REST control plane.
//!
//! Every response uses the `{success, message, rules}` envelope. Mutations
//! go store-first, then reconcile the scheduling core, so a 200 means both
//! the document and the running loop reflect the request.

use crate::core::SchedulerCore;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;
use vigil_common::{Rule, RuleError};
use vigil_store::{RuleStore, StoreError};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn RuleStore>,
    pub core: Arc<SchedulerCore>,
}

#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    message: String,
    rules: Vec<Rule>,
}

fn respond_ok(rules: Vec<Rule>) -> Response {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            message: String::new(),
            rules,
        }),
    )
        .into_response()
}

fn respond_err(status: StatusCode, message: impl Display) -> Response {
    (
        status,
        Json(ApiResponse {
            success: false,
            message: message.to_string(),
            rules: Vec::new(),
        }),
    )
        .into_response()
}

fn store_failure(e: StoreError) -> Response {
    respond_err(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Store error: {e}"),
    )
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/v1/rules", get(list_rules).post(create_rule))
        .route(
            "/v1/rules/{id}",
            get(get_rule)
                .put(update_rule)
                .patch(update_rule)
                .delete(delete_rule),
        )
        .fallback(no_such_endpoint)
        .with_state(state)
}

fn parse_id(raw: &str) -> Result<i64, Response> {
    raw.parse()
        .map_err(|_| respond_err(StatusCode::BAD_REQUEST, format!("Bad rule id: {raw}")))
}

/// Decodes and validates a user-supplied rule body. Any id in the body is
/// ignored; the store's id is authoritative.
fn parse_rule_body(body: &[u8]) -> Result<Rule, RuleError> {
    let mut rule = Rule::from_json(body)?;
    rule.id = 0;
    rule.validate()?;
    Ok(rule)
}

async fn list_rules(State(state): State<ApiState>) -> Response {
    match state.store.get_all() {
        Ok(rules) => respond_ok(rules),
        Err(e) => store_failure(e),
    }
}

async fn get_rule(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.store.get(id) {
        Ok(Some(rule)) => respond_ok(vec![rule]),
        Ok(None) => respond_err(StatusCode::NOT_FOUND, "Rule not found"),
        Err(e) => store_failure(e),
    }
}

async fn create_rule(State(state): State<ApiState>, body: Bytes) -> Response {
    let mut rule = match parse_rule_body(&body) {
        Ok(rule) => rule,
        Err(e) => return respond_err(StatusCode::BAD_REQUEST, format!("Invalid rule: {e}")),
    };

    let id = match state.store.insert(&rule) {
        Ok(id) => id,
        Err(e) => return store_failure(e),
    };
    rule.id = id;

    state.core.reconcile(rule.clone()).await;
    respond_ok(vec![rule])
}

async fn update_rule(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    match state.store.get(id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return respond_err(StatusCode::NOT_FOUND, "Rule id does not exist");
        }
        Err(e) => return store_failure(e),
    }

    let mut rule = match parse_rule_body(&body) {
        Ok(rule) => rule,
        Err(e) => return respond_err(StatusCode::BAD_REQUEST, format!("Invalid rule: {e}")),
    };

    match state.store.update(id, &rule) {
        Ok(()) => {}
        Err(StoreError::NotFound(_)) => {
            return respond_err(StatusCode::NOT_FOUND, "Rule id does not exist");
        }
        Err(e) => return store_failure(e),
    }
    rule.id = id;

    state.core.reconcile(rule.clone()).await;
    respond_ok(vec![rule])
}

async fn delete_rule(State(state): State<ApiState>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let rule = match state.store.get(id) {
        Ok(Some(rule)) => rule,
        Ok(None) => return respond_err(StatusCode::NOT_FOUND, "Rule not found"),
        Err(e) => return store_failure(e),
    };

    match state.store.delete(id) {
        Ok(()) => {}
        Err(StoreError::NotFound(_)) => {
            return respond_err(StatusCode::NOT_FOUND, "Rule not found");
        }
        Err(e) => return store_failure(e),
    }

    state.core.stop(id).await;
    respond_ok(vec![rule])
}

async fn no_such_endpoint() -> Response {
    respond_err(StatusCode::NOT_FOUND, "no such endpoint")
}
