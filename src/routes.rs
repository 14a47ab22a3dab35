use std::{collections::HashMap, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::pipeline::{Failure, Pipeline};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate", post(generate))
        .route("/invoke", post(invoke))
        .with_state(state)
}

/// Function-URL style event: the body plus a flag saying whether it is base64.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionUrlRequest {
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionUrlResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}

async fn run_invocation(state: &AppState, body: &[u8], is_base64_encoded: bool) -> Result<String, Failure> {
    let id = Uuid::new_v4();
    async {
        info!("🚀 Invocation started (base64: {})", is_base64_encoded);
        let result = state.pipeline.handle(body, is_base64_encoded).await;
        match &result {
            Ok(_) => info!("✅ Invocation finished"),
            Err(failure) => error!(stage = ?failure.stage, "❌ Invocation failed: {}", failure.error),
        }
        result
    }
    .instrument(info_span!("invocation", %id))
    .await
}

fn is_base64_transfer(headers: &HeaderMap) -> bool {
    headers
        .get("content-transfer-encoding")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().eq_ignore_ascii_case("base64"))
        .unwrap_or(false)
}

pub async fn generate(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    match run_invocation(&state, &body, is_base64_transfer(&headers)).await {
        Ok(json) => (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], json).into_response(),
        Err(failure) => failure.into_response(),
    }
}

pub async fn invoke(State(state): State<AppState>, Json(event): Json<FunctionUrlRequest>) -> Json<FunctionUrlResponse> {
    let body = event.body.unwrap_or_default();
    let (status, content_type, body) = match run_invocation(&state, body.as_bytes(), event.is_base64_encoded).await {
        Ok(json) => (StatusCode::OK, "application/json", json),
        Err(failure) => (failure.status(), "text/plain; charset=utf-8", failure.public_message()),
    };
    Json(FunctionUrlResponse {
        status_code: status.as_u16(),
        headers: HashMap::from([("content-type".to_string(), content_type.to_string())]),
        body,
    })
}
