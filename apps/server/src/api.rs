//! HTTP API handlers for netra-server

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
};
use netra_core::{AnalysisOutcome, ReportViews};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{AppState, error::ApiResult};

pub const STATUS_MESSAGE: &str = "Shiksha Netra ML Pipeline Running";

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
}

/// GET /
pub async fn home() -> Json<StatusResponse> {
    Json(StatusResponse {
        message: STATUS_MESSAGE,
    })
}

/// POST /process
///
/// Forwards the mapping to the pipeline unmodified and returns whatever it
/// produced (`null` when it produced nothing).
pub async fn process(
    State(state): State<AppState>,
    Json(payload): Json<Map<String, Value>>,
) -> ApiResult<Json<Value>> {
    tracing::info!(keys = payload.len(), "process request");
    let result = state.analyzer.process_payload(Value::Object(payload)).await?;
    Ok(Json(result.unwrap_or(Value::Null)))
}

fn default_topic() -> String {
    "General".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub file_name: String,
    #[serde(default = "default_topic")]
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// "complete", "empty" or "failed"
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<ReportViews>,
}

impl From<&AnalysisOutcome> for SessionResponse {
    fn from(outcome: &AnalysisOutcome) -> Self {
        let analysis = outcome.analysis();
        Self {
            status: outcome.status(),
            message: outcome.message(),
            session_id: analysis.map(|a| a.session_id.to_string()),
            topic: analysis.map(|a| a.topic.clone()),
            warnings: analysis.map(|a| a.warnings()).unwrap_or_default(),
            views: analysis.map(|a| a.views()),
        }
    }
}

/// POST /sessions?file_name=<name>&topic=<topic>
///
/// Body is the raw video. The upload is analyzed and removed before the
/// response is sent.
pub async fn create_session(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    body: Bytes,
) -> ApiResult<Json<SessionResponse>> {
    tracing::info!(
        file_name = %query.file_name,
        topic = %query.topic,
        bytes = body.len(),
        "session upload"
    );
    let outcome = state
        .analyzer
        .analyze_upload(&query.file_name, &body, &query.topic)
        .await?;
    Ok(Json(SessionResponse::from(&outcome)))
}
