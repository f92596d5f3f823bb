//! JSON endpoints over the agent services.
//!
//! - `POST /api/reason`: one pipeline run
//! - `POST /api/plan`: planner only
//! - `POST /research/analyse`: direct research call
//! - `POST /vectordb/add`, `GET /vectordb/search`: the memory store

use crate::SharedState;
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uhpm_agent::{PipelineRun, ResearchReport, TaskPlan};
use uhpm_core::error::PipelineError;
use uhpm_core::memory::{MemoryHit, Tags};
use uhpm_core::task::{Payload, Task};

/// Records returned by `/vectordb/search` when `k` is not given.
const DEFAULT_SEARCH_K: usize = 3;

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/reason", post(reason_handler))
        .route("/api/plan", post(plan_handler))
        .route("/research/analyse", post(research_handler))
        .route("/vectordb/add", post(vector_add_handler))
        .route("/vectordb/search", get(vector_search_handler))
}

// --- Errors ---

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorDetail>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorDetail {
            detail: detail.into(),
        }),
    )
}

fn task_from(text: String) -> Result<Task, ApiError> {
    Task::new(text).map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))
}

// --- Reasoning pipeline ---

#[derive(Debug, Deserialize)]
pub struct ReasonRequest {
    pub task: String,
    #[serde(flatten)]
    pub payload: Payload,
}

#[derive(Debug, Serialize)]
pub struct ReasonResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub run: PipelineRun,
}

async fn reason_handler(
    State(state): State<SharedState>,
    Json(request): Json<ReasonRequest>,
) -> Result<Json<ReasonResponse>, ApiError> {
    let task = task_from(request.task)?;
    info!(
        task_len = task.as_str().len(),
        fields = ?request.payload.present_fields(),
        "Reason request"
    );

    match state.services.runner.run(task, request.payload).await {
        Ok(run) => Ok(Json(ReasonResponse {
            status: run.status(),
            run,
        })),
        Err(e @ PipelineError::Timeout { .. }) => {
            warn!(error = %e, "Reason request timed out");
            Err(api_error(
                StatusCode::GATEWAY_TIMEOUT,
                format!("Reasoning failed: {e}"),
            ))
        }
        Err(e @ PipelineError::EmptyTask) => {
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}

// --- Planner ---

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub task: String,
}

async fn plan_handler(
    State(state): State<SharedState>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<TaskPlan>, ApiError> {
    let task = task_from(request.task)?;
    state.services.planner.plan(&task).await.map(Json).map_err(|e| {
        error!(error = %e, "Planning failed");
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Planning failed: {e}"),
        )
    })
}

// --- Direct research ---

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub product_text: String,
    #[serde(default)]
    pub competitor_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResearchResponse {
    pub analysis: ResearchReport,
}

async fn research_handler(
    State(state): State<SharedState>,
    Json(request): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>, ApiError> {
    let competitor = request.competitor_text.unwrap_or_default();
    let analysis = state
        .services
        .research
        .analyse_product(&request.product_text, &competitor)
        .await
        .map_err(|e| {
            error!(error = %e, "Research failed");
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Research failed: {e}"),
            )
        })?;
    Ok(Json(ResearchResponse { analysis }))
}

// --- Memory store ---

#[derive(Debug, Deserialize)]
pub struct AddDocumentRequest {
    pub text: String,
    #[serde(default)]
    pub tags: Tags,
}

/// Vector store replies always answer 200; failures are reported in-band.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VectorResponse {
    Success {
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        results: Option<Vec<MemoryHit>>,
    },
    Error {
        message: String,
    },
}

async fn vector_add_handler(
    State(state): State<SharedState>,
    Json(request): Json<AddDocumentRequest>,
) -> Json<VectorResponse> {
    if request.text.trim().is_empty() {
        return Json(VectorResponse::Error {
            message: "text must not be empty".into(),
        });
    }

    match state.services.memory.store(&request.text, request.tags).await {
        Ok(id) => Json(VectorResponse::Success {
            message: Some("Document added successfully.".into()),
            id: Some(id),
            results: None,
        }),
        Err(e) => {
            warn!(error = %e, "Document add failed");
            Json(VectorResponse::Error {
                message: e.to_string(),
            })
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default)]
    pub k: Option<usize>,
}

async fn vector_search_handler(
    State(state): State<SharedState>,
    Query(params): Query<SearchParams>,
) -> Json<VectorResponse> {
    let k = params.k.unwrap_or(DEFAULT_SEARCH_K);
    match state.services.memory.query(&params.query, k).await {
        Ok(results) => Json(VectorResponse::Success {
            message: None,
            id: None,
            results: Some(results),
        }),
        Err(e) => {
            warn!(error = %e, "Search failed");
            Json(VectorResponse::Error {
                message: e.to_string(),
            })
        }
    }
}
