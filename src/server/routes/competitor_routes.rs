//! Competitor endpoints
//!
//! CRUD over the `competitors` table plus on-demand analysis. A finished
//! analysis is stored as a `research_findings` row and pushed to the
//! requesting identity as a `new_finding` event.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{api_error, ApiResult};
use crate::agents::CompetitiveIntelligenceAgent;
use crate::models::{CompetitorCreate, CompetitorUpdate};
use crate::realtime::{WsEnvelope, ANONYMOUS_IDENTITY};
use crate::server::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_competitors).post(create_competitor))
        .route("/:id", get(get_competitor).put(update_competitor))
        .route("/:id/analyze", post(analyze_competitor))
        .route("/:id/threat", get(assess_threat))
}

#[derive(Debug, Deserialize)]
struct CompetitorFilters {
    status: Option<String>,
    industry: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    50
}

async fn list_competitors(
    State(state): State<AppState>,
    Query(query): Query<CompetitorFilters>,
) -> Json<Value> {
    let mut filters = Vec::new();
    if let Some(status) = query.status {
        filters.push(("status".to_string(), status));
    }
    if let Some(industry) = query.industry {
        filters.push(("industry".to_string(), industry));
    }

    let mut rows = state.store.list("competitors", &filters).await;
    rows.truncate(query.limit.min(100));
    Json(Value::Array(rows))
}

async fn get_competitor(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    find_competitor(&state, &id).await.map(Json)
}

async fn create_competitor(
    State(state): State<AppState>,
    Json(body): Json<CompetitorCreate>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let now = Utc::now().to_rfc3339();
    let mut row = serde_json::to_value(&body)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let fields = row.as_object_mut().expect("struct serializes to object");
    fields.insert("id".into(), json!(Uuid::new_v4().to_string()));
    fields.insert("created_at".into(), json!(now));
    fields.insert("updated_at".into(), json!(now));

    match state.store.create("competitors", row).await {
        Some(created) => Ok((StatusCode::CREATED, Json(created))),
        None => Err(api_error(
            StatusCode::BAD_REQUEST,
            "Failed to create competitor",
        )),
    }
}

async fn update_competitor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CompetitorUpdate>,
) -> ApiResult<Json<Value>> {
    let mut patch = serde_json::to_value(&body)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    patch
        .as_object_mut()
        .expect("struct serializes to object")
        .insert("updated_at".into(), json!(Utc::now().to_rfc3339()));

    match state.store.update("competitors", &id, patch).await {
        Some(updated) => Ok(Json(updated)),
        None => Err(api_error(StatusCode::NOT_FOUND, "Competitor not found")),
    }
}

#[derive(Debug, Deserialize)]
struct AnalyzeQuery {
    user_id: Option<String>,
    #[serde(default = "default_analysis_type")]
    analysis_type: String,
}

fn default_analysis_type() -> String {
    "comprehensive".to_string()
}

/// Run the competitive intelligence agent against one stored competitor,
/// persist the finding, and notify the requesting identity.
async fn analyze_competitor(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<AnalyzeQuery>,
) -> ApiResult<Json<Value>> {
    let competitor = find_competitor(&state, &id).await?;

    let agent = CompetitiveIntelligenceAgent::new(state.llm.clone());
    let analysis = agent.analyze(&competitor, &query.analysis_type).await;

    let finding = json!({
        "id": Uuid::new_v4().to_string(),
        "competitor_id": id,
        "analysis_type": query.analysis_type,
        "content": analysis,
        "created_at": Utc::now().to_rfc3339(),
    });
    // Soft failure: the finding is still returned even if persistence declined it
    let stored = state.store.create("research_findings", finding.clone()).await;

    let identity = query.user_id.as_deref().unwrap_or(ANONYMOUS_IDENTITY);
    let envelope = WsEnvelope::new(
        "new_finding",
        json!({
            "competitor_id": finding["competitor_id"],
            "competitor": competitor["name"],
            "finding_id": finding["id"],
        }),
    );
    state.registry.send_to_identity(identity, &envelope).await;

    Ok(Json(stored.unwrap_or(finding)))
}

/// Short threat assessment for one stored competitor. Analysis only;
/// nothing is persisted or pushed to clients.
async fn assess_threat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let competitor = find_competitor(&state, &id).await?;

    let agent = CompetitiveIntelligenceAgent::new(state.llm.clone());
    let assessment = agent.assess_threat_level(&competitor).await;

    Ok(Json(json!({
        "competitor_id": id,
        "competitor": competitor["name"],
        "assessment": assessment,
    })))
}

async fn find_competitor(state: &AppState, id: &str) -> ApiResult<Value> {
    let rows = state
        .store
        .list("competitors", &[("id".to_string(), id.to_string())])
        .await;
    rows.into_iter()
        .next()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Competitor not found"))
}
