//! Trend endpoints
//!
//! Listing and creation over the `trends` table plus agent-backed
//! discovery. A newly recorded trend is broadcast to every connected
//! client as a `trend_alert` event.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{api_error, ApiResult};
use crate::agents::MarketTrendAgent;
use crate::models::TrendCreate;
use crate::realtime::WsEnvelope;
use crate::server::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_trends).post(create_trend))
        .route("/discover", post(discover_trends))
        .route("/:id/trajectory", get(predict_trajectory))
}

#[derive(Debug, Deserialize)]
struct TrendFilters {
    industry: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    50
}

async fn list_trends(
    State(state): State<AppState>,
    Query(query): Query<TrendFilters>,
) -> Json<Value> {
    let mut filters = Vec::new();
    if let Some(industry) = query.industry {
        filters.push(("industry".to_string(), industry));
    }

    let mut rows = state.store.list("trends", &filters).await;
    rows.truncate(query.limit.min(100));
    Json(Value::Array(rows))
}

async fn create_trend(
    State(state): State<AppState>,
    Json(body): Json<TrendCreate>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let mut row = serde_json::to_value(&body)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    row.as_object_mut()
        .expect("struct serializes to object")
        .insert("id".into(), json!(Uuid::new_v4().to_string()));
    row.as_object_mut()
        .expect("struct serializes to object")
        .insert("created_at".into(), json!(Utc::now().to_rfc3339()));

    let created = state
        .store
        .create("trends", row)
        .await
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Failed to create trend"))?;

    let envelope = WsEnvelope::new(
        "trend_alert",
        json!({
            "trend_id": created["id"],
            "name": created["name"],
            "industry": created["industry"],
        }),
    );
    state.registry.broadcast(&envelope).await;

    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Debug, Deserialize)]
struct DiscoverQuery {
    industry: String,
    #[serde(default = "default_timeframe")]
    timeframe: String,
}

fn default_timeframe() -> String {
    "30_days".to_string()
}

/// Project where one stored trend is heading.
async fn predict_trajectory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let trend = state
        .store
        .list("trends", &[("id".to_string(), id.clone())])
        .await
        .into_iter()
        .next()
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Trend not found"))?;

    let agent = MarketTrendAgent::new(state.llm.clone());
    let prediction = agent.predict_trajectory(&trend).await;

    Ok(Json(json!({
        "trend_id": id,
        "name": trend["name"],
        "prediction": prediction,
    })))
}

/// Ask the trend agent for a fresh read on an industry. Analysis only;
/// nothing is persisted or broadcast until a trend row is created.
async fn discover_trends(
    State(state): State<AppState>,
    Query(query): Query<DiscoverQuery>,
) -> Json<Value> {
    let agent = MarketTrendAgent::new(state.llm.clone());
    let analysis = agent.discover(&query.industry, &query.timeframe).await;

    Json(json!({
        "industry": query.industry,
        "timeframe": query.timeframe,
        "analysis": analysis,
    }))
}
