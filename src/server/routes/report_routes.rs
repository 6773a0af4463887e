//! Report endpoints
//!
//! Report generation runs as a background task: the route answers 202
//! immediately, and completion is announced to every connected client with
//! a `report_ready` broadcast. Email/Slack delivery is best-effort; a
//! failed send is logged and never fails the notification path.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{api_error, ApiResult};
use crate::agents::SynthesisAgent;
use crate::models::ReportRequest;
use crate::realtime::WsEnvelope;
use crate::server::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reports))
        .route("/:id", get(get_report))
        .route("/generate", post(generate_report))
}

async fn list_reports(State(state): State<AppState>) -> Json<Value> {
    let mut rows = state.store.list("reports", &[]).await;
    // Newest first
    rows.sort_by(|a, b| {
        let a_ts = a["created_at"].as_str().unwrap_or_default();
        let b_ts = b["created_at"].as_str().unwrap_or_default();
        b_ts.cmp(a_ts)
    });
    Json(Value::Array(rows))
}

async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state
        .store
        .list("reports", &[("id".to_string(), id)])
        .await
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Report not found"))
}

async fn generate_report(
    State(state): State<AppState>,
    Json(request): Json<ReportRequest>,
) -> (StatusCode, Json<Value>) {
    let report_id = Uuid::new_v4().to_string();
    log::info!("Report {} queued ({})", report_id, request.report_type);

    tokio::spawn(run_report_generation(
        state.clone(),
        report_id.clone(),
        request,
    ));

    (
        StatusCode::ACCEPTED,
        Json(json!({ "report_id": report_id, "status": "generating" })),
    )
}

/// Gather source rows, synthesize the report, persist it, then fan the
/// completion out over the registry and the delivery collaborators.
async fn run_report_generation(state: AppState, report_id: String, request: ReportRequest) {
    let competitors = state.store.list("competitors", &[]).await;
    let trends = state.store.list("trends", &[]).await;

    let agent = SynthesisAgent::new(state.llm.clone());
    let content = agent
        .compose_report(&request.report_type, &competitors, &trends)
        .await;
    let summary = agent.executive_summary(&content).await;

    let title = request
        .title
        .clone()
        .unwrap_or_else(|| format!("{} report", request.report_type));
    let row = json!({
        "id": &report_id,
        "title": &title,
        "report_type": &request.report_type,
        "content": content,
        "summary": &summary,
        "status": "completed",
        "created_at": Utc::now().to_rfc3339(),
    });
    // A declined insert still produces the broadcast; the report content is
    // simply not retrievable later
    if state.store.create("reports", row.clone()).await.is_none() {
        log::error!("Report {} was not persisted", report_id);
    }

    let envelope = WsEnvelope::new(
        "report_ready",
        json!({
            "report_id": &report_id,
            "title": &title,
            "report_type": &request.report_type,
        }),
    );
    let delivered = state.registry.broadcast(&envelope).await;
    log::info!("Report {} ready, notified {} clients", report_id, delivered);

    // The requesting identity also gets a targeted copy carrying the summary
    if let Some(identity) = request.user_id.as_deref() {
        let targeted = WsEnvelope::new(
            "report_ready",
            json!({
                "report_id": &report_id,
                "title": &title,
                "report_type": &request.report_type,
                "summary": &summary,
            }),
        );
        state.registry.send_to_identity(identity, &targeted).await;
    }

    if let Some(recipient) = request.email_to.as_deref() {
        let payload = json!({
            "subject": format!("Your report is ready: {}", title),
            "body": &summary,
        });
        if !state.email.send(recipient, &payload).await {
            log::warn!("Report email to {} was not delivered", recipient);
        }
    }

    if request.notify_slack {
        let payload = json!({ "body": format!("Report ready: {}\n{}", title, summary) });
        if !state.slack.send("", &payload).await {
            log::warn!("Report Slack notification was not delivered");
        }
    }
}
