//! Request/response models for the REST API

use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/competitors`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorCreate {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "active".to_string()
}

/// Body of `PUT /api/v1/competitors/:id`; only present fields are patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Body of `POST /api/v1/trends`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendCreate {
    pub name: String,
    pub industry: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub momentum: Option<f64>,
}

/// Body of `POST /api/v1/reports/generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    #[serde(default = "default_report_type")]
    pub report_type: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Identity that requested the report; used for targeted notifications
    #[serde(default)]
    pub user_id: Option<String>,
    /// Optional email recipient for the finished report
    #[serde(default)]
    pub email_to: Option<String>,
    /// Also post the finished report to the configured Slack channel
    #[serde(default)]
    pub notify_slack: bool,
}

fn default_report_type() -> String {
    "competitive_landscape".to_string()
}
