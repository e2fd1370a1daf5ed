use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Alert {
    pub id: i64,
    pub title: String,
    pub message: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub is_global: bool,
    /// Null for global alerts.
    pub target_user_id: Option<String>,
    pub is_read: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateAlertRequest {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub target_user_id: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AlertQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<u32>,
}
