use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;

use super::user::FormalityPreference;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TutorSessionStatus {
    Active,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TutorMessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TutorSession {
    pub id: i64,
    pub user_id: String,
    pub session_topic: Option<String>,
    pub formality_level: FormalityPreference,
    pub status: TutorSessionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct TutorMessage {
    pub id: i64,
    pub session_id: i64,
    pub role: TutorMessageRole,
    pub content: String,
    #[schema(value_type = Option<Object>)]
    pub feedback: Option<Json<TutorFeedback>>,
    pub created_at: DateTime<Utc>,
}

/// Structured feedback attached to assistant replies.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TutorFeedback {
    pub corrections: Vec<String>,
    pub hints: Vec<String>,
    pub encouragement: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTutorSessionRequest {
    pub topic: Option<String>,
    pub formality_level: Option<FormalityPreference>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SendTutorMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TutorExchangeResponse {
    pub user_message: TutorMessage,
    pub tutor_message: TutorMessage,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TutorSessionDetail {
    #[serde(flatten)]
    pub session: TutorSession,
    pub messages: Vec<TutorMessage>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TutorHistoryQuery {
    pub limit: Option<u32>,
}
