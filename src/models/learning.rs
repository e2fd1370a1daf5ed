use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;

use super::user::SubscriptionTier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LearningPath {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub is_public: bool,
    pub required_subscription_tier: SubscriptionTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Module {
    pub id: i64,
    pub learning_path_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub order_index: i64,
    /// Total minutes for the module.
    pub estimated_duration: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Lesson {
    pub id: i64,
    pub module_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Rich lesson body: text blocks, audio URLs, exercises.
    #[schema(value_type = Object)]
    pub content: Option<Json<serde_json::Value>>,
    pub order_index: i64,
    pub estimated_duration: Option<i64>,
    pub required_subscription_tier: SubscriptionTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserProgress {
    pub id: i64,
    pub user_id: String,
    pub lesson_id: i64,
    pub status: ProgressStatus,
    pub completed_at: Option<DateTime<Utc>>,
    /// Percentage score (0-100).
    pub score: Option<i64>,
    /// Minutes spent on the lesson.
    pub time_spent: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ModuleWithLessons {
    #[serde(flatten)]
    pub module: Module,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LearningPathDetail {
    #[serde(flatten)]
    pub path: LearningPath,
    pub modules: Vec<ModuleWithLessons>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateLearningPathRequest {
    pub name: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    #[serde(default = "default_true")]
    pub is_public: bool,
    pub required_subscription_tier: Option<SubscriptionTier>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateLearningPathRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub is_public: Option<bool>,
    pub required_subscription_tier: Option<SubscriptionTier>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateLessonRequest {
    pub module_id: i64,
    pub name: String,
    pub description: Option<String>,
    #[schema(value_type = Object)]
    pub content: Option<serde_json::Value>,
    pub order_index: i64,
    pub estimated_duration: Option<i64>,
    pub required_subscription_tier: Option<SubscriptionTier>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateLessonRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Object)]
    pub content: Option<serde_json::Value>,
    pub order_index: Option<i64>,
    pub estimated_duration: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MarkLessonCompleteRequest {
    pub score: Option<i64>,
    pub time_spent: Option<i64>,
}
