use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CohortRole {
    Member,
    Leader,
    Instructor,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Cohort {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    /// Null for ongoing cohorts.
    pub end_date: Option<DateTime<Utc>>,
    pub max_members: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CohortMember {
    pub id: i64,
    pub cohort_id: i64,
    pub user_id: String,
    pub role: CohortRole,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CohortDetail {
    #[serde(flatten)]
    pub cohort: Cohort,
    pub members: Vec<CohortMember>,
}
