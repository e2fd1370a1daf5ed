use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;

use super::user::SubscriptionTier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum IntervalType {
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserSubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
    PastDue,
    Trialing,
}

/// Catalog row. Immutable reference data seeded by migration.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SubscriptionPlan {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Price in minor currency units (1900 = $19.00).
    pub price: i64,
    pub currency: String,
    pub interval_type: IntervalType,
    pub interval_count: i64,
    #[schema(value_type = Option<Vec<String>>)]
    pub features: Option<Json<Vec<String>>>,
    /// -1 means unlimited.
    pub max_sessions: i64,
    pub max_resources: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UserSubscription {
    pub id: i64,
    pub user_id: String,
    pub plan_id: i64,
    pub status: UserSubscriptionStatus,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionWithPlan {
    pub subscription: UserSubscription,
    pub plan: SubscriptionPlan,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivateSubscriptionRequest {
    pub plan_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CancelSubscriptionRequest {
    pub subscription_id: i64,
    #[serde(default = "default_cancel_at_period_end")]
    pub cancel_at_period_end: bool,
}

fn default_cancel_at_period_end() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCheckoutRequest {
    pub plan_id: i64,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutSessionResponse {
    pub checkout_url: String,
    pub session_id: String,
}

/// Resolved feature limits for a user at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Entitlements {
    /// AI tutor sessions per month, -1 = unlimited.
    pub max_sessions: i64,
    /// Resource downloads per month, -1 = unlimited.
    pub max_resources: i64,
    pub can_access_cohorts: bool,
    pub can_access_premium_content: bool,
    pub has_ai_tutor: bool,
    pub support_level: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionLimitsResponse {
    pub current_tier: SubscriptionTier,
    pub limits: Entitlements,
    pub subscription: Option<SubscriptionWithPlan>,
}
