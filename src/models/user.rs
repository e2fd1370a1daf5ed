use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Instructor,
    Admin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FormalityPreference {
    Informal,
    Formal,
    Mixed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GreekLevel {
    AbsoluteBeginner,
    Beginner,
    Elementary,
    Intermediate,
    Advanced,
    Native,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema, Default,
)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Premium,
}

impl SubscriptionTier {
    /// Ordering used for content gating: free < pro < premium.
    pub fn rank(&self) -> u8 {
        match self {
            SubscriptionTier::Free => 0,
            SubscriptionTier::Pro => 1,
            SubscriptionTier::Premium => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
    PastDue,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub image: Option<String>,
    pub role: UserRole,
    pub formality_preference: FormalityPreference,
    pub has_completed_onboarding: bool,
    pub greek_level: Option<GreekLevel>,
    #[schema(value_type = Option<Vec<String>>)]
    pub learning_goals: Option<Json<Vec<String>>>,
    pub study_time_per_week: Option<i64>,
    pub previous_experience: Option<String>,
    #[schema(value_type = Option<Vec<String>>)]
    pub interests: Option<Json<Vec<String>>>,
    pub how_heard_about_us: Option<String>,
    pub wants_practice_test: bool,
    pub subscription_tier: SubscriptionTier,
    pub subscription_status: SubscriptionStatus,
    pub subscription_start_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: UserRole,
    pub formality_preference: FormalityPreference,
    pub has_completed_onboarding: bool,
    pub greek_level: Option<GreekLevel>,
    pub learning_goals: Vec<String>,
    pub study_time_per_week: Option<i64>,
    pub interests: Vec<String>,
    pub subscription_tier: SubscriptionTier,
    pub subscription_status: SubscriptionStatus,
    pub subscription_start_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            image: user.image,
            role: user.role,
            formality_preference: user.formality_preference,
            has_completed_onboarding: user.has_completed_onboarding,
            greek_level: user.greek_level,
            learning_goals: user.learning_goals.map(|j| j.0).unwrap_or_default(),
            study_time_per_week: user.study_time_per_week,
            interests: user.interests.map(|j| j.0).unwrap_or_default(),
            subscription_tier: user.subscription_tier,
            subscription_status: user.subscription_status,
            subscription_start_date: user.subscription_start_date,
            subscription_end_date: user.subscription_end_date,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "maria@example.com")]
    pub email: String,
    #[schema(example = "Maria Papadopoulou")]
    pub name: Option<String>,
    #[schema(example = "Password123")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "maria@example.com")]
    pub email: String,
    #[schema(example = "Password123")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompleteOnboardingRequest {
    pub role: UserRole,
    pub greek_level: GreekLevel,
    pub learning_goals: Vec<String>,
    pub study_time_per_week: i64,
    pub previous_experience: Option<String>,
    pub interests: Option<Vec<String>>,
    pub how_heard_about_us: Option<String>,
    #[serde(default)]
    pub wants_practice_test: bool,
    pub formality_preference: Option<FormalityPreference>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub greek_level: Option<GreekLevel>,
    pub learning_goals: Option<Vec<String>>,
    pub study_time_per_week: Option<i64>,
    pub interests: Option<Vec<String>>,
    pub formality_preference: Option<FormalityPreference>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OnboardingStatusResponse {
    pub has_completed_onboarding: bool,
    pub role: UserRole,
    pub subscription_tier: SubscriptionTier,
}

/// Append-only audit row, one per onboarding question.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OnboardingResponseRow {
    pub id: i64,
    pub user_id: String,
    pub question_key: String,
    #[schema(value_type = Object)]
    pub response: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
