use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::user::SubscriptionTier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Pdf,
    Video,
    Audio,
    Link,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Resource {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub url: String,
    pub is_public: bool,
    pub required_subscription_tier: SubscriptionTier,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateResourceRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub url: String,
    pub is_public: Option<bool>,
    pub required_subscription_tier: Option<SubscriptionTier>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateResourceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub is_public: Option<bool>,
    pub required_subscription_tier: Option<SubscriptionTier>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResourceQuery {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: Option<ResourceType>,
    pub limit: Option<u32>,
}
