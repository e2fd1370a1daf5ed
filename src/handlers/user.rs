use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::ToSchema;

use crate::middlewares::require_claims;
use crate::models::*;
use crate::services::UserService;

#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user profile", body = UserResponse),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn get_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match user_service.get_profile(&claims.sub).await {
        Ok(profile) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": profile
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/users/me",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Invalid profile fields")
    )
)]
pub async fn update_profile(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match user_service
        .update_profile(&claims.sub, request.into_inner())
        .await
    {
        Ok(profile) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": profile
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/users/onboarding/complete",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CompleteOnboardingRequest,
    responses(
        (status = 200, description = "Onboarding completed", body = UserResponse),
        (status = 400, description = "Missing required onboarding fields")
    )
)]
pub async fn complete_onboarding(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    request: web::Json<CompleteOnboardingRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match user_service
        .complete_onboarding(&claims.sub, request.into_inner())
        .await
    {
        Ok(profile) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": profile,
            "message": "Onboarding completed. Sign in again or refresh the token to update the session."
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/users/onboarding/status",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Onboarding status", body = OnboardingStatusResponse)
    )
)]
pub async fn onboarding_status(
    user_service: web::Data<UserService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match user_service.get_onboarding_status(&claims.sub).await {
        Ok(status) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": status
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AnalyticsQuery {
    pub user_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/users/analytics",
    tag = "users",
    security(("bearer_auth" = [])),
    params(
        ("user_id" = Option<String>, Query, description = "Inspect another user (admin only)")
    ),
    responses(
        (status = 200, description = "Onboarding audit rows"),
        (status = 403, description = "Not allowed to view another user")
    )
)]
pub async fn user_analytics(
    user_service: web::Data<UserService>,
    req: HttpRequest,
    query: web::Query<AnalyticsQuery>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match user_service
        .get_user_analytics(&claims.sub, query.user_id.as_deref())
        .await
    {
        Ok(rows) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": rows
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn user_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/me", web::get().to(get_profile))
            .route("/me", web::put().to(update_profile))
            .route("/onboarding/complete", web::post().to(complete_onboarding))
            .route("/onboarding/status", web::get().to(onboarding_status))
            .route("/analytics", web::get().to(user_analytics)),
    );
}
