use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::require_claims;
use crate::models::*;
use crate::services::SubscriptionService;

#[utoipa::path(
    get,
    path = "/subscriptions/plans",
    tag = "subscriptions",
    responses(
        (status = 200, description = "Active plan catalog, cheapest first")
    )
)]
pub async fn list_plans(
    subscription_service: web::Data<SubscriptionService>,
) -> Result<HttpResponse> {
    match subscription_service.list_plans().await {
        Ok(plans) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": plans
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/subscriptions/current",
    tag = "subscriptions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active subscription with plan, if any")
    )
)]
pub async fn current_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match subscription_service.current_subscription(&claims.sub).await {
        Ok(subscription) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": subscription
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/subscriptions/history",
    tag = "subscriptions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All subscription rows, newest first")
    )
)]
pub async fn subscription_history(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match subscription_service.subscription_history(&claims.sub).await {
        Ok(history) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": history
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/subscriptions/limits",
    tag = "subscriptions",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Resolved entitlements for the current tier", body = SubscriptionLimitsResponse)
    )
)]
pub async fn subscription_limits(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match subscription_service.subscription_limits(&claims.sub).await {
        Ok(limits) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": limits
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/checkout",
    tag = "subscriptions",
    security(("bearer_auth" = [])),
    request_body = CreateCheckoutRequest,
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutSessionResponse),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn create_checkout(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    request: web::Json<CreateCheckoutRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match subscription_service
        .create_checkout_session(&claims.sub, request.into_inner())
        .await
    {
        Ok(session) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": session
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/activate",
    tag = "subscriptions",
    security(("bearer_auth" = [])),
    request_body = ActivateSubscriptionRequest,
    responses(
        (status = 200, description = "Plan activated", body = UserSubscription),
        (status = 404, description = "Plan not found")
    )
)]
pub async fn activate_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    request: web::Json<ActivateSubscriptionRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match subscription_service
        .activate(&claims.sub, request.plan_id)
        .await
    {
        Ok(subscription) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": subscription
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/subscriptions/cancel",
    tag = "subscriptions",
    security(("bearer_auth" = [])),
    request_body = CancelSubscriptionRequest,
    responses(
        (status = 200, description = "Subscription cancelled or flagged", body = UserSubscription),
        (status = 404, description = "Subscription not found or not owned by user")
    )
)]
pub async fn cancel_subscription(
    subscription_service: web::Data<SubscriptionService>,
    req: HttpRequest,
    request: web::Json<CancelSubscriptionRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match subscription_service
        .cancel(&claims.sub, request.into_inner())
        .await
    {
        Ok(subscription) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": subscription
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn subscription_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/subscriptions")
            .route("/plans", web::get().to(list_plans))
            .route("/current", web::get().to(current_subscription))
            .route("/history", web::get().to(subscription_history))
            .route("/limits", web::get().to(subscription_limits))
            .route("/checkout", web::post().to(create_checkout))
            .route("/activate", web::post().to(activate_subscription))
            .route("/cancel", web::post().to(cancel_subscription)),
    );
}
