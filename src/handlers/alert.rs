use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::require_claims;
use crate::models::*;
use crate::services::AlertService;

#[utoipa::path(
    get,
    path = "/alerts",
    tag = "alerts",
    security(("bearer_auth" = [])),
    params(
        ("unread_only" = Option<bool>, Query, description = "Only unread alerts"),
        ("limit" = Option<u32>, Query, description = "Max alerts (1-100, default 20)")
    ),
    responses(
        (status = 200, description = "Global and targeted alerts, newest first")
    )
)]
pub async fn list_alerts(
    alert_service: web::Data<AlertService>,
    req: HttpRequest,
    query: web::Query<AlertQuery>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match alert_service
        .list_alerts(&claims.sub, query.into_inner())
        .await
    {
        Ok(alerts) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": alerts
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/alerts",
    tag = "alerts",
    security(("bearer_auth" = [])),
    request_body = CreateAlertRequest,
    responses(
        (status = 200, description = "Alert published", body = Alert),
        (status = 403, description = "Requires instructor or admin role")
    )
)]
pub async fn create_alert(
    alert_service: web::Data<AlertService>,
    req: HttpRequest,
    request: web::Json<CreateAlertRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match alert_service
        .create_alert(claims.role, request.into_inner())
        .await
    {
        Ok(alert) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": alert
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/alerts/{id}/read",
    tag = "alerts",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Alert id")),
    responses(
        (status = 200, description = "Alert marked as read", body = Alert),
        (status = 404, description = "Alert not found or not visible to user")
    )
)]
pub async fn mark_as_read(
    alert_service: web::Data<AlertService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match alert_service.mark_as_read(&claims.sub, path.into_inner()).await {
        Ok(alert) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": alert
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/alerts/read-all",
    tag = "alerts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All visible alerts marked as read")
    )
)]
pub async fn mark_all_as_read(
    alert_service: web::Data<AlertService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match alert_service.mark_all_as_read(&claims.sub).await {
        Ok(count) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": { "marked": count }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn alert_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/alerts")
            .route("", web::get().to(list_alerts))
            .route("", web::post().to(create_alert))
            .route("/read-all", web::post().to(mark_all_as_read))
            .route("/{id}/read", web::post().to(mark_as_read)),
    );
}
