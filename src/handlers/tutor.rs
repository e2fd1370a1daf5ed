use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::require_claims;
use crate::models::*;
use crate::services::TutorService;

#[utoipa::path(
    post,
    path = "/tutor/sessions",
    tag = "tutor",
    security(("bearer_auth" = [])),
    request_body = CreateTutorSessionRequest,
    responses(
        (status = 200, description = "Session started", body = TutorSession),
        (status = 400, description = "Monthly session limit reached")
    )
)]
pub async fn create_session(
    tutor_service: web::Data<TutorService>,
    req: HttpRequest,
    request: web::Json<CreateTutorSessionRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match tutor_service
        .create_session(&claims.sub, request.into_inner())
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
    get,
    path = "/tutor/sessions/active",
    tag = "tutor",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active session with messages, if any")
    )
)]
pub async fn active_session(
    tutor_service: web::Data<TutorService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match tutor_service.get_active_session(&claims.sub).await {
        Ok(session) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": session
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/tutor/sessions/history",
    tag = "tutor",
    security(("bearer_auth" = [])),
    params(
        ("limit" = Option<u32>, Query, description = "Max sessions to return (1-50, default 10)")
    ),
    responses(
        (status = 200, description = "Recent sessions, newest first")
    )
)]
pub async fn session_history(
    tutor_service: web::Data<TutorService>,
    req: HttpRequest,
    query: web::Query<TutorHistoryQuery>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match tutor_service
        .session_history(&claims.sub, query.into_inner())
        .await
    {
        Ok(sessions) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": sessions
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/tutor/sessions/{id}/messages",
    tag = "tutor",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Session id")),
    request_body = SendTutorMessageRequest,
    responses(
        (status = 200, description = "User message stored and tutor reply generated", body = TutorExchangeResponse),
        (status = 404, description = "Session not found or not owned by user")
    )
)]
pub async fn send_message(
    tutor_service: web::Data<TutorService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<SendTutorMessageRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match tutor_service
        .send_message(&claims.sub, path.into_inner(), request.into_inner())
        .await
    {
        Ok(exchange) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": exchange
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/tutor/sessions/{id}/end",
    tag = "tutor",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Session id")),
    responses(
        (status = 200, description = "Session completed", body = TutorSession),
        (status = 404, description = "Session not found or not owned by user")
    )
)]
pub async fn end_session(
    tutor_service: web::Data<TutorService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match tutor_service.end_session(&claims.sub, path.into_inner()).await {
        Ok(session) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": session
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn tutor_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tutor/sessions")
            .route("", web::post().to(create_session))
            .route("/active", web::get().to(active_session))
            .route("/history", web::get().to(session_history))
            .route("/{id}/messages", web::post().to(send_message))
            .route("/{id}/end", web::post().to(end_session)),
    );
}
