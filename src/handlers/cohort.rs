use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::require_claims;
use crate::services::CohortService;

#[utoipa::path(
    get,
    path = "/cohorts",
    tag = "cohorts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active cohorts, newest first")
    )
)]
pub async fn list_cohorts(
    cohort_service: web::Data<CohortService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_claims(&req) {
        return Ok(e.error_response());
    }

    match cohort_service.list_cohorts().await {
        Ok(cohorts) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": cohorts
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/cohorts/{id}",
    tag = "cohorts",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Cohort id")),
    responses(
        (status = 200, description = "Cohort with active members"),
        (status = 404, description = "Cohort not found")
    )
)]
pub async fn get_cohort(
    cohort_service: web::Data<CohortService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Err(e) = require_claims(&req) {
        return Ok(e.error_response());
    }

    match cohort_service.get_cohort(path.into_inner()).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": detail
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/cohorts/{id}/join",
    tag = "cohorts",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Cohort id")),
    responses(
        (status = 200, description = "Joined the cohort"),
        (status = 403, description = "Cohorts require a pro or premium subscription"),
        (status = 409, description = "Already a member")
    )
)]
pub async fn join_cohort(
    cohort_service: web::Data<CohortService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match cohort_service.join_cohort(&claims.sub, path.into_inner()).await {
        Ok(member) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": member
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/cohorts/{id}/leave",
    tag = "cohorts",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Cohort id")),
    responses(
        (status = 200, description = "Left the cohort"),
        (status = 404, description = "No active membership")
    )
)]
pub async fn leave_cohort(
    cohort_service: web::Data<CohortService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match cohort_service.leave_cohort(&claims.sub, path.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Left the cohort"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn cohort_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cohorts")
            .route("", web::get().to(list_cohorts))
            .route("/{id}", web::get().to(get_cohort))
            .route("/{id}/join", web::post().to(join_cohort))
            .route("/{id}/leave", web::post().to(leave_cohort)),
    );
}
