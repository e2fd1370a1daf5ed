use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::{current_claims, require_claims};
use crate::models::*;
use crate::services::ResourceService;

#[utoipa::path(
    get,
    path = "/resources",
    tag = "resources",
    params(
        ("search" = Option<String>, Query, description = "Name substring filter"),
        ("type" = Option<String>, Query, description = "pdf | video | audio | link | text"),
        ("limit" = Option<u32>, Query, description = "Max resources (1-100, default 20)")
    ),
    responses(
        (status = 200, description = "Public resources, newest first")
    )
)]
pub async fn list_resources(
    resource_service: web::Data<ResourceService>,
    query: web::Query<ResourceQuery>,
) -> Result<HttpResponse> {
    match resource_service.list_resources(query.into_inner()).await {
        Ok(resources) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": resources
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/resources/{id}",
    tag = "resources",
    params(("id" = i64, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Resource details", body = Resource),
        (status = 403, description = "Requires a higher subscription tier"),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn get_resource(
    resource_service: web::Data<ResourceService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let tier = current_claims(&req).map(|c| c.subscription_tier);

    match resource_service.get_resource(tier, path.into_inner()).await {
        Ok(resource) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": resource
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/resources",
    tag = "resources",
    security(("bearer_auth" = [])),
    request_body = CreateResourceRequest,
    responses(
        (status = 200, description = "Resource created", body = Resource),
        (status = 400, description = "Missing name or URL")
    )
)]
pub async fn create_resource(
    resource_service: web::Data<ResourceService>,
    req: HttpRequest,
    request: web::Json<CreateResourceRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match resource_service
        .create_resource(&claims.sub, request.into_inner())
        .await
    {
        Ok(resource) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": resource
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/resources/{id}",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Resource id")),
    request_body = UpdateResourceRequest,
    responses(
        (status = 200, description = "Resource updated", body = Resource),
        (status = 403, description = "Not the uploader and not an admin")
    )
)]
pub async fn update_resource(
    resource_service: web::Data<ResourceService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateResourceRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match resource_service
        .update_resource(&claims.sub, claims.role, path.into_inner(), request.into_inner())
        .await
    {
        Ok(resource) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": resource
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/resources/{id}",
    tag = "resources",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Resource deleted"),
        (status = 403, description = "Not the uploader and not an admin")
    )
)]
pub async fn delete_resource(
    resource_service: web::Data<ResourceService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match resource_service
        .delete_resource(&claims.sub, claims.role, path.into_inner())
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Resource deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn resource_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/resources")
            .route("", web::get().to(list_resources))
            .route("", web::post().to(create_resource))
            .route("/{id}", web::get().to(get_resource))
            .route("/{id}", web::put().to(update_resource))
            .route("/{id}", web::delete().to(delete_resource)),
    );
}
