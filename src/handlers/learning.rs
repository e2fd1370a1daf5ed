use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::{current_claims, require_claims};
use crate::models::*;
use crate::services::LearningService;

#[utoipa::path(
    get,
    path = "/learning-paths",
    tag = "learning",
    responses(
        (status = 200, description = "Public catalog with modules and lessons")
    )
)]
pub async fn list_paths(learning_service: web::Data<LearningService>) -> Result<HttpResponse> {
    match learning_service.list_paths().await {
        Ok(paths) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": paths
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/learning-paths/{id}",
    tag = "learning",
    params(("id" = i64, Path, description = "Learning path id")),
    responses(
        (status = 200, description = "Path with nested modules and lessons", body = LearningPathDetail),
        (status = 404, description = "Path not found")
    )
)]
pub async fn get_path(
    learning_service: web::Data<LearningService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match learning_service.get_path(path.into_inner()).await {
        Ok(detail) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": detail
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/learning-paths",
    tag = "learning",
    security(("bearer_auth" = [])),
    request_body = CreateLearningPathRequest,
    responses(
        (status = 200, description = "Path created", body = LearningPath),
        (status = 403, description = "Requires instructor or admin role")
    )
)]
pub async fn create_path(
    learning_service: web::Data<LearningService>,
    req: HttpRequest,
    request: web::Json<CreateLearningPathRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match learning_service
        .create_path(claims.role, request.into_inner())
        .await
    {
        Ok(path) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": path
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/learning-paths/{id}",
    tag = "learning",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Learning path id")),
    request_body = UpdateLearningPathRequest,
    responses(
        (status = 200, description = "Path updated", body = LearningPath),
        (status = 404, description = "Path not found")
    )
)]
pub async fn update_path(
    learning_service: web::Data<LearningService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateLearningPathRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match learning_service
        .update_path(claims.role, path.into_inner(), request.into_inner())
        .await
    {
        Ok(updated) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": updated
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/learning-paths/{id}",
    tag = "learning",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Learning path id")),
    responses(
        (status = 200, description = "Path deleted"),
        (status = 404, description = "Path not found")
    )
)]
pub async fn delete_path(
    learning_service: web::Data<LearningService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match learning_service
        .delete_path(claims.role, path.into_inner())
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Learning path deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/modules/{id}/lessons",
    tag = "learning",
    params(("id" = i64, Path, description = "Module id")),
    responses(
        (status = 200, description = "Lessons in module order")
    )
)]
pub async fn lessons_by_module(
    learning_service: web::Data<LearningService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match learning_service.lessons_by_module(path.into_inner()).await {
        Ok(lessons) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": lessons
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lessons/{id}",
    tag = "learning",
    params(("id" = i64, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Lesson content", body = Lesson),
        (status = 403, description = "Requires a higher subscription tier"),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn get_lesson(
    learning_service: web::Data<LearningService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let tier = current_claims(&req).map(|c| c.subscription_tier);

    match learning_service.get_lesson(tier, path.into_inner()).await {
        Ok(lesson) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": lesson
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/lessons",
    tag = "learning",
    security(("bearer_auth" = [])),
    request_body = CreateLessonRequest,
    responses(
        (status = 200, description = "Lesson created", body = Lesson),
        (status = 403, description = "Requires instructor or admin role"),
        (status = 404, description = "Module not found")
    )
)]
pub async fn create_lesson(
    learning_service: web::Data<LearningService>,
    req: HttpRequest,
    request: web::Json<CreateLessonRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match learning_service
        .create_lesson(claims.role, request.into_inner())
        .await
    {
        Ok(lesson) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": lesson
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/lessons/{id}",
    tag = "learning",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Lesson id")),
    request_body = UpdateLessonRequest,
    responses(
        (status = 200, description = "Lesson updated", body = Lesson),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn update_lesson(
    learning_service: web::Data<LearningService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateLessonRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match learning_service
        .update_lesson(claims.role, path.into_inner(), request.into_inner())
        .await
    {
        Ok(lesson) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": lesson
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/lessons/{id}",
    tag = "learning",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Lesson deleted"),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn delete_lesson(
    learning_service: web::Data<LearningService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match learning_service
        .delete_lesson(claims.role, path.into_inner())
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Lesson deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/lessons/{id}/complete",
    tag = "learning",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Lesson id")),
    request_body = MarkLessonCompleteRequest,
    responses(
        (status = 200, description = "Completion recorded", body = UserProgress),
        (status = 404, description = "Lesson not found")
    )
)]
pub async fn mark_lesson_complete(
    learning_service: web::Data<LearningService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<MarkLessonCompleteRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match learning_service
        .mark_lesson_complete(&claims.sub, path.into_inner(), request.into_inner())
        .await
    {
        Ok(progress) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": progress
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lessons/{id}/progress",
    tag = "learning",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Progress for the current user, if any")
    )
)]
pub async fn get_lesson_progress(
    learning_service: web::Data<LearningService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match learning_service
        .get_lesson_progress(&claims.sub, path.into_inner())
        .await
    {
        Ok(progress) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": progress
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn learning_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/learning-paths")
            .route("", web::get().to(list_paths))
            .route("", web::post().to(create_path))
            .route("/{id}", web::get().to(get_path))
            .route("/{id}", web::put().to(update_path))
            .route("/{id}", web::delete().to(delete_path)),
    )
    .service(web::scope("/modules").route("/{id}/lessons", web::get().to(lessons_by_module)))
    .service(
        web::scope("/lessons")
            .route("", web::post().to(create_lesson))
            .route("/{id}", web::get().to(get_lesson))
            .route("/{id}", web::put().to(update_lesson))
            .route("/{id}", web::delete().to(delete_lesson))
            .route("/{id}/complete", web::post().to(mark_lesson_complete))
            .route("/{id}/progress", web::get().to(get_lesson_progress)),
    );
}
