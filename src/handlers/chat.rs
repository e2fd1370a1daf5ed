use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use crate::middlewares::require_claims;
use crate::models::*;
use crate::services::ChatService;

#[utoipa::path(
    get,
    path = "/chat/messages",
    tag = "chat",
    params(
        ("message_type" = Option<String>, Query, description = "chat | forum | announcement"),
        ("limit" = Option<u32>, Query, description = "Max messages (1-100, default 50)")
    ),
    responses(
        (status = 200, description = "Recent messages, newest first")
    )
)]
pub async fn list_messages(
    chat_service: web::Data<ChatService>,
    query: web::Query<MessageQuery>,
) -> Result<HttpResponse> {
    match chat_service.list_messages(query.into_inner()).await {
        Ok(messages) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": messages
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/chat/messages",
    tag = "chat",
    security(("bearer_auth" = [])),
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Message posted", body = Message),
        (status = 400, description = "Empty message")
    )
)]
pub async fn send_message(
    chat_service: web::Data<ChatService>,
    req: HttpRequest,
    request: web::Json<SendMessageRequest>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match chat_service
        .send_message(&claims.sub, request.into_inner())
        .await
    {
        Ok(message) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": message
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/chat/messages/{id}",
    tag = "chat",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message deleted"),
        (status = 403, description = "Not the sender and not an admin")
    )
)]
pub async fn delete_message(
    chat_service: web::Data<ChatService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let claims = match require_claims(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match chat_service
        .delete_message(&claims.sub, claims.role, path.into_inner())
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Message deleted"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn chat_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/chat/messages")
            .route("", web::get().to(list_messages))
            .route("", web::post().to(send_message))
            .route("/{id}", web::delete().to(delete_message)),
    );
}
