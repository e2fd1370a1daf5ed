use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;

#[derive(Clone)]
pub struct ChatService {
    pool: DbPool,
}

impl ChatService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Recent messages, newest first, optionally filtered by kind.
    pub async fn list_messages(&self, query: MessageQuery) -> AppResult<Vec<Message>> {
        let limit = query.limit.unwrap_or(50).clamp(1, 100) as i64;

        let messages = match query.message_type {
            Some(message_type) => {
                sqlx::query_as::<_, Message>(
                    "SELECT * FROM melimou_messages WHERE message_type = ? ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(message_type)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Message>(
                    "SELECT * FROM melimou_messages ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(messages)
    }

    pub async fn send_message(
        &self,
        user_id: &str,
        request: SendMessageRequest,
    ) -> AppResult<Message> {
        if request.content.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Message content cannot be empty".to_string(),
            ));
        }

        if let Some(parent_id) = request.parent_id {
            let parent_exists: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM melimou_messages WHERE id = ?")
                    .bind(parent_id)
                    .fetch_one(&self.pool)
                    .await?;
            if parent_exists == 0 {
                return Err(AppError::NotFound("Parent message not found".to_string()));
            }
        }

        let message_id = sqlx::query(
            "INSERT INTO melimou_messages (user_id, content, message_type, parent_id) VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(request.content.trim())
        .bind(request.message_type.unwrap_or(MessageType::Chat))
        .bind(request.parent_id)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_message(message_id).await
    }

    /// Senders can delete their own messages; admins can delete any.
    pub async fn delete_message(
        &self,
        requester_id: &str,
        requester_role: UserRole,
        message_id: i64,
    ) -> AppResult<()> {
        let message = self.get_message(message_id).await?;

        if message.user_id != requester_id && requester_role != UserRole::Admin {
            return Err(AppError::Forbidden(
                "Not allowed to delete this message".to_string(),
            ));
        }

        sqlx::query("DELETE FROM melimou_messages WHERE id = ?")
            .bind(message_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_message(&self, message_id: i64) -> AppResult<Message> {
        sqlx::query_as::<_, Message>("SELECT * FROM melimou_messages WHERE id = ?")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))
    }
}
