use std::sync::Arc;

use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::entitlement;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rand::seq::SliceRandom;
use sqlx::types::Json;

/// Produces the assistant side of a tutor exchange. Kept behind a trait so
/// the canned generator can be swapped for a real model integration without
/// touching session bookkeeping.
pub trait TutorBackend: Send + Sync {
    fn reply(&self, user_input: &str, formality: FormalityPreference) -> (String, TutorFeedback);
}

const INFORMAL_REPLIES: [&str; 3] = [
    "Καλά! That's a good start. Try saying it again with more confidence.",
    "Ωραία! You're getting better. Let me help you with the pronunciation.",
    "Μπράβο! Keep practicing, you're doing well!",
];

const FORMAL_REPLIES: [&str; 3] = [
    "Εξαιρετικά. Your effort is commendable. Please continue with the exercise.",
    "Πολύ καλά. I suggest we focus on improving your accent.",
    "Συγχαρητήρια. Your progress is notable.",
];

const MIXED_REPLIES: [&str; 3] = [
    "Good job! Καλή δουλειά! Let's work on that phrase together.",
    "That's right! Σωστά! Now try it with different intonation.",
    "Excellent! Τέλεια! You're improving quickly.",
];

/// Canned tutor: picks a formality-appropriate encouragement at random.
pub struct CannedTutor;

impl TutorBackend for CannedTutor {
    fn reply(&self, _user_input: &str, formality: FormalityPreference) -> (String, TutorFeedback) {
        let pool: &[&str] = match formality {
            FormalityPreference::Informal => &INFORMAL_REPLIES,
            FormalityPreference::Formal => &FORMAL_REPLIES,
            FormalityPreference::Mixed => &MIXED_REPLIES,
        };
        let content = pool
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(MIXED_REPLIES[0])
            .to_string();

        let feedback = TutorFeedback {
            corrections: vec![],
            hints: vec![
                "Try speaking more slowly".to_string(),
                "Focus on the accent".to_string(),
            ],
            encouragement: "Keep up the great work!".to_string(),
        };
        (content, feedback)
    }
}

#[derive(Clone)]
pub struct TutorService {
    pool: DbPool,
    backend: Arc<dyn TutorBackend>,
}

impl TutorService {
    pub fn new(pool: DbPool, backend: Arc<dyn TutorBackend>) -> Self {
        Self { pool, backend }
    }

    /// Starts a tutor session. Any prior active session is abandoned first,
    /// and the per-tier monthly session cap is enforced before the insert.
    pub async fn create_session(
        &self,
        user_id: &str,
        request: CreateTutorSessionRequest,
    ) -> AppResult<TutorSession> {
        let user = self.get_user(user_id).await?;
        self.enforce_session_cap(&user).await?;

        let formality = request
            .formality_level
            .unwrap_or(user.formality_preference);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE melimou_tutor_sessions
            SET status = 'abandoned', ended_at = CURRENT_TIMESTAMP
            WHERE user_id = ? AND status = 'active'
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let session_id = sqlx::query(
            r#"
            INSERT INTO melimou_tutor_sessions (user_id, session_topic, formality_level, status)
            VALUES (?, ?, ?, 'active')
            "#,
        )
        .bind(user_id)
        .bind(&request.topic)
        .bind(formality)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        self.get_session(session_id).await
    }

    pub async fn get_active_session(&self, user_id: &str) -> AppResult<Option<TutorSessionDetail>> {
        let session = sqlx::query_as::<_, TutorSession>(
            "SELECT * FROM melimou_tutor_sessions WHERE user_id = ? AND status = 'active'",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match session {
            Some(session) => {
                let messages = self.session_messages(session.id).await?;
                Ok(Some(TutorSessionDetail { session, messages }))
            }
            None => Ok(None),
        }
    }

    /// Stores the user's message, asks the backend for a reply and stores
    /// that too. Ownership is part of the session lookup.
    pub async fn send_message(
        &self,
        user_id: &str,
        session_id: i64,
        request: SendTutorMessageRequest,
    ) -> AppResult<TutorExchangeResponse> {
        if request.content.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Message content cannot be empty".to_string(),
            ));
        }

        let session = self.get_owned_session(user_id, session_id).await?;
        if session.status != TutorSessionStatus::Active {
            return Err(AppError::ValidationError(
                "Session is no longer active".to_string(),
            ));
        }

        let (reply, feedback) = self.backend.reply(&request.content, session.formality_level);

        let mut tx = self.pool.begin().await?;

        let user_message_id = sqlx::query(
            "INSERT INTO melimou_tutor_messages (session_id, role, content) VALUES (?, 'user', ?)",
        )
        .bind(session_id)
        .bind(&request.content)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let tutor_message_id = sqlx::query(
            r#"
            INSERT INTO melimou_tutor_messages (session_id, role, content, feedback)
            VALUES (?, 'assistant', ?, ?)
            "#,
        )
        .bind(session_id)
        .bind(&reply)
        .bind(Json(&feedback))
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        Ok(TutorExchangeResponse {
            user_message: self.get_message(user_message_id).await?,
            tutor_message: self.get_message(tutor_message_id).await?,
        })
    }

    pub async fn end_session(&self, user_id: &str, session_id: i64) -> AppResult<TutorSession> {
        let session = self.get_owned_session(user_id, session_id).await?;

        sqlx::query(
            r#"
            UPDATE melimou_tutor_sessions
            SET status = 'completed', ended_at = CURRENT_TIMESTAMP
            WHERE id = ? AND status = 'active'
            "#,
        )
        .bind(session.id)
        .execute(&self.pool)
        .await?;

        self.get_session(session.id).await
    }

    pub async fn session_history(
        &self,
        user_id: &str,
        query: TutorHistoryQuery,
    ) -> AppResult<Vec<TutorSession>> {
        let limit = query.limit.unwrap_or(10).clamp(1, 50);

        let sessions = sqlx::query_as::<_, TutorSession>(
            "SELECT * FROM melimou_tutor_sessions WHERE user_id = ? ORDER BY started_at DESC, id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn enforce_session_cap(&self, user: &User) -> AppResult<()> {
        let plan = self.active_plan(&user.id).await?;
        let limits = entitlement::resolve(Some(user.subscription_tier), plan.as_ref());
        if limits.max_sessions < 0 {
            return Ok(());
        }

        // started_at rows come from CURRENT_TIMESTAMP (space-separated) while
        // the bound cutoff is RFC3339 text; datetime() normalizes both before
        // the comparison.
        let month_start = current_month_start()?;
        let used: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM melimou_tutor_sessions WHERE user_id = ? AND datetime(started_at) >= datetime(?)",
        )
        .bind(&user.id)
        .bind(month_start)
        .fetch_one(&self.pool)
        .await?;

        if used >= limits.max_sessions {
            return Err(AppError::ValidationError(format!(
                "Monthly tutor session limit of {} reached",
                limits.max_sessions
            )));
        }
        Ok(())
    }

    async fn active_plan(&self, user_id: &str) -> AppResult<Option<SubscriptionPlan>> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            SELECT p.* FROM melimou_subscription_plans p
            JOIN melimou_user_subscriptions s ON s.plan_id = p.id
            WHERE s.user_id = ? AND s.status = 'active'
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }

    async fn session_messages(&self, session_id: i64) -> AppResult<Vec<TutorMessage>> {
        let messages = sqlx::query_as::<_, TutorMessage>(
            "SELECT * FROM melimou_tutor_messages WHERE session_id = ? ORDER BY created_at, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    async fn get_owned_session(&self, user_id: &str, session_id: i64) -> AppResult<TutorSession> {
        sqlx::query_as::<_, TutorSession>(
            "SELECT * FROM melimou_tutor_sessions WHERE id = ? AND user_id = ?",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Session not found or not owned by user".to_string()))
    }

    async fn get_session(&self, session_id: i64) -> AppResult<TutorSession> {
        sqlx::query_as::<_, TutorSession>("SELECT * FROM melimou_tutor_sessions WHERE id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Session not found".to_string()))
    }

    async fn get_message(&self, message_id: i64) -> AppResult<TutorMessage> {
        sqlx::query_as::<_, TutorMessage>("SELECT * FROM melimou_tutor_messages WHERE id = ?")
            .bind(message_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))
    }

    async fn get_user(&self, user_id: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM melimou_users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

fn current_month_start() -> AppResult<DateTime<Utc>> {
    let today = Utc::now().date_naive();
    NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::InternalError("Failed to compute month start".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use uuid::Uuid;

    async fn insert_user(pool: &DbPool, tier: &str) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO melimou_users (id, email, subscription_tier) VALUES (?, ?, ?)")
            .bind(&id)
            .bind(format!("{id}@example.com"))
            .bind(tier)
            .execute(pool)
            .await
            .unwrap();
        id
    }

    fn service(pool: DbPool) -> TutorService {
        TutorService::new(pool, Arc::new(CannedTutor))
    }

    fn session_request() -> CreateTutorSessionRequest {
        CreateTutorSessionRequest {
            topic: Some("ordering coffee".to_string()),
            formality_level: Some(FormalityPreference::Informal),
        }
    }

    #[tokio::test]
    async fn new_session_abandons_previous_active_one() {
        let pool = test_pool().await;
        let svc = service(pool.clone());
        let user_id = insert_user(&pool, "premium").await;

        let first = svc.create_session(&user_id, session_request()).await.unwrap();
        let second = svc.create_session(&user_id, session_request()).await.unwrap();

        let active = svc.get_active_session(&user_id).await.unwrap().unwrap();
        assert_eq!(active.session.id, second.id);

        let first_after = svc
            .session_history(&user_id, TutorHistoryQuery { limit: None })
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.id == first.id)
            .unwrap();
        assert_eq!(first_after.status, TutorSessionStatus::Abandoned);
    }

    #[tokio::test]
    async fn free_tier_is_capped_at_three_sessions_per_month() {
        let pool = test_pool().await;
        let svc = service(pool.clone());
        let user_id = insert_user(&pool, "free").await;

        for _ in 0..3 {
            svc.create_session(&user_id, session_request()).await.unwrap();
        }
        let err = svc
            .create_session(&user_id, session_request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn sessions_started_on_the_first_of_the_month_count_toward_cap() {
        let pool = test_pool().await;
        let svc = service(pool.clone());
        let user_id = insert_user(&pool, "free").await;

        for _ in 0..3 {
            sqlx::query(
                r#"
                INSERT INTO melimou_tutor_sessions (user_id, status, started_at)
                VALUES (?, 'completed', datetime('now', 'start of month'))
                "#,
            )
            .bind(&user_id)
            .execute(&pool)
            .await
            .unwrap();
        }

        let err = svc
            .create_session(&user_id, session_request())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn premium_tier_is_not_capped() {
        let pool = test_pool().await;
        let svc = service(pool.clone());
        let user_id = insert_user(&pool, "premium").await;

        for _ in 0..5 {
            svc.create_session(&user_id, session_request()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn exchange_stores_both_messages_with_feedback() {
        let pool = test_pool().await;
        let svc = service(pool.clone());
        let user_id = insert_user(&pool, "premium").await;
        let session = svc.create_session(&user_id, session_request()).await.unwrap();

        let exchange = svc
            .send_message(
                &user_id,
                session.id,
                SendTutorMessageRequest {
                    content: "Καλημέρα!".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(exchange.user_message.role, TutorMessageRole::User);
        assert_eq!(exchange.tutor_message.role, TutorMessageRole::Assistant);
        assert!(INFORMAL_REPLIES.contains(&exchange.tutor_message.content.as_str()));
        assert!(exchange.tutor_message.feedback.is_some());

        let detail = svc.get_active_session(&user_id).await.unwrap().unwrap();
        assert_eq!(detail.messages.len(), 2);
    }

    #[tokio::test]
    async fn foreign_session_is_not_found() {
        let pool = test_pool().await;
        let svc = service(pool.clone());
        let alice = insert_user(&pool, "premium").await;
        let bob = insert_user(&pool, "premium").await;
        let session = svc.create_session(&alice, session_request()).await.unwrap();

        let err = svc
            .send_message(
                &bob,
                session.id,
                SendTutorMessageRequest {
                    content: "hi".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn ended_session_refuses_new_messages() {
        let pool = test_pool().await;
        let svc = service(pool.clone());
        let user_id = insert_user(&pool, "premium").await;
        let session = svc.create_session(&user_id, session_request()).await.unwrap();

        let ended = svc.end_session(&user_id, session.id).await.unwrap();
        assert_eq!(ended.status, TutorSessionStatus::Completed);
        assert!(ended.ended_at.is_some());

        let err = svc
            .send_message(
                &user_id,
                session.id,
                SendTutorMessageRequest {
                    content: "hello again".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
