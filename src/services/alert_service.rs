use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use chrono::Utc;

#[derive(Clone)]
pub struct AlertService {
    pool: DbPool,
}

impl AlertService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Alerts visible to a user: global ones plus those targeted at them,
    /// minus anything past its expiry.
    pub async fn list_alerts(&self, user_id: &str, query: AlertQuery) -> AppResult<Vec<Alert>> {
        let limit = query.limit.unwrap_or(20).clamp(1, 100) as i64;

        // The expiry cutoff is bound rather than compared against
        // CURRENT_TIMESTAMP: bound DateTime<Utc> values are stored as RFC3339
        // text, which does not collate against SQLite's space-separated
        // timestamp format.
        let sql = if query.unread_only {
            r#"
            SELECT * FROM melimou_alerts
            WHERE (is_global = 1 OR target_user_id = ?)
              AND is_read = 0
              AND (expires_at IS NULL OR expires_at > ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#
        } else {
            r#"
            SELECT * FROM melimou_alerts
            WHERE (is_global = 1 OR target_user_id = ?)
              AND (expires_at IS NULL OR expires_at > ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#
        };

        let alerts = sqlx::query_as::<_, Alert>(sql)
            .bind(user_id)
            .bind(Utc::now())
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(alerts)
    }

    /// Only admins and instructors may publish alerts. A missing target makes
    /// the alert global.
    pub async fn create_alert(
        &self,
        author_role: UserRole,
        request: CreateAlertRequest,
    ) -> AppResult<Alert> {
        if !matches!(author_role, UserRole::Admin | UserRole::Instructor) {
            return Err(AppError::Forbidden(
                "Only instructors and admins can create alerts".to_string(),
            ));
        }
        if request.title.trim().is_empty() || request.message.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Title and message are required".to_string(),
            ));
        }

        let is_global = request.target_user_id.is_none();
        let alert_id = sqlx::query(
            r#"
            INSERT INTO melimou_alerts (title, message, type, is_global, target_user_id, expires_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.title.trim())
        .bind(request.message.trim())
        .bind(request.alert_type)
        .bind(is_global)
        .bind(&request.target_user_id)
        .bind(request.expires_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_alert(alert_id).await
    }

    pub async fn mark_as_read(&self, user_id: &str, alert_id: i64) -> AppResult<Alert> {
        let result = sqlx::query(
            r#"
            UPDATE melimou_alerts SET is_read = 1
            WHERE id = ? AND (is_global = 1 OR target_user_id = ?)
            "#,
        )
        .bind(alert_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Alert not found".to_string()));
        }
        self.get_alert(alert_id).await
    }

    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE melimou_alerts SET is_read = 1 WHERE is_global = 1 OR target_user_id = ?",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn get_alert(&self, alert_id: i64) -> AppResult<Alert> {
        sqlx::query_as::<_, Alert>("SELECT * FROM melimou_alerts WHERE id = ?")
            .bind(alert_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Alert not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    async fn insert_user(pool: &DbPool) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO melimou_users (id, email) VALUES (?, ?)")
            .bind(&id)
            .bind(format!("{id}@example.com"))
            .execute(pool)
            .await
            .unwrap();
        id
    }

    fn alert(title: &str, target: Option<String>) -> CreateAlertRequest {
        CreateAlertRequest {
            title: title.to_string(),
            message: "body".to_string(),
            alert_type: AlertType::Info,
            target_user_id: target,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn students_cannot_publish_alerts() {
        let svc = AlertService::new(test_pool().await);
        let err = svc
            .create_alert(UserRole::Student, alert("nope", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn listing_mixes_global_and_targeted_alerts() {
        let pool = test_pool().await;
        let svc = AlertService::new(pool.clone());
        let alice = insert_user(&pool).await;
        let bob = insert_user(&pool).await;

        svc.create_alert(UserRole::Admin, alert("global", None))
            .await
            .unwrap();
        svc.create_alert(UserRole::Admin, alert("for alice", Some(alice.clone())))
            .await
            .unwrap();
        svc.create_alert(UserRole::Admin, alert("for bob", Some(bob.clone())))
            .await
            .unwrap();

        let visible = svc
            .list_alerts(
                &alice,
                AlertQuery {
                    unread_only: false,
                    limit: None,
                },
            )
            .await
            .unwrap();
        let titles: Vec<&str> = visible.iter().map(|a| a.title.as_str()).collect();
        assert!(titles.contains(&"global"));
        assert!(titles.contains(&"for alice"));
        assert!(!titles.contains(&"for bob"));
    }

    #[tokio::test]
    async fn expired_alerts_are_hidden() {
        let pool = test_pool().await;
        let svc = AlertService::new(pool.clone());
        let alice = insert_user(&pool).await;

        let mut expired = alert("old news", None);
        expired.expires_at = Some(Utc::now() - Duration::hours(1));
        svc.create_alert(UserRole::Admin, expired).await.unwrap();

        let mut fresh = alert("still on", None);
        fresh.expires_at = Some(Utc::now() + Duration::hours(1));
        svc.create_alert(UserRole::Admin, fresh).await.unwrap();

        let visible = svc
            .list_alerts(
                &alice,
                AlertQuery {
                    unread_only: false,
                    limit: None,
                },
            )
            .await
            .unwrap();
        let titles: Vec<&str> = visible.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["still on"]);
    }

    #[tokio::test]
    async fn unread_filter_and_mark_all() {
        let pool = test_pool().await;
        let svc = AlertService::new(pool.clone());
        let alice = insert_user(&pool).await;

        svc.create_alert(UserRole::Admin, alert("one", Some(alice.clone())))
            .await
            .unwrap();
        svc.create_alert(UserRole::Admin, alert("two", Some(alice.clone())))
            .await
            .unwrap();

        let marked = svc.mark_all_as_read(&alice).await.unwrap();
        assert_eq!(marked, 2);

        let unread = svc
            .list_alerts(
                &alice,
                AlertQuery {
                    unread_only: true,
                    limit: None,
                },
            )
            .await
            .unwrap();
        assert!(unread.is_empty());
    }

    #[tokio::test]
    async fn cannot_mark_foreign_alert_as_read() {
        let pool = test_pool().await;
        let svc = AlertService::new(pool.clone());
        let alice = insert_user(&pool).await;
        let bob = insert_user(&pool).await;

        let a = svc
            .create_alert(UserRole::Admin, alert("for alice", Some(alice.clone())))
            .await
            .unwrap();

        let err = svc.mark_as_read(&bob, a.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
