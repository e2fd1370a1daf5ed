use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::entitlement;

#[derive(Clone)]
pub struct CohortService {
    pool: DbPool,
}

impl CohortService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_cohorts(&self) -> AppResult<Vec<Cohort>> {
        let cohorts = sqlx::query_as::<_, Cohort>(
            "SELECT * FROM melimou_cohorts WHERE is_active = 1 ORDER BY start_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(cohorts)
    }

    pub async fn get_cohort(&self, cohort_id: i64) -> AppResult<CohortDetail> {
        let cohort = self.get_cohort_row(cohort_id).await?;
        let members = sqlx::query_as::<_, CohortMember>(
            "SELECT * FROM melimou_cohort_members WHERE cohort_id = ? AND is_active = 1 ORDER BY joined_at, id",
        )
        .bind(cohort_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(CohortDetail { cohort, members })
    }

    /// Joins a cohort. Requires the cohorts entitlement, a free seat and no
    /// existing membership.
    pub async fn join_cohort(&self, user_id: &str, cohort_id: i64) -> AppResult<CohortMember> {
        let tier: Option<SubscriptionTier> =
            sqlx::query_scalar("SELECT subscription_tier FROM melimou_users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        let tier = tier.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let limits = entitlement::resolve(Some(tier), None);
        if !limits.can_access_cohorts {
            return Err(AppError::Forbidden(
                "Cohorts require a pro or premium subscription".to_string(),
            ));
        }

        let cohort = self.get_cohort_row(cohort_id).await?;
        if !cohort.is_active {
            return Err(AppError::ValidationError(
                "Cohort is not accepting members".to_string(),
            ));
        }

        // A left member keeps their row (UNIQUE cohort_id + user_id), so a
        // rejoin reactivates it instead of inserting.
        let existing = sqlx::query_as::<_, CohortMember>(
            "SELECT * FROM melimou_cohort_members WHERE cohort_id = ? AND user_id = ?",
        )
        .bind(cohort_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(member) = &existing
            && member.is_active
        {
            return Err(AppError::Conflict(
                "Already a member of this cohort".to_string(),
            ));
        }

        let member_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM melimou_cohort_members WHERE cohort_id = ? AND is_active = 1",
        )
        .bind(cohort_id)
        .fetch_one(&self.pool)
        .await?;
        if member_count >= cohort.max_members {
            return Err(AppError::ValidationError("Cohort is full".to_string()));
        }

        let member_id = match existing {
            Some(member) => {
                sqlx::query("UPDATE melimou_cohort_members SET is_active = 1 WHERE id = ?")
                    .bind(member.id)
                    .execute(&self.pool)
                    .await?;
                member.id
            }
            None => {
                let result = sqlx::query(
                    "INSERT INTO melimou_cohort_members (cohort_id, user_id, role) VALUES (?, ?, 'member')",
                )
                .bind(cohort_id)
                .bind(user_id)
                .execute(&self.pool)
                .await;

                match result {
                    Ok(done) => done.last_insert_rowid(),
                    // Concurrent join hit the unique constraint first.
                    Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                        return Err(AppError::Conflict(
                            "Already a member of this cohort".to_string(),
                        ));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        sqlx::query_as::<_, CohortMember>("SELECT * FROM melimou_cohort_members WHERE id = ?")
            .bind(member_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Membership not found".to_string()))
    }

    pub async fn leave_cohort(&self, user_id: &str, cohort_id: i64) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE melimou_cohort_members SET is_active = 0 WHERE cohort_id = ? AND user_id = ? AND is_active = 1",
        )
        .bind(cohort_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Membership not found".to_string()));
        }
        Ok(())
    }

    async fn get_cohort_row(&self, cohort_id: i64) -> AppResult<Cohort> {
        sqlx::query_as::<_, Cohort>("SELECT * FROM melimou_cohorts WHERE id = ?")
            .bind(cohort_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Cohort not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
    use chrono::Utc;
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

    async fn insert_cohort(pool: &DbPool, max_members: i64) -> i64 {
        sqlx::query(
            "INSERT INTO melimou_cohorts (name, start_date, max_members) VALUES ('Spring', ?, ?)",
        )
        .bind(Utc::now())
        .bind(max_members)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn free_tier_cannot_join() {
        let pool = test_pool().await;
        let svc = CohortService::new(pool.clone());
        let user_id = insert_user(&pool, "free").await;
        let cohort_id = insert_cohort(&pool, 10).await;

        let err = svc.join_cohort(&user_id, cohort_id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn joining_twice_is_a_conflict() {
        let pool = test_pool().await;
        let svc = CohortService::new(pool.clone());
        let user_id = insert_user(&pool, "pro").await;
        let cohort_id = insert_cohort(&pool, 10).await;

        svc.join_cohort(&user_id, cohort_id).await.unwrap();
        let err = svc.join_cohort(&user_id, cohort_id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn full_cohort_rejects_new_members() {
        let pool = test_pool().await;
        let svc = CohortService::new(pool.clone());
        let cohort_id = insert_cohort(&pool, 1).await;

        let first = insert_user(&pool, "pro").await;
        let second = insert_user(&pool, "pro").await;

        svc.join_cohort(&first, cohort_id).await.unwrap();
        let err = svc.join_cohort(&second, cohort_id).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn rejoining_after_leaving_reactivates_membership() {
        let pool = test_pool().await;
        let svc = CohortService::new(pool.clone());
        let user_id = insert_user(&pool, "pro").await;
        let cohort_id = insert_cohort(&pool, 10).await;

        svc.join_cohort(&user_id, cohort_id).await.unwrap();
        svc.leave_cohort(&user_id, cohort_id).await.unwrap();
        let member = svc.join_cohort(&user_id, cohort_id).await.unwrap();
        assert!(member.is_active);
    }

    #[tokio::test]
    async fn leaving_frees_a_seat() {
        let pool = test_pool().await;
        let svc = CohortService::new(pool.clone());
        let cohort_id = insert_cohort(&pool, 1).await;

        let first = insert_user(&pool, "pro").await;
        let second = insert_user(&pool, "premium").await;

        svc.join_cohort(&first, cohort_id).await.unwrap();
        svc.leave_cohort(&first, cohort_id).await.unwrap();
        svc.join_cohort(&second, cohort_id).await.unwrap();

        let detail = svc.get_cohort(cohort_id).await.unwrap();
        assert_eq!(detail.members.len(), 1);
        assert_eq!(detail.members[0].user_id, second);
    }
}
