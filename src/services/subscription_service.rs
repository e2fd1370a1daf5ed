use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::entitlement;
use chrono::{DateTime, Months, Utc};

/// Maps a catalog plan name to the denormalized tier stored on the user row.
/// Unrecognized names fall back to free.
fn plan_tier(plan_name: &str) -> SubscriptionTier {
    match plan_name {
        "Pro" | "Pro Annual" => SubscriptionTier::Pro,
        "Premium" | "Premium Annual" => SubscriptionTier::Premium,
        _ => SubscriptionTier::Free,
    }
}

fn period_end(start: DateTime<Utc>, plan: &SubscriptionPlan) -> AppResult<DateTime<Utc>> {
    let months = match plan.interval_type {
        IntervalType::Month => plan.interval_count,
        IntervalType::Year => plan.interval_count * 12,
    };
    start
        .checked_add_months(Months::new(months as u32))
        .ok_or_else(|| AppError::InternalError("Billing period overflow".to_string()))
}

#[derive(Clone)]
pub struct SubscriptionService {
    pool: DbPool,
}

impl SubscriptionService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_plans(&self) -> AppResult<Vec<SubscriptionPlan>> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM melimou_subscription_plans WHERE is_active = 1 ORDER BY price",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    pub async fn current_subscription(
        &self,
        user_id: &str,
    ) -> AppResult<Option<SubscriptionWithPlan>> {
        let subscription = sqlx::query_as::<_, UserSubscription>(
            r#"
            SELECT * FROM melimou_user_subscriptions
            WHERE user_id = ? AND status = 'active'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match subscription {
            Some(subscription) => {
                let plan = self.get_plan(subscription.plan_id).await?;
                Ok(Some(SubscriptionWithPlan { subscription, plan }))
            }
            None => Ok(None),
        }
    }

    pub async fn subscription_history(&self, user_id: &str) -> AppResult<Vec<SubscriptionWithPlan>> {
        let subscriptions = sqlx::query_as::<_, UserSubscription>(
            "SELECT * FROM melimou_user_subscriptions WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut history = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let plan = self.get_plan(subscription.plan_id).await?;
            history.push(SubscriptionWithPlan { subscription, plan });
        }
        Ok(history)
    }

    /// Billing integration is stubbed: returns a mock checkout URL so the
    /// client flow can be exercised end to end without a payment provider.
    pub async fn create_checkout_session(
        &self,
        user_id: &str,
        request: CreateCheckoutRequest,
    ) -> AppResult<CheckoutSessionResponse> {
        let plan = self.get_plan(request.plan_id).await?;

        Ok(CheckoutSessionResponse {
            checkout_url: format!("/checkout/mock?planId={}&userId={}", plan.id, user_id),
            session_id: format!("mock_session_{}", Utc::now().timestamp_millis()),
        })
    }

    /// Activates a plan for a user. The deactivate-then-insert sequence and
    /// the denormalized user update run in one transaction; together with the
    /// partial unique index this keeps at most one active row per user.
    pub async fn activate(&self, user_id: &str, plan_id: i64) -> AppResult<UserSubscription> {
        let plan = self.get_plan(plan_id).await?;

        let now = Utc::now();
        let end = period_end(now, &plan)?;
        let tier = plan_tier(&plan.name);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE melimou_user_subscriptions
            SET status = 'inactive', updated_at = CURRENT_TIMESTAMP
            WHERE user_id = ? AND status = 'active'
            "#,
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let subscription_id = sqlx::query(
            r#"
            INSERT INTO melimou_user_subscriptions
                (user_id, plan_id, status, current_period_start, current_period_end)
            VALUES (?, ?, 'active', ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(plan.id)
        .bind(now)
        .bind(end)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            r#"
            UPDATE melimou_users SET
                subscription_tier = ?,
                subscription_status = 'active',
                subscription_start_date = ?,
                subscription_end_date = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(tier)
        .bind(now)
        .bind(end)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_subscription(subscription_id).await
    }

    /// Cancels a subscription owned by the requesting user. With
    /// `cancel_at_period_end` the row is only flagged and the tier is kept
    /// until the period lapses; an immediate cancel downgrades synchronously.
    pub async fn cancel(
        &self,
        user_id: &str,
        request: CancelSubscriptionRequest,
    ) -> AppResult<UserSubscription> {
        // Ownership is part of the lookup: a foreign id looks identical to a
        // missing one.
        let subscription = sqlx::query_as::<_, UserSubscription>(
            "SELECT * FROM melimou_user_subscriptions WHERE id = ? AND user_id = ?",
        )
        .bind(request.subscription_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Subscription not found or not owned by user".to_string())
        })?;

        if request.cancel_at_period_end {
            sqlx::query(
                r#"
                UPDATE melimou_user_subscriptions
                SET cancel_at_period_end = 1, updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
            )
            .bind(subscription.id)
            .execute(&self.pool)
            .await?;
        } else {
            let mut tx = self.pool.begin().await?;

            sqlx::query(
                r#"
                UPDATE melimou_user_subscriptions
                SET status = 'cancelled', cancel_at_period_end = 0, updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
            )
            .bind(subscription.id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                UPDATE melimou_users SET
                    subscription_tier = 'free',
                    subscription_status = 'cancelled',
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = ?
                "#,
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
        }

        self.get_subscription(subscription.id).await
    }

    pub async fn subscription_limits(&self, user_id: &str) -> AppResult<SubscriptionLimitsResponse> {
        let tier: Option<SubscriptionTier> =
            sqlx::query_scalar("SELECT subscription_tier FROM melimou_users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        let tier = tier.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let subscription = self.current_subscription(user_id).await?;
        let limits = entitlement::resolve(Some(tier), subscription.as_ref().map(|s| &s.plan));

        Ok(SubscriptionLimitsResponse {
            current_tier: tier,
            limits,
            subscription,
        })
    }

    async fn get_plan(&self, plan_id: i64) -> AppResult<SubscriptionPlan> {
        sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM melimou_subscription_plans WHERE id = ?",
        )
        .bind(plan_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Plan not found".to_string()))
    }

    async fn get_subscription(&self, subscription_id: i64) -> AppResult<UserSubscription> {
        sqlx::query_as::<_, UserSubscription>(
            "SELECT * FROM melimou_user_subscriptions WHERE id = ?",
        )
        .bind(subscription_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Subscription not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_pool;
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

    async fn plan_id_by_name(pool: &DbPool, name: &str) -> i64 {
        sqlx::query_scalar("SELECT id FROM melimou_subscription_plans WHERE name = ?")
            .bind(name)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn user_tier(pool: &DbPool, user_id: &str) -> SubscriptionTier {
        sqlx::query_scalar("SELECT subscription_tier FROM melimou_users WHERE id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn active_row_count(pool: &DbPool, user_id: &str) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM melimou_user_subscriptions WHERE user_id = ? AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
    }

    #[test]
    fn plan_name_tier_map() {
        assert_eq!(plan_tier("Free"), SubscriptionTier::Free);
        assert_eq!(plan_tier("Pro"), SubscriptionTier::Pro);
        assert_eq!(plan_tier("Pro Annual"), SubscriptionTier::Pro);
        assert_eq!(plan_tier("Premium"), SubscriptionTier::Premium);
        assert_eq!(plan_tier("Premium Annual"), SubscriptionTier::Premium);
        assert_eq!(plan_tier("Enterprise"), SubscriptionTier::Free);
    }

    #[tokio::test]
    async fn plans_are_seeded_and_price_ordered() {
        let svc = SubscriptionService::new(test_pool().await);
        let plans = svc.list_plans().await.unwrap();

        assert_eq!(plans.len(), 5);
        assert!(plans.windows(2).all(|w| w[0].price <= w[1].price));
        let pro = plans.iter().find(|p| p.name == "Pro").unwrap();
        assert_eq!(pro.price, 1900);
        assert_eq!(pro.max_sessions, 50);
    }

    #[tokio::test]
    async fn activate_unknown_plan_is_not_found() {
        let pool = test_pool().await;
        let svc = SubscriptionService::new(pool.clone());
        let user_id = insert_user(&pool).await;

        let err = svc.activate(&user_id, 9999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn activate_sets_tier_and_monthly_period() {
        let pool = test_pool().await;
        let svc = SubscriptionService::new(pool.clone());
        let user_id = insert_user(&pool).await;
        let pro = plan_id_by_name(&pool, "Pro").await;

        let subscription = svc.activate(&user_id, pro).await.unwrap();

        assert_eq!(subscription.status, UserSubscriptionStatus::Active);
        assert_eq!(user_tier(&pool, &user_id).await, SubscriptionTier::Pro);
        let days = (subscription.current_period_end - subscription.current_period_start).num_days();
        assert!((28..=31).contains(&days));
    }

    #[tokio::test]
    async fn annual_plan_period_spans_a_year() {
        let pool = test_pool().await;
        let svc = SubscriptionService::new(pool.clone());
        let user_id = insert_user(&pool).await;
        let pro_annual = plan_id_by_name(&pool, "Pro Annual").await;

        let subscription = svc.activate(&user_id, pro_annual).await.unwrap();
        let days = (subscription.current_period_end - subscription.current_period_start).num_days();
        assert!((365..=366).contains(&days));
        assert_eq!(user_tier(&pool, &user_id).await, SubscriptionTier::Pro);
    }

    #[tokio::test]
    async fn activating_second_plan_leaves_one_active_row() {
        let pool = test_pool().await;
        let svc = SubscriptionService::new(pool.clone());
        let user_id = insert_user(&pool).await;
        let pro = plan_id_by_name(&pool, "Pro").await;
        let premium = plan_id_by_name(&pool, "Premium").await;

        svc.activate(&user_id, pro).await.unwrap();
        svc.activate(&user_id, premium).await.unwrap();

        assert_eq!(active_row_count(&pool, &user_id).await, 1);
        assert_eq!(user_tier(&pool, &user_id).await, SubscriptionTier::Premium);

        let history = svc.subscription_history(&user_id).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn storage_rejects_second_active_row_outright() {
        let pool = test_pool().await;
        let user_id = insert_user(&pool).await;

        let insert = |plan: i64| {
            let pool = pool.clone();
            let user_id = user_id.clone();
            async move {
                sqlx::query(
                    r#"
                    INSERT INTO melimou_user_subscriptions
                        (user_id, plan_id, status, current_period_start, current_period_end)
                    VALUES (?, ?, 'active', ?, ?)
                    "#,
                )
                .bind(&user_id)
                .bind(plan)
                .bind(Utc::now())
                .bind(Utc::now())
                .execute(&pool)
                .await
            }
        };

        insert(2).await.unwrap();
        // The partial unique index closes the concurrent-activation race.
        assert!(insert(3).await.is_err());
    }

    #[tokio::test]
    async fn cancel_at_period_end_keeps_tier() {
        let pool = test_pool().await;
        let svc = SubscriptionService::new(pool.clone());
        let user_id = insert_user(&pool).await;
        let pro = plan_id_by_name(&pool, "Pro").await;

        let subscription = svc.activate(&user_id, pro).await.unwrap();
        let updated = svc
            .cancel(
                &user_id,
                CancelSubscriptionRequest {
                    subscription_id: subscription.id,
                    cancel_at_period_end: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, UserSubscriptionStatus::Active);
        assert!(updated.cancel_at_period_end);
        assert_eq!(user_tier(&pool, &user_id).await, SubscriptionTier::Pro);
    }

    #[tokio::test]
    async fn immediate_cancel_downgrades_synchronously() {
        let pool = test_pool().await;
        let svc = SubscriptionService::new(pool.clone());
        let user_id = insert_user(&pool).await;
        let premium = plan_id_by_name(&pool, "Premium").await;

        let subscription = svc.activate(&user_id, premium).await.unwrap();
        let updated = svc
            .cancel(
                &user_id,
                CancelSubscriptionRequest {
                    subscription_id: subscription.id,
                    cancel_at_period_end: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.status, UserSubscriptionStatus::Cancelled);
        assert_eq!(user_tier(&pool, &user_id).await, SubscriptionTier::Free);
    }

    #[tokio::test]
    async fn cancel_of_foreign_subscription_is_not_found() {
        let pool = test_pool().await;
        let svc = SubscriptionService::new(pool.clone());
        let alice = insert_user(&pool).await;
        let bob = insert_user(&pool).await;
        let pro = plan_id_by_name(&pool, "Pro").await;

        let subscription = svc.activate(&alice, pro).await.unwrap();
        let err = svc
            .cancel(
                &bob,
                CancelSubscriptionRequest {
                    subscription_id: subscription.id,
                    cancel_at_period_end: false,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn signup_onboarding_and_upgrade_flow() {
        use crate::services::{AuthService, UserService};
        use crate::utils::JwtService;

        let pool = test_pool().await;
        let auth = AuthService::new(pool.clone(), JwtService::new("test-secret", 3600, 86400));
        let users = UserService::new(pool.clone());
        let subscriptions = SubscriptionService::new(pool.clone());

        let signup = auth
            .register(RegisterRequest {
                email: "nikos@example.com".to_string(),
                name: Some("Nikos".to_string()),
                password: "Password123".to_string(),
            })
            .await
            .unwrap();
        assert!(!signup.user.has_completed_onboarding);
        assert_eq!(signup.user.subscription_tier, SubscriptionTier::Free);

        let limits = subscriptions
            .subscription_limits(&signup.user.id)
            .await
            .unwrap();
        assert_eq!(limits.limits.max_sessions, 3);
        assert_eq!(limits.limits.max_resources, 10);
        assert!(!limits.limits.has_ai_tutor);

        let profile = users
            .complete_onboarding(
                &signup.user.id,
                CompleteOnboardingRequest {
                    role: UserRole::Student,
                    greek_level: GreekLevel::Beginner,
                    learning_goals: vec!["travel".to_string()],
                    study_time_per_week: 4,
                    previous_experience: None,
                    interests: None,
                    how_heard_about_us: None,
                    wants_practice_test: false,
                    formality_preference: None,
                },
            )
            .await
            .unwrap();
        assert!(profile.has_completed_onboarding);

        let audit_rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM melimou_onboarding_responses WHERE user_id = ?",
        )
        .bind(&signup.user.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(audit_rows, 9);

        let pro = plan_id_by_name(&pool, "Pro").await;
        let subscription = subscriptions.activate(&signup.user.id, pro).await.unwrap();
        assert_eq!(subscription.status, UserSubscriptionStatus::Active);

        let limits = subscriptions
            .subscription_limits(&signup.user.id)
            .await
            .unwrap();
        assert_eq!(limits.current_tier, SubscriptionTier::Pro);
        assert_eq!(limits.limits.max_sessions, 50);
        assert!(limits.limits.has_ai_tutor);
    }

    #[tokio::test]
    async fn limits_follow_activation() {
        let pool = test_pool().await;
        let svc = SubscriptionService::new(pool.clone());
        let user_id = insert_user(&pool).await;

        let before = svc.subscription_limits(&user_id).await.unwrap();
        assert_eq!(before.current_tier, SubscriptionTier::Free);
        assert_eq!(before.limits.max_sessions, 3);
        assert!(!before.limits.has_ai_tutor);

        let pro = plan_id_by_name(&pool, "Pro").await;
        svc.activate(&user_id, pro).await.unwrap();

        let after = svc.subscription_limits(&user_id).await.unwrap();
        assert_eq!(after.current_tier, SubscriptionTier::Pro);
        assert_eq!(after.limits.max_sessions, 50);
        assert!(after.limits.has_ai_tutor);
        assert!(after.subscription.is_some());
    }
}
