use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use sqlx::types::Json;

/// The fixed question set recorded by the onboarding audit trail.
const ONBOARDING_QUESTION_KEYS: [&str; 9] = [
    "role",
    "greek_level",
    "learning_goals",
    "study_time_per_week",
    "previous_experience",
    "interests",
    "how_heard_about_us",
    "wants_practice_test",
    "formality_preference",
];

#[derive(Clone)]
pub struct UserService {
    pool: DbPool,
}

impl UserService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_profile(&self, user_id: &str) -> AppResult<UserResponse> {
        let user = self.get_user(user_id).await?;
        Ok(UserResponse::from(user))
    }

    /// Terminal action of the onboarding workflow: one transaction covering
    /// the profile mutation, the completion flag and the audit rows. A
    /// validation failure leaves no partial writes.
    pub async fn complete_onboarding(
        &self,
        user_id: &str,
        input: CompleteOnboardingRequest,
    ) -> AppResult<UserResponse> {
        if input.role == UserRole::Admin {
            return Err(AppError::ValidationError(
                "Role must be student or instructor".to_string(),
            ));
        }
        if input.learning_goals.is_empty() {
            return Err(AppError::ValidationError(
                "At least one learning goal is required".to_string(),
            ));
        }
        if !(1..=50).contains(&input.study_time_per_week) {
            return Err(AppError::ValidationError(
                "Study time must be between 1 and 50 hours per week".to_string(),
            ));
        }

        // Ensure the user exists before opening the transaction.
        self.get_user(user_id).await?;

        let interests = input.interests.clone().unwrap_or_default();
        let formality = input
            .formality_preference
            .unwrap_or(FormalityPreference::Mixed);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE melimou_users SET
                role = ?,
                greek_level = ?,
                learning_goals = ?,
                study_time_per_week = ?,
                previous_experience = ?,
                interests = ?,
                how_heard_about_us = ?,
                wants_practice_test = ?,
                formality_preference = ?,
                has_completed_onboarding = 1,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(input.role)
        .bind(input.greek_level)
        .bind(Json(&input.learning_goals))
        .bind(input.study_time_per_week)
        .bind(&input.previous_experience)
        .bind(Json(&interests))
        .bind(&input.how_heard_about_us)
        .bind(input.wants_practice_test)
        .bind(formality)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        // Replace-then-insert keeps re-completion idempotent: exactly one
        // audit row per question survives, matching the latest submission.
        sqlx::query("DELETE FROM melimou_onboarding_responses WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let answers: [serde_json::Value; 9] = [
            serde_json::to_value(input.role)?,
            serde_json::to_value(input.greek_level)?,
            serde_json::to_value(&input.learning_goals)?,
            serde_json::to_value(input.study_time_per_week)?,
            serde_json::to_value(input.previous_experience.clone().unwrap_or_default())?,
            serde_json::to_value(&interests)?,
            serde_json::to_value(input.how_heard_about_us.clone().unwrap_or_default())?,
            serde_json::to_value(input.wants_practice_test)?,
            serde_json::to_value(formality)?,
        ];

        for (question_key, answer) in ONBOARDING_QUESTION_KEYS.iter().zip(answers.iter()) {
            sqlx::query(
                "INSERT INTO melimou_onboarding_responses (user_id, question_key, response) VALUES (?, ?, ?)",
            )
            .bind(user_id)
            .bind(question_key)
            .bind(Json(answer))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        self.get_profile(user_id).await
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        request: UpdateProfileRequest,
    ) -> AppResult<UserResponse> {
        if let Some(goals) = &request.learning_goals
            && goals.is_empty()
        {
            return Err(AppError::ValidationError(
                "Learning goals cannot be emptied".to_string(),
            ));
        }
        if let Some(hours) = request.study_time_per_week
            && !(1..=50).contains(&hours)
        {
            return Err(AppError::ValidationError(
                "Study time must be between 1 and 50 hours per week".to_string(),
            ));
        }

        let user = self.get_user(user_id).await?;

        let name = request.name.or(user.name);
        let greek_level = request.greek_level.or(user.greek_level);
        let learning_goals = request
            .learning_goals
            .map(Json)
            .or(user.learning_goals);
        let study_time = request.study_time_per_week.or(user.study_time_per_week);
        let interests = request.interests.map(Json).or(user.interests);
        let formality = request
            .formality_preference
            .unwrap_or(user.formality_preference);

        sqlx::query(
            r#"
            UPDATE melimou_users SET
                name = ?,
                greek_level = ?,
                learning_goals = ?,
                study_time_per_week = ?,
                interests = ?,
                formality_preference = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(&name)
        .bind(greek_level)
        .bind(learning_goals)
        .bind(study_time)
        .bind(interests)
        .bind(formality)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        self.get_profile(user_id).await
    }

    pub async fn get_onboarding_status(&self, user_id: &str) -> AppResult<OnboardingStatusResponse> {
        let user = self.get_user(user_id).await?;
        Ok(OnboardingStatusResponse {
            has_completed_onboarding: user.has_completed_onboarding,
            role: user.role,
            subscription_tier: user.subscription_tier,
        })
    }

    /// Onboarding audit rows for a user. Admins may inspect any user; others
    /// only themselves.
    pub async fn get_user_analytics(
        &self,
        requester_id: &str,
        target_user_id: Option<&str>,
    ) -> AppResult<Vec<OnboardingResponseRow>> {
        let target = target_user_id.unwrap_or(requester_id);

        if target != requester_id {
            let requester = self.get_user(requester_id).await?;
            if requester.role != UserRole::Admin {
                return Err(AppError::Forbidden(
                    "Not allowed to view analytics for another user".to_string(),
                ));
            }
        }

        let rows = sqlx::query_as::<_, OnboardingResponseRow>(
            "SELECT * FROM melimou_onboarding_responses WHERE user_id = ? ORDER BY id",
        )
        .bind(target)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn get_user(&self, user_id: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM melimou_users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
