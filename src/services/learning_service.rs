use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::entitlement;
use sqlx::types::Json;

#[derive(Clone)]
pub struct LearningService {
    pool: DbPool,
}

impl LearningService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Public catalog view: every public path with its modules and lessons.
    pub async fn list_paths(&self) -> AppResult<Vec<LearningPathDetail>> {
        let paths = sqlx::query_as::<_, LearningPath>(
            "SELECT * FROM melimou_learning_paths WHERE is_public = 1 ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut details = Vec::with_capacity(paths.len());
        for path in paths {
            let modules = self.path_modules(path.id).await?;
            details.push(LearningPathDetail { path, modules });
        }
        Ok(details)
    }

    pub async fn get_path(&self, path_id: i64) -> AppResult<LearningPathDetail> {
        let path = sqlx::query_as::<_, LearningPath>(
            "SELECT * FROM melimou_learning_paths WHERE id = ?",
        )
        .bind(path_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Learning path not found".to_string()))?;

        let modules = self.path_modules(path.id).await?;
        Ok(LearningPathDetail { path, modules })
    }

    pub async fn create_path(
        &self,
        author_role: UserRole,
        request: CreateLearningPathRequest,
    ) -> AppResult<LearningPath> {
        require_curator(author_role)?;
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }

        let path_id = sqlx::query(
            r#"
            INSERT INTO melimou_learning_paths
                (name, description, difficulty, is_public, required_subscription_tier)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(request.difficulty)
        .bind(request.is_public)
        .bind(request.required_subscription_tier.unwrap_or_default())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_path_row(path_id).await
    }

    pub async fn update_path(
        &self,
        author_role: UserRole,
        path_id: i64,
        request: UpdateLearningPathRequest,
    ) -> AppResult<LearningPath> {
        require_curator(author_role)?;
        let existing = self.get_path_row(path_id).await?;

        sqlx::query(
            r#"
            UPDATE melimou_learning_paths SET
                name = ?,
                description = ?,
                difficulty = ?,
                is_public = ?,
                required_subscription_tier = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(request.name.unwrap_or(existing.name))
        .bind(request.description.or(existing.description))
        .bind(request.difficulty.unwrap_or(existing.difficulty))
        .bind(request.is_public.unwrap_or(existing.is_public))
        .bind(
            request
                .required_subscription_tier
                .unwrap_or(existing.required_subscription_tier),
        )
        .bind(path_id)
        .execute(&self.pool)
        .await?;

        self.get_path_row(path_id).await
    }

    pub async fn delete_path(&self, author_role: UserRole, path_id: i64) -> AppResult<()> {
        require_curator(author_role)?;
        let result = sqlx::query("DELETE FROM melimou_learning_paths WHERE id = ?")
            .bind(path_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Learning path not found".to_string()));
        }
        Ok(())
    }

    pub async fn lessons_by_module(&self, module_id: i64) -> AppResult<Vec<Lesson>> {
        let lessons = sqlx::query_as::<_, Lesson>(
            "SELECT * FROM melimou_lessons WHERE module_id = ? ORDER BY order_index, id",
        )
        .bind(module_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lessons)
    }

    /// Fetches a lesson, gated on the caller's tier. Anonymous callers count
    /// as free tier.
    pub async fn get_lesson(
        &self,
        viewer_tier: Option<SubscriptionTier>,
        lesson_id: i64,
    ) -> AppResult<Lesson> {
        let lesson = self.get_lesson_row(lesson_id).await?;

        let tier = viewer_tier.unwrap_or_default();
        if !entitlement::meets_tier_requirement(tier, lesson.required_subscription_tier) {
            return Err(AppError::Forbidden(
                "This lesson requires a higher subscription tier".to_string(),
            ));
        }
        Ok(lesson)
    }

    pub async fn create_lesson(
        &self,
        author_role: UserRole,
        request: CreateLessonRequest,
    ) -> AppResult<Lesson> {
        require_curator(author_role)?;
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }

        // Referenced module must exist; SQLite reports the violation late.
        let module_exists: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM melimou_modules WHERE id = ?")
                .bind(request.module_id)
                .fetch_one(&self.pool)
                .await?;
        if module_exists == 0 {
            return Err(AppError::NotFound("Module not found".to_string()));
        }

        let lesson_id = sqlx::query(
            r#"
            INSERT INTO melimou_lessons
                (module_id, name, description, content, order_index, estimated_duration, required_subscription_tier)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.module_id)
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(request.content.map(Json))
        .bind(request.order_index)
        .bind(request.estimated_duration)
        .bind(request.required_subscription_tier.unwrap_or_default())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_lesson_row(lesson_id).await
    }

    pub async fn update_lesson(
        &self,
        author_role: UserRole,
        lesson_id: i64,
        request: UpdateLessonRequest,
    ) -> AppResult<Lesson> {
        require_curator(author_role)?;
        let existing = self.get_lesson_row(lesson_id).await?;

        sqlx::query(
            r#"
            UPDATE melimou_lessons SET
                name = ?,
                description = ?,
                content = ?,
                order_index = ?,
                estimated_duration = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(request.name.unwrap_or(existing.name))
        .bind(request.description.or(existing.description))
        .bind(request.content.map(Json).or(existing.content))
        .bind(request.order_index.unwrap_or(existing.order_index))
        .bind(request.estimated_duration.or(existing.estimated_duration))
        .bind(lesson_id)
        .execute(&self.pool)
        .await?;

        self.get_lesson_row(lesson_id).await
    }

    pub async fn delete_lesson(&self, author_role: UserRole, lesson_id: i64) -> AppResult<()> {
        require_curator(author_role)?;
        let result = sqlx::query("DELETE FROM melimou_lessons WHERE id = ?")
            .bind(lesson_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Lesson not found".to_string()));
        }
        Ok(())
    }

    /// Records completion of a lesson. One progress row per (user, lesson);
    /// repeated completions update the existing row in place.
    pub async fn mark_lesson_complete(
        &self,
        user_id: &str,
        lesson_id: i64,
        request: MarkLessonCompleteRequest,
    ) -> AppResult<UserProgress> {
        if let Some(score) = request.score
            && !(0..=100).contains(&score)
        {
            return Err(AppError::ValidationError(
                "Score must be between 0 and 100".to_string(),
            ));
        }
        self.get_lesson_row(lesson_id).await?;

        sqlx::query(
            r#"
            INSERT INTO melimou_user_progress
                (user_id, lesson_id, status, completed_at, score, time_spent)
            VALUES (?, ?, 'completed', CURRENT_TIMESTAMP, ?, ?)
            ON CONFLICT (user_id, lesson_id) DO UPDATE SET
                status = 'completed',
                completed_at = CURRENT_TIMESTAMP,
                score = excluded.score,
                time_spent = excluded.time_spent,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(user_id)
        .bind(lesson_id)
        .bind(request.score)
        .bind(request.time_spent)
        .execute(&self.pool)
        .await?;

        self.get_lesson_progress(user_id, lesson_id)
            .await?
            .ok_or_else(|| AppError::InternalError("Progress row missing after upsert".to_string()))
    }

    pub async fn get_lesson_progress(
        &self,
        user_id: &str,
        lesson_id: i64,
    ) -> AppResult<Option<UserProgress>> {
        let progress = sqlx::query_as::<_, UserProgress>(
            "SELECT * FROM melimou_user_progress WHERE user_id = ? AND lesson_id = ?",
        )
        .bind(user_id)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(progress)
    }

    async fn path_modules(&self, path_id: i64) -> AppResult<Vec<ModuleWithLessons>> {
        let modules = sqlx::query_as::<_, Module>(
            "SELECT * FROM melimou_modules WHERE learning_path_id = ? ORDER BY order_index, id",
        )
        .bind(path_id)
        .fetch_all(&self.pool)
        .await?;

        let mut result = Vec::with_capacity(modules.len());
        for module in modules {
            let lessons = self.lessons_by_module(module.id).await?;
            result.push(ModuleWithLessons { module, lessons });
        }
        Ok(result)
    }

    async fn get_path_row(&self, path_id: i64) -> AppResult<LearningPath> {
        sqlx::query_as::<_, LearningPath>("SELECT * FROM melimou_learning_paths WHERE id = ?")
            .bind(path_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Learning path not found".to_string()))
    }

    async fn get_lesson_row(&self, lesson_id: i64) -> AppResult<Lesson> {
        sqlx::query_as::<_, Lesson>("SELECT * FROM melimou_lessons WHERE id = ?")
            .bind(lesson_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Lesson not found".to_string()))
    }
}

fn require_curator(role: UserRole) -> AppResult<()> {
    match role {
        UserRole::Instructor | UserRole::Admin => Ok(()),
        UserRole::Student => Err(AppError::Forbidden(
            "Only instructors and admins can manage curriculum".to_string(),
        )),
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

    async fn seed_path_with_lesson(svc: &LearningService) -> (LearningPath, i64) {
        let path = svc
            .create_path(
                UserRole::Instructor,
                CreateLearningPathRequest {
                    name: "Greek for Travelers".to_string(),
                    description: None,
                    difficulty: Difficulty::Beginner,
                    is_public: true,
                    required_subscription_tier: None,
                },
            )
            .await
            .unwrap();

        let module_id = sqlx::query(
            "INSERT INTO melimou_modules (learning_path_id, name, order_index) VALUES (?, 'Basics', 1)",
        )
        .bind(path.id)
        .execute(&svc.pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let lesson = svc
            .create_lesson(
                UserRole::Instructor,
                CreateLessonRequest {
                    module_id,
                    name: "Greetings".to_string(),
                    description: None,
                    content: Some(serde_json::json!({"blocks": []})),
                    order_index: 1,
                    estimated_duration: Some(15),
                    required_subscription_tier: None,
                },
            )
            .await
            .unwrap();
        (path, lesson.id)
    }

    #[tokio::test]
    async fn students_cannot_manage_curriculum() {
        let svc = LearningService::new(test_pool().await);
        let err = svc
            .create_path(
                UserRole::Student,
                CreateLearningPathRequest {
                    name: "Sneaky".to_string(),
                    description: None,
                    difficulty: Difficulty::Beginner,
                    is_public: true,
                    required_subscription_tier: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn catalog_nests_modules_and_lessons() {
        let svc = LearningService::new(test_pool().await);
        let (path, _) = seed_path_with_lesson(&svc).await;

        let catalog = svc.list_paths().await.unwrap();
        let entry = catalog.iter().find(|d| d.path.id == path.id).unwrap();
        assert_eq!(entry.modules.len(), 1);
        assert_eq!(entry.modules[0].lessons.len(), 1);
    }

    #[tokio::test]
    async fn premium_lesson_is_gated_by_tier() {
        let svc = LearningService::new(test_pool().await);
        let (_, lesson_id) = seed_path_with_lesson(&svc).await;

        sqlx::query("UPDATE melimou_lessons SET required_subscription_tier = 'premium' WHERE id = ?")
            .bind(lesson_id)
            .execute(&svc.pool)
            .await
            .unwrap();

        let err = svc
            .get_lesson(Some(SubscriptionTier::Free), lesson_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = svc.get_lesson(None, lesson_id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        assert!(
            svc.get_lesson(Some(SubscriptionTier::Premium), lesson_id)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn repeat_completion_keeps_a_single_progress_row() {
        let pool = test_pool().await;
        let svc = LearningService::new(pool.clone());
        let (_, lesson_id) = seed_path_with_lesson(&svc).await;
        let user_id = insert_user(&pool).await;

        svc.mark_lesson_complete(
            &user_id,
            lesson_id,
            MarkLessonCompleteRequest {
                score: Some(70),
                time_spent: Some(10),
            },
        )
        .await
        .unwrap();
        let second = svc
            .mark_lesson_complete(
                &user_id,
                lesson_id,
                MarkLessonCompleteRequest {
                    score: Some(95),
                    time_spent: Some(12),
                },
            )
            .await
            .unwrap();

        assert_eq!(second.status, ProgressStatus::Completed);
        assert_eq!(second.score, Some(95));

        let rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM melimou_user_progress WHERE user_id = ? AND lesson_id = ?",
        )
        .bind(&user_id)
        .bind(lesson_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn score_outside_range_is_rejected() {
        let svc = LearningService::new(test_pool().await);
        let (_, lesson_id) = seed_path_with_lesson(&svc).await;
        let user_id = insert_user(&svc.pool).await;

        let err = svc
            .mark_lesson_complete(
                &user_id,
                lesson_id,
                MarkLessonCompleteRequest {
                    score: Some(101),
                    time_spent: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
