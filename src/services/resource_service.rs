use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::entitlement;

#[derive(Clone)]
pub struct ResourceService {
    pool: DbPool,
}

impl ResourceService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Public resource listing with optional name search and type filter.
    pub async fn list_resources(&self, query: ResourceQuery) -> AppResult<Vec<Resource>> {
        let limit = query.limit.unwrap_or(20).clamp(1, 100) as i64;

        let mut sql = String::from("SELECT * FROM melimou_resources WHERE is_public = 1");
        if query.search.is_some() {
            sql.push_str(" AND name LIKE ?");
        }
        if query.resource_type.is_some() {
            sql.push_str(" AND type = ?");
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");

        let mut q = sqlx::query_as::<_, Resource>(&sql);
        if let Some(search) = &query.search {
            q = q.bind(format!("%{search}%"));
        }
        if let Some(resource_type) = query.resource_type {
            q = q.bind(resource_type);
        }
        let resources = q.bind(limit).fetch_all(&self.pool).await?;
        Ok(resources)
    }

    /// Fetches a resource, gated on the viewer's tier. Anonymous viewers
    /// count as free tier.
    pub async fn get_resource(
        &self,
        viewer_tier: Option<SubscriptionTier>,
        resource_id: i64,
    ) -> AppResult<Resource> {
        let resource = self.get_resource_row(resource_id).await?;

        let tier = viewer_tier.unwrap_or_default();
        if !entitlement::meets_tier_requirement(tier, resource.required_subscription_tier) {
            return Err(AppError::Forbidden(
                "This resource requires a higher subscription tier".to_string(),
            ));
        }
        Ok(resource)
    }

    pub async fn create_resource(
        &self,
        uploader_id: &str,
        request: CreateResourceRequest,
    ) -> AppResult<Resource> {
        if request.name.trim().is_empty() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }
        if request.url.trim().is_empty() {
            return Err(AppError::ValidationError("URL is required".to_string()));
        }

        let resource_id = sqlx::query(
            r#"
            INSERT INTO melimou_resources
                (name, description, type, url, is_public, required_subscription_tier, uploaded_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(request.resource_type)
        .bind(request.url.trim())
        .bind(request.is_public.unwrap_or(true))
        .bind(request.required_subscription_tier.unwrap_or_default())
        .bind(uploader_id)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_resource_row(resource_id).await
    }

    /// Uploaders can edit their own resources; admins can edit any.
    pub async fn update_resource(
        &self,
        requester_id: &str,
        requester_role: UserRole,
        resource_id: i64,
        request: UpdateResourceRequest,
    ) -> AppResult<Resource> {
        let existing = self.get_resource_row(resource_id).await?;
        require_owner_or_admin(&existing, requester_id, requester_role)?;

        sqlx::query(
            r#"
            UPDATE melimou_resources SET
                name = ?,
                description = ?,
                url = ?,
                is_public = ?,
                required_subscription_tier = ?
            WHERE id = ?
            "#,
        )
        .bind(request.name.unwrap_or(existing.name))
        .bind(request.description.or(existing.description))
        .bind(request.url.unwrap_or(existing.url))
        .bind(request.is_public.unwrap_or(existing.is_public))
        .bind(
            request
                .required_subscription_tier
                .unwrap_or(existing.required_subscription_tier),
        )
        .bind(resource_id)
        .execute(&self.pool)
        .await?;

        self.get_resource_row(resource_id).await
    }

    pub async fn delete_resource(
        &self,
        requester_id: &str,
        requester_role: UserRole,
        resource_id: i64,
    ) -> AppResult<()> {
        let existing = self.get_resource_row(resource_id).await?;
        require_owner_or_admin(&existing, requester_id, requester_role)?;

        sqlx::query("DELETE FROM melimou_resources WHERE id = ?")
            .bind(resource_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_resource_row(&self, resource_id: i64) -> AppResult<Resource> {
        sqlx::query_as::<_, Resource>("SELECT * FROM melimou_resources WHERE id = ?")
            .bind(resource_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))
    }
}

fn require_owner_or_admin(
    resource: &Resource,
    requester_id: &str,
    requester_role: UserRole,
) -> AppResult<()> {
    if resource.uploaded_by != requester_id && requester_role != UserRole::Admin {
        return Err(AppError::Forbidden(
            "Not allowed to modify this resource".to_string(),
        ));
    }
    Ok(())
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

    fn pdf(name: &str) -> CreateResourceRequest {
        CreateResourceRequest {
            name: name.to_string(),
            description: None,
            resource_type: ResourceType::Pdf,
            url: "https://example.com/grammar.pdf".to_string(),
            is_public: None,
            required_subscription_tier: None,
        }
    }

    #[tokio::test]
    async fn search_matches_on_name() {
        let pool = test_pool().await;
        let svc = ResourceService::new(pool.clone());
        let user_id = insert_user(&pool).await;

        svc.create_resource(&user_id, pdf("Grammar Basics")).await.unwrap();
        svc.create_resource(&user_id, pdf("Verb Tables")).await.unwrap();

        let found = svc
            .list_resources(ResourceQuery {
                search: Some("grammar".to_string()),
                resource_type: None,
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Grammar Basics");
    }

    #[tokio::test]
    async fn type_filter_narrows_results() {
        let pool = test_pool().await;
        let svc = ResourceService::new(pool.clone());
        let user_id = insert_user(&pool).await;

        svc.create_resource(&user_id, pdf("Grammar Basics")).await.unwrap();
        let mut video = pdf("Pronunciation Video");
        video.resource_type = ResourceType::Video;
        svc.create_resource(&user_id, video).await.unwrap();

        let videos = svc
            .list_resources(ResourceQuery {
                search: None,
                resource_type: Some(ResourceType::Video),
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].resource_type, ResourceType::Video);
    }

    #[tokio::test]
    async fn premium_resource_is_gated_by_tier() {
        let pool = test_pool().await;
        let svc = ResourceService::new(pool.clone());
        let user_id = insert_user(&pool).await;

        let mut premium = pdf("Advanced Idioms");
        premium.required_subscription_tier = Some(SubscriptionTier::Premium);
        let resource = svc.create_resource(&user_id, premium).await.unwrap();

        let err = svc
            .get_resource(Some(SubscriptionTier::Free), resource.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(
            svc.get_resource(Some(SubscriptionTier::Premium), resource.id)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn only_uploader_or_admin_can_modify() {
        let pool = test_pool().await;
        let svc = ResourceService::new(pool.clone());
        let alice = insert_user(&pool).await;
        let bob = insert_user(&pool).await;

        let resource = svc.create_resource(&alice, pdf("Mine")).await.unwrap();

        let err = svc
            .delete_resource(&bob, UserRole::Student, resource.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        svc.delete_resource(&bob, UserRole::Admin, resource.id)
            .await
            .unwrap();
    }
}
