use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::{JwtService, hash_password, validate_password, verify_password};
use uuid::Uuid;

/// Email + password authentication. OAuth sign-in is handled by an external
/// collaborator; this service only covers the credential provider and token
/// reissue.
#[derive(Clone)]
pub struct AuthService {
    pool: DbPool,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(pool: DbPool, jwt_service: JwtService) -> Self {
        Self { pool, jwt_service }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::ValidationError("Invalid email address".to_string()));
        }
        validate_password(&request.password)?;

        let existing = sqlx::query("SELECT id FROM melimou_users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::ValidationError(
                "Email is already registered".to_string(),
            ));
        }

        let user_id = Uuid::new_v4().to_string();
        let password_hash = hash_password(&request.password)?;

        sqlx::query(
            "INSERT INTO melimou_users (id, email, name, password_hash) VALUES (?, ?, ?, ?)",
        )
        .bind(&user_id)
        .bind(&email)
        .bind(&request.name)
        .bind(&password_hash)
        .execute(&self.pool)
        .await?;

        let user = self.get_user_by_id(&user_id).await?;
        self.issue_tokens(user)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();

        let user = sqlx::query_as::<_, User>("SELECT * FROM melimou_users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;

        // Single generic message for both unknown email and bad password.
        let user =
            user.ok_or_else(|| AppError::AuthError("Invalid email or password".to_string()))?;

        let password_hash = user
            .password_hash
            .as_deref()
            .ok_or_else(|| AppError::AuthError("Invalid email or password".to_string()))?;

        if !verify_password(&request.password, password_hash)? {
            return Err(AppError::AuthError("Invalid email or password".to_string()));
        }

        self.issue_tokens(user)
    }

    /// Reissues an access token from a refresh token. Claims are rebuilt from
    /// the current user row, so a completed onboarding or a tier change
    /// becomes visible to the route gate here.
    pub async fn refresh_token(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let user = self.get_user_by_id(&claims.sub).await?;

        let access_token = self.jwt_service.generate_access_token(&user)?;
        let expires_in = self.jwt_service.get_access_token_expires_in();

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token: refresh_token.to_string(),
            expires_in,
        })
    }

    fn issue_tokens(&self, user: User) -> AppResult<AuthResponse> {
        let access_token = self.jwt_service.generate_access_token(&user)?;
        let refresh_token = self.jwt_service.generate_refresh_token(&user)?;
        let expires_in = self.jwt_service.get_access_token_expires_in();

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token,
            expires_in,
        })
    }

    async fn get_user_by_id(&self, user_id: &str) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM melimou_users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
