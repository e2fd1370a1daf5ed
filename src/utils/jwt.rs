use crate::error::{AppError, AppResult};
use crate::models::{SubscriptionTier, User, UserRole};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims embedded in every token. The onboarding flag and tier are
/// snapshots taken at issue time; they are refreshed whenever a token is
/// reissued (login or refresh), not when the user row changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user id
    pub role: UserRole,
    pub has_completed_onboarding: bool,
    pub subscription_tier: SubscriptionTier,
    pub exp: i64,
    pub iat: i64,
    pub token_type: String, // "access" or "refresh"
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
    refresh_token_expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_expires_in: i64, refresh_expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in: access_expires_in,
            refresh_token_expires_in: refresh_expires_in,
        }
    }

    fn generate_token(&self, user: &User, token_type: &str, expires_in: i64) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(expires_in);

        let claims = Claims {
            sub: user.id.clone(),
            role: user.role,
            has_completed_onboarding: user.has_completed_onboarding,
            subscription_tier: user.subscription_tier,
            exp: exp.timestamp(),
            iat: now.timestamp(),
            token_type: token_type.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn generate_access_token(&self, user: &User) -> AppResult<String> {
        self.generate_token(user, "access", self.access_token_expires_in)
    }

    pub fn generate_refresh_token(&self, user: &User) -> AppResult<String> {
        self.generate_token(user, "refresh", self.refresh_token_expires_in)
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<Claims> {
        let claims = self.verify_token(token)?;

        if claims.token_type != "access" {
            return Err(AppError::AuthError("Invalid access token type".to_string()));
        }

        Ok(claims)
    }

    pub fn verify_refresh_token(&self, token: &str) -> AppResult<Claims> {
        let claims = self.verify_token(token)?;

        if claims.token_type != "refresh" {
            return Err(AppError::AuthError(
                "Invalid refresh token type".to_string(),
            ));
        }

        Ok(claims)
    }

    pub fn get_access_token_expires_in(&self) -> i64 {
        self.access_token_expires_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FormalityPreference, SubscriptionStatus};

    fn sample_user(completed: bool) -> User {
        User {
            id: "u-1".to_string(),
            email: "maria@example.com".to_string(),
            name: Some("Maria".to_string()),
            password_hash: None,
            image: None,
            role: UserRole::Student,
            formality_preference: FormalityPreference::Mixed,
            has_completed_onboarding: completed,
            greek_level: None,
            learning_goals: None,
            study_time_per_week: None,
            previous_experience: None,
            interests: None,
            how_heard_about_us: None,
            wants_practice_test: false,
            subscription_tier: SubscriptionTier::Pro,
            subscription_status: SubscriptionStatus::Active,
            subscription_start_date: None,
            subscription_end_date: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn access_token_carries_session_claims() {
        let svc = JwtService::new("test-secret", 3600, 86400);
        let token = svc.generate_access_token(&sample_user(true)).unwrap();
        let claims = svc.verify_access_token(&token).unwrap();

        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.role, UserRole::Student);
        assert!(claims.has_completed_onboarding);
        assert_eq!(claims.subscription_tier, SubscriptionTier::Pro);
    }

    #[test]
    fn refresh_token_rejected_as_access_token() {
        let svc = JwtService::new("test-secret", 3600, 86400);
        let refresh = svc.generate_refresh_token(&sample_user(false)).unwrap();

        assert!(svc.verify_access_token(&refresh).is_err());
        assert!(svc.verify_refresh_token(&refresh).is_ok());
    }

    #[test]
    fn token_from_other_secret_rejected() {
        let svc = JwtService::new("secret-a", 3600, 86400);
        let other = JwtService::new("secret-b", 3600, 86400);
        let token = svc.generate_access_token(&sample_user(false)).unwrap();

        assert!(other.verify_access_token(&token).is_err());
    }
}
