use crate::error::{AppError, AppResult};
use crate::utils::{Claims, JwtService};
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
    /// Read-only catalog endpoints, public for GET only.
    public_get_prefixes: Vec<&'static str>,
    /// Never public, even under a public prefix.
    excluded_suffixes: Vec<&'static str>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            exact_paths: vec!["/swagger-ui", "/swagger-ui/", "/api-docs/openapi.json"],
            prefix_paths: vec!["/swagger-ui/", "/api-docs/", "/api/v1/auth/"],
            public_get_prefixes: vec![
                "/api/v1/subscriptions/plans",
                "/api/v1/learning-paths",
                "/api/v1/modules",
                "/api/v1/lessons",
                "/api/v1/chat/messages",
                "/api/v1/resources",
            ],
            excluded_suffixes: vec!["/progress"],
        }
    }

    fn is_public(&self, method: &Method, path: &str) -> bool {
        if self
            .excluded_suffixes
            .iter()
            .any(|&suffix| path.ends_with(suffix))
        {
            return false;
        }

        if self.exact_paths.contains(&path) {
            return true;
        }
        if self.prefix_paths.iter().any(|&p| path.starts_with(p)) {
            return true;
        }

        method == Method::GET
            && self
                .public_get_prefixes
                .iter()
                .any(|&p| path.starts_with(p))
    }
}

pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
            public_paths: PublicPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
    public_paths: PublicPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // CORS preflight requests pass through.
        if req.method() == Method::OPTIONS {
            return Box::pin(self.service.call(req));
        }

        let path = req.path().to_string();

        // Page routes are handled by the route gate, not the API guard.
        if !path.starts_with("/api") && !path.starts_with("/swagger-ui") {
            return Box::pin(self.service.call(req));
        }

        let token = bearer_token(req.request());
        let claims = token
            .as_deref()
            .and_then(|t| self.jwt_service.verify_access_token(t).ok());

        if self.public_paths.is_public(req.method(), &path) {
            // Claims are optional here; tier-gated reads use them if present.
            if let Some(claims) = claims {
                req.extensions_mut().insert(claims);
            }
            return Box::pin(self.service.call(req));
        }

        match claims {
            Some(claims) => {
                req.extensions_mut().insert(claims);
                Box::pin(self.service.call(req))
            }
            None => {
                let error = if token.is_some() {
                    AppError::AuthError("Invalid access token".to_string())
                } else {
                    AppError::AuthError("Missing access token".to_string())
                };
                Box::pin(async move { Err(error.into()) })
            }
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.to_string())
}

/// Claims injected by the middleware, if the caller presented a valid token.
pub fn current_claims(req: &HttpRequest) -> Option<Claims> {
    req.extensions().get::<Claims>().cloned()
}

/// Claims for endpoints that require authentication.
pub fn require_claims(req: &HttpRequest) -> AppResult<Claims> {
    current_claims(req).ok_or_else(|| AppError::AuthError("Missing access token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_endpoints_are_public() {
        let paths = PublicPaths::new();
        assert!(paths.is_public(&Method::POST, "/api/v1/auth/login"));
        assert!(paths.is_public(&Method::POST, "/api/v1/auth/register"));
        assert!(paths.is_public(&Method::GET, "/api-docs/openapi.json"));
    }

    #[test]
    fn catalog_reads_are_public_but_writes_are_not() {
        let paths = PublicPaths::new();
        assert!(paths.is_public(&Method::GET, "/api/v1/learning-paths"));
        assert!(paths.is_public(&Method::GET, "/api/v1/subscriptions/plans"));
        assert!(!paths.is_public(&Method::POST, "/api/v1/learning-paths"));
        assert!(!paths.is_public(&Method::DELETE, "/api/v1/lessons/3"));
    }

    #[test]
    fn per_user_progress_reads_require_auth() {
        let paths = PublicPaths::new();
        assert!(!paths.is_public(&Method::GET, "/api/v1/lessons/3/progress"));
    }

    #[test]
    fn private_endpoints_are_not_public() {
        let paths = PublicPaths::new();
        assert!(!paths.is_public(&Method::GET, "/api/v1/users/me"));
        assert!(!paths.is_public(&Method::POST, "/api/v1/subscriptions/activate"));
    }

    #[actix_web::test]
    async fn missing_and_invalid_tokens_report_distinct_errors() {
        use actix_web::{App, HttpResponse, test, web};

        let jwt = JwtService::new("test-secret", 3600, 86400);
        let app = test::init_service(
            App::new().wrap(AuthMiddleware::new(jwt)).route(
                "/api/v1/users/me",
                web::get().to(|| async { HttpResponse::Ok().finish() }),
            ),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/users/me").to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert!(err.to_string().contains("Missing access token"));

        let req = test::TestRequest::get()
            .uri("/api/v1/users/me")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert!(err.to_string().contains("Invalid access token"));
    }
}
