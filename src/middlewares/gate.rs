use crate::utils::{Claims, JwtService};
use actix_web::body::EitherBody;
use actix_web::{
    Error, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

const ONBOARDING_PATH: &str = "/onboarding";
const DASHBOARD_PATH: &str = "/dashboard";
const SIGNIN_PATH: &str = "/auth/signin";

/// Pages reachable in any auth state. Feature previews stay open so visitors
/// can explore before signing up.
const PUBLIC_PAGES: [&str; 9] = [
    "/",
    "/terms",
    "/privacy",
    "/tutor",
    "/learning-paths",
    "/resources",
    "/certification",
    "/culture",
    "/chat",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(&'static str),
}

/// Navigation policy for page routes, evaluated per request. Rules apply in
/// order; the onboarding-completion claim decides where a signed-in user may
/// go.
pub fn evaluate(path: &str, claims: Option<&Claims>) -> GateDecision {
    if path.starts_with("/auth/") {
        return GateDecision::Allow;
    }
    if PUBLIC_PAGES.contains(&path) {
        return GateDecision::Allow;
    }

    match claims {
        Some(claims) if !claims.has_completed_onboarding && path != ONBOARDING_PATH => {
            GateDecision::Redirect(ONBOARDING_PATH)
        }
        Some(claims) if claims.has_completed_onboarding && path == ONBOARDING_PATH => {
            GateDecision::Redirect(DASHBOARD_PATH)
        }
        Some(_) => GateDecision::Allow,
        None => GateDecision::Redirect(SIGNIN_PATH),
    }
}

pub struct GateMiddleware {
    jwt_service: JwtService,
}

impl GateMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for GateMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = GateMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(GateMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
        }))
    }
}

pub struct GateMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
}

impl<S, B> Service<ServiceRequest> for GateMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();

        // API and docs traffic is guarded by the auth middleware instead.
        if path.starts_with("/api") || path.starts_with("/swagger-ui") {
            let fut = self.service.call(req);
            return Box::pin(async move { Ok(fut.await?.map_into_left_body()) });
        }

        let claims = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .and_then(|token| self.jwt_service.verify_access_token(token).ok());

        match evaluate(&path, claims.as_ref()) {
            GateDecision::Allow => {
                let fut = self.service.call(req);
                Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
            }
            GateDecision::Redirect(target) => {
                let response = HttpResponse::Found()
                    .insert_header((header::LOCATION, target))
                    .finish();
                let response = req.into_response(response).map_into_right_body();
                Box::pin(async move { Ok(response) })
            }
        }
    }
}
