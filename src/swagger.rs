use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::logout,
        handlers::user::get_profile,
        handlers::user::update_profile,
        handlers::user::complete_onboarding,
        handlers::user::onboarding_status,
        handlers::user::user_analytics,
        handlers::subscription::list_plans,
        handlers::subscription::current_subscription,
        handlers::subscription::subscription_history,
        handlers::subscription::subscription_limits,
        handlers::subscription::create_checkout,
        handlers::subscription::activate_subscription,
        handlers::subscription::cancel_subscription,
        handlers::learning::list_paths,
        handlers::learning::get_path,
        handlers::learning::create_path,
        handlers::learning::update_path,
        handlers::learning::delete_path,
        handlers::learning::lessons_by_module,
        handlers::learning::get_lesson,
        handlers::learning::create_lesson,
        handlers::learning::update_lesson,
        handlers::learning::delete_lesson,
        handlers::learning::mark_lesson_complete,
        handlers::learning::get_lesson_progress,
        handlers::tutor::create_session,
        handlers::tutor::active_session,
        handlers::tutor::session_history,
        handlers::tutor::send_message,
        handlers::tutor::end_session,
        handlers::chat::list_messages,
        handlers::chat::send_message,
        handlers::chat::delete_message,
        handlers::alert::list_alerts,
        handlers::alert::create_alert,
        handlers::alert::mark_as_read,
        handlers::alert::mark_all_as_read,
        handlers::resource::list_resources,
        handlers::resource::get_resource,
        handlers::resource::create_resource,
        handlers::resource::update_resource,
        handlers::resource::delete_resource,
        handlers::cohort::list_cohorts,
        handlers::cohort::get_cohort,
        handlers::cohort::join_cohort,
        handlers::cohort::leave_cohort,
    ),
    components(
        schemas(
            User,
            UserResponse,
            UserRole,
            FormalityPreference,
            GreekLevel,
            SubscriptionTier,
            SubscriptionStatus,
            RegisterRequest,
            LoginRequest,
            RefreshTokenRequest,
            AuthResponse,
            CompleteOnboardingRequest,
            UpdateProfileRequest,
            OnboardingStatusResponse,
            OnboardingResponseRow,
            IntervalType,
            UserSubscriptionStatus,
            SubscriptionPlan,
            UserSubscription,
            SubscriptionWithPlan,
            ActivateSubscriptionRequest,
            CancelSubscriptionRequest,
            CreateCheckoutRequest,
            CheckoutSessionResponse,
            Entitlements,
            SubscriptionLimitsResponse,
            Difficulty,
            ProgressStatus,
            LearningPath,
            Module,
            Lesson,
            UserProgress,
            ModuleWithLessons,
            LearningPathDetail,
            CreateLearningPathRequest,
            UpdateLearningPathRequest,
            CreateLessonRequest,
            UpdateLessonRequest,
            MarkLessonCompleteRequest,
            TutorSessionStatus,
            TutorMessageRole,
            TutorSession,
            TutorMessage,
            TutorFeedback,
            CreateTutorSessionRequest,
            SendTutorMessageRequest,
            TutorExchangeResponse,
            TutorSessionDetail,
            MessageType,
            Message,
            SendMessageRequest,
            AlertType,
            Alert,
            CreateAlertRequest,
            ResourceType,
            Resource,
            CreateResourceRequest,
            UpdateResourceRequest,
            CohortRole,
            Cohort,
            CohortMember,
            CohortDetail,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication API"),
        (name = "users", description = "Profile and onboarding API"),
        (name = "subscriptions", description = "Plan catalog and subscription lifecycle API"),
        (name = "learning", description = "Learning paths, lessons and progress API"),
        (name = "tutor", description = "Tutor session API"),
        (name = "chat", description = "Community chat API"),
        (name = "alerts", description = "Alert API"),
        (name = "resources", description = "Resource library API"),
        (name = "cohorts", description = "Cohort membership API"),
    ),
    info(
        title = "MeliMou Backend API",
        version = "1.0.0",
        description = "Greek language learning platform REST API documentation"
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
