use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use melimou_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    handlers,
    middlewares::{AuthMiddleware, GateMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(
        &config.jwt.secret,
        config.jwt.access_token_expires_in,
        config.jwt.refresh_token_expires_in,
    );

    let tutor_backend: Arc<dyn TutorBackend> = Arc::new(CannedTutor);

    let auth_service = AuthService::new(pool.clone(), jwt_service.clone());
    let user_service = UserService::new(pool.clone());
    let subscription_service = SubscriptionService::new(pool.clone());
    let learning_service = LearningService::new(pool.clone());
    let tutor_service = TutorService::new(pool.clone(), tutor_backend);
    let chat_service = ChatService::new(pool.clone());
    let alert_service = AlertService::new(pool.clone());
    let resource_service = ResourceService::new(pool.clone());
    let cohort_service = CohortService::new(pool.clone());

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(GateMiddleware::new(jwt_service.clone()))
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors())
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(user_service.clone()))
            .app_data(web::Data::new(subscription_service.clone()))
            .app_data(web::Data::new(learning_service.clone()))
            .app_data(web::Data::new(tutor_service.clone()))
            .app_data(web::Data::new(chat_service.clone()))
            .app_data(web::Data::new(alert_service.clone()))
            .app_data(web::Data::new(resource_service.clone()))
            .app_data(web::Data::new(cohort_service.clone()))
            .configure(swagger_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::user_config)
                    .configure(handlers::subscription_config)
                    .configure(handlers::learning_config)
                    .configure(handlers::tutor_config)
                    .configure(handlers::chat_config)
                    .configure(handlers::alert_config)
                    .configure(handlers::resource_config)
                    .configure(handlers::cohort_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
