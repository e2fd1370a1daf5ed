pub mod alert;
pub mod auth;
pub mod chat;
pub mod cohort;
pub mod learning;
pub mod resource;
pub mod subscription;
pub mod tutor;
pub mod user;

pub use alert::alert_config;
pub use auth::auth_config;
pub use chat::chat_config;
pub use cohort::cohort_config;
pub use learning::learning_config;
pub use resource::resource_config;
pub use subscription::subscription_config;
pub use tutor::tutor_config;
pub use user::user_config;
