pub mod alert_service;
pub mod auth_service;
pub mod chat_service;
pub mod cohort_service;
pub mod entitlement;
pub mod learning_service;
pub mod resource_service;
pub mod subscription_service;
pub mod tutor_service;
pub mod user_service;

pub use alert_service::*;
pub use auth_service::*;
pub use chat_service::*;
pub use cohort_service::*;
pub use learning_service::*;
pub use resource_service::*;
pub use subscription_service::*;
pub use tutor_service::*;
pub use user_service::*;
