pub mod auth;
pub mod cors;
pub mod gate;

pub use auth::{AuthMiddleware, current_claims, require_claims};
pub use cors::create_cors;
pub use gate::{GateDecision, GateMiddleware, evaluate};
