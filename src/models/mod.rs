pub mod alert;
pub mod cohort;
pub mod common;
pub mod learning;
pub mod message;
pub mod resource;
pub mod subscription;
pub mod tutor;
pub mod user;

pub use alert::*;
pub use cohort::*;
pub use common::*;
pub use learning::*;
pub use message::*;
pub use resource::*;
pub use subscription::*;
pub use tutor::*;
pub use user::*;
