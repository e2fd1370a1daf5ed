pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtService};
pub use password::{hash_password, validate_password, verify_password};
