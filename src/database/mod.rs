pub mod connection;

#[cfg(test)]
pub use connection::test_pool;
pub use connection::{DbPool, create_pool, run_migrations};
