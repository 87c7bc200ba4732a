//! SQLite connection pool and migration runner.

mod connection;

pub use connection::DatabaseConnection;
