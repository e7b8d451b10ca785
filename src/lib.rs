pub mod config;
pub mod db;
pub mod errors;
pub mod models;

pub use config::PoolConfig;
pub use db::Database;
pub use errors::DbError;
pub use models::{PoolStats, QueryParam, QueryResult, Row};
