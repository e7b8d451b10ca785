//! Values passed into and returned from the pool service.

pub mod numeric;
pub mod param;
pub mod query_result;

pub use param::QueryParam;
pub use query_result::{PoolStats, QueryResult, Row};
