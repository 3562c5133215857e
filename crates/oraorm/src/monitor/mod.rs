//! Statement logging around an [`Executor`](crate::client::Executor).
//!
//! # Example
//!
//! ```rust,ignore
//! use oraorm::monitor::TracingExecutor;
//! use std::time::Duration;
//! use tracing::Level;
//!
//! let executor = TracingExecutor::new(driver)
//!     .level(Level::INFO)
//!     .max_sql_length(500)
//!     .slow_threshold(Duration::from_millis(250));
//!
//! engine.execute(&plan, Some(&schema), &executor, &mut rows).await?;
//! ```

mod tracing_executor;
mod types;


pub use tracing_executor::TracingExecutor;
pub use types::StatementKind;

/// Truncate `sql` to at most `max_bytes`, backing off to a char boundary.
pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}
