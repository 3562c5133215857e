use super::truncate_sql_bytes;
use super::types::StatementKind;
use crate::client::Executor;
use crate::error::OrmResult;
use crate::statement::BindSlot;
use std::time::{Duration, Instant};
use tracing::Level;

/// Dispatch a tracing event at a runtime-determined level.
macro_rules! emit_at_level {
    ($level:expr, $($field:tt)*) => {
        match $level {
            Level::ERROR => tracing::error!($($field)*),
            Level::WARN  => tracing::warn!($($field)*),
            Level::INFO  => tracing::info!($($field)*),
            Level::DEBUG => tracing::debug!($($field)*),
            Level::TRACE => tracing::trace!($($field)*),
        }
    };
}

/// An [`Executor`] decorator that logs every statement under `oraorm.sql`.
///
/// The statement text is logged **before** execution; the affected-row count
/// (or the error) and the elapsed time are logged after it. Failures are
/// always logged at WARN, and so are executions slower than the configured
/// threshold.
#[derive(Debug, Clone)]
pub struct TracingExecutor<E> {
    inner: E,
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes, on a char boundary). `None` means no truncation.
    pub max_sql_length: Option<usize>,
    /// Executions slower than this are logged at WARN.
    pub slow_threshold: Option<Duration>,
}

impl<E> TracingExecutor<E> {
    /// Wrap an executor with defaults (DEBUG, SQL cut at 200 bytes).
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            level: Level::DEBUG,
            max_sql_length: Some(200),
            slow_threshold: None,
        }
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    /// Log executions slower than `threshold` at WARN.
    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = Some(threshold);
        self
    }

    /// The wrapped executor.
    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Unwrap the decorator.
    pub fn into_inner(self) -> E {
        self.inner
    }

    pub(crate) fn display_sql(&self, sql: &str) -> String {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    fn before(&self, kind: StatementKind, sql: &str, binds: &[BindSlot]) {
        let outputs = binds.iter().filter(|b| b.is_output()).count();
        let sql = self.display_sql(sql);
        emit_at_level!(
            self.level,
            target: "oraorm.sql",
            kind = ?kind,
            inputs = binds.len() - outputs,
            outputs,
            sql = %sql,
            "executing statement"
        );
    }

    fn after(&self, kind: StatementKind, elapsed: Duration, result: &OrmResult<u64>) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match result {
            Ok(rows) => {
                let slow = self.slow_threshold.is_some_and(|t| elapsed > t);
                if slow {
                    tracing::warn!(
                        target: "oraorm.sql",
                        kind = ?kind,
                        rows_affected = *rows,
                        elapsed_ms,
                        "slow statement"
                    );
                } else {
                    emit_at_level!(
                        self.level,
                        target: "oraorm.sql",
                        kind = ?kind,
                        rows_affected = *rows,
                        elapsed_ms,
                        "statement finished"
                    );
                }
            }
            Err(err) => tracing::warn!(
                target: "oraorm.sql",
                kind = ?kind,
                elapsed_ms,
                error = %err,
                "statement failed"
            ),
        }
    }
}

impl<E: Executor> Executor for TracingExecutor<E> {
    async fn execute(&self, sql: &str, binds: &mut [BindSlot]) -> OrmResult<u64> {
        let kind = StatementKind::from_sql(sql);
        self.before(kind, sql, binds);
        let start = Instant::now();
        let result = self.inner.execute(sql, binds).await;
        self.after(kind, start.elapsed(), &result);
        result
    }
}
