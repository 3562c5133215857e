//! Execution provider seam.

use crate::error::OrmResult;
use crate::statement::BindSlot;

/// Something that can run a compiled statement against Oracle.
///
/// Implementations read every [`BindSlot::In`] as a positional input and fill
/// every [`BindSlot::Out`] through [`OutSlot::fill`](crate::value::OutSlot::fill).
/// Output slots left untouched keep their zero value.
///
/// Errors are reported as [`OrmError::Execution`](crate::OrmError::Execution)
/// carrying the driver message verbatim.
pub trait Executor: Send + Sync {
    /// Execute `sql` once and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        binds: &mut [BindSlot],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(
        &self,
        sql: &str,
        binds: &mut [BindSlot],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send {
        (**self).execute(sql, binds)
    }
}
