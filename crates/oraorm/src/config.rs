//! Engine configuration.

/// Default number of rows an UPDATE/DELETE capture can report.
pub const DEFAULT_MAX_RETURNING_ROWS: usize = 100;

/// Values longer than this (in characters) force a CLOB/BLOB bulk array.
pub const DEFAULT_LOB_THRESHOLD: usize = 4000;

/// What a bulk UPDATE/DELETE block does when more rows were affected than
/// there are output slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowCapPolicy {
    /// Raise an application error inside the block; the statement is rolled back.
    #[default]
    Fail,
    /// Report only the first `max_returning_rows` rows.
    Truncate,
}

/// Configuration for statement synthesis.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Output rows pre-allocated for UPDATE/DELETE captures.
    pub max_returning_rows: usize,
    /// Behavior when a capture affects more rows than `max_returning_rows`.
    pub row_cap_policy: RowCapPolicy,
    /// Threshold above which bulk arrays switch to large-object element types.
    pub lob_threshold: usize,
    /// Column whose `IS [NOT] NULL` checks do not count as a WHERE condition.
    pub soft_delete_column: String,
    /// Allow UPDATE/DELETE without a meaningful WHERE clause.
    pub allow_global_update: bool,
    /// Minimum number of rows for which INSERT captures use a PL/SQL block.
    ///
    /// A single-row insert without conflict handling uses `RETURNING ... INTO`.
    pub bulk_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_returning_rows: DEFAULT_MAX_RETURNING_ROWS,
            row_cap_policy: RowCapPolicy::default(),
            lob_threshold: DEFAULT_LOB_THRESHOLD,
            soft_delete_column: "deleted_at".to_string(),
            allow_global_update: false,
            bulk_threshold: 2,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of output rows allocated for UPDATE/DELETE captures.
    pub fn with_max_returning_rows(mut self, rows: usize) -> Self {
        self.max_returning_rows = rows.max(1);
        self
    }

    /// Set the row cap policy.
    pub fn with_row_cap_policy(mut self, policy: RowCapPolicy) -> Self {
        self.row_cap_policy = policy;
        self
    }

    /// Set the large-object widening threshold.
    pub fn with_lob_threshold(mut self, chars: usize) -> Self {
        self.lob_threshold = chars;
        self
    }

    /// Set the soft-delete marker column.
    pub fn with_soft_delete_column(mut self, column: impl Into<String>) -> Self {
        self.soft_delete_column = column.into();
        self
    }

    /// Allow UPDATE/DELETE statements that affect every row.
    pub fn allow_global_update(mut self, allow: bool) -> Self {
        self.allow_global_update = allow;
        self
    }

    /// Set the minimum INSERT row count that uses a PL/SQL block for captures.
    ///
    /// Plain `RETURNING ... INTO` binds a single row, so the value is clamped
    /// to 1 (every capture uses a block) or 2.
    pub fn with_bulk_threshold(mut self, rows: usize) -> Self {
        self.bulk_threshold = rows.clamp(1, 2);
        self
    }
}
