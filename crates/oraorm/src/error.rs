//! Error types for oraorm

use thiserror::Error;

/// Result type alias for oraorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for statement synthesis, execution and result binding
#[derive(Debug, Error)]
pub enum OrmError {
    /// The operation plan is malformed (empty write, inconsistent rows, ...)
    #[error("Invalid operation plan: {0}")]
    PlanShape(String),

    /// A row carries a different number of values than there are columns
    #[error("row {row} has {got} values, expected {expected}")]
    RowShape {
        row: usize,
        got: usize,
        expected: usize,
    },

    /// Table metadata is required but was not supplied
    #[error("Schema required: {0}")]
    SchemaRequired(String),

    /// ON CONFLICT columns are not part of the written value set
    #[error(
        "conflict columns not present in values: missing [{}], available [{}]",
        .missing.join(", "),
        .available.join(", ")
    )]
    ConflictColumns {
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// The dialect has no way to express the requested clause
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// UPDATE/DELETE without a meaningful WHERE clause
    #[error("Missing WHERE clause: {0}")]
    MissingWhere(String),

    /// A captured value could not be stored into the destination field
    #[error("Conversion error on field '{field}': {message}")]
    Conversion { field: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error reported by the execution provider, passed through verbatim
    #[error("Execution error: {0}")]
    Execution(String),

    /// More rows were affected than output slots were allocated for
    #[error("{kind} affected more than {cap} rows, which exceeds the RETURNING capacity")]
    RowCapExceeded { cap: usize, kind: &'static str },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl OrmError {
    /// Create a plan-shape error
    pub fn plan_shape(message: impl Into<String>) -> Self {
        Self::PlanShape(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a conversion error for a specific destination field
    pub fn conversion(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conversion {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Check if this error was raised before any SQL reached the database
    pub fn is_pre_execution(&self) -> bool {
        matches!(
            self,
            Self::PlanShape(_)
                | Self::RowShape { .. }
                | Self::SchemaRequired(_)
                | Self::ConflictColumns { .. }
                | Self::Unsupported(_)
                | Self::MissingWhere(_)
                | Self::Validation(_)
                | Self::Serialization(_)
        )
    }

    /// Check if this is a missing-WHERE safety error
    pub fn is_missing_where(&self) -> bool {
        matches!(self, Self::MissingWhere(_))
    }

    /// Check if this is a conversion error
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_error_names_both_sides() {
        let err = OrmError::ConflictColumns {
            missing: vec!["email".into()],
            available: vec!["id".into(), "name".into()],
        };
        assert_eq!(
            err.to_string(),
            "conflict columns not present in values: missing [email], available [id, name]"
        );
        assert!(err.is_pre_execution());
    }

    #[test]
    fn row_shape_message() {
        let err = OrmError::RowShape {
            row: 2,
            got: 1,
            expected: 3,
        };
        assert_eq!(err.to_string(), "row 2 has 1 values, expected 3");
    }
}
