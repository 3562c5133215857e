//! Abstract description of one DML request.
//!
//! An [`OperationPlan`] is built once by the caller, compiled once into a
//! [`CompiledStatement`](crate::statement::CompiledStatement) and finally
//! consulted again by the result binder for field lookup.
//!
//! # Example
//! ```ignore
//! use oraorm::{OperationPlan, OnConflict, Value};
//!
//! let plan = OperationPlan::insert("users")
//!     .columns(["id", "name"])
//!     .row([Value::Null, Value::from("alice")])
//!     .row([Value::Null, Value::from("bob")])
//!     .on_conflict(OnConflict::columns(["id"]).update_excluded(["name"]))
//!     .returning(["id", "name"]);
//! ```

use crate::error::{OrmError, OrmResult};
use crate::expr::Expr;
use crate::schema::TableSchema;
use crate::value::Value;

/// DML operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Insert => "INSERT",
            Operation::Update => "UPDATE",
            Operation::Delete => "DELETE",
        }
    }
}

/// A target column, optionally qualified by its owning table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub table: Option<String>,
    pub name: String,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: name.into(),
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            name: name.into(),
        }
    }

    /// Whether this column refers to `name` (case-insensitive, quotes ignored).
    pub fn is(&self, name: &str) -> bool {
        crate::ident::same_name(&self.name, name)
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::new(name)
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Column::new(name)
    }
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum AssignValue {
    /// A bound value.
    Value(Value),
    /// The incoming row's value for the named column.
    Excluded(String),
    /// Raw SQL expression.
    Raw(String),
}

/// `column = value` in an UPDATE or a MERGE update branch.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: String,
    pub value: AssignValue,
}

impl Assignment {
    pub fn value(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: AssignValue::Value(value.into()),
        }
    }

    pub fn excluded(column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            value: AssignValue::Excluded(column.clone()),
            column,
        }
    }

    pub fn raw(column: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: AssignValue::Raw(sql.into()),
        }
    }
}

/// Conflict handling requested for an INSERT.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnConflict {
    /// Conflict target; empty means "the primary key".
    pub columns: Vec<Column>,
    /// Assignments applied when a row matches.
    pub do_updates: Vec<Assignment>,
    /// Skip matching rows instead of updating them.
    pub do_nothing: bool,
    /// Update every writable column from the incoming row on match.
    pub update_all: bool,
}

impl OnConflict {
    /// Target the given conflict columns.
    pub fn columns<C: Into<Column>>(columns: impl IntoIterator<Item = C>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Target the primary key.
    pub fn primary_key() -> Self {
        Self::default()
    }

    /// DO NOTHING on conflict.
    pub fn do_nothing(mut self) -> Self {
        self.do_nothing = true;
        self
    }

    /// Add an assignment to the update branch.
    pub fn do_update(mut self, assignment: Assignment) -> Self {
        self.do_updates.push(assignment);
        self
    }

    /// On conflict, copy the named columns from the incoming row.
    pub fn update_excluded<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.do_updates
            .extend(columns.into_iter().map(Assignment::excluded));
        self
    }

    /// On conflict, copy every writable column from the incoming row.
    pub fn update_all(mut self) -> Self {
        self.update_all = true;
        self
    }
}

/// Which columns a statement reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum Capture {
    /// Every column known for the table.
    All,
    /// The listed columns.
    Columns(Vec<Column>),
}

/// Abstract description of one INSERT/UPDATE/DELETE request.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationPlan {
    pub operation: Operation,
    pub table: String,
    /// Written columns (INSERT) or assigned columns (UPDATE).
    pub columns: Vec<Column>,
    /// One entry per written row, aligned with `columns`.
    pub rows: Vec<Vec<Value>>,
    /// Raw-SQL assignments for UPDATE (`SET col = expr`).
    pub raw_assignments: Vec<Assignment>,
    /// WHERE conditions, ANDed together.
    pub conditions: Vec<Expr>,
    pub on_conflict: Option<OnConflict>,
    pub returning: Option<Capture>,
}

impl OperationPlan {
    fn new(operation: Operation, table: impl Into<String>) -> Self {
        Self {
            operation,
            table: table.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            raw_assignments: Vec::new(),
            conditions: Vec::new(),
            on_conflict: None,
            returning: None,
        }
    }

    /// Start an INSERT plan.
    pub fn insert(table: impl Into<String>) -> Self {
        Self::new(Operation::Insert, table)
    }

    /// Start an UPDATE plan.
    pub fn update(table: impl Into<String>) -> Self {
        Self::new(Operation::Update, table)
    }

    /// Start a DELETE plan.
    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(Operation::Delete, table)
    }

    /// Set the written columns.
    pub fn columns<C: Into<Column>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Append a row of values aligned with the columns.
    pub fn row<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }

    /// Assign a column in an UPDATE.
    pub fn set(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        self.columns.push(Column::new(column));
        if let Some(row) = self.rows.first_mut() {
            row.push(value.into());
        }
        self
    }

    /// Assign a raw SQL expression in an UPDATE.
    pub fn set_raw(mut self, column: impl Into<String>, sql: impl Into<String>) -> Self {
        self.raw_assignments.push(Assignment::raw(column, sql));
        self
    }

    /// Add a WHERE condition.
    pub fn filter(mut self, expr: Expr) -> Self {
        self.conditions.push(expr);
        self
    }

    pub fn on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = Some(on_conflict);
        self
    }

    /// Capture the given columns of every affected row.
    pub fn returning<C: Into<Column>>(mut self, columns: impl IntoIterator<Item = C>) -> Self {
        self.returning = Some(Capture::Columns(
            columns.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Capture every column of every affected row.
    pub fn returning_all(mut self) -> Self {
        self.returning = Some(Capture::All);
        self
    }

    /// Whether written or deleted values are captured.
    pub fn captures(&self) -> bool {
        self.returning.is_some()
    }

    /// Position of a written column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.is(name))
    }

    /// Check row/column alignment and per-operation shape rules.
    pub fn validate(&self) -> OrmResult<()> {
        if self.table.trim().is_empty() {
            return Err(OrmError::plan_shape("operation plan has no target table"));
        }
        let expected = self.columns.len();
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != expected {
                return Err(OrmError::RowShape {
                    row: i + 1,
                    got: row.len(),
                    expected,
                });
            }
        }
        match self.operation {
            Operation::Insert => {
                if self.rows.is_empty() {
                    return Err(OrmError::plan_shape("INSERT plan has no rows"));
                }
            }
            Operation::Update => {
                if self.rows.len() > 1 {
                    return Err(OrmError::plan_shape(format!(
                        "UPDATE plan carries {} rows; assignments take exactly one",
                        self.rows.len()
                    )));
                }
                if self.columns.is_empty() && self.raw_assignments.is_empty() {
                    return Err(OrmError::plan_shape("UPDATE plan has no assignments"));
                }
                if self.on_conflict.is_some() {
                    return Err(OrmError::plan_shape("ON CONFLICT only applies to INSERT"));
                }
            }
            Operation::Delete => {
                if !self.columns.is_empty() || !self.raw_assignments.is_empty() {
                    return Err(OrmError::plan_shape("DELETE plan cannot assign columns"));
                }
                if self.on_conflict.is_some() {
                    return Err(OrmError::plan_shape("ON CONFLICT only applies to INSERT"));
                }
            }
        }
        Ok(())
    }
}

/// Indices of written columns that stay in an INSERT column list.
///
/// An identity column that is NULL in every row is left out so the database
/// generates it.
pub(crate) fn insert_column_indices(
    columns: &[Column],
    rows: &[Vec<Value>],
    schema: Option<&TableSchema>,
) -> Vec<usize> {
    columns
        .iter()
        .enumerate()
        .filter(|(i, column)| {
            let generated = schema
                .and_then(|s| s.lookup(&column.name))
                .is_some_and(|f| f.auto_increment);
            !generated || rows.iter().any(|row| row.get(*i).is_some_and(|v| !v.is_null()))
        })
        .map(|(i, _)| i)
        .collect()
}
