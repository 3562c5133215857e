//! Clause compiler.
//!
//! Each [`Clause`] variant maps to exactly one rendering function. Clauses are
//! compiled in caller-given order into a shared [`StatementBuilder`], which
//! supplies the table name and schema when a clause leaves them unset.
//!
//! ```ignore
//! use oraorm::clause::{self, Clause};
//!
//! let mut b = StatementBuilder::new("users", None);
//! clause::compile(&[Clause::delete(), Clause::filter(Expr::eq("id", 1i64))], &mut b)?;
//! assert_eq!(b.sql(), r#"DELETE FROM "users" WHERE "id" = :1"#);
//! ```

mod limit;
mod merge;
mod returning;
mod values;


pub use limit::Limit;
pub use returning::Returning;
pub use values::Values;

pub(crate) use merge::{write_merge_branches, write_merge_header};
pub(crate) use returning::captured_fields;
pub(crate) use values::default_row as values_default_row;

use crate::conflict::ConflictPlan;
use crate::error::{OrmError, OrmResult};
use crate::expr::{Expr, build_conjunction};
use crate::plan::{AssignValue, Assignment, Column};
use crate::statement::StatementBuilder;

/// One abstract clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Select(Select),
    From(FromTables),
    Insert(Insert),
    Values(Values),
    Update(Update),
    Set(Set),
    Delete(Delete),
    Where(Where),
    OrderBy(OrderBy),
    Limit(Limit),
    Returning(Returning),
}

impl Clause {
    pub fn insert() -> Self {
        Clause::Insert(Insert::default())
    }

    pub fn update() -> Self {
        Clause::Update(Update::default())
    }

    pub fn delete() -> Self {
        Clause::Delete(Delete::default())
    }

    pub fn filter(expr: Expr) -> Self {
        Clause::Where(Where { exprs: vec![expr] })
    }

    pub fn set(assignments: Vec<Assignment>) -> Self {
        Clause::Set(Set { assignments })
    }
}

/// `SELECT col, ...`; no columns selects `*`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub columns: Vec<Column>,
    pub distinct: bool,
}

/// `FROM table, ...`; no tables uses the statement's table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FromTables {
    pub tables: Vec<String>,
}

/// `INSERT INTO table`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Insert {
    pub table: Option<String>,
}

/// `UPDATE table`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    pub table: Option<String>,
}

/// `SET col = value, ...`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Set {
    pub assignments: Vec<Assignment>,
}

/// `DELETE FROM table`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delete {
    pub table: Option<String>,
}

/// `WHERE cond AND ...`; renders nothing when every condition is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Where {
    pub exprs: Vec<Expr>,
}

/// One ORDER BY key.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByColumn {
    pub column: String,
    pub desc: bool,
}

/// `ORDER BY col [DESC], ...`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBy {
    pub columns: Vec<OrderByColumn>,
}

impl OrderBy {
    pub fn asc(mut self, column: impl Into<String>) -> Self {
        self.columns.push(OrderByColumn {
            column: column.into(),
            desc: false,
        });
        self
    }

    pub fn desc(mut self, column: impl Into<String>) -> Self {
        self.columns.push(OrderByColumn {
            column: column.into(),
            desc: true,
        });
        self
    }
}

/// Compile `clauses` in order into `b`, separated by single spaces.
///
/// An INSERT whose VALUES carry a conflict spec that plans to a MERGE is
/// rewritten into one `MERGE INTO` statement; such a statement cannot carry a
/// RETURNING clause.
pub fn compile(clauses: &[Clause], b: &mut StatementBuilder<'_>) -> OrmResult<()> {
    let conflict = match clauses.iter().find_map(|c| match c {
        Clause::Values(v) => Some(v),
        _ => None,
    }) {
        Some(values) => values.plan_conflict(b.schema())?,
        None => ConflictPlan::Insert,
    };
    let merge = match &conflict {
        ConflictPlan::Merge(plan) => Some(plan),
        ConflictPlan::Insert => None,
    };
    let insert_table = clauses.iter().find_map(|c| match c {
        Clause::Insert(insert) => insert.table.clone(),
        _ => None,
    });

    for clause in clauses {
        if merge.is_some() {
            match clause {
                Clause::Insert(_) => continue,
                Clause::Returning(_) => {
                    return Err(OrmError::Unsupported(
                        "MERGE statements cannot return values; capture through a PL/SQL block"
                            .to_string(),
                    ));
                }
                _ => {}
            }
        }

        let mark = b.sql_len();
        if mark > 0 {
            b.push_char(' ');
        }
        let start = b.sql_len();
        match clause {
            Clause::Select(select) => build_select(select, b),
            Clause::From(from) => build_from(from, b),
            Clause::Insert(insert) => {
                b.push("INSERT INTO ");
                push_table_or_context(b, insert.table.as_deref());
            }
            Clause::Values(values) => match merge {
                Some(plan) => merge::build(values, plan, insert_table.as_deref(), b)?,
                None => values::build(values, b)?,
            },
            Clause::Update(update) => {
                b.push("UPDATE ");
                push_table_or_context(b, update.table.as_deref());
            }
            Clause::Set(set) => build_set(set, b)?,
            Clause::Delete(delete) => {
                b.push("DELETE FROM ");
                push_table_or_context(b, delete.table.as_deref());
            }
            Clause::Where(clause) => build_where(clause, b),
            Clause::OrderBy(order) => build_order_by(order, b),
            Clause::Limit(limit) => limit::build(limit, b),
            Clause::Returning(returning) => returning::build(returning, b),
        }
        if b.sql_len() == start {
            b.truncate_sql(mark);
        }
    }
    Ok(())
}

fn push_table_or_context(b: &mut StatementBuilder<'_>, table: Option<&str>) {
    match table {
        Some(table) => {
            b.push_ident(table);
        }
        None => {
            b.push_table();
        }
    }
}

fn build_select(select: &Select, b: &mut StatementBuilder<'_>) {
    b.push("SELECT ");
    if select.distinct {
        b.push("DISTINCT ");
    }
    if select.columns.is_empty() {
        b.push_char('*');
        return;
    }
    push_column_list(b, &select.columns);
}

fn build_from(from: &FromTables, b: &mut StatementBuilder<'_>) {
    b.push("FROM ");
    if from.tables.is_empty() {
        b.push_table();
        return;
    }
    for (i, table) in from.tables.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_ident(table);
    }
}

pub(crate) fn push_column_list(b: &mut StatementBuilder<'_>, columns: &[Column]) {
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        if let Some(table) = &column.table {
            b.push_ident(table).push_char('.');
        }
        b.push_ident(&column.name);
    }
}

fn build_set(set: &Set, b: &mut StatementBuilder<'_>) -> OrmResult<()> {
    if set.assignments.is_empty() {
        return Ok(());
    }
    b.push("SET ");
    for (i, assignment) in set.assignments.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_ident(&assignment.column).push(" = ");
        match &assignment.value {
            AssignValue::Value(value) => {
                let field = b.schema().and_then(|s| s.lookup(&assignment.column));
                b.push_value_for(value, field);
            }
            AssignValue::Raw(sql) => {
                b.push(sql);
            }
            AssignValue::Excluded(column) => {
                return Err(OrmError::Unsupported(format!(
                    "incoming-row reference to {column} is only valid inside MERGE"
                )));
            }
        }
    }
    Ok(())
}

fn build_where(clause: &Where, b: &mut StatementBuilder<'_>) {
    if clause.exprs.iter().all(Expr::is_empty) {
        return;
    }
    b.push("WHERE ");
    build_conjunction(b, &clause.exprs);
}

fn build_order_by(order: &OrderBy, b: &mut StatementBuilder<'_>) {
    if order.columns.is_empty() {
        return;
    }
    b.push("ORDER BY ");
    for (i, key) in order.columns.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_ident(&key.column);
        if key.desc {
            b.push(" DESC");
        }
    }
    b.mark_order_by();
}
