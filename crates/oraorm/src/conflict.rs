//! Decide how an INSERT with conflict handling is expressed.
//!
//! Oracle has no `ON CONFLICT`; an upsert becomes a `MERGE`. A MERGE is only
//! generated when it can change the outcome: at least one conflict column is
//! written and the spec either updates something or asks to skip matches.
//! Everything else degenerates to a plain INSERT.
//!
//! A conflict column that is NULL in every row can never match an existing
//! row (typically an identity left for the database to generate), so such a
//! write is planned as an INSERT as well.

use crate::error::{OrmError, OrmResult};
use crate::plan::{AssignValue, Assignment, Column, OnConflict};
use crate::schema::TableSchema;
use crate::value::Value;

/// How the write is expressed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConflictPlan {
    /// No conflict handling: a plain INSERT.
    Insert,
    /// A MERGE keyed on `on`.
    Merge(MergePlan),
}

/// Parameters of a MERGE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    /// Columns of the `ON (...)` match condition, spelled as in the write.
    pub on: Vec<String>,
    /// Update branch assignments; empty means matched rows are left alone.
    pub updates: Vec<Assignment>,
}

impl MergePlan {
    pub fn is_do_nothing(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Plan conflict handling for a write of `rows` into `columns`.
pub fn plan_conflict(
    on_conflict: Option<&OnConflict>,
    columns: &[Column],
    rows: &[Vec<Value>],
    schema: Option<&TableSchema>,
) -> OrmResult<ConflictPlan> {
    let Some(spec) = on_conflict else {
        return Ok(ConflictPlan::Insert);
    };

    let on = conflict_columns(spec, columns, rows, schema)?;
    let has_action = !spec.do_updates.is_empty() || spec.do_nothing || spec.update_all;
    if on.is_empty() || !has_action {
        tracing::debug!(
            target: "oraorm.sql",
            conflict_columns = on.len(),
            has_action,
            "conflict spec degenerates to a plain INSERT"
        );
        return Ok(ConflictPlan::Insert);
    }

    let updates = if spec.do_nothing {
        Vec::new()
    } else if spec.update_all {
        writable_assignments(columns, &on, schema)
    } else {
        update_assignments(&spec.do_updates, columns, &on, schema)
    };

    Ok(ConflictPlan::Merge(MergePlan { on, updates }))
}

/// Resolve the conflict target against the written columns.
///
/// An empty result means no MERGE can match.
fn conflict_columns(
    spec: &OnConflict,
    columns: &[Column],
    rows: &[Vec<Value>],
    schema: Option<&TableSchema>,
) -> OrmResult<Vec<String>> {
    let find = |name: &str| columns.iter().find(|c| c.is(name)).map(|c| c.name.clone());
    // Columns whose every row is NULL are not usable as a match key.
    let find_valued = |name: &str| find(name).filter(|c| !all_null(columns, rows, c));

    if !spec.columns.is_empty() {
        let missing: Vec<String> = spec
            .columns
            .iter()
            .filter(|c| find(&c.name).is_none())
            .map(|c| c.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(OrmError::ConflictColumns {
                missing,
                available: columns.iter().map(|c| c.name.clone()).collect(),
            });
        }
        if let Some(schema) = schema {
            check_identifies_row(spec, schema)?;
        }
        let declared: Vec<String> = spec.columns.iter().filter_map(|c| find(&c.name)).collect();
        if let Some(column) = declared.iter().find(|c| all_null(columns, rows, c)) {
            tracing::debug!(
                target: "oraorm.sql",
                column = %column,
                "conflict column is NULL in every row"
            );
            return Ok(Vec::new());
        }
        return Ok(declared);
    }

    let Some(schema) = schema else {
        return Ok(Vec::new());
    };
    let primary: Vec<String> = schema
        .primary_keys()
        .filter_map(|f| find(&f.db_name))
        .collect();
    if !primary.is_empty() && !primary.iter().any(|c| all_null(columns, rows, c)) {
        return Ok(primary);
    }
    Ok(schema
        .unique_fields()
        .filter_map(|f| find_valued(&f.db_name))
        .collect())
}

/// Declared conflict columns must cover the primary key or name a unique column.
fn check_identifies_row(spec: &OnConflict, schema: &TableSchema) -> OrmResult<()> {
    let declared = |name: &str| spec.columns.iter().any(|c| crate::ident::same_name(&c.name, name));
    let mut primary = schema.primary_keys().peekable();
    let covers_primary = primary.peek().is_some() && primary.all(|f| declared(&f.db_name));
    let names_unique = schema.unique_fields().any(|f| declared(&f.db_name));
    if covers_primary || names_unique {
        return Ok(());
    }
    let names: Vec<&str> = spec.columns.iter().map(|c| c.name.as_str()).collect();
    Err(OrmError::validation(format!(
        "conflict columns [{}] are neither the primary key nor a unique key of {}",
        names.join(", "),
        schema.name
    )))
}

/// True when `rows` is non-empty and every row is NULL at `name`.
fn all_null(columns: &[Column], rows: &[Vec<Value>], name: &str) -> bool {
    let Some(index) = columns.iter().position(|c| c.is(name)) else {
        return false;
    };
    !rows.is_empty()
        && rows
            .iter()
            .all(|row| row.get(index).is_none_or(Value::is_null))
}

fn is_primary_key(name: &str, on: &[String], schema: Option<&TableSchema>) -> bool {
    schema.is_some_and(|s| s.lookup(name).is_some_and(|f| f.primary_key))
        || on.iter().any(|c| crate::ident::same_name(c, name))
}

/// Every written column that a MERGE may update.
fn writable_assignments(
    columns: &[Column],
    on: &[String],
    schema: Option<&TableSchema>,
) -> Vec<Assignment> {
    columns
        .iter()
        .filter(|c| !on.iter().any(|o| c.is(o)))
        .filter(|c| match schema.and_then(|s| s.lookup(&c.name)) {
            Some(field) => field.is_merge_updatable(),
            None => true,
        })
        .map(|c| Assignment::excluded(c.name.clone()))
        .collect()
}

fn update_assignments(
    requested: &[Assignment],
    columns: &[Column],
    on: &[String],
    schema: Option<&TableSchema>,
) -> Vec<Assignment> {
    let touches_key = requested
        .iter()
        .any(|a| is_primary_key(&a.column, on, schema));
    if !touches_key {
        return requested.to_vec();
    }

    // Keys are never reassigned; fall back to updating every writable column,
    // keeping explicit non-key assignments that are not plain copies.
    let mut updates = writable_assignments(columns, on, schema);
    for assignment in requested {
        if is_primary_key(&assignment.column, on, schema) {
            continue;
        }
        if matches!(assignment.value, AssignValue::Excluded(_)) {
            continue;
        }
        match updates
            .iter_mut()
            .find(|a| crate::ident::same_name(&a.column, &assignment.column))
        {
            Some(existing) => *existing = assignment.clone(),
            None => updates.push(assignment.clone()),
        }
    }
    tracing::debug!(
        target: "oraorm.sql",
        assignments = updates.len(),
        "primary key assignment stripped from MERGE update branch"
    );
    updates
}
