use super::push_column_list;
use crate::conflict::{ConflictPlan, plan_conflict};
use crate::error::{OrmError, OrmResult};
use crate::plan::{Column, OnConflict};
use crate::schema::TableSchema;
use crate::statement::StatementBuilder;
use crate::value::Value;

/// `(cols) VALUES (...), (...)`, optionally with a conflict spec.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
    pub on_conflict: Option<OnConflict>,
}

impl Values {
    pub fn new<C: Into<Column>>(columns: impl IntoIterator<Item = C>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn row<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.rows.push(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn on_conflict(mut self, on_conflict: OnConflict) -> Self {
        self.on_conflict = Some(on_conflict);
        self
    }

    pub(crate) fn plan_conflict(&self, schema: Option<&TableSchema>) -> OrmResult<ConflictPlan> {
        plan_conflict(self.on_conflict.as_ref(), &self.columns, &self.rows, schema)
    }

    pub(crate) fn check_shape(&self) -> OrmResult<()> {
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
        Ok(())
    }
}

pub(super) fn build(values: &Values, b: &mut StatementBuilder<'_>) -> OrmResult<()> {
    values.check_shape()?;
    if values.columns.is_empty() {
        return build_defaults(values.rows.len().max(1), b);
    }
    if values.rows.is_empty() {
        return Err(OrmError::plan_shape("INSERT names columns but has no rows"));
    }

    let schema = b.schema();
    let fields: Vec<_> = values
        .columns
        .iter()
        .map(|c| schema.and_then(|s| s.lookup(&c.name)))
        .collect();

    b.push_char('(');
    push_column_list(b, &values.columns);
    b.push(") VALUES ");
    for (i, row) in values.rows.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_char('(');
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                b.push(", ");
            }
            b.push_value_for(value, fields[j]);
        }
        b.push_char(')');
    }
    Ok(())
}

/// All-default rows. Oracle has no `DEFAULT VALUES`, so one `DEFAULT` is
/// written per known column.
fn build_defaults(rows: usize, b: &mut StatementBuilder<'_>) -> OrmResult<()> {
    let count = b.schema().map_or(0, |s| s.fields.len());
    if count == 0 {
        return Err(OrmError::Unsupported(format!(
            "insert into {} without columns needs column metadata to write DEFAULT values",
            b.table()
        )));
    }
    b.push("VALUES ");
    for i in 0..rows {
        if i > 0 {
            b.push(", ");
        }
        b.push(&default_row(count));
    }
    Ok(())
}

pub(crate) fn default_row(count: usize) -> String {
    format!("({})", vec!["DEFAULT"; count].join(", "))
}
