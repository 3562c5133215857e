use super::values::Values;
use crate::conflict::MergePlan;
use crate::error::{OrmError, OrmResult};
use crate::plan::{AssignValue, insert_column_indices};
use crate::statement::StatementBuilder;

/// Alias of the merge target.
pub(crate) const TARGET: &str = "t";
/// Alias of the merge source row set.
pub(crate) const SOURCE: &str = "s";

/// `MERGE INTO "T" t USING (SELECT ... FROM DUAL UNION ALL ...) s ON (...) ...`
pub(super) fn build(
    values: &Values,
    plan: &MergePlan,
    table: Option<&str>,
    b: &mut StatementBuilder<'_>,
) -> OrmResult<()> {
    values.check_shape()?;
    if values.rows.is_empty() {
        return Err(OrmError::plan_shape("MERGE needs at least one row"));
    }

    let schema = b.schema();
    let fields: Vec<_> = values
        .columns
        .iter()
        .map(|c| schema.and_then(|s| s.lookup(&c.name)))
        .collect();

    write_merge_header(b, table);
    b.push(" USING (");
    for (i, row) in values.rows.iter().enumerate() {
        if i > 0 {
            b.push(" UNION ALL ");
        }
        b.push("SELECT ");
        for (j, value) in row.iter().enumerate() {
            if j > 0 {
                b.push(", ");
            }
            b.push_value_for(value, fields[j]);
            b.push(" AS ").push_ident(&values.columns[j].name);
        }
        b.push(" FROM DUAL");
    }
    b.push(") ").push(SOURCE);

    let inserted: Vec<&str> = insert_column_indices(&values.columns, &values.rows, schema)
        .into_iter()
        .map(|i| values.columns[i].name.as_str())
        .collect();
    write_merge_branches(b, plan, &inserted);
    Ok(())
}

/// `MERGE INTO "T" t`
pub(crate) fn write_merge_header(b: &mut StatementBuilder<'_>, table: Option<&str>) {
    b.push("MERGE INTO ");
    match table {
        Some(table) => {
            b.push_ident(table);
        }
        None => {
            b.push_table();
        }
    }
    b.push_char(' ').push(TARGET);
}

/// ` ON (...) [WHEN MATCHED THEN UPDATE SET ...] WHEN NOT MATCHED THEN INSERT ...`
///
/// The source row set must be aliased [`SOURCE`] and expose every written
/// column under its own name.
pub(crate) fn write_merge_branches(
    b: &mut StatementBuilder<'_>,
    plan: &MergePlan,
    insert_columns: &[&str],
) {
    b.push(" ON (");
    for (i, column) in plan.on.iter().enumerate() {
        if i > 0 {
            b.push(" AND ");
        }
        qualified(b, TARGET, column);
        b.push(" = ");
        qualified(b, SOURCE, column);
    }
    b.push_char(')');

    if !plan.updates.is_empty() {
        b.push(" WHEN MATCHED THEN UPDATE SET ");
        let schema = b.schema();
        for (i, assignment) in plan.updates.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            qualified(b, TARGET, &assignment.column);
            b.push(" = ");
            match &assignment.value {
                AssignValue::Excluded(column) => qualified(b, SOURCE, column),
                AssignValue::Raw(sql) => {
                    b.push(sql);
                }
                AssignValue::Value(value) => {
                    let field = schema.and_then(|s| s.lookup(&assignment.column));
                    b.push_value_for(value, field);
                }
            }
        }
    }

    b.push(" WHEN NOT MATCHED THEN INSERT (");
    for (i, column) in insert_columns.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_ident(column);
    }
    b.push(") VALUES (");
    for (i, column) in insert_columns.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        qualified(b, SOURCE, column);
    }
    b.push_char(')');
}

fn qualified(b: &mut StatementBuilder<'_>, alias: &str, column: &str) {
    b.push(alias).push_char('.').push_ident(column);
}
