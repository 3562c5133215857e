//! UPDATE blocks.
//!
//! An UPDATE carries one set of assignments, so its values are bound
//! directly instead of through bulk arrays. The number of affected rows is
//! unknown until execution; output slots are allocated for
//! `max_returning_rows` rows.

use super::Block;
use crate::config::EngineConfig;
use crate::error::OrmResult;
use crate::expr::{Expr, build_conjunction};
use crate::plan::{AssignValue, OperationPlan};
use crate::schema::TableSchema;
use crate::statement::CompiledStatement;

pub(super) fn build(
    plan: &OperationPlan,
    schema: &TableSchema,
    config: &EngineConfig,
    mut block: Block<'_>,
) -> OrmResult<CompiledStatement> {
    block.declare(&[], false);

    let table = block.table_sql().to_string();
    let returning = block.captured_list("");
    let b = block.builder();
    b.push("  UPDATE ").push(&table).push(" SET ");

    let values = plan.rows.first().map(Vec::as_slice).unwrap_or_default();
    let mut first = true;
    for (column, value) in plan.columns.iter().zip(values) {
        if !first {
            b.push(", ");
        }
        first = false;
        b.push_ident(&column.name).push(" = ");
        b.push_value_for(value, schema.lookup(&column.name));
    }
    for assignment in &plan.raw_assignments {
        if !first {
            b.push(", ");
        }
        first = false;
        b.push_ident(&assignment.column).push(" = ");
        match &assignment.value {
            AssignValue::Raw(sql) => {
                b.push(sql);
            }
            AssignValue::Value(value) => {
                b.push_value_for(value, schema.lookup(&assignment.column));
            }
            AssignValue::Excluded(column) => {
                b.push_ident(column);
            }
        }
    }

    if !plan.conditions.iter().all(Expr::is_empty) {
        b.push("\n    WHERE ");
        build_conjunction(b, &plan.conditions);
    }
    b.push(&format!(
        "\n    RETURNING {returning} BULK COLLECT INTO l_affected_records;\n"
    ));

    block.row_cap_check("UPDATE", config);
    block.capture_assignments(config.max_returning_rows);
    Ok(block.finish())
}
