//! DELETE blocks.

use super::Block;
use crate::config::EngineConfig;
use crate::error::OrmResult;
use crate::expr::{Expr, build_conjunction};
use crate::plan::OperationPlan;
use crate::statement::CompiledStatement;

pub(super) fn build(
    plan: &OperationPlan,
    config: &EngineConfig,
    mut block: Block<'_>,
) -> OrmResult<CompiledStatement> {
    block.declare(&[], false);

    let table = block.table_sql().to_string();
    let returning = block.captured_list("");
    let b = block.builder();
    b.push("  DELETE FROM ").push(&table);
    if !plan.conditions.iter().all(Expr::is_empty) {
        b.push("\n    WHERE ");
        build_conjunction(b, &plan.conditions);
    }
    b.push(&format!(
        "\n    RETURNING {returning} BULK COLLECT INTO l_affected_records;\n"
    ));

    block.row_cap_check("DELETE", config);
    block.capture_assignments(config.max_returning_rows);
    Ok(block.finish())
}
