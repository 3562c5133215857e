//! INSERT and MERGE blocks.

use super::types::{element_type, needs_lob};
use super::{ArrayDecl, Block};
use crate::clause::{values_default_row, write_merge_branches, write_merge_header};
use crate::config::EngineConfig;
use crate::conflict::{ConflictPlan, MergePlan, plan_conflict};
use crate::error::{OrmError, OrmResult};
use crate::ident::quote;
use crate::plan::{OperationPlan, insert_column_indices};
use crate::schema::TableSchema;
use crate::statement::CompiledStatement;

pub(super) fn build(
    plan: &OperationPlan,
    schema: &TableSchema,
    config: &EngineConfig,
    mut block: Block<'_>,
) -> OrmResult<CompiledStatement> {
    let conflict = plan_conflict(
        plan.on_conflict.as_ref(),
        &plan.columns,
        &plan.rows,
        Some(schema),
    )?;
    let rows = plan.rows.len();

    match conflict {
        ConflictPlan::Merge(merge) => build_merge(plan, schema, config, &merge, block),
        ConflictPlan::Insert => {
            let kept = insert_column_indices(&plan.columns, &plan.rows, Some(schema));
            if kept.is_empty() {
                return build_default_rows(plan, schema, rows, block);
            }
            let arrays = declare_arrays(plan, schema, config, &kept, &block);
            block.declare(&arrays, false);
            init_arrays(plan, schema, &kept, &mut block);

            let columns: Vec<String> = kept.iter().map(|&i| quote(&plan.columns[i].name)).collect();
            let sources: Vec<String> = (0..kept.len()).map(|k| format!("l_col_{k}_array(i)")).collect();
            let returning = block.captured_list("");
            let table = block.table_sql().to_string();
            block.builder().push(&format!(
                "  FORALL i IN 1..l_col_0_array.COUNT\n    INSERT INTO {table} ({}) VALUES ({})\n    RETURNING {returning} BULK COLLECT INTO l_affected_records;\n",
                columns.join(", "),
                sources.join(", ")
            ));
            block.capture_assignments(rows);
            Ok(block.finish())
        }
    }
}

fn declare_arrays(
    plan: &OperationPlan,
    schema: &TableSchema,
    config: &EngineConfig,
    columns: &[usize],
    block: &Block<'_>,
) -> Vec<ArrayDecl> {
    columns
        .iter()
        .map(|&i| {
            let name = &plan.columns[i].name;
            let widen = needs_lob(plan.rows.iter().map(|row| &row[i]), config.lob_threshold);
            ArrayDecl {
                element: element_type(schema.lookup(name), &block.column_type(name), widen),
            }
        })
        .collect()
}

fn init_arrays(plan: &OperationPlan, schema: &TableSchema, columns: &[usize], block: &mut Block<'_>) {
    for (k, &i) in columns.iter().enumerate() {
        let values: Vec<_> = plan.rows.iter().map(|row| &row[i]).collect();
        block.init_array(k, &values, schema.lookup(&plan.columns[i].name));
    }
}

/// FORALL MERGE over the bulk arrays, then read every written row back by its
/// conflict key.
fn build_merge(
    plan: &OperationPlan,
    schema: &TableSchema,
    config: &EngineConfig,
    merge: &MergePlan,
    mut block: Block<'_>,
) -> OrmResult<CompiledStatement> {
    let all: Vec<usize> = (0..plan.columns.len()).collect();
    let arrays = declare_arrays(plan, schema, config, &all, &block);
    block.declare(&arrays, true);
    init_arrays(plan, schema, &all, &mut block);

    let source: Vec<String> = plan
        .columns
        .iter()
        .enumerate()
        .map(|(k, c)| format!("l_col_{k}_array(i) AS {}", quote(&c.name)))
        .collect();
    let inserted: Vec<&str> = insert_column_indices(&plan.columns, &plan.rows, Some(schema))
        .into_iter()
        .map(|i| plan.columns[i].name.as_str())
        .collect();

    let table = plan.table.clone();
    let b = block.builder();
    b.push("  FORALL i IN 1..l_col_0_array.COUNT\n    ");
    write_merge_header(b, Some(&table));
    b.push(&format!("\n    USING (SELECT {} FROM DUAL) s\n   ", source.join(", ")));
    write_merge_branches(b, merge, &inserted);
    b.push(";\n");

    let mut keys = Vec::with_capacity(merge.on.len());
    for column in &merge.on {
        let index = plan.column_index(column).ok_or_else(|| OrmError::ConflictColumns {
            missing: vec![column.clone()],
            available: plan.columns.iter().map(|c| c.name.clone()).collect(),
        })?;
        keys.push(format!("t.{} = l_col_{index}_array(i)", quote(column)));
    }
    let selected = block.captured_list("t.");
    let table_sql = block.table_sql().to_string();
    block.builder().push(&format!(
        "  FOR i IN 1..l_col_0_array.COUNT LOOP\n    BEGIN\n      SELECT {selected} INTO l_record FROM {table_sql} t WHERE {};\n",
        keys.join(" AND ")
    ));
    block.collect_record("      ");
    block.builder().push(
        "    EXCEPTION\n      WHEN NO_DATA_FOUND THEN NULL;\n    END;\n  END LOOP;\n",
    );
    block.capture_assignments(plan.rows.len());
    Ok(block.finish())
}

/// Rows without any written column: one `VALUES (DEFAULT, ...)` insert per row.
fn build_default_rows(
    plan: &OperationPlan,
    schema: &TableSchema,
    rows: usize,
    mut block: Block<'_>,
) -> OrmResult<CompiledStatement> {
    let generates = schema.fields.iter().any(|f| f.auto_increment || f.has_default);
    if schema.fields.is_empty() || !generates {
        return Err(OrmError::plan_shape(format!(
            "empty write to {} has no identity-generating column",
            plan.table
        )));
    }

    block.declare(&[], true);
    let returning = block.captured_list("");
    let table = block.table_sql().to_string();
    block.builder().push(&format!(
        "  FOR i IN 1..{rows} LOOP\n    INSERT INTO {table} VALUES {} RETURNING {returning} INTO l_record;\n",
        values_default_row(schema.fields.len())
    ));
    block.collect_record("    ");
    block.builder().push("  END LOOP;\n");
    block.capture_assignments(rows);
    Ok(block.finish())
}
