//! Bulk PL/SQL synthesizer.
//!
//! Oracle cannot return more than one row through `RETURNING ... INTO` in
//! plain SQL. When a write must report several affected rows, the engine
//! generates an anonymous block instead:
//!
//! ```text
//! DECLARE
//!   TYPE t_record IS RECORD ("id" "T"."id"%TYPE, ...);
//!   TYPE t_records IS TABLE OF t_record;
//!   l_affected_records t_records := t_records();
//!   TYPE t_col_0_array IS TABLE OF VARCHAR2(4000);
//!   l_col_0_array t_col_0_array;
//! BEGIN
//!   l_col_0_array := t_col_0_array(:1, :2);
//!   FORALL i IN 1..l_col_0_array.COUNT
//!     INSERT INTO "T" ("name") VALUES (l_col_0_array(i))
//!     RETURNING "id", "name" BULK COLLECT INTO l_affected_records;
//!   IF l_affected_records.COUNT > 0 THEN :3 := l_affected_records(1)."id"; END IF;
//!   ...
//! END;
//! ```
//!
//! Generation is a single forward pass: declarations, array initialization,
//! one set-oriented DML statement, then one guarded output assignment per
//! (row, column). Output slots a row never reaches keep their zero value,
//! which is how the result binder tells real rows from padding.

mod create;
mod delete;
mod types;
mod update;


use crate::clause::captured_fields;
use crate::config::{EngineConfig, RowCapPolicy};
use crate::error::{OrmError, OrmResult};
use crate::ident::quote;
use crate::plan::{Capture, Operation, OperationPlan};
use crate::schema::{DataType, FieldDescriptor, TableSchema};
use crate::statement::{CompiledStatement, StatementBuilder};
use crate::value::{ConversionContext, allocate_destination};

/// Application error number raised when a capture exceeds its row cap.
pub const ROW_CAP_ERROR: i32 = -20001;

/// Synthesize a PL/SQL block for a capturing write.
///
/// Fails with [`OrmError::SchemaRequired`] before generating any text when no
/// table metadata is available.
pub fn synthesize(
    plan: &OperationPlan,
    schema: Option<&TableSchema>,
    config: &EngineConfig,
    conversion: &ConversionContext,
) -> OrmResult<CompiledStatement> {
    let Some(schema) = schema else {
        return Err(OrmError::SchemaRequired(format!(
            "bulk {} on {} needs table metadata",
            plan.operation.as_str(),
            plan.table
        )));
    };
    plan.validate()?;

    let captured = match &plan.returning {
        Some(Capture::Columns(columns)) => captured_fields(columns, Some(schema)),
        Some(Capture::All) | None => captured_fields(&[], Some(schema)),
    };
    if captured.is_empty() {
        return Err(OrmError::plan_shape(format!(
            "no columns to capture from {}",
            plan.table
        )));
    }

    let block = Block::new(&plan.table, schema, conversion, captured);
    let stmt = match plan.operation {
        Operation::Insert => create::build(plan, schema, config, block)?,
        Operation::Update => update::build(plan, schema, config, block)?,
        Operation::Delete => delete::build(plan, config, block)?,
    };
    tracing::debug!(
        target: "oraorm.sql",
        operation = plan.operation.as_str(),
        table = %plan.table,
        inputs = stmt.input_count(),
        outputs = stmt.output_count(),
        "synthesized PL/SQL block"
    );
    Ok(stmt)
}

/// One bulk bind array declaration.
pub(crate) struct ArrayDecl {
    pub(crate) element: String,
}

/// Writer for one anonymous block.
pub(crate) struct Block<'s> {
    b: StatementBuilder<'s>,
    table_sql: String,
    captured: Vec<FieldDescriptor>,
}

impl<'s> Block<'s> {
    fn new(
        table: &str,
        schema: &'s TableSchema,
        conversion: &'s ConversionContext,
        captured: Vec<FieldDescriptor>,
    ) -> Self {
        Self {
            b: StatementBuilder::new(table, Some(schema)).with_conversion(conversion),
            table_sql: quote(table),
            captured,
        }
    }

    pub(crate) fn builder(&mut self) -> &mut StatementBuilder<'s> {
        &mut self.b
    }

    pub(crate) fn table_sql(&self) -> &str {
        &self.table_sql
    }

    /// `%TYPE` anchor of a table column.
    pub(crate) fn column_type(&self, column: &str) -> String {
        format!("{}.{}%TYPE", self.table_sql, quote(column))
    }

    /// Comma separated quoted names of the captured columns, each prefixed
    /// with `prefix`.
    pub(crate) fn captured_list(&self, prefix: &str) -> String {
        self.captured
            .iter()
            .map(|f| format!("{prefix}{}", quote(&f.db_name)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Emit the DECLARE section and open the body.
    pub(crate) fn declare(&mut self, arrays: &[ArrayDecl], record_var: bool) {
        let fields: Vec<String> = self
            .captured
            .iter()
            .map(|f| format!("    {} {}", quote(&f.db_name), self.column_type(&f.db_name)))
            .collect();
        let b = &mut self.b;
        b.push("DECLARE\n");
        b.push("  TYPE t_record IS RECORD (\n");
        b.push(&fields.join(",\n"));
        b.push("\n  );\n");
        b.push("  TYPE t_records IS TABLE OF t_record;\n");
        b.push("  l_affected_records t_records := t_records();\n");
        if record_var {
            b.push("  l_record t_record;\n");
        }
        for (i, array) in arrays.iter().enumerate() {
            b.push(&format!(
                "  TYPE t_col_{i}_array IS TABLE OF {};\n  l_col_{i}_array t_col_{i}_array;\n",
                array.element
            ));
        }
        b.push("BEGIN\n");
    }

    /// `l_col_N_array := t_col_N_array(:a, :b, ...);`
    pub(crate) fn init_array(
        &mut self,
        index: usize,
        values: &[&crate::value::Value],
        field: Option<&FieldDescriptor>,
    ) {
        let b = &mut self.b;
        b.push(&format!("  l_col_{index}_array := t_col_{index}_array("));
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.push_value_for(value, field);
        }
        b.push(");\n");
    }

    /// Append the current row of the record variable to the collection.
    pub(crate) fn collect_record(&mut self, indent: &str) {
        self.b.push(&format!(
            "{indent}l_affected_records.EXTEND;\n{indent}l_affected_records(l_affected_records.COUNT) := l_record;\n"
        ));
    }

    /// Fail the block when more rows were affected than can be reported.
    pub(crate) fn row_cap_check(&mut self, kind: &str, config: &EngineConfig) {
        if config.row_cap_policy != RowCapPolicy::Fail {
            return;
        }
        let cap = config.max_returning_rows;
        self.b.push(&format!(
            "  IF l_affected_records.COUNT > {cap} THEN\n    RAISE_APPLICATION_ERROR({ROW_CAP_ERROR}, '{kind} affected ' || l_affected_records.COUNT || ' rows; at most {cap} can be returned');\n  END IF;\n"
        ));
    }

    /// One guarded output assignment per (row, captured column).
    pub(crate) fn capture_assignments(&mut self, rows: usize) {
        for row in 0..rows {
            for field in &self.captured {
                let source = format!("l_affected_records({})", row + 1);
                let b = &mut self.b;
                b.push(&format!("  IF l_affected_records.COUNT > {row} THEN "));
                b.push_out(allocate_destination(field));
                b.push(" := ");
                match field.data_type {
                    DataType::Json if !field.json_binary => {
                        b.push(&format!(
                            "JSON_SERIALIZE({source}.{} RETURNING CLOB)",
                            quote(&field.db_name)
                        ));
                    }
                    _ => {
                        b.push(&format!("{source}.{}", quote(&field.db_name)));
                    }
                }
                b.push("; END IF;\n");
            }
        }
    }

    /// Close the block.
    pub(crate) fn finish(mut self) -> CompiledStatement {
        self.b.push("END;");
        self.b.build()
    }
}
