//! Execution entry point: gate, plan, compile, execute, bind.

use crate::binder::{BindReport, Destination};
use crate::clause::{self, Clause, Returning, Values, captured_fields};
use crate::client::Executor;
use crate::config::EngineConfig;
use crate::conflict::{ConflictPlan, plan_conflict};
use crate::error::{OrmError, OrmResult};
use crate::plan::{Assignment, Capture, Operation, OperationPlan, insert_column_indices};
use crate::plsql::{self, ROW_CAP_ERROR};
use crate::safety::check_where;
use crate::schema::{FieldDescriptor, TableSchema};
use crate::statement::{CompiledStatement, StatementBuilder};
use crate::value::{ConversionContext, OutSlot};

/// Result of one executed plan.
#[derive(Debug, Default)]
pub struct ExecOutcome {
    /// Rows written or deleted.
    ///
    /// For statements run as a PL/SQL block this is the number of captured
    /// rows, since drivers report a block as a single execution.
    pub rows_affected: u64,
    /// Binding result, empty when nothing was captured.
    pub report: BindReport,
}

/// How a plan is turned into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Clauses,
    Block,
}

/// Statement synthesis and result binding for one configuration.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    pub config: EngineConfig,
    pub conversion: ConversionContext,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            conversion: ConversionContext::default(),
        }
    }

    /// Use `conversion` for collection binds.
    pub fn with_conversion(mut self, conversion: ConversionContext) -> Self {
        self.conversion = conversion;
        self
    }

    /// Compile a plan without executing it.
    ///
    /// Every failure here happens before any SQL reaches the database.
    pub fn compile(
        &self,
        plan: &OperationPlan,
        schema: Option<&TableSchema>,
    ) -> OrmResult<CompiledStatement> {
        self.compile_routed(plan, schema).map(|(stmt, _)| stmt)
    }

    fn compile_routed(
        &self,
        plan: &OperationPlan,
        schema: Option<&TableSchema>,
    ) -> OrmResult<(CompiledStatement, Route)> {
        plan.validate()?;
        if plan.operation != Operation::Insert {
            check_where(
                &self.config,
                plan.operation.as_str(),
                &plan.table,
                &plan.conditions,
            )?;
        }
        if matches!(plan.returning, Some(Capture::All)) && schema.is_none() {
            return Err(OrmError::SchemaRequired(format!(
                "capturing every column of {} needs table metadata",
                plan.table
            )));
        }

        let route = self.route(plan, schema)?;
        let stmt = match route {
            Route::Block => plsql::synthesize(plan, schema, &self.config, &self.conversion)?,
            Route::Clauses => {
                let clauses = self.clauses(plan, schema)?;
                let mut b =
                    StatementBuilder::new(plan.table.clone(), schema).with_conversion(&self.conversion);
                clause::compile(&clauses, &mut b)?;
                b.build()
            }
        };
        tracing::debug!(
            target: "oraorm.sql",
            operation = plan.operation.as_str(),
            table = %plan.table,
            route = ?route,
            binds = stmt.binds.len(),
            "compiled plan"
        );
        Ok((stmt, route))
    }

    fn route(&self, plan: &OperationPlan, schema: Option<&TableSchema>) -> OrmResult<Route> {
        if !plan.captures() {
            return Ok(Route::Clauses);
        }
        match plan.operation {
            Operation::Update | Operation::Delete => Ok(Route::Block),
            Operation::Insert => {
                let conflict =
                    plan_conflict(plan.on_conflict.as_ref(), &plan.columns, &plan.rows, schema)?;
                let single = plan.rows.len() < self.config.bulk_threshold.clamp(1, 2);
                match conflict {
                    ConflictPlan::Insert if single => Ok(Route::Clauses),
                    _ => Ok(Route::Block),
                }
            }
        }
    }

    fn clauses(&self, plan: &OperationPlan, schema: Option<&TableSchema>) -> OrmResult<Vec<Clause>> {
        let mut clauses = Vec::with_capacity(4);
        match plan.operation {
            Operation::Insert => {
                clauses.push(Clause::insert());
                clauses.push(Clause::Values(insert_values(plan, schema)?));
            }
            Operation::Update => {
                let values = plan.rows.first().map(Vec::as_slice).unwrap_or_default();
                let mut assignments: Vec<Assignment> = plan
                    .columns
                    .iter()
                    .zip(values)
                    .map(|(c, v)| Assignment::value(c.name.clone(), v.clone()))
                    .collect();
                assignments.extend(plan.raw_assignments.iter().cloned());
                clauses.push(Clause::update());
                clauses.push(Clause::set(assignments));
                clauses.push(Clause::Where(clause::Where {
                    exprs: plan.conditions.clone(),
                }));
            }
            Operation::Delete => {
                clauses.push(Clause::delete());
                clauses.push(Clause::Where(clause::Where {
                    exprs: plan.conditions.clone(),
                }));
            }
        }
        match &plan.returning {
            Some(Capture::All) => clauses.push(Clause::Returning(Returning::all())),
            Some(Capture::Columns(columns)) => {
                clauses.push(Clause::Returning(Returning::new(columns.iter().cloned())))
            }
            None => {}
        }
        Ok(clauses)
    }

    /// Compile, execute once and bind captured rows into `dest`.
    ///
    /// An UPDATE/DELETE block that trips the row cap surfaces as
    /// [`OrmError::RowCapExceeded`]; other driver errors are passed through.
    pub async fn execute<E, D>(
        &self,
        plan: &OperationPlan,
        schema: Option<&TableSchema>,
        executor: &E,
        dest: &mut D,
    ) -> OrmResult<ExecOutcome>
    where
        E: Executor + ?Sized,
        D: Destination + ?Sized,
    {
        self.run(plan, schema, executor, Some(dest)).await
    }

    /// Compile and execute a plan whose captured values, if any, are not needed.
    pub async fn execute_unbound<E>(
        &self,
        plan: &OperationPlan,
        schema: Option<&TableSchema>,
        executor: &E,
    ) -> OrmResult<u64>
    where
        E: Executor + ?Sized,
    {
        let outcome = self.run(plan, schema, executor, None::<&mut Discard>).await?;
        Ok(outcome.rows_affected)
    }

    async fn run<E, D>(
        &self,
        plan: &OperationPlan,
        schema: Option<&TableSchema>,
        executor: &E,
        dest: Option<&mut D>,
    ) -> OrmResult<ExecOutcome>
    where
        E: Executor + ?Sized,
        D: Destination + ?Sized,
    {
        let (mut stmt, route) = self.compile_routed(plan, schema)?;
        let affected = executor
            .execute(&stmt.sql, &mut stmt.binds)
            .await
            .map_err(|err| self.map_row_cap(plan, err))?;

        let mut outcome = ExecOutcome {
            rows_affected: affected,
            report: BindReport::default(),
        };
        let (Some(dest), Some(capture)) = (dest, plan.returning.as_ref()) else {
            return Ok(outcome);
        };

        let fields = capture_fields(capture, schema);
        let outputs: Vec<&OutSlot> = stmt.outputs().collect();
        outcome.report = dest.bind_rows(&fields, &outputs);
        if route == Route::Block {
            outcome.rows_affected = outcome.report.rows as u64;
        }
        Ok(outcome)
    }

    fn map_row_cap(&self, plan: &OperationPlan, err: OrmError) -> OrmError {
        let code = format!("ORA{ROW_CAP_ERROR}");
        match err {
            OrmError::Execution(message) if message.contains(&code) => {
                tracing::warn!(
                    target: "oraorm.sql",
                    operation = plan.operation.as_str(),
                    cap = self.config.max_returning_rows,
                    "capture exceeded the returning row cap"
                );
                OrmError::RowCapExceeded {
                    cap: self.config.max_returning_rows,
                    kind: plan.operation.as_str(),
                }
            }
            other => other,
        }
    }
}

/// Placeholder destination for [`Engine::execute_unbound`].
struct Discard;

impl Destination for Discard {
    fn bind_rows(&mut self, _columns: &[FieldDescriptor], _outputs: &[&OutSlot]) -> BindReport {
        BindReport::default()
    }
}

/// VALUES for a plain INSERT (or single MERGE) statement.
///
/// Identity columns that are NULL in every row are dropped from a plain
/// INSERT; a MERGE keeps every column so the ON condition can reference it.
fn insert_values(plan: &OperationPlan, schema: Option<&TableSchema>) -> OrmResult<Values> {
    let conflict = plan_conflict(plan.on_conflict.as_ref(), &plan.columns, &plan.rows, schema)?;
    let (kept, on_conflict): (Vec<usize>, _) = match conflict {
        ConflictPlan::Merge(_) => ((0..plan.columns.len()).collect(), plan.on_conflict.clone()),
        ConflictPlan::Insert => (insert_column_indices(&plan.columns, &plan.rows, schema), None),
    };
    Ok(Values {
        columns: kept.iter().map(|&i| plan.columns[i].clone()).collect(),
        rows: plan
            .rows
            .iter()
            .map(|row| kept.iter().map(|&i| row[i].clone()).collect())
            .collect(),
        on_conflict,
    })
}

fn capture_fields(capture: &Capture, schema: Option<&TableSchema>) -> Vec<FieldDescriptor> {
    match capture {
        Capture::All => captured_fields(&[], schema),
        Capture::Columns(columns) => captured_fields(columns, schema),
    }
}

/// Compile a plan with default configuration.
pub fn compile(plan: &OperationPlan, schema: Option<&TableSchema>) -> OrmResult<CompiledStatement> {
    Engine::default().compile(plan, schema)
}
