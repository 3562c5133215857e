//! End-to-end tests: plan → compile → mock driver → bind.
//!
//! `MockDriver` stands in for the Oracle driver: it records every statement
//! and fills output slots in positional order from a script of values.

use oraorm::{
    BindSlot, DataType, Engine, EngineConfig, Executor, Expr, FieldDescriptor, OnConflict,
    OperationPlan, OrmError, OrmResult, Record, RowCapPolicy, TableSchema, TracingExecutor, Value,
    WireValue,
};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct MockDriver {
    outputs: Vec<WireValue>,
    rows: u64,
    error: Option<String>,
    seen: Mutex<Vec<(String, usize, usize)>>,
}

impl MockDriver {
    fn returning(outputs: Vec<WireValue>, rows: u64) -> Self {
        Self {
            outputs,
            rows,
            ..Self::default()
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    fn last_sql(&self) -> String {
        self.seen
            .lock()
            .unwrap()
            .last()
            .map(|(sql, _, _)| sql.clone())
            .unwrap_or_default()
    }

    fn last_counts(&self) -> (usize, usize) {
        self.seen
            .lock()
            .unwrap()
            .last()
            .map(|(_, i, o)| (*i, *o))
            .unwrap_or_default()
    }
}

impl Executor for MockDriver {
    async fn execute(&self, sql: &str, binds: &mut [BindSlot]) -> OrmResult<u64> {
        let outputs = binds.iter().filter(|b| b.is_output()).count();
        self.seen
            .lock()
            .unwrap()
            .push((sql.to_string(), binds.len() - outputs, outputs));
        if let Some(message) = &self.error {
            return Err(OrmError::execution(message.clone()));
        }
        let mut script = self.outputs.iter();
        for bind in binds.iter_mut() {
            if let BindSlot::Out(slot) = bind {
                match script.next() {
                    Some(value) => slot.fill(value.clone()),
                    None => break,
                }
            }
        }
        Ok(self.rows)
    }
}

fn table_t() -> TableSchema {
    TableSchema::new("T")
        .field(FieldDescriptor::new("id", DataType::I64).primary_key().auto_increment())
        .field(FieldDescriptor::new("name", DataType::String))
}

fn accounts() -> TableSchema {
    TableSchema::new("accounts")
        .field(FieldDescriptor::new("id", DataType::I64).primary_key())
        .field(FieldDescriptor::new("email", DataType::String).unique())
        .field(FieldDescriptor::new("balance", DataType::F64))
        .field(FieldDescriptor::new("deleted_at", DataType::Time).nullable())
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Row {
    id: i64,
    name: String,
}

impl Record for Row {
    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::I64(self.id)),
            "name" => Some(Value::String(self.name.clone())),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) -> OrmResult<()> {
        match (field, value) {
            ("id", Value::I64(id)) => self.id = id,
            ("name", Value::String(name)) => self.name = name,
            (field, other) => {
                return Err(OrmError::conversion(field, format!("cannot store {other:?}")));
            }
        }
        Ok(())
    }
}

#[tokio::test]
async fn bulk_insert_populates_generated_ids() {
    let schema = table_t();
    let plan = OperationPlan::insert("T")
        .columns(["id", "name"])
        .row([Value::Null, Value::from("a")])
        .row([Value::Null, Value::from("b")])
        .returning(["id", "name"]);
    let driver = MockDriver::returning(
        vec![
            WireValue::Int64(101),
            WireValue::Text("a".into()),
            WireValue::Int64(102),
            WireValue::Text("b".into()),
        ],
        1,
    );

    let mut rows: Vec<Row> = Vec::new();
    let outcome = Engine::default()
        .execute(&plan, Some(&schema), &driver, &mut rows)
        .await
        .unwrap();

    assert_eq!(driver.last_counts(), (2, 4));
    let sql = driver.last_sql();
    assert!(sql.contains("l_col_0_array := t_col_0_array(:1, :2);"));
    assert!(sql.contains("RETURNING \"id\", \"name\" BULK COLLECT INTO l_affected_records;"));
    assert_eq!(
        rows,
        vec![
            Row { id: 101, name: "a".into() },
            Row { id: 102, name: "b".into() },
        ]
    );
    assert_eq!(outcome.rows_affected, 2);
    assert!(outcome.report.is_clean());
}

#[tokio::test]
async fn single_insert_binds_into_record() {
    let schema = table_t();
    let plan = OperationPlan::insert("T")
        .columns(["id", "name"])
        .row([Value::Null, Value::from("solo")])
        .returning(["id"]);
    let driver = MockDriver::returning(vec![WireValue::Int64(7)], 1);

    let mut row = Row {
        id: 0,
        name: "solo".into(),
    };
    let outcome = Engine::default()
        .execute(&plan, Some(&schema), &driver, &mut row)
        .await
        .unwrap();

    assert_eq!(
        driver.last_sql(),
        r#"INSERT INTO "T" ("name") VALUES (:1) RETURNING "id" INTO :2"#
    );
    assert_eq!(row.id, 7);
    assert_eq!(outcome.rows_affected, 1);
}

#[tokio::test]
async fn update_capture_trims_padding_rows() {
    let schema = accounts();
    let plan = OperationPlan::update("accounts")
        .set("balance", 0.0f64)
        .filter(Expr::lt("balance", 0.0f64))
        .returning(["id", "email"]);
    let driver = MockDriver::returning(
        vec![
            WireValue::Int64(1),
            WireValue::Text("a@x".into()),
            WireValue::Int64(2),
            WireValue::Text("b@x".into()),
            WireValue::Int64(3),
            WireValue::Text("c@x".into()),
        ],
        1,
    );

    let mut rows: Vec<HashMap<String, Value>> = Vec::new();
    let outcome = Engine::default()
        .execute(&plan, Some(&schema), &driver, &mut rows)
        .await
        .unwrap();

    assert_eq!(driver.last_counts(), (2, 200));
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].get("email"), Some(&Value::String("c@x".into())));
    assert_eq!(outcome.rows_affected, 3);
}

#[tokio::test]
async fn row_cap_error_surfaces_typed() {
    let schema = accounts();
    let plan = OperationPlan::delete("accounts")
        .filter(Expr::is_not_null("deleted_at"))
        .filter(Expr::lt("balance", 0.0f64))
        .returning_all();
    let driver = MockDriver::failing(
        "ORA-20001: DELETE affected 250 rows; at most 100 can be returned\nORA-06512: at line 12",
    );

    let mut rows: Vec<HashMap<String, Value>> = Vec::new();
    let err = Engine::default()
        .execute(&plan, Some(&schema), &driver, &mut rows)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::RowCapExceeded { cap: 100, kind: "DELETE" }));
    assert!(rows.is_empty());

    let engine = Engine::new(EngineConfig::new().with_row_cap_policy(RowCapPolicy::Truncate));
    let stmt = engine.compile(&plan, Some(&schema)).unwrap();
    assert!(!stmt.sql.contains("RAISE_APPLICATION_ERROR"));
}

#[tokio::test]
async fn unguarded_delete_never_reaches_driver() {
    let schema = accounts();
    let plan = OperationPlan::delete("accounts").filter(Expr::is_null("deleted_at"));
    let driver = MockDriver::default();

    let err = Engine::default()
        .execute_unbound(&plan, Some(&schema), &driver)
        .await
        .unwrap_err();
    assert!(err.is_missing_where());
    assert!(driver.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn conflict_columns_must_be_written() {
    let schema = accounts();
    let plan = OperationPlan::insert("accounts")
        .columns(["id", "balance"])
        .row([Value::I64(1), Value::F64(10.0)])
        .on_conflict(OnConflict::columns(["email"]).update_excluded(["balance"]));
    let driver = MockDriver::default();

    let err = Engine::default()
        .execute_unbound(&plan, Some(&schema), &driver)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "conflict columns not present in values: missing [email], available [id, balance]"
    );
    assert!(err.is_pre_execution());
}

#[tokio::test]
async fn upsert_defaults_to_primary_key() {
    let schema = accounts();
    let plan = OperationPlan::insert("accounts")
        .columns(["id", "email", "balance"])
        .row([Value::I64(1), Value::from("a@x"), Value::F64(1.5)])
        .row([Value::I64(2), Value::from("b@x"), Value::F64(2.5)])
        .on_conflict(OnConflict::default().update_excluded(["balance"]));
    let driver = MockDriver::returning(Vec::new(), 2);

    let rows = Engine::default()
        .execute_unbound(&plan, Some(&schema), &driver)
        .await
        .unwrap();
    assert_eq!(rows, 2);
    let sql = driver.last_sql();
    assert!(sql.starts_with(r#"MERGE INTO "accounts" t USING (SELECT :1 AS "id", :2 AS "email", :3 AS "balance" FROM DUAL UNION ALL SELECT :4 AS "id", :5 AS "email", :6 AS "balance" FROM DUAL) s"#), "{sql}");
    assert!(sql.contains(r#"ON (t."id" = s."id")"#));
    assert!(sql.contains(r#"WHEN MATCHED THEN UPDATE SET t."balance" = s."balance""#));
}

#[tokio::test]
async fn merge_capture_reports_current_rows() {
    let schema = accounts();
    let plan = OperationPlan::insert("accounts")
        .columns(["id", "email", "balance"])
        .row([Value::I64(1), Value::from("a@x"), Value::F64(1.5)])
        .on_conflict(OnConflict::primary_key().do_nothing())
        .returning(["id", "balance"]);
    let driver = MockDriver::returning(vec![WireValue::Int64(1), WireValue::Float64(99.0)], 1);

    let mut row: HashMap<String, Value> = HashMap::new();
    let outcome = Engine::default()
        .execute(&plan, Some(&schema), &driver, &mut row)
        .await
        .unwrap();
    assert!(driver.last_sql().contains("WHEN NO_DATA_FOUND THEN NULL;"));
    assert_eq!(row.get("balance"), Some(&Value::F64(99.0)));
    assert_eq!(outcome.report.rows, 1);
}

#[tokio::test]
async fn upsert_capture_with_generated_ids_inserts() {
    let schema = table_t();
    let plan = OperationPlan::insert("T")
        .columns(["id", "name"])
        .row([Value::Null, Value::from("a")])
        .row([Value::Null, Value::from("b")])
        .on_conflict(OnConflict::primary_key().update_all())
        .returning(["id", "name"]);
    let driver = MockDriver::returning(
        vec![
            WireValue::Int64(7),
            WireValue::Text("a".into()),
            WireValue::Int64(8),
            WireValue::Text("b".into()),
        ],
        2,
    );

    let mut rows: Vec<Row> = Vec::new();
    let outcome = Engine::default()
        .execute(&plan, Some(&schema), &driver, &mut rows)
        .await
        .unwrap();
    let sql = driver.last_sql();
    assert!(!sql.contains("MERGE"), "{sql}");
    assert!(sql.contains(r#"INSERT INTO "T" ("name") VALUES (l_col_0_array(i))"#));
    assert_eq!(outcome.report.rows, 2);
    assert_eq!(rows.iter().map(|r| r.id).collect::<Vec<_>>(), vec![7, 8]);
}

#[tokio::test]
async fn upsert_on_plain_column_is_rejected() {
    let schema = accounts();
    let plan = OperationPlan::insert("accounts")
        .columns(["id", "email", "balance"])
        .row([Value::I64(1), Value::from("a@x"), Value::F64(1.0)])
        .on_conflict(OnConflict::columns(["balance"]).update_excluded(["email"]));
    let driver = MockDriver::returning(Vec::new(), 1);

    let err = Engine::default()
        .execute_unbound(&plan, Some(&schema), &driver)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)), "{err:?}");
    assert!(driver.last_sql().is_empty());
}

#[tokio::test]
async fn conversion_failures_are_reported_not_raised() {
    let schema = table_t().field(FieldDescriptor::new("extra", DataType::String).nullable());
    let plan = OperationPlan::insert("T")
        .columns(["name"])
        .row(["a"])
        .returning(["id", "extra"]);
    let driver =
        MockDriver::returning(vec![WireValue::Int64(5), WireValue::NullText(Some("x".into()))], 1);

    let mut row = Row::default();
    let outcome = Engine::default()
        .execute(&plan, Some(&schema), &driver, &mut row)
        .await
        .unwrap();
    assert_eq!(row.id, 5);
    assert_eq!(outcome.report.failures.len(), 1);
    assert!(outcome.report.failures[0].is_conversion());
}

#[tokio::test]
async fn tracing_executor_wraps_driver() {
    let schema = table_t();
    let plan = OperationPlan::delete("T").filter(Expr::eq("id", 1i64));
    let driver = TracingExecutor::new(MockDriver::returning(Vec::new(), 1)).max_sql_length(16);

    let rows = Engine::default()
        .execute_unbound(&plan, Some(&schema), &driver)
        .await
        .unwrap();
    assert_eq!(rows, 1);
    assert_eq!(driver.inner().last_sql(), r#"DELETE FROM "T" WHERE "id" = :1"#);
}

#[tokio::test]
async fn driver_errors_pass_through() {
    let schema = table_t();
    let plan = OperationPlan::insert("T").columns(["name"]).row(["a"]);
    let driver = MockDriver::failing("ORA-00001: unique constraint (APP.T_NAME_UK) violated");

    let err = Engine::default()
        .execute_unbound(&plan, Some(&schema), &driver)
        .await
        .unwrap_err();
    assert!(matches!(err, OrmError::Execution(ref m) if m.starts_with("ORA-00001")));
    assert!(!err.is_pre_execution());
}
