//! Result binder: write captured output slots back into destinations.
//!
//! Output slots are laid out row-major: `slot[row * columns + column]`. When
//! binding into a vector, a row is considered real when at least one of its
//! converted values is non-zero; padding rows allocated for an unknown
//! affected-row count stay at their zero values and are dropped. A single
//! record always receives row 0, so legitimately zero values are stored.
//!
//! Conversion failures never abort binding. Each failing field is recorded in
//! the returned [`BindReport`] and logged under the `oraorm.bind` target.

use crate::error::{OrmError, OrmResult};
use crate::schema::FieldDescriptor;
use crate::value::{OutSlot, Value, to_host};
use std::collections::HashMap;

/// Field access on one destination record.
pub trait Record {
    /// Current value of a field, if the record has it.
    fn get(&self, field: &str) -> Option<Value>;

    /// Store a value into a field.
    fn set(&mut self, field: &str, value: Value) -> OrmResult<()>;
}

impl Record for HashMap<String, Value> {
    fn get(&self, field: &str) -> Option<Value> {
        HashMap::get(self, field).cloned()
    }

    fn set(&mut self, field: &str, value: Value) -> OrmResult<()> {
        self.insert(field.to_string(), value);
        Ok(())
    }
}

/// Outcome of one binding pass.
#[derive(Debug, Default)]
pub struct BindReport {
    /// Number of real rows written into the destination.
    pub rows: usize,
    /// Per-field conversion failures.
    pub failures: Vec<OrmError>,
}

impl BindReport {
    /// Whether every field was stored.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record_failure(&mut self, row: usize, field: &str, err: OrmError) {
        tracing::warn!(target: "oraorm.bind", row, field, error = %err, "failed to bind captured value");
        let err = match err {
            OrmError::Conversion { .. } => err,
            other => OrmError::conversion(field, other.to_string()),
        };
        self.failures.push(err);
    }
}

/// A place captured rows can be written to.
pub trait Destination {
    /// Populate from row-major output slots of `columns`.
    fn bind_rows(&mut self, columns: &[FieldDescriptor], outputs: &[&OutSlot]) -> BindReport;
}

impl<R: Record> Destination for R {
    fn bind_rows(&mut self, columns: &[FieldDescriptor], outputs: &[&OutSlot]) -> BindReport {
        bind_one(self, columns, outputs)
    }
}

impl<R: Record + Default> Destination for Vec<R> {
    fn bind_rows(&mut self, columns: &[FieldDescriptor], outputs: &[&OutSlot]) -> BindReport {
        bind_many(self, columns, outputs)
    }
}

fn convert_row(columns: &[FieldDescriptor], slots: &[&OutSlot]) -> (Vec<Value>, bool) {
    let values: Vec<Value> = columns
        .iter()
        .zip(slots)
        .map(|(field, slot)| to_host(&slot.value, field))
        .collect();
    let real = values.iter().any(|v| !v.is_zero());
    (values, real)
}

fn store<R: Record + ?Sized>(
    record: &mut R,
    row: usize,
    columns: &[FieldDescriptor],
    values: Vec<Value>,
    report: &mut BindReport,
) {
    for (field, value) in columns.iter().zip(values) {
        if let Err(err) = record.set(&field.name, value) {
            report.record_failure(row, &field.name, err);
        }
    }
}

/// Bind the first captured row into a single record.
///
/// Row 0 is stored even when every value is zero; the record is left alone
/// only when there are fewer output slots than columns.
pub fn bind_one<R: Record + ?Sized>(
    record: &mut R,
    columns: &[FieldDescriptor],
    outputs: &[&OutSlot],
) -> BindReport {
    let mut report = BindReport::default();
    if columns.is_empty() || outputs.len() < columns.len() {
        return report;
    }
    let (values, real) = convert_row(columns, &outputs[..columns.len()]);
    if !real {
        tracing::debug!(target: "oraorm.bind", "captured row holds only zero values");
    }
    store(record, 0, columns, values, &mut report);
    report.rows = 1;
    report
}

/// Bind every real captured row into a vector of records.
///
/// Row `i` updates `records[i]` in place when it exists; rows beyond the end
/// are appended as fresh records.
pub fn bind_many<R: Record + Default>(
    records: &mut Vec<R>,
    columns: &[FieldDescriptor],
    outputs: &[&OutSlot],
) -> BindReport {
    let mut report = BindReport::default();
    if columns.is_empty() {
        return report;
    }
    let candidates = outputs.len() / columns.len();

    for (row, slots) in outputs.chunks_exact(columns.len()).enumerate() {
        let (values, real) = convert_row(columns, slots);
        if !real {
            continue;
        }
        match records.get_mut(row) {
            Some(record) => store(record, row, columns, values, &mut report),
            None => {
                let mut record = R::default();
                store(&mut record, row, columns, values, &mut report);
                records.push(record);
            }
        }
        report.rows += 1;
    }

    tracing::debug!(
        target: "oraorm.bind",
        candidates,
        rows = report.rows,
        failures = report.failures.len(),
        "bound captured rows"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DataType;
    use crate::value::{WireKind, WireValue};

    fn columns() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", DataType::I64),
            FieldDescriptor::new("name", DataType::String).nullable(),
        ]
    }

    fn slots(rows: usize, filled: usize) -> Vec<OutSlot> {
        let mut out = Vec::new();
        for row in 0..rows {
            let mut id = OutSlot::new(WireKind::Int64);
            let mut name = OutSlot::new(WireKind::NullText);
            if row < filled {
                id.fill(WireValue::Int64(row as i64 + 1));
                name.fill(WireValue::NullText(Some(format!("n{row}"))));
            }
            out.push(id);
            out.push(name);
        }
        out
    }

    #[derive(Debug, Default)]
    struct User {
        id: i64,
        name: Option<String>,
    }

    impl Record for User {
        fn get(&self, field: &str) -> Option<Value> {
            match field {
                "id" => Some(Value::I64(self.id)),
                "name" => Some(self.name.clone().into()),
                _ => None,
            }
        }

        fn set(&mut self, field: &str, value: Value) -> OrmResult<()> {
            match (field, value) {
                ("id", Value::I64(v)) => self.id = v,
                ("name", Value::String(v)) => self.name = Some(v),
                ("name", Value::Null) => self.name = None,
                (field, other) => {
                    return Err(OrmError::conversion(field, format!("unexpected {other:?}")));
                }
            }
            Ok(())
        }
    }

    #[test]
    fn padding_rows_are_trimmed() {
        let out = slots(100, 3);
        let refs: Vec<&OutSlot> = out.iter().collect();
        let mut rows: Vec<HashMap<String, Value>> = Vec::new();
        let report = rows.bind_rows(&columns(), &refs);
        assert_eq!(report.rows, 3);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].get("id"), Some(&Value::I64(3)));
        assert_eq!(rows[0].get("name"), Some(&Value::String("n0".into())));
    }

    #[test]
    fn existing_entries_are_updated_in_place() {
        let out = slots(4, 2);
        let refs: Vec<&OutSlot> = out.iter().collect();
        let mut users = vec![User {
            id: 0,
            name: Some("keep".into()),
        }];
        let report = users.bind_rows(&columns(), &refs);
        assert!(report.is_clean());
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, 1);
        assert_eq!(users[0].name.as_deref(), Some("n0"));
        assert_eq!(users[1].id, 2);
    }

    #[test]
    fn single_record_uses_first_row() {
        let out = slots(1, 1);
        let refs: Vec<&OutSlot> = out.iter().collect();
        let mut user = User::default();
        let report = user.bind_rows(&columns(), &refs);
        assert_eq!(report.rows, 1);
        assert_eq!(user.id, 1);

        let out = slots(1, 0);
        let refs: Vec<&OutSlot> = out.iter().collect();
        let mut user = User {
            id: 42,
            name: Some("old".into()),
        };
        let report = user.bind_rows(&columns(), &refs);
        assert_eq!(report.rows, 1);
        assert_eq!(user.id, 0);
        assert_eq!(user.name, None);

        let mut user = User {
            id: 42,
            name: None,
        };
        let report = user.bind_rows(&columns(), &[]);
        assert_eq!(report.rows, 0);
        assert_eq!(user.id, 42);
    }

    #[test]
    fn zero_values_reach_a_single_record() {
        let qty = vec![FieldDescriptor::new("qty", DataType::I64)];
        let mut slot = OutSlot::new(WireKind::Int64);
        slot.fill(WireValue::Int64(0));
        let mut record: HashMap<String, Value> = HashMap::new();
        record.insert("qty".into(), Value::I64(5));

        let report = record.bind_rows(&qty, &[&slot]);
        assert!(report.is_clean());
        assert_eq!(report.rows, 1);
        assert_eq!(record.get("qty"), Some(&Value::I64(0)));
    }

    #[test]
    fn entries_beyond_captured_rows_are_kept() {
        let out = slots(3, 1);
        let refs: Vec<&OutSlot> = out.iter().collect();
        let mut users = vec![
            User { id: 10, name: Some("a".into()) },
            User { id: 20, name: Some("b".into()) },
            User { id: 30, name: None },
        ];
        let report = users.bind_rows(&columns(), &refs);
        assert_eq!(report.rows, 1);
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].id, 1);
        assert_eq!(users[0].name.as_deref(), Some("n0"));
        assert_eq!(users[1].id, 20);
        assert_eq!(users[1].name.as_deref(), Some("b"));
        assert_eq!(users[2].id, 30);
        assert_eq!(users[2].name, None);
    }

    #[test]
    fn conversion_failures_do_not_abort() {
        let cols = vec![
            FieldDescriptor::new("id", DataType::I64),
            FieldDescriptor::new("bogus", DataType::String),
            FieldDescriptor::new("name", DataType::String).nullable(),
        ];
        let mut id = OutSlot::new(WireKind::Int64);
        id.fill(WireValue::Int64(7));
        let mut bogus = OutSlot::new(WireKind::Text);
        bogus.fill(WireValue::Text("x".into()));
        let mut name = OutSlot::new(WireKind::NullText);
        name.fill(WireValue::NullText(Some("ok".into())));
        let refs = vec![&id, &bogus, &name];

        let mut user = User::default();
        let report = user.bind_rows(&cols, &refs);
        assert_eq!(user.id, 7);
        assert_eq!(user.name.as_deref(), Some("ok"));
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].is_conversion());
        assert!(report.failures[0].to_string().contains("bogus"));
    }
}
