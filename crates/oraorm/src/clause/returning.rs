use crate::plan::Column;
use crate::schema::{DataType, FieldDescriptor, TableSchema};
use crate::statement::StatementBuilder;
use crate::value::allocate_destination;

/// `RETURNING cols INTO :n, ...`; no columns returns every known column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Returning {
    pub columns: Vec<Column>,
}

impl Returning {
    pub fn new<C: Into<Column>>(columns: impl IntoIterator<Item = C>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Return every column of the table.
    pub fn all() -> Self {
        Self::default()
    }
}

/// Descriptors of the captured columns, in capture order.
///
/// An empty request captures every schema column. Columns missing from the
/// schema get an untyped descriptor and are captured as text.
pub(crate) fn captured_fields(
    columns: &[Column],
    schema: Option<&TableSchema>,
) -> Vec<FieldDescriptor> {
    if columns.is_empty() {
        return schema.map(|s| s.fields.clone()).unwrap_or_default();
    }
    columns
        .iter()
        .map(|column| {
            schema
                .and_then(|s| s.lookup(&column.name))
                .cloned()
                .unwrap_or_else(|| FieldDescriptor::new(column.name.clone(), DataType::Unknown).nullable())
        })
        .collect()
}

pub(super) fn build(returning: &Returning, b: &mut StatementBuilder<'_>) {
    let fields = captured_fields(&returning.columns, b.schema());
    if fields.is_empty() {
        return;
    }
    b.push("RETURNING ");
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_ident(&field.db_name);
    }
    b.push(" INTO ");
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_out(allocate_destination(field));
    }
}
