//! PL/SQL element types for bulk bind arrays.

use crate::schema::{DataType, FieldDescriptor};
use crate::value::Value;

const MAX_VARCHAR2: u32 = 4000;
const MAX_RAW: u32 = 2000;

/// Whether any value of a column is too long for a VARCHAR2/RAW element.
pub(crate) fn needs_lob<'v>(values: impl IntoIterator<Item = &'v Value>, threshold: usize) -> bool {
    values.into_iter().any(|v| v.lob_len() > threshold)
}

/// Element type of the bulk array for one written column.
///
/// `column_type` is the `%TYPE` anchor used when nothing is known about the
/// column. Oversized values widen text to CLOB and binary to BLOB.
pub(crate) fn element_type(field: Option<&FieldDescriptor>, column_type: &str, widen: bool) -> String {
    let Some(field) = field else {
        return if widen {
            "CLOB".to_string()
        } else {
            column_type.to_string()
        };
    };

    match field.data_type {
        DataType::Bytes => {
            if widen {
                "BLOB".to_string()
            } else {
                format!("RAW({})", field.size.unwrap_or(MAX_RAW).min(MAX_RAW))
            }
        }
        DataType::Json if field.json_binary => "BLOB".to_string(),
        DataType::Json => "CLOB".to_string(),
        DataType::String | DataType::Unknown if widen => "CLOB".to_string(),
        DataType::String => match field.size {
            Some(size) if size <= MAX_VARCHAR2 => format!("VARCHAR2({size} CHAR)"),
            _ => format!("VARCHAR2({MAX_VARCHAR2})"),
        },
        DataType::Unknown => column_type.to_string(),
        DataType::Bool => "NUMBER(1)".to_string(),
        DataType::Int { .. } | DataType::Uint { .. } => match (field.precision, field.scale) {
            (Some(p), Some(s)) if s > 0 => format!("NUMBER({p},{s})"),
            (Some(p), _) => format!("NUMBER({p})"),
            _ => "NUMBER".to_string(),
        },
        DataType::Float { bits: 32 } => "BINARY_FLOAT".to_string(),
        DataType::Float { .. } => "BINARY_DOUBLE".to_string(),
        DataType::Time => "TIMESTAMP".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_types() {
        let anchor = r#""T"."c"%TYPE"#;
        let string = FieldDescriptor::new("c", DataType::String);
        assert_eq!(element_type(Some(&string), anchor, false), "VARCHAR2(4000)");
        assert_eq!(element_type(Some(&string.clone().size(64)), anchor, false), "VARCHAR2(64 CHAR)");
        assert_eq!(element_type(Some(&string), anchor, true), "CLOB");

        let number = FieldDescriptor::new("c", DataType::I64).precision(10, 2);
        assert_eq!(element_type(Some(&number), anchor, false), "NUMBER(10,2)");
        assert_eq!(
            element_type(Some(&FieldDescriptor::new("c", DataType::Time)), anchor, false),
            "TIMESTAMP"
        );
        let blob = FieldDescriptor::new("c", DataType::Bytes);
        assert_eq!(element_type(Some(&blob), anchor, false), "RAW(2000)");
        assert_eq!(element_type(Some(&blob), anchor, true), "BLOB");
        assert_eq!(element_type(None, anchor, false), anchor);
    }

    #[test]
    fn lob_threshold() {
        let short = Value::from("x".repeat(4000));
        let long = Value::from("y".repeat(4001));
        assert!(!needs_lob([&short], 4000));
        assert!(needs_lob([&short, &long], 4000));
    }
}
