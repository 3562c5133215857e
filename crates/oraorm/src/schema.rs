//! Table metadata consumed by the synthesizer and the result binder.
//!
//! The engine never discovers schema itself: callers register [`TableSchema`]
//! values (usually produced by their own model layer) and pass them in. All
//! metadata is read-only while a statement is compiled or bound.

use crate::ident::same_name;
use std::collections::HashMap;

/// Host type category of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Bool,
    /// Signed integer of the given bit width (8, 16, 32 or 64).
    Int { bits: u8 },
    /// Unsigned integer of the given bit width (8, 16, 32 or 64).
    Uint { bits: u8 },
    /// Floating point of the given bit width (32 or 64).
    Float { bits: u8 },
    String,
    Time,
    Bytes,
    Json,
    /// A type the engine has no dedicated mapping for.
    Unknown,
}

impl DataType {
    pub const I64: DataType = DataType::Int { bits: 64 };
    pub const I32: DataType = DataType::Int { bits: 32 };
    pub const F64: DataType = DataType::Float { bits: 64 };

    /// Whether values of this type are numeric on the wire.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::Bool | DataType::Int { .. } | DataType::Uint { .. } | DataType::Float { .. }
        )
    }
}

/// Per-column metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Host field name (the key used on destination records).
    pub name: String,
    /// Database column name.
    pub db_name: String,
    pub data_type: DataType,
    /// Declared size (characters for text, bytes for binary).
    pub size: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub auto_increment: bool,
    pub unique: bool,
    pub primary_key: bool,
    /// Column has a database-side default.
    pub has_default: bool,
    /// Column may be written on INSERT.
    pub creatable: bool,
    /// Column may be written on UPDATE.
    pub updatable: bool,
    /// JSON payload stored in a binary column (BLOB / OSON) instead of text.
    pub json_binary: bool,
}

impl FieldDescriptor {
    /// Create a descriptor whose host field name equals its column name.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        Self {
            db_name: name.clone(),
            name,
            data_type,
            size: None,
            precision: None,
            scale: None,
            nullable: false,
            auto_increment: false,
            unique: false,
            primary_key: false,
            has_default: false,
            creatable: true,
            updatable: true,
            json_binary: false,
        }
    }

    /// Override the host field name.
    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark as primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as identity / sequence generated.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.has_default = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Mark as read-only (never written by INSERT or UPDATE).
    pub fn read_only(mut self) -> Self {
        self.creatable = false;
        self.updatable = false;
        self
    }

    pub fn json_binary(mut self) -> Self {
        self.json_binary = true;
        self
    }

    /// Whether this column may be the target of a MERGE update branch.
    pub(crate) fn is_merge_updatable(&self) -> bool {
        self.updatable && !self.primary_key && !self.auto_increment
    }
}

/// Metadata for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    /// Owning schema (user), if the table is not in the session's default schema.
    pub owner: Option<String>,
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl TableSchema {
    /// Create a new, empty table schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            owner: None,
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Set the owning schema.
    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Add a column.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Qualified table name (`owner.name` or `name`).
    pub fn qualified_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{owner}.{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Ordered database column names.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.db_name.as_str())
    }

    /// Look up a column by database name (case-insensitive).
    pub fn lookup(&self, db_name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| same_name(&f.db_name, db_name))
    }

    /// Look up a column by host field name.
    pub fn lookup_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Primary key columns in declaration order.
    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.primary_key)
    }

    /// Unique (non primary key) columns.
    pub fn unique_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.unique && !f.primary_key)
    }

    /// The identity column, if any.
    pub fn auto_increment_field(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.auto_increment)
    }
}

/// Registry of table schemas, keyed by lower-cased table name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: HashMap<String, TableSchema>,
}

impl SchemaRegistry {
    /// Create a new empty schema registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table schema.
    pub fn register(&mut self, table: TableSchema) {
        self.tables.insert(table.name.to_lowercase(), table);
    }

    /// Get a table by name.
    pub fn get(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(&crate::ident::unquote(name).to_lowercase())
    }

    /// Get the number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableSchema {
        TableSchema::new("users")
            .field(FieldDescriptor::new("id", DataType::I64).primary_key().auto_increment())
            .field(FieldDescriptor::new("email", DataType::String).size(255).unique())
            .field(FieldDescriptor::new("name", DataType::String).nullable())
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let t = users();
        assert_eq!(t.lookup("EMAIL").map(|f| f.name.as_str()), Some("email"));
        assert_eq!(t.lookup(r#""id""#).map(|f| f.name.as_str()), Some("id"));
        assert!(t.lookup("missing").is_none());
    }

    #[test]
    fn key_sets() {
        let t = users();
        let pks: Vec<_> = t.primary_keys().map(|f| f.db_name.as_str()).collect();
        assert_eq!(pks, vec!["id"]);
        let uniques: Vec<_> = t.unique_fields().map(|f| f.db_name.as_str()).collect();
        assert_eq!(uniques, vec!["email"]);
        assert_eq!(t.auto_increment_field().map(|f| f.db_name.as_str()), Some("id"));
    }

    #[test]
    fn registry_lookup() {
        let mut reg = SchemaRegistry::new();
        reg.register(users().owner("hr"));
        assert_eq!(reg.len(), 1);
        let t = reg.get("USERS").unwrap();
        assert_eq!(t.qualified_name(), "hr.users");
    }
}
