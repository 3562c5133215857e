//! Statement context, bind slots and compiled statements.
//!
//! [`StatementBuilder`] stores SQL text and bind slots side by side and writes
//! Oracle positional placeholders (`:1`, `:2`, ...) in bind order, so the text
//! and the slot list can never drift apart.

use crate::ident::quote_to;
use crate::schema::{FieldDescriptor, TableSchema};
use crate::value::{ConversionContext, OutSlot, Value, WireValue, to_wire_for, to_wire_with};
use std::borrow::Cow;

/// One positional parameter of a compiled statement.
#[derive(Debug, Clone, PartialEq)]
pub enum BindSlot {
    /// A value sent to the database.
    In(WireValue),
    /// A destination the driver populates during execution.
    Out(OutSlot),
}

impl BindSlot {
    pub fn is_output(&self) -> bool {
        matches!(self, BindSlot::Out(_))
    }
}

/// Compiled SQL text plus its ordered bind slots.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStatement {
    pub sql: String,
    pub binds: Vec<BindSlot>,
}

impl CompiledStatement {
    /// Number of input slots.
    pub fn input_count(&self) -> usize {
        self.binds.iter().filter(|b| !b.is_output()).count()
    }

    /// Number of output slots.
    pub fn output_count(&self) -> usize {
        self.binds.iter().filter(|b| b.is_output()).count()
    }

    /// Output slots in positional order.
    pub fn outputs(&self) -> impl Iterator<Item = &OutSlot> {
        self.binds.iter().filter_map(|b| match b {
            BindSlot::Out(slot) => Some(slot),
            BindSlot::In(_) => None,
        })
    }

    /// Mutable output slots in positional order.
    pub fn outputs_mut(&mut self) -> impl Iterator<Item = &mut OutSlot> {
        self.binds.iter_mut().filter_map(|b| match b {
            BindSlot::Out(slot) => Some(slot),
            BindSlot::In(_) => None,
        })
    }
}

/// Live statement context: target table, optional schema, text and binds.
#[must_use]
#[derive(Debug, Clone)]
pub struct StatementBuilder<'s> {
    table: String,
    schema: Option<&'s TableSchema>,
    sql: String,
    binds: Vec<BindSlot>,
    has_order_by: bool,
    conversion: Cow<'s, ConversionContext>,
}

impl<'s> StatementBuilder<'s> {
    /// Create a builder for statements against `table`.
    pub fn new(table: impl Into<String>, schema: Option<&'s TableSchema>) -> Self {
        Self {
            table: table.into(),
            schema,
            sql: String::new(),
            binds: Vec::new(),
            has_order_by: false,
            conversion: Cow::Owned(ConversionContext::default()),
        }
    }

    /// Use `ctx` for host-to-wire conversions instead of the default context.
    pub fn with_conversion(mut self, ctx: &'s ConversionContext) -> Self {
        self.conversion = Cow::Borrowed(ctx);
        self
    }

    /// Create a builder whose table name comes from the schema.
    pub fn for_schema(schema: &'s TableSchema) -> Self {
        Self::new(schema.qualified_name(), Some(schema))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> Option<&'s TableSchema> {
        self.schema
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub(crate) fn conversion(&self) -> &ConversionContext {
        &self.conversion
    }

    pub fn bind_count(&self) -> usize {
        self.binds.len()
    }

    pub(crate) fn has_order_by(&self) -> bool {
        self.has_order_by
    }

    pub(crate) fn mark_order_by(&mut self) {
        self.has_order_by = true;
    }

    pub(crate) fn sql_len(&self) -> usize {
        self.sql.len()
    }

    /// Drop text written after `len`. Only valid while no bind was added past it.
    pub(crate) fn truncate_sql(&mut self, len: usize) {
        self.sql.truncate(len);
    }

    /// Append raw SQL.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    pub(crate) fn push_char(&mut self, ch: char) -> &mut Self {
        self.sql.push(ch);
        self
    }

    /// Append a quoted identifier.
    pub fn push_ident(&mut self, name: &str) -> &mut Self {
        quote_to(&mut self.sql, name);
        self
    }

    /// Append the quoted target table name.
    pub fn push_table(&mut self) -> &mut Self {
        quote_to(&mut self.sql, &self.table);
        self
    }

    /// Append a placeholder bound to an input value; returns its 1-based position.
    pub fn push_bind(&mut self, value: WireValue) -> usize {
        self.binds.push(BindSlot::In(value));
        let idx = self.binds.len();
        self.write_placeholder(idx);
        idx
    }

    /// Convert a host value and bind it.
    pub fn push_value(&mut self, value: &Value) -> usize {
        let wire = to_wire_with(value, self.conversion());
        self.push_bind(wire)
    }

    /// Convert a host value for a known column and bind it.
    pub fn push_value_for(&mut self, value: &Value, field: Option<&FieldDescriptor>) -> usize {
        match field {
            Some(field) => {
                let wire = to_wire_for(value, field, self.conversion());
                self.push_bind(wire)
            }
            None => self.push_value(value),
        }
    }

    /// Append a placeholder bound to an output slot; returns its 1-based position.
    pub fn push_out(&mut self, slot: OutSlot) -> usize {
        self.binds.push(BindSlot::Out(slot));
        let idx = self.binds.len();
        self.write_placeholder(idx);
        idx
    }

    fn write_placeholder(&mut self, idx: usize) {
        self.sql.push(':');
        self.sql.push_str(&idx.to_string());
    }

    /// Finish the statement.
    pub fn build(self) -> CompiledStatement {
        CompiledStatement {
            sql: self.sql,
            binds: self.binds,
        }
    }
}
