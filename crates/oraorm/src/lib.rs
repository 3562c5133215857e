//! # oraorm
//!
//! Oracle DML synthesis and `RETURNING` result binding.
//!
//! ## Features
//!
//! - **Clause compiler**: abstract clauses in, Oracle SQL with `:n` placeholders out
//! - **Upserts**: ON CONFLICT requests are planned into `MERGE INTO ... USING DUAL`
//! - **Multi-row capture**: bulk writes that must report their rows compile to a
//!   single PL/SQL block with one output slot per (row, column)
//! - **Result binding**: captured values are written back into records or
//!   vectors of records, padding rows trimmed, conversion failures reported per field
//! - **Safe defaults**: UPDATE/DELETE require a WHERE besides the soft-delete marker
//!
//! ## Example
//!
//! ```ignore
//! use oraorm::{Engine, Expr, OperationPlan, OnConflict, Value};
//!
//! let engine = Engine::default();
//!
//! // Two-row insert reporting generated ids
//! let plan = OperationPlan::insert("users")
//!     .columns(["id", "name"])
//!     .row([Value::Null, Value::from("alice")])
//!     .row([Value::Null, Value::from("bob")])
//!     .returning(["id", "name"]);
//! let mut users: Vec<User> = Vec::new();
//! let outcome = engine.execute(&plan, Some(&schema), &executor, &mut users).await?;
//!
//! // Upsert by primary key
//! let plan = OperationPlan::insert("users")
//!     .columns(["id", "name"])
//!     .row([Value::I64(1), Value::from("alice")])
//!     .on_conflict(OnConflict::primary_key().update_all());
//! engine.execute_unbound(&plan, Some(&schema), &executor).await?;
//!
//! // Guarded delete
//! let plan = OperationPlan::delete("users").filter(Expr::eq("id", 1i64));
//! engine.execute_unbound(&plan, Some(&schema), &executor).await?;
//! ```

pub mod binder;
pub mod clause;
pub mod client;
pub mod config;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod expr;
pub mod ident;
pub mod monitor;
pub mod plan;
pub mod plsql;
pub mod safety;
pub mod schema;
pub mod statement;
pub mod value;

pub use binder::{BindReport, Destination, Record, bind_many, bind_one};
pub use clause::{Clause, compile as compile_clauses};
pub use client::Executor;
pub use config::{EngineConfig, RowCapPolicy};
pub use conflict::{ConflictPlan, MergePlan, plan_conflict};
pub use engine::{Engine, ExecOutcome, compile};
pub use error::{OrmError, OrmResult};
pub use expr::Expr;
pub use ident::{Ident, IntoIdent, quote};
pub use monitor::{StatementKind, TracingExecutor};
pub use plan::{AssignValue, Assignment, Capture, Column, OnConflict, Operation, OperationPlan};
pub use plsql::synthesize;
pub use safety::{WhereGuard, check_where};
pub use schema::{DataType, FieldDescriptor, SchemaRegistry, TableSchema};
pub use statement::{BindSlot, CompiledStatement, StatementBuilder};
pub use value::{
    CollectionElement, ConversionContext, OutSlot, Value, WireKind, WireValue,
    allocate_destination, to_host, to_wire, to_wire_for, to_wire_with,
};
