//! Table metadata consumed by the write path.
//!
//! - [`TableMeta`]: generated per-entity descriptor and field extraction
//! - [`EditHooks`]: injected before-insert / before-update / before-modify hooks

pub mod hooks;
pub mod table_meta;

pub use hooks::{EditHooks, HookError, Modifier};
pub use table_meta::{
    ColumnValues, ExcludeColumns, Field, FieldBinder, LookupFieldFn, STAMP_ON_INSERT,
    STAMP_ON_UPDATE, TableMeta,
};
