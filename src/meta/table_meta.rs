//! Generated table metadata and the field extraction engine.
//!
//! A code generator emits one [`TableMeta`] per entity type: the table name,
//! the declared column order, the autoincrement column, the stamp columns and
//! a [`LookupFieldFn`] that maps a column name to the matching struct field.
//! Everything here is driven by that function; nothing inspects types at
//! runtime.

use crate::error::{DaoError, DaoResult};
use crate::meta::hooks::{EditHooks, Modifier};
use crate::models::Value;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Stamp bit: fill the column on insert when it is still zero.
pub const STAMP_ON_INSERT: u8 = 1;
/// Stamp bit: the column is (re)assigned outside the update statement.
pub const STAMP_ON_UPDATE: u8 = 2;

/// Assigns a column value into its field; the counterpart of a field address.
pub type FieldBinder<T> = fn(&mut T, Value) -> DaoResult<()>;

/// What a lookup returns for one column.
pub enum Field<T> {
    /// Current value of the field, for binding into a statement.
    Value(Value),
    /// Setter for the field, for populating it from a result row.
    Pointer(FieldBinder<T>),
}

impl<T> Field<T> {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Field::Value(v) => Some(v),
            Field::Pointer(_) => None,
        }
    }

    pub fn into_pointer(self) -> Option<FieldBinder<T>> {
        match self {
            Field::Pointer(p) => Some(p),
            Field::Value(_) => None,
        }
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Field::Pointer(_) => f.write_str("Pointer"),
        }
    }
}

/// Generated accessor: `(column, entity, want_pointer)`. Returns `None` for
/// a column the entity does not have.
pub type LookupFieldFn<T> = fn(column: &str, ins: &T, pointer: bool) -> Option<Field<T>>;

/// Column names excluded from an extraction.
pub type ExcludeColumns = HashSet<&'static str>;

/// Columns and values ready for a statement builder, in declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValues {
    pub columns: Vec<&'static str>,
    pub values: Vec<Value>,
}

/// Per-entity metadata emitted by the generator.
pub struct TableMeta<T> {
    lookup_field: LookupFieldFn<T>,
    table: &'static str,
    columns: &'static [&'static str],
    auto_column: Option<&'static str>,
    stamp_columns: HashMap<&'static str, u8>,
}

impl<T> fmt::Debug for TableMeta<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableMeta")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("auto_column", &self.auto_column)
            .field("stamp_columns", &self.stamp_columns)
            .finish_non_exhaustive()
    }
}

impl<T> TableMeta<T> {
    pub fn new(
        table: &'static str,
        columns: &'static [&'static str],
        lookup_field: LookupFieldFn<T>,
    ) -> Self {
        Self {
            lookup_field,
            table,
            columns,
            auto_column: None,
            stamp_columns: HashMap::new(),
        }
    }

    pub fn with_auto_column(mut self, column: &'static str) -> Self {
        self.auto_column = Some(column);
        self
    }

    /// Mark `column` as a stamp column; `mask` combines [`STAMP_ON_INSERT`]
    /// and [`STAMP_ON_UPDATE`].
    pub fn with_stamp_column(mut self, column: &'static str, mask: u8) -> Self {
        self.stamp_columns.insert(column, mask);
        self
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn columns(&self) -> &'static [&'static str] {
        self.columns
    }

    pub fn auto_column(&self) -> Option<&'static str> {
        self.auto_column
    }

    pub fn stamp_mask(&self, column: &str) -> u8 {
        self.stamp_columns.get(column).copied().unwrap_or(0)
    }

    fn lookup(&self, column: &str, ins: &T, pointer: bool) -> DaoResult<Field<T>> {
        (self.lookup_field)(column, ins, pointer)
            .ok_or_else(|| DaoError::unknown_column(self.table, column))
    }

    /// Extract the fields of `ins` in declared column order, skipping every
    /// column in `exclude`.
    pub fn extract_field_values(
        &self,
        ins: &T,
        pointer: bool,
        exclude: Option<&HashSet<&str>>,
    ) -> DaoResult<Vec<Field<T>>> {
        self.columns
            .iter()
            .filter(|column| exclude.is_none_or(|ex| !ex.contains(*column)))
            .map(|column| self.lookup(column, ins, pointer))
            .collect()
    }

    /// Extract only the given columns, in the given order. Exclusion rules
    /// do not apply.
    pub fn extract_field_values_by_columns(
        &self,
        ins: &T,
        pointer: bool,
        columns: &[&str],
    ) -> DaoResult<Vec<Field<T>>> {
        columns
            .iter()
            .map(|column| self.lookup(column, ins, pointer))
            .collect()
    }

    /// Field values for binding, in declared order.
    pub fn extract_values(
        &self,
        ins: &T,
        exclude: Option<&HashSet<&str>>,
    ) -> DaoResult<Vec<Value>> {
        self.extract_field_values(ins, false, exclude)?
            .into_iter()
            .map(|field| {
                field.into_value().ok_or_else(|| {
                    DaoError::internal(format!(
                        "accessor for '{}' returned a pointer for a value lookup",
                        self.table
                    ))
                })
            })
            .collect()
    }

    /// Field setters for scanning a row back into an entity, in declared
    /// order.
    pub fn extract_binders(
        &self,
        ins: &T,
        exclude: Option<&HashSet<&str>>,
    ) -> DaoResult<Vec<FieldBinder<T>>> {
        self.extract_field_values(ins, true, exclude)?
            .into_iter()
            .map(|field| {
                field.into_pointer().ok_or_else(|| {
                    DaoError::internal(format!(
                        "accessor for '{}' returned a value for a pointer lookup",
                        self.table
                    ))
                })
            })
            .collect()
    }

    /// Populate `ins` from one row: `values[i]` goes to `columns[i]`.
    pub fn assign_fields(&self, ins: &mut T, columns: &[&str], values: Vec<Value>) -> DaoResult<()> {
        if columns.len() != values.len() {
            return Err(DaoError::internal(format!(
                "{} columns but {} values for table '{}'",
                columns.len(),
                values.len(),
                self.table
            )));
        }
        let binders = self.extract_field_values_by_columns(ins, true, columns)?;
        for (field, value) in binders.into_iter().zip(values) {
            let bind = field.into_pointer().ok_or_else(|| {
                DaoError::internal(format!(
                    "accessor for '{}' returned a value for a pointer lookup",
                    self.table
                ))
            })?;
            bind(ins, value)?;
        }
        Ok(())
    }

    /// Default exclusion set for an insert (`is_update == false`) or an
    /// update.
    ///
    /// The autoincrement column is always excluded. A stamp column whose mask
    /// has the operation's bit is excluded on update unconditionally, and on
    /// insert only while its timestamp is zero. Stamp columns that do not
    /// hold a timestamp are left alone.
    pub fn should_exclude_columns(&self, ins: &T, is_update: bool) -> ExcludeColumns {
        let mut exclude = ExcludeColumns::new();
        if let Some(auto) = self.auto_column {
            exclude.insert(auto);
        }
        if self.stamp_columns.is_empty() {
            return exclude;
        }
        let target = if is_update {
            STAMP_ON_UPDATE
        } else {
            STAMP_ON_INSERT
        };
        for &column in self.columns {
            if self.stamp_mask(column) & target != target {
                continue;
            }
            let Some(Field::Value(value)) = (self.lookup_field)(column, ins, false) else {
                continue;
            };
            let Some(stamp) = value.as_datetime() else {
                continue;
            };
            if is_update || stamp.is_zero() {
                exclude.insert(column);
            }
        }
        exclude
    }

    pub fn insert_exclusions(&self, ins: &T) -> ExcludeColumns {
        self.should_exclude_columns(ins, false)
    }

    pub fn update_exclusions(&self, ins: &T) -> ExcludeColumns {
        self.should_exclude_columns(ins, true)
    }

    fn column_values(&self, ins: &T, exclude: &ExcludeColumns) -> DaoResult<ColumnValues> {
        let columns = self
            .columns
            .iter()
            .copied()
            .filter(|column| !exclude.contains(column))
            .collect();
        let values = self.extract_values(ins, Some(exclude))?;
        Ok(ColumnValues { columns, values })
    }

    /// Validate a modifier against the declared columns and run the modify
    /// hook on it.
    pub fn prepare_modify(&self, modifier: &mut Modifier, hooks: &EditHooks) -> DaoResult<()> {
        hooks.before_modify(self.table, modifier)?;
        if let Some(unknown) = modifier
            .columns()
            .iter()
            .find(|c| !self.columns.iter().any(|declared| *declared == c.as_str()))
        {
            return Err(DaoError::unknown_column(self.table, unknown.clone()));
        }
        Ok(())
    }
}

impl<T: Any> TableMeta<T> {
    /// Run the insert hook, then collect the columns and values an INSERT
    /// statement should carry.
    pub fn prepare_insert(&self, ins: &mut T, hooks: &EditHooks) -> DaoResult<ColumnValues> {
        hooks.before_insert(self.table, ins)?;
        let exclude = self.insert_exclusions(ins);
        self.column_values(ins, &exclude)
    }

    /// Run the update hook, then collect the columns and values an UPDATE
    /// statement should set.
    pub fn prepare_update(&self, ins: &mut T, hooks: &EditHooks) -> DaoResult<ColumnValues> {
        hooks.before_update(self.table, ins)?;
        let exclude = self.update_exclusions(ins);
        self.column_values(ins, &exclude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        id: i64,
        hits: i64,
    }

    fn lookup(column: &str, ins: &Counter, pointer: bool) -> Option<Field<Counter>> {
        if pointer {
            let bind: FieldBinder<Counter> = match column {
                "id" => |c, v| {
                    c.id = v.try_into()?;
                    Ok(())
                },
                "hits" => |c, v| {
                    c.hits = v.try_into()?;
                    Ok(())
                },
                _ => return None,
            };
            return Some(Field::Pointer(bind));
        }
        match column {
            "id" => Some(Field::Value(Value::from(ins.id))),
            "hits" => Some(Field::Value(Value::from(ins.hits))),
            _ => None,
        }
    }

    fn meta() -> TableMeta<Counter> {
        TableMeta::new("counter", &["id", "hits"], lookup).with_auto_column("id")
    }

    #[test]
    fn test_field_helpers() {
        let field: Field<Counter> = Field::Value(Value::Int(3));
        assert_eq!(format!("{:?}", field), "Value(Int(3))");
        assert_eq!(field.into_value(), Some(Value::Int(3)));

        let ins = Counter { id: 0, hits: 0 };
        let pointer = lookup("hits", &ins, true).unwrap();
        assert_eq!(format!("{:?}", pointer), "Pointer");
        assert!(pointer.into_value().is_none());
    }

    #[test]
    fn test_stamp_mask_defaults_to_zero() {
        let meta = meta().with_stamp_column("hits", STAMP_ON_INSERT | STAMP_ON_UPDATE);
        assert_eq!(meta.stamp_mask("hits"), 3);
        assert_eq!(meta.stamp_mask("id"), 0);
        assert_eq!(meta.stamp_mask("missing"), 0);
    }

    #[test]
    fn test_non_datetime_stamp_column_is_ignored() {
        let meta = meta().with_stamp_column("hits", STAMP_ON_INSERT);
        let ins = Counter { id: 1, hits: 0 };
        let exclude = meta.insert_exclusions(&ins);
        assert_eq!(exclude, ExcludeColumns::from(["id"]));
    }

    #[test]
    fn test_extract_binders_assigns_in_order() {
        let meta = meta();
        let mut ins = Counter { id: 0, hits: 0 };
        let binders = meta.extract_binders(&ins, None).unwrap();
        assert_eq!(binders.len(), 2);
        binders[0](&mut ins, Value::Int(9)).unwrap();
        binders[1](&mut ins, Value::Int(4)).unwrap();
        assert_eq!((ins.id, ins.hits), (9, 4));
    }

    #[test]
    fn test_assign_fields_rejects_length_mismatch() {
        let meta = meta();
        let mut ins = Counter { id: 0, hits: 0 };
        let err = meta
            .assign_fields(&mut ins, &["id", "hits"], vec![Value::Int(1)])
            .unwrap_err();
        assert!(matches!(err, DaoError::Internal { .. }));
        assert_eq!(ins.id, 0);
    }

    #[test]
    fn test_debug_lists_table() {
        let text = format!("{:?}", meta());
        assert!(text.contains("counter"));
        assert!(text.contains("auto_column: Some(\"id\")"));
    }
}
