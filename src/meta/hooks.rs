//! Edit hooks run before entities are written.
//!
//! Hooks live in an [`EditHooks`] registry that the write path receives
//! explicitly. There is no process-wide hook state, so two call sites with
//! different registries never affect each other.

use crate::error::{DaoError, DaoResult};
use crate::models::Value;
use std::any::Any;
use std::fmt;

/// Error type hooks may return; its message ends up in [`DaoError::Hook`].
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

type EntityHook = Box<dyn Fn(&str, &mut dyn Any) -> Result<(), HookError> + Send + Sync>;
type ModifyHook = Box<dyn Fn(&str, &mut Modifier) -> Result<(), HookError> + Send + Sync>;

/// An ordered set of column assignments for a partial update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Modifier {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Modifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `value` to `column`, replacing an earlier assignment.
    pub fn add(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let column = column.into();
        let value = value.into();
        match self.columns.iter().position(|c| *c == column) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.columns.push(column);
                self.values.push(value);
            }
        }
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }
}

/// Registry of optional before-insert / before-update / before-modify hooks.
///
/// Entity hooks receive the table name and the entity as `&mut dyn Any`;
/// downcast to the concrete type to read or change fields.
#[derive(Default)]
pub struct EditHooks {
    before_insert: Option<EntityHook>,
    before_update: Option<EntityHook>,
    before_modify: Option<ModifyHook>,
}

impl fmt::Debug for EditHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditHooks")
            .field("before_insert", &self.before_insert.is_some())
            .field("before_update", &self.before_update.is_some())
            .field("before_modify", &self.before_modify.is_some())
            .finish()
    }
}

impl EditHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before_insert<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &mut dyn Any) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.before_insert = Some(Box::new(hook));
        self
    }

    pub fn on_before_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &mut dyn Any) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.before_update = Some(Box::new(hook));
        self
    }

    pub fn on_before_modify<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &mut Modifier) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.before_modify = Some(Box::new(hook));
        self
    }

    pub fn before_insert(&self, table: &str, entity: &mut dyn Any) -> DaoResult<()> {
        match &self.before_insert {
            Some(hook) => {
                hook(table, entity).map_err(|e| DaoError::hook("insert", table, e.to_string()))
            }
            None => Ok(()),
        }
    }

    pub fn before_update(&self, table: &str, entity: &mut dyn Any) -> DaoResult<()> {
        match &self.before_update {
            Some(hook) => {
                hook(table, entity).map_err(|e| DaoError::hook("update", table, e.to_string()))
            }
            None => Ok(()),
        }
    }

    pub fn before_modify(&self, table: &str, modifier: &mut Modifier) -> DaoResult<()> {
        match &self.before_modify {
            Some(hook) => {
                hook(table, modifier).map_err(|e| DaoError::hook("modify", table, e.to_string()))
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_replaces_existing_column() {
        let mut modi = Modifier::new();
        modi.add("name", "a").add("age", 3).add("name", "b");
        assert_eq!(modi.columns(), ["name".to_string(), "age".to_string()]);
        assert_eq!(modi.values()[0], Value::from("b"));
        assert_eq!(modi.len(), 2);
    }

    #[test]
    fn test_empty_registry_is_noop() {
        let hooks = EditHooks::new();
        let mut n = 5_i32;
        assert!(hooks.before_insert("t", &mut n).is_ok());
        assert!(hooks.before_update("t", &mut n).is_ok());
        assert!(hooks.before_modify("t", &mut Modifier::new()).is_ok());
        assert_eq!(n, 5);
    }

    #[test]
    fn test_hook_error_is_wrapped() {
        let hooks = EditHooks::new().on_before_update(|_, _| Err("read only table".into()));
        let mut n = 1_i32;
        let err = hooks.before_update("audit", &mut n).unwrap_err();
        assert!(matches!(
            err,
            DaoError::Hook {
                operation: "update",
                ..
            }
        ));
        assert!(err.to_string().contains("read only table"));
    }

    #[test]
    fn test_modify_hook_can_add_columns() {
        let hooks = EditHooks::new().on_before_modify(|_, modi| {
            modi.add("modify_by", "system");
            Ok(())
        });
        let mut modi = Modifier::new();
        modi.add("name", "x");
        hooks.before_modify("user", &mut modi).unwrap();
        assert_eq!(modi.columns(), ["name".to_string(), "modify_by".to_string()]);
    }

    #[test]
    fn test_debug_shows_registered_hooks() {
        let hooks = EditHooks::new().on_before_insert(|_, _| Ok(()));
        let text = format!("{:?}", hooks);
        assert!(text.contains("before_insert: true"));
        assert!(text.contains("before_update: false"));
    }
}
