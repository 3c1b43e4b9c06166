//! Conversion between mapped objects and their SQL representation.

use crate::entity::{ColumnBinding, EntityDescriptor};
use crate::error::{OrmError, Result};
use crate::value::Value;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use tracing::trace;

/// A single fetched row, addressed by column name.
pub trait RowSource {
    /// Returns the raw value stored under `column`.
    ///
    /// A column the row does not contain is a [`OrmError::Mapping`].
    fn value(&self, column: &str) -> Result<Value>;
}

impl RowSource for rusqlite::Row<'_> {
    fn value(&self, column: &str) -> Result<Value> {
        match self.get_ref(column) {
            Ok(value) => Ok(value.into()),
            Err(rusqlite::Error::InvalidColumnName(_)) => Err(OrmError::mapping(format!(
                "result row has no column `{column}`"
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

impl RowSource for HashMap<String, Value> {
    fn value(&self, column: &str) -> Result<Value> {
        self.get(column)
            .cloned()
            .ok_or_else(|| OrmError::mapping(format!("result row has no column `{column}`")))
    }
}

/// Registry of entity descriptors, looked up by type identity.
#[derive(Default)]
pub struct Mapper {
    descriptors: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the descriptor for `T`, replacing any earlier one.
    pub fn register<T: 'static>(&mut self, descriptor: EntityDescriptor<T>) -> &mut Self {
        self.descriptors
            .insert(TypeId::of::<T>(), Box::new(descriptor));
        self
    }

    pub fn with<T: 'static>(mut self, descriptor: EntityDescriptor<T>) -> Self {
        self.register(descriptor);
        self
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.descriptors.contains_key(&TypeId::of::<T>())
    }

    pub fn descriptor<T: 'static>(&self) -> Result<&EntityDescriptor<T>> {
        self.descriptors
            .get(&TypeId::of::<T>())
            .and_then(|d| d.downcast_ref::<EntityDescriptor<T>>())
            .ok_or_else(|| {
                OrmError::configuration(format!("type `{}` is not mapped", type_name::<T>()))
            })
    }

    /// Table name declared for `T`.
    pub fn table_name<T: 'static>(&self) -> Result<&str> {
        match self.descriptor::<T>()?.table_name() {
            None => Err(OrmError::configuration(format!(
                "no table declared for `{}`",
                type_name::<T>()
            ))),
            Some("") => Err(OrmError::configuration(format!(
                "table name for `{}` cannot be empty",
                type_name::<T>()
            ))),
            Some(name) => Ok(name),
        }
    }

    /// Column of `attribute`, or `None` when the attribute has no column.
    pub fn column_name<T: 'static>(&self, attribute: &str) -> Result<Option<&str>> {
        let attr = self.descriptor::<T>()?.find(attribute).ok_or_else(|| {
            OrmError::reflection(format!(
                "`{}` has no attribute `{attribute}`",
                type_name::<T>()
            ))
        })?;
        Ok(attr.binding().map(|b| b.column()))
    }

    /// Mapped attributes of `T` in declaration order; an empty column name is
    /// a configuration error.
    fn bindings<T: 'static>(&self) -> Result<Vec<(&str, &ColumnBinding<T>)>> {
        self.descriptor::<T>()?
            .bindings()
            .map(|(name, binding)| {
                if binding.column().is_empty() {
                    return Err(OrmError::configuration(format!(
                        "column name for `{}.{name}` cannot be empty",
                        type_name::<T>()
                    )));
                }
                Ok((name, binding))
            })
            .collect()
    }

    pub fn column_names<T: 'static>(&self) -> Result<Vec<String>> {
        Ok(self
            .bindings::<T>()?
            .into_iter()
            .map(|(_, b)| b.column().to_string())
            .collect())
    }

    /// Current values of every mapped attribute, rendered as SQL literals.
    pub fn column_values<T: 'static>(&self, object: &T) -> Result<Vec<String>> {
        self.bindings::<T>()?
            .into_iter()
            .map(|(name, binding)| -> Result<String> {
                let value = binding
                    .read(object)
                    .filter(|v| !v.is_null())
                    .ok_or_else(|| {
                        OrmError::configuration(format!(
                            "value of `{}.{name}` cannot be absent",
                            type_name::<T>()
                        ))
                    })?;
                Ok(value.to_column_literal(binding.data_type()))
            })
            .collect()
    }

    /// Builds a fresh `T` from `row`, writing every mapped attribute.
    pub fn new_instance_from_row<T>(&self, row: &dyn RowSource) -> Result<T>
    where
        T: Default + 'static,
    {
        let bindings = self.bindings::<T>()?;
        let mut object = T::default();
        for (name, binding) in bindings {
            let raw = row.value(binding.column())?;
            if raw.is_null() {
                return Err(OrmError::mapping(format!(
                    "column `{}` is NULL",
                    binding.column()
                )));
            }
            let found = raw.type_name();
            let value = raw.coerce(binding.data_type()).ok_or_else(|| {
                OrmError::reflection(format!(
                    "column `{}` holds {found}, `{}.{name}` expects {}",
                    binding.column(),
                    type_name::<T>(),
                    binding.data_type().as_str()
                ))
            })?;
            binding.write(&mut object, value)?;
        }
        trace!(entity = type_name::<T>(), "mapped row");
        Ok(object)
    }

    /// `INSERT` statement carrying the current values of `object`.
    pub fn insert_sql<T: 'static>(&self, object: &T) -> Result<String> {
        Ok(format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_name::<T>()?,
            self.column_names::<T>()?.join(", "),
            self.column_values(object)?.join(", ")
        ))
    }

    /// `SELECT` of every mapped column of `T`.
    pub fn select_sql<T: 'static>(&self) -> Result<String> {
        Ok(format!(
            "SELECT {} FROM {}",
            self.column_names::<T>()?.join(", "),
            self.table_name::<T>()?
        ))
    }
}
