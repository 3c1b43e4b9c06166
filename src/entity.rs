//! Static mapping metadata for a Rust type.
//!
//! An [`EntityDescriptor`] plays the part of table and column annotations: it
//! names the table, lists every attribute in declaration order, and for
//! mapped attributes carries the column name, the declared [`DataType`] and
//! explicit accessor/mutator functions.

use crate::error::Result;
use crate::value::{DataType, SqlType, Value};

type Getter<T> = Box<dyn Fn(&T) -> Option<Value> + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, Value) -> Result<()> + Send + Sync>;

/// Column binding of a mapped attribute.
pub struct ColumnBinding<T> {
    column: String,
    data_type: DataType,
    get: Getter<T>,
    set: Setter<T>,
}

impl<T> ColumnBinding<T> {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Current value of the attribute, `None` when absent.
    pub fn read(&self, object: &T) -> Option<Value> {
        (self.get)(object)
    }

    /// Stores an already-coerced value into the attribute.
    pub fn write(&self, object: &mut T, value: Value) -> Result<()> {
        (self.set)(object, value)
    }
}

/// A declared attribute, mapped to a column or not.
pub struct Attribute<T> {
    name: String,
    binding: Option<ColumnBinding<T>>,
}

impl<T> Attribute<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding(&self) -> Option<&ColumnBinding<T>> {
        self.binding.as_ref()
    }
}

/// Table name plus ordered attribute list for `T`.
pub struct EntityDescriptor<T> {
    table: Option<String>,
    attributes: Vec<Attribute<T>>,
}

impl<T: 'static> EntityDescriptor<T> {
    pub fn new() -> Self {
        Self {
            table: None,
            attributes: Vec::new(),
        }
    }

    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(name.into());
        self
    }

    /// Declares an attribute mapped to `column`.
    ///
    /// The getter returns `None` for an absent value, which the mapper
    /// refuses when rendering values.
    pub fn column<V>(
        mut self,
        attribute: impl Into<String>,
        column: impl Into<String>,
        get: fn(&T) -> Option<V>,
        set: fn(&mut T, V),
    ) -> Self
    where
        V: SqlType + 'static,
    {
        self.attributes.push(Attribute {
            name: attribute.into(),
            binding: Some(ColumnBinding {
                column: column.into(),
                data_type: V::DATA_TYPE,
                get: Box::new(move |object: &T| get(object).map(V::into_value)),
                set: Box::new(move |object: &mut T, value: Value| {
                    set(object, V::from_value(value)?);
                    Ok(())
                }),
            }),
        });
        self
    }

    /// Declares an attribute that has no column.
    pub fn attribute(mut self, name: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            binding: None,
        });
        self
    }

    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn attributes(&self) -> &[Attribute<T>] {
        &self.attributes
    }

    pub fn find(&self, name: &str) -> Option<&Attribute<T>> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Mapped attributes in declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &ColumnBinding<T>)> {
        self.attributes
            .iter()
            .filter_map(|a| a.binding.as_ref().map(|b| (a.name.as_str(), b)))
    }
}

impl<T: 'static> Default for EntityDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Tag {
        id: i64,
        label: String,
        hits: u64,
    }

    fn descriptor() -> EntityDescriptor<Tag> {
        EntityDescriptor::<Tag>::new()
            .table("tags")
            .column("id", "tag_id", |t: &Tag| Some(t.id), |t, v| t.id = v)
            .attribute("hits")
            .column(
                "label",
                "label",
                |t: &Tag| Some(t.label.clone()),
                |t, v| t.label = v,
            )
    }

    #[test]
    fn bindings_skip_unmapped_attributes_in_order() {
        let d = descriptor();
        let names: Vec<_> = d.bindings().map(|(name, b)| (name, b.column())).collect();
        assert_eq!(names, vec![("id", "tag_id"), ("label", "label")]);
        assert_eq!(d.attributes().len(), 3);
        assert!(d.find("hits").unwrap().binding().is_none());
    }

    #[test]
    fn binding_reads_and_writes() {
        let d = descriptor();
        let mut tag = Tag {
            hits: 9,
            ..Tag::default()
        };
        let (_, label) = d.bindings().nth(1).unwrap();
        assert_eq!(label.data_type(), DataType::Text);
        label.write(&mut tag, Value::from("rust")).unwrap();
        assert_eq!(label.read(&tag), Some(Value::from("rust")));
        assert_eq!(tag.hits, 9);
    }
}
