//! In-memory description of resource schemas.
//!
//! Relationships name their target schema and are followed through a [`SchemaCatalog`], so
//! self-referential and mutually referential resources need no special handling. Embedded
//! documents own their nested schema outright: its fields are keys inside one column.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Declared kind of a field, the key of the type mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    String,
    Email,
    Url,
    Bytes,
    Integer,
    Float,
    Decimal,
    Boolean,
    DateTime,
    LocalDateTime,
    Date,
    Time,
    Uuid,
    Enum,
    List,
    Dict,
    Nested,
    Relationship,
    Custom(String),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Custom(name) => f.write_str(name),
            other => write!(f, "{:?}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FieldShape {
    Plain,
    Relationship { target: String },
    Embedded(Arc<Schema>),
}

/// A member of an enumerated field: serialized as `NAME(value)`, stored as `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub shape: FieldShape,
    pub nullable: bool,
    /// Element field of a list
    pub item: Option<Box<Field>>,
    pub variants: Vec<EnumVariant>,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self { name: name.into(), kind, shape: FieldShape::Plain, nullable: false, item: None, variants: Vec::new() }
    }

    pub fn relationship(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self { shape: FieldShape::Relationship { target: target.into() }, ..Self::new(name, FieldKind::Relationship) }
    }

    pub fn embedded(name: impl Into<String>, schema: Schema) -> Self {
        Self { shape: FieldShape::Embedded(Arc::new(schema)), ..Self::new(name, FieldKind::Nested) }
    }

    pub fn list(name: impl Into<String>, item: Field) -> Self { Self { item: Some(Box::new(item)), ..Self::new(name, FieldKind::List) } }

    pub fn enumeration<S: Into<String>>(name: impl Into<String>, variants: impl IntoIterator<Item = (S, i64)>) -> Self {
        let variants = variants.into_iter().map(|(name, value)| EnumVariant { name: name.into(), value }).collect();
        Self { variants, ..Self::new(name, FieldKind::Enum) }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn is_embedded(&self) -> bool { matches!(self.shape, FieldShape::Embedded(_)) }

    pub fn is_relationship(&self) -> bool { matches!(self.shape, FieldShape::Relationship { .. }) }

    pub fn embedded_schema(&self) -> Option<&Schema> {
        match &self.shape {
            FieldShape::Embedded(schema) => Some(schema.as_ref()),
            _ => None,
        }
    }

    pub fn relationship_target(&self) -> Option<&str> {
        match &self.shape {
            FieldShape::Relationship { target } => Some(target.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    fields: IndexMap<String, Field>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), fields: IndexMap::new() } }

    pub fn with_field(mut self, field: Field) -> Self {
        self.insert(field);
        self
    }

    pub fn insert(&mut self, field: Field) { self.fields.insert(field.name.clone(), field); }

    pub fn name(&self) -> &str { &self.name }

    pub fn field(&self, name: &str) -> Option<&Field> { self.fields.get(name) }

    pub fn fields(&self) -> impl Iterator<Item = &Field> { self.fields.values() }
}

/// Schema introspection: look up the target of a relationship by name.
pub trait SchemaCatalog: Send + Sync {
    fn schema(&self, name: &str) -> Option<&Schema>;
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    schemas: HashMap<String, Schema>,
}

impl Catalog {
    pub fn new() -> Self { Self::default() }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.insert(schema);
        self
    }

    pub fn insert(&mut self, schema: Schema) { self.schemas.insert(schema.name.clone(), schema); }
}

impl SchemaCatalog for Catalog {
    fn schema(&self, name: &str) -> Option<&Schema> { self.schemas.get(name) }
}
