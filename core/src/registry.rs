//! The type mapping table: declared field kind → native value type → backend cast type.
//!
//! Filter and sort compilation both go through [`TypeRegistry::cast_type`], so a field kind
//! always filters and orders under the same cast.

use nestql::expr::CastType;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

use crate::schema::FieldKind;

/// The value type a filter value is coerced to before it reaches the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    Text,
    Bytes,
    Integer,
    Float,
    Decimal,
    Boolean,
    DateTime,
    Date,
    Time,
    Uuid,
    /// Set-membership target: only containment is defined
    List,
    Mapping,
}

impl NativeType {
    /// The cast applied to a text-extracted document value, for the types that can be compared and ordered.
    pub fn cast_type(&self) -> Option<CastType> {
        match self {
            NativeType::Decimal => Some(CastType::Decimal),
            NativeType::Text | NativeType::Bytes => Some(CastType::String),
            NativeType::Integer => Some(CastType::Integer),
            NativeType::Boolean => Some(CastType::Boolean),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("a process-wide type registry is already installed")]
    AlreadyInstalled,
}

static GLOBAL: OnceLock<Arc<TypeRegistry>> = OnceLock::new();

/// Immutable once built. Extend it through [`TypeRegistry::builder`] before installing.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    natives: HashMap<FieldKind, NativeType>,
}

impl Default for TypeRegistry {
    fn default() -> Self { Self::builder().build() }
}

impl TypeRegistry {
    /// A builder pre-populated with the built-in associations.
    pub fn builder() -> TypeRegistryBuilder {
        let natives = [
            (FieldKind::String, NativeType::Text),
            (FieldKind::Email, NativeType::Text),
            (FieldKind::Url, NativeType::Text),
            (FieldKind::Bytes, NativeType::Bytes),
            (FieldKind::Integer, NativeType::Integer),
            (FieldKind::Enum, NativeType::Integer),
            (FieldKind::Float, NativeType::Float),
            (FieldKind::Decimal, NativeType::Decimal),
            (FieldKind::Boolean, NativeType::Boolean),
            (FieldKind::DateTime, NativeType::DateTime),
            (FieldKind::LocalDateTime, NativeType::DateTime),
            (FieldKind::Date, NativeType::Date),
            (FieldKind::Time, NativeType::Time),
            (FieldKind::Uuid, NativeType::Uuid),
            (FieldKind::List, NativeType::List),
            (FieldKind::Dict, NativeType::Mapping),
            (FieldKind::Nested, NativeType::Mapping),
        ];
        TypeRegistryBuilder { natives: natives.into_iter().collect() }
    }

    pub fn native_type(&self, kind: &FieldKind) -> Option<NativeType> { self.natives.get(kind).copied() }

    pub fn cast_type(&self, kind: &FieldKind) -> Option<CastType> { self.native_type(kind).and_then(|native| native.cast_type()) }

    /// Reverse lookup: every kind associated with `native`, in display order.
    pub fn kinds_for(&self, native: NativeType) -> Vec<&FieldKind> {
        let mut kinds: Vec<_> = self.natives.iter().filter(|(_, n)| **n == native).map(|(kind, _)| kind).collect();
        kinds.sort_by_key(|kind| kind.to_string());
        kinds
    }

    /// Make this the process-wide registry. Fails if one was already installed or read.
    pub fn install(self) -> Result<Arc<TypeRegistry>, RegistryError> {
        let registry = Arc::new(self);
        GLOBAL.set(registry.clone()).map_err(|_| RegistryError::AlreadyInstalled)?;
        tracing::debug!(kinds = registry.natives.len(), "installed process-wide type registry");
        Ok(registry)
    }

    /// The installed registry, or the built-in one if nothing was installed.
    pub fn global() -> Arc<TypeRegistry> { GLOBAL.get_or_init(|| Arc::new(TypeRegistry::default())).clone() }
}

pub struct TypeRegistryBuilder {
    natives: HashMap<FieldKind, NativeType>,
}

impl TypeRegistryBuilder {
    /// Associate `kind` with `native`, replacing any existing association.
    pub fn register(mut self, kind: FieldKind, native: NativeType) -> Self {
        self.natives.insert(kind, native);
        self
    }

    pub fn build(self) -> TypeRegistry { TypeRegistry { natives: self.natives } }
}
