//! Nested filter and sort resolution for embedded document columns.
//!
//! A host resolving `author__profile__city` walks relationships itself, but a path whose
//! second-to-last segment is an embedded document (one JSON column holding a nested object)
//! cannot be mapped onto columns. [`JsonbPlugin`] is consulted at each step of the host's
//! walk and takes over exactly those clauses, returning a backend expression from
//! [`nestql::expr`] and no extra joins. Everything else falls through to the host.

pub mod coerce;
pub mod config;
pub mod error;
pub mod filter;
pub mod hooks;
pub mod overrides;
pub mod path;
pub mod registry;
pub mod schema;
pub mod sort;

pub use coerce::{coerce, CoercionError};
pub use config::{CompilerConfig, ConfigError};
pub use error::{ClauseKind, CompileError};
pub use filter::{compile_filter, CompileEnv};
pub use hooks::{FilterContext, JsonbPlugin, NestedResolver, Resolved, SortContext};
pub use overrides::{FieldKindOps, JsonContainment, OverrideError, OverrideRegistry};
pub use path::{resolve_path, EmbeddedTarget, Resolution};
pub use registry::{NativeType, RegistryError, TypeRegistry};
pub use schema::{Catalog, Field, FieldKind, FieldShape, Schema, SchemaCatalog};
pub use sort::compile_sort;
