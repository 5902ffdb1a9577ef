//! Entry points the host's nested resolution machinery calls.

use nestql::ast::{FilterNode, SortClause};
use nestql::expr::{ColumnRef, Join, OrderBy, Predicate};
use std::sync::Arc;

use crate::config::{CompilerConfig, ConfigError};
use crate::error::{ClauseKind, CompileError};
use crate::filter::{compile_filter, CompileEnv};
use crate::overrides::OverrideRegistry;
use crate::path::{resolve_path, EmbeddedTarget, Resolution};
use crate::registry::TypeRegistry;
use crate::schema::{Schema, SchemaCatalog};
use crate::sort::compile_sort;

/// What the host knows when it hands a filter clause over.
#[derive(Clone, Copy)]
pub struct FilterContext<'a> {
    pub catalog: &'a dyn SchemaCatalog,
    /// The schema `name` is a field of
    pub schema: &'a Schema,
    /// The field currently being traversed
    pub name: &'a str,
    /// The backend column already resolved for `name`
    pub column: &'a ColumnRef,
    pub filter: &'a FilterNode,
}

#[derive(Clone, Copy)]
pub struct SortContext<'a> {
    pub catalog: &'a dyn SchemaCatalog,
    pub schema: &'a Schema,
    pub name: &'a str,
    pub column: &'a ColumnRef,
    pub sort: &'a SortClause,
}

/// A compiled expression and the joins it needs. Embedded resolutions never need any.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub expr: T,
    pub joins: Vec<Join>,
}

impl<T> Resolved<T> {
    pub fn new(expr: T) -> Self { Self { expr, joins: Vec::new() } }
}

/// Consulted by the host for every clause it cannot map to a plain column. `Ok(None)` means the
/// clause is not ours and the host carries on.
pub trait NestedResolver: Send + Sync {
    fn resolve_filter(&self, ctx: &FilterContext<'_>) -> Result<Option<Resolved<Predicate>>, CompileError>;

    fn resolve_sort(&self, ctx: &SortContext<'_>) -> Result<Option<Resolved<OrderBy>>, CompileError>;
}

/// Resolves clauses addressing keys inside embedded document (JSONB) columns.
#[derive(Debug, Clone)]
pub struct JsonbPlugin {
    types: Arc<TypeRegistry>,
    overrides: Arc<OverrideRegistry>,
    config: CompilerConfig,
}

impl Default for JsonbPlugin {
    fn default() -> Self { Self::new() }
}

impl JsonbPlugin {
    /// Uses the process-wide type registry and no overrides.
    pub fn new() -> Self { Self { types: TypeRegistry::global(), overrides: Arc::new(OverrideRegistry::new()), config: CompilerConfig::default() } }

    pub fn with_types(mut self, types: Arc<TypeRegistry>) -> Self {
        self.types = types;
        self
    }

    pub fn with_overrides(mut self, overrides: impl Into<Arc<OverrideRegistry>>) -> Self {
        self.overrides = overrides.into();
        self
    }

    /// Fails on a config `CompilerConfig::from_json` would also reject.
    pub fn with_config(mut self, config: CompilerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &CompilerConfig { &self.config }

    fn env(&self) -> CompileEnv<'_> { CompileEnv { types: &self.types, overrides: &self.overrides, config: &self.config } }

    /// Resolve `raw` and keep it only if the embedded field is the one the host is standing on.
    fn target<'a>(
        &self,
        catalog: &'a dyn SchemaCatalog,
        schema: &'a Schema,
        name: &str,
        raw: &str,
        kind: ClauseKind,
    ) -> Result<Option<EmbeddedTarget<'a>>, CompileError> {
        if !raw.contains(self.config.separator.as_str()) {
            return Ok(None);
        }

        let path = nestql::ast::Path::parse(raw, &self.config.separator);
        let target = match resolve_path(catalog, schema, &path, kind)? {
            Resolution::NotEmbedded => return Ok(None),
            Resolution::Embedded(target) => target,
        };

        if !target.is_direct() {
            // the host joins across the relationships and calls again at the embedded field
            tracing::trace!(%path, hops = ?target.hops, "embedded key behind relationships, deferring to host");
            return Ok(None);
        }
        if target.embedded.name != name {
            return Err(CompileError::invalid_path(kind, &path, format!("resolved column belongs to {}, not {}", name, target.embedded.name)));
        }
        Ok(Some(target))
    }
}

impl NestedResolver for JsonbPlugin {
    fn resolve_filter(&self, ctx: &FilterContext<'_>) -> Result<Option<Resolved<Predicate>>, CompileError> {
        let Some(clause) = ctx.filter.as_leaf() else {
            tracing::trace!(name = ctx.name, "combinator node, deferring to host");
            return Ok(None);
        };

        let Some(target) = self.target(ctx.catalog, ctx.schema, ctx.name, &clause.name, ClauseKind::Filter)? else {
            return Ok(None);
        };
        let predicate = compile_filter(&self.env(), &target, ctx.column, clause.op, &clause.value)?;
        tracing::debug!(path = %target.path, op = %clause.op, "resolved embedded filter");
        Ok(Some(Resolved::new(predicate)))
    }

    fn resolve_sort(&self, ctx: &SortContext<'_>) -> Result<Option<Resolved<OrderBy>>, CompileError> {
        let Some(target) = self.target(ctx.catalog, ctx.schema, ctx.name, &ctx.sort.field, ClauseKind::Sort)? else {
            return Ok(None);
        };
        let order = compile_sort(&self.env(), &target, ctx.column, ctx.sort.direction)?;
        tracing::debug!(path = %target.path, direction = %ctx.sort.direction, "resolved embedded sort");
        Ok(Some(Resolved::new(order)))
    }
}
