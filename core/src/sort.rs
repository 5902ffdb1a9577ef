//! Compiles one sort clause against an embedded document key.

use nestql::ast::Direction;
use nestql::expr::{ColumnRef, Expr, OrderBy};

use crate::error::{ClauseKind, CompileError};
use crate::filter::CompileEnv;
use crate::path::EmbeddedTarget;

/// Orders by the key extracted as text and cast through the same type table filters use.
pub fn compile_sort(env: &CompileEnv<'_>, target: &EmbeddedTarget<'_>, column: &ColumnRef, direction: Direction) -> Result<OrderBy, CompileError> {
    let field = target.field;
    let path = target.path.to_string();
    let extraction = Expr::json_text(column.clone(), target.key.as_str());

    if let Some(ops) = env.overrides.sort(&field.kind, direction) {
        tracing::debug!(%path, %direction, kind = %field.kind, "delegating to field kind override");
        return ops.build_sort_expression(field, extraction, direction).map_err(|source| CompileError::Override { kind: ClauseKind::Sort, path, source });
    }

    let Some(native) = env.types.native_type(&field.kind) else {
        return Err(CompileError::invalid_path(ClauseKind::Sort, path, format!("no type mapping for {}", field.kind)));
    };
    let Some(cast) = native.cast_type() else {
        tracing::warn!(%path, kind = %field.kind, ?native, "rejected sort on uncastable type");
        return Err(CompileError::UnsupportedSort { path, direction, target: field.kind.to_string() });
    };

    tracing::debug!(%path, %direction, ?cast, "compiled embedded sort");
    Ok(OrderBy::new(extraction.cast(cast), direction))
}
