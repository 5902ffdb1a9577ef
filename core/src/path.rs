//! Classifies a client path against the schema graph.
//!
//! Relationship segments are followed through the catalog. The walk stops silently at the first
//! plain or unknown segment, since the host owns those paths. An embedded document may only sit
//! at the second-to-last segment; anywhere else the path is rejected, because it would be
//! ambiguous which keys belong to which nesting level.

use nestql::ast::Path;

use crate::error::{ClauseKind, CompileError};
use crate::schema::{Field, FieldShape, Schema, SchemaCatalog};

#[derive(Debug)]
pub enum Resolution<'a> {
    /// The host continues its own resolution.
    NotEmbedded,
    Embedded(EmbeddedTarget<'a>),
}

/// A path that terminates at a key inside an embedded document column.
#[derive(Debug, Clone)]
pub struct EmbeddedTarget<'a> {
    /// The full client path
    pub path: Path,
    /// The embedded document field (second-to-last segment)
    pub embedded: &'a Field,
    /// The terminal field, declared in the embedded schema
    pub field: &'a Field,
    pub key: String,
    /// Relationship segments walked before reaching the embedded field
    pub hops: Vec<String>,
    /// The path minus its terminal key
    pub override_path: Path,
}

impl EmbeddedTarget<'_> {
    pub fn is_direct(&self) -> bool { self.hops.is_empty() }
}

pub fn resolve_path<'a>(catalog: &'a dyn SchemaCatalog, schema: &'a Schema, path: &Path, kind: ClauseKind) -> Result<Resolution<'a>, CompileError> {
    let Some(override_path) = path.parent() else {
        return Ok(Resolution::NotEmbedded);
    };

    let marker = path.len() - 2;
    let mut current = schema;
    let mut hops = Vec::new();

    for (index, segment) in path.segments().iter().enumerate() {
        let Some(field) = current.field(segment) else {
            tracing::trace!(%path, %segment, schema = current.name(), "unknown segment, not embedded");
            return Ok(Resolution::NotEmbedded);
        };

        match &field.shape {
            FieldShape::Embedded(nested) => {
                if index != marker {
                    tracing::warn!(%path, %segment, index, "embedded document is not the second-to-last segment");
                    return Err(CompileError::invalid_path(kind, path, format!("embedded document {} must be the second-to-last segment", segment)));
                }
                let key = path.last();
                let terminal = nested.field(key).ok_or_else(|| CompileError::invalid_path(kind, path, format!("{} has no key {}", segment, key)))?;
                tracing::trace!(%path, embedded = %segment, %key, hops = hops.len(), "resolved embedded target");
                return Ok(Resolution::Embedded(EmbeddedTarget {
                    path: path.clone(),
                    embedded: field,
                    field: terminal,
                    key: key.to_owned(),
                    hops,
                    override_path,
                }));
            }
            FieldShape::Relationship { target } => match catalog.schema(target) {
                Some(next) => {
                    tracing::trace!(%path, %segment, target = %target, "following relationship");
                    hops.push(segment.clone());
                    current = next;
                }
                None => {
                    tracing::trace!(%path, %segment, target = %target, "relationship target not in catalog");
                    return Ok(Resolution::NotEmbedded);
                }
            },
            FieldShape::Plain => return Ok(Resolution::NotEmbedded),
        }
    }

    Ok(Resolution::NotEmbedded)
}
