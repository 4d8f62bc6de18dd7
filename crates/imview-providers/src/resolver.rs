//! Entity resolution from backend metadata responses
//!
//! Adapters convert their native wire shapes into the closed
//! [`EntityMeta`] model at their boundary; this resolver turns metadata
//! into [`Entity`] trees. A group response carries at most one extra
//! nesting level of children; attribute values for siblings are fetched
//! concurrently and merged back by declared order, so the resulting
//! tree is deterministic regardless of completion order.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;

use imview_core::{
    build_entity_path, decode_dtype, Attribute, Dataset, Entity, EntityContent, ImviewError,
    ImviewResult,
};

use crate::api::AttrValues;
use crate::cache::AttributeCache;

/// Attribute metadata as declared by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrMeta {
    pub name: String,
    pub dtype: String,
    pub shape: Vec<usize>,
}

/// Closed tagged-union metadata model shared by all adapters
#[derive(Debug, Clone, PartialEq)]
pub enum EntityMeta {
    Group {
        name: String,
        attributes: Vec<AttrMeta>,
        /// `None` when the backend stopped at this nesting level
        children: Option<Vec<EntityMeta>>,
    },
    Dataset {
        name: String,
        attributes: Vec<AttrMeta>,
        dtype: String,
        shape: Vec<usize>,
    },
    Datatype {
        name: String,
        attributes: Vec<AttrMeta>,
    },
    Link {
        name: String,
        attributes: Vec<AttrMeta>,
        target: Option<String>,
    },
    /// Discriminant outside the known set; resolves to an unresolved
    /// entity instead of failing
    Other {
        name: String,
        attributes: Vec<AttrMeta>,
        kind: String,
    },
}

impl EntityMeta {
    pub fn name(&self) -> &str {
        match self {
            EntityMeta::Group { name, .. }
            | EntityMeta::Dataset { name, .. }
            | EntityMeta::Datatype { name, .. }
            | EntityMeta::Link { name, .. }
            | EntityMeta::Other { name, .. } => name,
        }
    }

    fn attributes(&self) -> &[AttrMeta] {
        match self {
            EntityMeta::Group { attributes, .. }
            | EntityMeta::Dataset { attributes, .. }
            | EntityMeta::Datatype { attributes, .. }
            | EntityMeta::Link { attributes, .. }
            | EntityMeta::Other { attributes, .. } => attributes,
        }
    }
}

/// Backend source of attribute values, keyed by entity path
#[async_trait]
pub trait AttrValueSource: Send + Sync {
    async fn fetch_attr_values(&self, path: &str) -> ImviewResult<AttrValues>;
}

/// Builds [`Entity`] trees from [`EntityMeta`] responses
#[derive(Clone)]
pub struct EntityResolver {
    cache: Arc<AttributeCache>,
    source: Arc<dyn AttrValueSource>,
}

impl EntityResolver {
    pub fn new(cache: Arc<AttributeCache>, source: Arc<dyn AttrValueSource>) -> Self {
        Self { cache, source }
    }

    /// Resolve `meta` into the entity at `path`
    ///
    /// `NotFound`/`AccessDenied` failures from the attribute source
    /// propagate unchanged. An undecodable dataset type degrades only
    /// the affected child; resolving such a dataset directly fails with
    /// `UnsupportedType`.
    pub async fn resolve(&self, path: &str, meta: EntityMeta) -> ImviewResult<Entity> {
        self.resolve_owned(path.to_string(), meta).await
    }

    fn resolve_owned(
        &self,
        path: String,
        meta: EntityMeta,
    ) -> Pin<Box<dyn Future<Output = ImviewResult<Entity>> + Send + '_>> {
        Box::pin(async move {
            let name = meta.name().to_string();
            let attributes = self.resolve_attributes(&path, meta.attributes()).await?;

            let content = match meta {
                EntityMeta::Group { children, .. } => EntityContent::Group {
                    children: match children {
                        Some(children) => Some(self.resolve_children(&path, children).await?),
                        None => None,
                    },
                },
                EntityMeta::Dataset { dtype, shape, .. } => EntityContent::Dataset(Dataset {
                    shape,
                    dtype: decode_dtype(&dtype)?,
                    raw_type: dtype,
                }),
                EntityMeta::Datatype { .. } => EntityContent::Datatype,
                EntityMeta::Link { target, .. } => EntityContent::Link { target },
                EntityMeta::Other { kind, .. } => {
                    tracing::debug!(path = %path, kind = %kind, "unknown entity kind, degrading to unresolved");
                    EntityContent::Unresolved
                }
            };

            Ok(Entity {
                name,
                path,
                attributes,
                content,
            })
        })
    }

    /// Fan out child resolution concurrently, then merge the results
    /// back by declared index so the order never depends on completion
    /// order
    async fn resolve_children(
        &self,
        parent_path: &str,
        children: Vec<EntityMeta>,
    ) -> ImviewResult<Vec<Entity>> {
        let mut tasks: JoinSet<(usize, ImviewResult<Entity>)> = JoinSet::new();

        for (index, child) in children.into_iter().enumerate() {
            let resolver = self.clone();
            let child_path = build_entity_path(parent_path, child.name());
            tasks.spawn(async move {
                let resolved = resolver.resolve_owned(child_path.clone(), child.clone()).await;
                // An undecodable type is terminal only for the affected
                // child; its siblings still resolve.
                let resolved = match resolved {
                    Err(ImviewError::UnsupportedType(descriptor)) => {
                        tracing::warn!(
                            path = %child_path,
                            descriptor = %descriptor,
                            "undecodable type, degrading child to unresolved"
                        );
                        Ok(Entity {
                            name: child.name().to_string(),
                            path: child_path,
                            attributes: Vec::new(),
                            content: EntityContent::Unresolved,
                        })
                    }
                    other => other,
                };
                (index, resolved)
            });
        }

        let mut by_index = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, resolved) = joined
                .map_err(|e| ImviewError::Transport(format!("child resolution failed: {e}")))?;
            by_index.insert(index, resolved);
        }

        by_index.into_values().collect()
    }

    /// Zip declared attribute metadata with fetched values
    ///
    /// Zero declared attributes short-circuit to an empty list without
    /// issuing any request.
    async fn resolve_attributes(
        &self,
        path: &str,
        metas: &[AttrMeta],
    ) -> ImviewResult<Vec<Attribute>> {
        if metas.is_empty() {
            return Ok(Vec::new());
        }

        let source = Arc::clone(&self.source);
        let values = self
            .cache
            .get_or_fetch(path, || async move { source.fetch_attr_values(path).await })
            .await?;

        metas
            .iter()
            .map(|meta| {
                Ok(Attribute {
                    name: meta.name.clone(),
                    shape: meta.shape.clone(),
                    dtype: decode_dtype(&meta.dtype)?,
                    value: values.get(&meta.name).cloned(),
                })
            })
            .collect()
    }
}
