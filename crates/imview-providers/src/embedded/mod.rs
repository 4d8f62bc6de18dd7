//! Embedded in-process engine adapter
//!
//! Opens one read-only handle over an in-memory snapshot buffer and
//! serves the provider surface from synchronous engine lookups wrapped
//! as asynchronous operations, for interface parity with the remote
//! adapters.

pub mod engine;

use std::sync::Arc;

use async_trait::async_trait;

use imview_core::{Entity, ImviewResult, Value};

use crate::api::{AttrValues, DataProvider, ValueRequest};
use crate::cache::AttributeCache;
use crate::fetcher::{RawValue, ValueFetcher};
use crate::resolver::{AttrMeta, AttrValueSource, EntityMeta, EntityResolver};

use engine::{EngineFile, EngineValue, SnapshotAttr, SnapshotNode};

fn attr_metas(attrs: &[SnapshotAttr]) -> Vec<AttrMeta> {
    attrs
        .iter()
        .map(|attr| AttrMeta {
            name: attr.name.clone(),
            dtype: attr.dtype.clone(),
            shape: attr.shape.clone(),
        })
        .collect()
}

/// Convert an engine node into the shared metadata model
///
/// `depth` bounds the nesting: the requested entity carries its direct
/// children, whose own children stay unresolved.
fn node_meta(name: &str, node: &SnapshotNode, depth: usize) -> EntityMeta {
    match node {
        SnapshotNode::Group {
            attributes,
            children,
        } => EntityMeta::Group {
            name: name.to_string(),
            attributes: attr_metas(attributes),
            children: if depth > 0 {
                Some(
                    children
                        .iter()
                        .map(|(child_name, child)| node_meta(child_name, child, depth - 1))
                        .collect(),
                )
            } else {
                None
            },
        },
        SnapshotNode::Dataset {
            dtype,
            shape,
            attributes,
            ..
        } => EntityMeta::Dataset {
            name: name.to_string(),
            attributes: attr_metas(attributes),
            dtype: dtype.clone(),
            shape: shape.clone(),
        },
        SnapshotNode::Link { target, attributes } => EntityMeta::Link {
            name: name.to_string(),
            attributes: attr_metas(attributes),
            target: Some(target.clone()),
        },
    }
}

struct EngineAttrSource {
    engine: Arc<EngineFile>,
}

#[async_trait]
impl AttrValueSource for EngineAttrSource {
    async fn fetch_attr_values(&self, path: &str) -> ImviewResult<AttrValues> {
        Ok(self.engine.attr_values(path)?.into_iter().collect())
    }
}

/// Embedded engine provider session
pub struct EmbeddedApi {
    engine: Arc<EngineFile>,
    cache: Arc<AttributeCache>,
    resolver: EntityResolver,
    fetcher: ValueFetcher,
}

impl EmbeddedApi {
    /// Validate and decode `bytes` as a snapshot of `filename`
    pub fn open(filename: &str, bytes: &[u8]) -> ImviewResult<Self> {
        let engine = Arc::new(EngineFile::open(filename, bytes)?);
        let cache = Arc::new(AttributeCache::new());
        let source = Arc::new(EngineAttrSource {
            engine: Arc::clone(&engine),
        });
        let resolver = EntityResolver::new(Arc::clone(&cache), source);

        Ok(Self {
            engine,
            cache,
            resolver,
            fetcher: ValueFetcher::new(),
        })
    }
}

#[async_trait]
impl DataProvider for EmbeddedApi {
    async fn get_entity(&self, path: &str) -> ImviewResult<Entity> {
        let node = self.engine.node(path)?;
        let meta = node_meta(imview_core::name_from_path(path), node, 1);
        self.resolver.resolve(path, meta).await
    }

    async fn get_value(&self, request: &ValueRequest) -> ImviewResult<Option<Value>> {
        let engine = Arc::clone(&self.engine);
        let path = request.path.clone();
        let selection = request.selection.clone();

        self.fetcher
            .fetch(request, || async move {
                Ok(match engine.read(&path, selection.as_ref())? {
                    EngineValue::Numeric(array) => RawValue::Typed(array),
                    EngineValue::Structured(json) => RawValue::Structured(json),
                })
            })
            .await
    }

    async fn get_attr_values(&self, entity: &Entity) -> ImviewResult<AttrValues> {
        if entity.attributes.is_empty() {
            return Ok(AttrValues::new());
        }

        let engine = Arc::clone(&self.engine);
        let path = entity.path.clone();
        self.cache
            .get_or_fetch(&entity.path, || async move {
                Ok(engine.attr_values(&path)?.into_iter().collect())
            })
            .await
    }
}
