//! Provider capability surface
//!
//! Every backend adapter exposes the same three operations; adapters
//! only translate their native wire shapes into the shared model and
//! hold no semantic logic of their own.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use imview_core::{Dataset, Entity, ImviewError, ImviewResult, Selection, Value};

/// Fetched attribute values of one entity, keyed by attribute name
pub type AttrValues = HashMap<String, JsonValue>;

/// Parameters of a value fetch
#[derive(Debug, Clone)]
pub struct ValueRequest {
    /// Path of the dataset being fetched
    pub path: String,
    /// Dataset payload (shape, type, raw descriptor)
    pub dataset: Dataset,
    /// Optional per-dimension selection; `None` fetches everything
    pub selection: Option<Selection>,
}

impl ValueRequest {
    /// Build a request from a resolved dataset entity
    pub fn from_entity(entity: &Entity, selection: Option<Selection>) -> ImviewResult<Self> {
        let dataset = entity.as_dataset().ok_or_else(|| {
            ImviewError::InvalidFormat(format!("entity at {} is not a dataset", entity.path))
        })?;

        Ok(ValueRequest {
            path: entity.path.clone(),
            dataset: dataset.clone(),
            selection,
        })
    }

    /// Canonical wire form of the selection; empty when absent
    pub fn selection_string(&self) -> String {
        self.selection
            .as_ref()
            .map(Selection::to_string)
            .unwrap_or_default()
    }

    /// Shape of the value after applying the selection
    pub fn selected_shape(&self) -> ImviewResult<Vec<usize>> {
        match &self.selection {
            Some(selection) => selection.shape_of(&self.dataset.shape),
            None => Ok(self.dataset.shape.clone()),
        }
    }
}

/// Common capability surface of the three backend adapters
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Resolve the entity at `path`
    ///
    /// Group responses carry at most one nesting level of children;
    /// grandchildren are resolved lazily by further calls.
    async fn get_entity(&self, path: &str) -> ImviewResult<Entity>;

    /// Fetch a dataset value, optionally sliced
    ///
    /// Returns `Ok(None)` when the request was superseded by a newer
    /// request for the same dataset and selection; the stale result is
    /// never delivered.
    async fn get_value(&self, request: &ValueRequest) -> ImviewResult<Option<Value>>;

    /// Fetch the attribute values of an entity
    ///
    /// Results are memoized per path for the provider session; an entity
    /// declaring zero attributes short-circuits without a backend call.
    async fn get_attr_values(&self, entity: &Entity) -> ImviewResult<AttrValues>;
}
