//! In-memory provider and entity builders
//!
//! Builds fully-resolved entity trees for tests and demos without any
//! backend. Values and attribute values are served from the prebuilt
//! tree; entity lookups still honor the one-nesting-level contract of
//! real adapters.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use imview_core::{
    build_entity_path, decode_dtype, Attribute, Dataset, Entity, EntityContent, ImviewError,
    ImviewResult, Value,
};

use crate::api::{AttrValues, DataProvider, ValueRequest};

/// Scalar string attribute with a value
pub fn make_str_attr(name: &str, value: &str) -> Attribute {
    make_attr(name, "|O", JsonValue::from(value))
}

/// Scalar attribute of the given descriptor with a value
pub fn make_attr(name: &str, descriptor: &str, value: JsonValue) -> Attribute {
    Attribute {
        name: name.to_string(),
        shape: Vec::new(),
        dtype: decode_dtype(descriptor).expect("mock attribute descriptors are valid"),
        value: Some(value),
    }
}

/// Dataset entity rooted at `/name`; nest it with [`make_group`]
pub fn make_dataset(name: &str, descriptor: &str, shape: Vec<usize>) -> Entity {
    Entity {
        name: name.to_string(),
        path: format!("/{name}"),
        attributes: Vec::new(),
        content: EntityContent::Dataset(Dataset {
            shape,
            dtype: decode_dtype(descriptor).expect("mock dataset descriptors are valid"),
            raw_type: descriptor.to_string(),
        }),
    }
}

/// Group entity rooted at `/name`; children paths are re-rooted under it
pub fn make_group(name: &str, attributes: Vec<Attribute>, children: Vec<Entity>) -> Entity {
    let mut group = Entity {
        name: name.to_string(),
        path: format!("/{name}"),
        attributes,
        content: EntityContent::Group {
            children: Some(children),
        },
    };
    reroot_children(&mut group);
    group
}

/// Root group over the given children
pub fn make_root(children: Vec<Entity>) -> Entity {
    let mut root = Entity {
        name: String::new(),
        path: "/".to_string(),
        attributes: Vec::new(),
        content: EntityContent::Group {
            children: Some(children),
        },
    };
    reroot_children(&mut root);
    root
}

/// Plottable group with `NX_class`, `signal` and (optionally) `axes`
/// attributes set; pass more attributes via [`with_attributes`]
pub fn make_nx_data_group(
    name: &str,
    signal: &str,
    axes: &[&str],
    children: Vec<Entity>,
) -> Entity {
    let mut attributes = vec![
        make_str_attr("NX_class", "NXdata"),
        make_str_attr("signal", signal),
    ];
    if !axes.is_empty() {
        attributes.push(make_attr("axes", "|O", JsonValue::from(axes.to_vec())));
    }
    make_group(name, attributes, children)
}

/// Attach attributes to an existing entity
pub fn with_attributes(mut entity: Entity, attributes: Vec<Attribute>) -> Entity {
    entity.attributes.extend(attributes);
    entity
}

fn reroot_children(group: &mut Entity) {
    let parent_path = group.path.clone();
    if let EntityContent::Group {
        children: Some(children),
    } = &mut group.content
    {
        for child in children {
            child.path = build_entity_path(&parent_path, &child.name);
            reroot_children(child);
        }
    }
}

/// Provider over a prebuilt entity tree and value store
pub struct MockProvider {
    root: Entity,
    values: HashMap<String, Value>,
}

impl MockProvider {
    pub fn new(root: Entity) -> Self {
        Self {
            root,
            values: HashMap::new(),
        }
    }

    /// Serve `value` for the dataset at `path`
    pub fn with_value(mut self, path: &str, value: Value) -> Self {
        self.values.insert(path.to_string(), value);
        self
    }

    fn find<'a>(entity: &'a Entity, path: &str) -> Option<&'a Entity> {
        if entity.path == path {
            return Some(entity);
        }
        entity
            .children()?
            .iter()
            .find_map(|child| Self::find(child, path))
    }

    /// Clone with grandchildren stripped, matching real adapters'
    /// one-nesting-level responses
    fn one_level(entity: &Entity) -> Entity {
        let mut clone = entity.clone();
        if let EntityContent::Group {
            children: Some(children),
        } = &mut clone.content
        {
            for child in children {
                if let EntityContent::Group { children } = &mut child.content {
                    *children = None;
                }
            }
        }
        clone
    }
}

#[async_trait]
impl DataProvider for MockProvider {
    async fn get_entity(&self, path: &str) -> ImviewResult<Entity> {
        Self::find(&self.root, path)
            .map(Self::one_level)
            .ok_or_else(|| ImviewError::EntityNotFound(path.to_string()))
    }

    async fn get_value(&self, request: &ValueRequest) -> ImviewResult<Option<Value>> {
        self.values
            .get(&request.path)
            .cloned()
            .map(Some)
            .ok_or_else(|| ImviewError::EntityNotFound(request.path.clone()))
    }

    async fn get_attr_values(&self, entity: &Entity) -> ImviewResult<AttrValues> {
        let found = Self::find(&self.root, &entity.path)
            .ok_or_else(|| ImviewError::EntityNotFound(entity.path.clone()))?;

        Ok(found
            .attributes
            .iter()
            .filter_map(|attr| attr.value.clone().map(|v| (attr.name.clone(), v)))
            .collect())
    }
}
