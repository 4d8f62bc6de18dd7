//! Entities of the hierarchical dataset tree
//!
//! An entity is a named, path-addressed node: group, dataset, named
//! datatype, link, or unresolved. Entities are immutable once resolved,
//! except that a group may have children attached by a later resolution
//! of the same path.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::dtype::DType;

/// Kind discriminant of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Group,
    Dataset,
    Datatype,
    Link,
    Unresolved,
}

/// Attribute attached to an entity
///
/// The value is optional until fetched from the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub value: Option<JsonValue>,
}

/// Dataset payload: shape, semantic type, and the backend-native
/// descriptor retained for re-query purposes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dimension sizes; empty means scalar
    pub shape: Vec<usize>,
    pub dtype: DType,
    pub raw_type: String,
}

impl Dataset {
    /// Whether the dataset holds a single element
    pub fn is_scalar(&self) -> bool {
        self.shape.is_empty()
    }

    /// Number of dimensions
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

/// Kind-specific payload of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityContent {
    /// `children: None` means the children have not been resolved yet;
    /// resolution returns at most one nesting level per call.
    Group { children: Option<Vec<Entity>> },
    Dataset(Dataset),
    Datatype,
    Link { target: Option<String> },
    Unresolved,
}

/// A node in the hierarchical dataset tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub path: String,
    pub attributes: Vec<Attribute>,
    pub content: EntityContent,
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self.content {
            EntityContent::Group { .. } => EntityKind::Group,
            EntityContent::Dataset(_) => EntityKind::Dataset,
            EntityContent::Datatype => EntityKind::Datatype,
            EntityContent::Link { .. } => EntityKind::Link,
            EntityContent::Unresolved => EntityKind::Unresolved,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self.content, EntityContent::Group { .. })
    }

    pub fn as_dataset(&self) -> Option<&Dataset> {
        match &self.content {
            EntityContent::Dataset(dataset) => Some(dataset),
            _ => None,
        }
    }

    /// Resolved children, if this is a group whose children were resolved
    pub fn children(&self) -> Option<&[Entity]> {
        match &self.content {
            EntityContent::Group { children } => children.as_deref(),
            _ => None,
        }
    }

    /// Find a direct child by name
    pub fn child(&self, name: &str) -> Option<&Entity> {
        self.children()?.iter().find(|c| c.name == name)
    }

    /// Attach children produced by a later resolution of this path
    ///
    /// Only fills in missing children; an already-resolved group is left
    /// untouched.
    pub fn attach_children(&mut self, new_children: Vec<Entity>) {
        if let EntityContent::Group { children } = &mut self.content {
            if children.is_none() {
                *children = Some(new_children);
            }
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Fetched value of an attribute, if any
    pub fn attr_value(&self, name: &str) -> Option<&JsonValue> {
        self.attribute(name)?.value.as_ref()
    }

    /// Attribute value as a string
    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr_value(name)?.as_str()
    }

    /// Attribute value as a list of strings; a single string is promoted
    /// to a one-element list
    pub fn attr_str_list(&self, name: &str) -> Option<Vec<String>> {
        match self.attr_value(name)? {
            JsonValue::String(s) => Some(vec![s.clone()]),
            JsonValue::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
            ),
            _ => None,
        }
    }
}

/// Join a parent path and a child name
pub fn build_entity_path(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// Last path segment; empty for the root path
pub fn name_from_path(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::decode_dtype;

    fn dataset_entity(name: &str, path: &str) -> Entity {
        Entity {
            name: name.to_string(),
            path: path.to_string(),
            attributes: Vec::new(),
            content: EntityContent::Dataset(Dataset {
                shape: vec![3, 2],
                dtype: decode_dtype("<f8").unwrap(),
                raw_type: "<f8".to_string(),
            }),
        }
    }

    #[test]
    fn test_build_entity_path() {
        assert_eq!(build_entity_path("/", "entry"), "/entry");
        assert_eq!(build_entity_path("/entry", "data"), "/entry/data");
    }

    #[test]
    fn test_name_from_path() {
        assert_eq!(name_from_path("/entry/data"), "data");
        assert_eq!(name_from_path("/"), "");
    }

    #[test]
    fn test_child_lookup() {
        let group = Entity {
            name: "entry".to_string(),
            path: "/entry".to_string(),
            attributes: Vec::new(),
            content: EntityContent::Group {
                children: Some(vec![dataset_entity("x", "/entry/x")]),
            },
        };

        assert_eq!(group.kind(), EntityKind::Group);
        assert!(group.child("x").is_some());
        assert!(group.child("y").is_none());
    }

    #[test]
    fn test_attach_children_only_once() {
        let mut group = Entity {
            name: "entry".to_string(),
            path: "/entry".to_string(),
            attributes: Vec::new(),
            content: EntityContent::Group { children: None },
        };

        group.attach_children(vec![dataset_entity("x", "/entry/x")]);
        group.attach_children(vec![]);

        assert_eq!(group.children().unwrap().len(), 1);
    }

    #[test]
    fn test_attr_str_list_promotes_single_string() {
        let entity = Entity {
            name: "data".to_string(),
            path: "/data".to_string(),
            attributes: vec![Attribute {
                name: "axes".to_string(),
                shape: Vec::new(),
                dtype: decode_dtype("|S10").unwrap(),
                value: Some(serde_json::json!("x")),
            }],
            content: EntityContent::Group { children: None },
        };

        assert_eq!(entity.attr_str_list("axes"), Some(vec!["x".to_string()]));
    }
}
