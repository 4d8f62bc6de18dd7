//! Wire models of the remote metadata/data service

use serde::Deserialize;

use crate::resolver::{AttrMeta, EntityMeta};

/// Attribute descriptor as returned by the `meta` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteAttribute {
    pub name: String,
    pub dtype: String,
    #[serde(default)]
    pub shape: Vec<usize>,
}

impl From<RemoteAttribute> for AttrMeta {
    fn from(attr: RemoteAttribute) -> Self {
        AttrMeta {
            name: attr.name,
            dtype: attr.dtype,
            shape: attr.shape,
        }
    }
}

/// One-level entity metadata as returned by the `meta` endpoint
///
/// The discriminant is an open string on the wire; it is narrowed into
/// the closed [`EntityMeta`] model at this boundary and unknown kinds
/// degrade to [`EntityMeta::Other`].
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteEntityResponse {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<RemoteAttribute>,
    /// Direct children; present for groups only, and only one level deep
    #[serde(default)]
    pub children: Option<Vec<RemoteEntityResponse>>,
    #[serde(default)]
    pub dtype: Option<String>,
    #[serde(default)]
    pub shape: Option<Vec<usize>>,
    #[serde(default)]
    pub target_path: Option<String>,
}

impl RemoteEntityResponse {
    pub fn into_meta(self) -> EntityMeta {
        let attributes = self.attributes.into_iter().map(AttrMeta::from).collect();

        match self.kind.as_str() {
            "group" => EntityMeta::Group {
                name: self.name,
                attributes,
                children: self
                    .children
                    .map(|children| children.into_iter().map(Self::into_meta).collect()),
            },
            "dataset" => match (self.dtype, self.shape) {
                (Some(dtype), Some(shape)) => EntityMeta::Dataset {
                    name: self.name,
                    attributes,
                    dtype,
                    shape,
                },
                // A dataset without type or shape is malformed rather
                // than unknown; degrade it all the same so one bad
                // entry cannot poison its siblings.
                _ => EntityMeta::Other {
                    name: self.name,
                    attributes,
                    kind: "dataset".to_string(),
                },
            },
            "datatype" => EntityMeta::Datatype {
                name: self.name,
                attributes,
            },
            "soft_link" | "external_link" => EntityMeta::Link {
                name: self.name,
                attributes,
                target: self.target_path,
            },
            other => EntityMeta::Other {
                name: self.name,
                attributes,
                kind: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_response_converts_one_level() {
        let json = serde_json::json!({
            "name": "entry",
            "type": "group",
            "attributes": [{ "name": "NX_class", "dtype": "|S7", "shape": [] }],
            "children": [
                { "name": "data", "type": "dataset", "dtype": "<f8", "shape": [10] },
                { "name": "sub", "type": "group" }
            ]
        });

        let response: RemoteEntityResponse = serde_json::from_value(json).unwrap();
        match response.into_meta() {
            EntityMeta::Group { children, .. } => {
                let children = children.unwrap();
                assert_eq!(children.len(), 2);
                assert!(matches!(children[0], EntityMeta::Dataset { .. }));
                assert!(matches!(
                    children[1],
                    EntityMeta::Group { children: None, .. }
                ));
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kind_becomes_other() {
        let json = serde_json::json!({ "name": "x", "type": "quantum_link" });
        let response: RemoteEntityResponse = serde_json::from_value(json).unwrap();
        assert!(matches!(response.into_meta(), EntityMeta::Other { .. }));
    }

    #[test]
    fn test_dataset_without_dtype_degrades() {
        let json = serde_json::json!({ "name": "x", "type": "dataset" });
        let response: RemoteEntityResponse = serde_json::from_value(json).unwrap();
        assert!(matches!(response.into_meta(), EntityMeta::Other { .. }));
    }
}
