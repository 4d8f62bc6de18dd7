//! Wire models of the interactive-kernel content API
//!
//! The kernel gateway lists group contents as a nested descriptor list
//! and mirrors the remote service's attribute/value shapes. Responses
//! are normalized into the shared [`EntityMeta`] model here.

use serde::Deserialize;

use crate::resolver::{AttrMeta, EntityMeta};

/// Attribute descriptor in a kernel meta response
#[derive(Debug, Clone, Deserialize)]
pub struct KernelAttribute {
    pub name: String,
    pub dtype: String,
    #[serde(default)]
    pub shape: Vec<usize>,
}

/// Metadata of one entity as reported by the kernel
#[derive(Debug, Clone, Deserialize)]
pub struct KernelMetaResponse {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<KernelAttribute>,
    #[serde(default)]
    pub dtype: Option<String>,
    #[serde(default)]
    pub shape: Option<Vec<usize>>,
}

impl KernelMetaResponse {
    /// Normalize into the shared model; `children` comes from a
    /// separate content-listing call and applies to groups only
    pub fn into_meta(self, children: Option<Vec<KernelMetaResponse>>) -> EntityMeta {
        let attributes: Vec<AttrMeta> = self
            .attributes
            .into_iter()
            .map(|attr| AttrMeta {
                name: attr.name,
                dtype: attr.dtype,
                shape: attr.shape,
            })
            .collect();

        match self.kind.as_str() {
            "group" => EntityMeta::Group {
                name: self.name,
                attributes,
                children: children.map(|children| {
                    children
                        .into_iter()
                        .map(|child| child.into_meta(None))
                        .collect()
                }),
            },
            "dataset" => match (self.dtype, self.shape) {
                (Some(dtype), Some(shape)) => EntityMeta::Dataset {
                    name: self.name,
                    attributes,
                    dtype,
                    shape,
                },
                _ => EntityMeta::Other {
                    name: self.name,
                    attributes,
                    kind: "dataset".to_string(),
                },
            },
            other => EntityMeta::Other {
                name: self.name,
                attributes,
                kind: other.to_string(),
            },
        }
    }
}
