//! In-process storage engine over an in-memory snapshot
//!
//! A snapshot is one read-only virtual file: a magic signature followed
//! by a bincode-encoded node tree. The engine validates the signature,
//! decodes the tree once, and serves synchronous lookups against it.
//! Attribute values are stored as JSON text so the snapshot stays
//! self-describing for structured data.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use imview_core::{ImviewError, ImviewResult, NumericArray, Selection};

/// Signature at the start of every snapshot buffer
pub const SNAPSHOT_MAGIC: &[u8; 8] = b"IMVSNAP1";

/// Attribute stored in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotAttr {
    pub name: String,
    pub dtype: String,
    pub shape: Vec<usize>,
    /// JSON-encoded attribute value
    pub value: String,
}

/// Dataset payload stored in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SnapshotData {
    /// Fixed-width numeric elements, row-major
    Numeric(NumericArray),
    /// JSON-encoded structured value (strings, compounds, ...)
    Json(String),
}

/// Node of the snapshot tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SnapshotNode {
    Group {
        attributes: Vec<SnapshotAttr>,
        /// Insertion order is the enumeration order seen by consumers
        children: Vec<(String, SnapshotNode)>,
    },
    Dataset {
        dtype: String,
        shape: Vec<usize>,
        attributes: Vec<SnapshotAttr>,
        data: SnapshotData,
    },
    Link {
        target: String,
        attributes: Vec<SnapshotAttr>,
    },
}

impl SnapshotNode {
    /// Encode this tree as a snapshot buffer (used to build fixtures)
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = SNAPSHOT_MAGIC.to_vec();
        bytes.extend(bincode::serialize(self).expect("snapshot trees are always encodable"));
        bytes
    }

    pub fn attributes(&self) -> &[SnapshotAttr] {
        match self {
            SnapshotNode::Group { attributes, .. }
            | SnapshotNode::Dataset { attributes, .. }
            | SnapshotNode::Link { attributes, .. } => attributes,
        }
    }
}

/// Value read from the engine, before provider-level decoding
#[derive(Debug, Clone)]
pub enum EngineValue {
    Numeric(NumericArray),
    Structured(JsonValue),
}

/// Read-only handle over one in-memory snapshot
#[derive(Debug)]
pub struct EngineFile {
    filename: String,
    root: SnapshotNode,
}

impl EngineFile {
    /// Validate the signature and decode the node tree
    pub fn open(filename: &str, bytes: &[u8]) -> ImviewResult<Self> {
        let payload = bytes
            .strip_prefix(SNAPSHOT_MAGIC.as_slice())
            .ok_or_else(|| {
                ImviewError::InvalidFormat(format!("{filename} is not a valid snapshot"))
            })?;

        let root: SnapshotNode = bincode::deserialize(payload).map_err(|e| {
            ImviewError::InvalidFormat(format!("failed to decode snapshot {filename}: {e}"))
        })?;

        if !matches!(root, SnapshotNode::Group { .. }) {
            return Err(ImviewError::InvalidFormat(format!(
                "snapshot {filename} has no root group"
            )));
        }

        Ok(Self {
            filename: filename.to_string(),
            root,
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Look up the node at an absolute path
    pub fn node(&self, path: &str) -> ImviewResult<&SnapshotNode> {
        let mut node = &self.root;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            match node {
                SnapshotNode::Group { children, .. } => {
                    node = children
                        .iter()
                        .find(|(name, _)| name == segment)
                        .map(|(_, child)| child)
                        .ok_or_else(|| ImviewError::EntityNotFound(path.to_string()))?;
                }
                _ => return Err(ImviewError::EntityNotFound(path.to_string())),
            }
        }
        Ok(node)
    }

    /// Parsed attribute values of the node at `path`
    pub fn attr_values(&self, path: &str) -> ImviewResult<Vec<(String, JsonValue)>> {
        let node = self.node(path)?;
        node.attributes()
            .iter()
            .map(|attr| {
                let value: JsonValue = serde_json::from_str(&attr.value).map_err(|e| {
                    ImviewError::InvalidFormat(format!(
                        "bad attribute value for {path}@{}: {e}",
                        attr.name
                    ))
                })?;
                Ok((attr.name.clone(), value))
            })
            .collect()
    }

    /// Read a dataset value, applying the selection engine-side
    pub fn read(&self, path: &str, selection: Option<&Selection>) -> ImviewResult<EngineValue> {
        let (shape, data) = match self.node(path)? {
            SnapshotNode::Dataset { shape, data, .. } => (shape, data),
            _ => {
                return Err(ImviewError::InvalidFormat(format!(
                    "entity at {path} is not a dataset"
                )))
            }
        };

        match data {
            SnapshotData::Numeric(array) => {
                let array = match selection {
                    Some(selection) if !selection.is_empty() => {
                        array.take_indices(&flat_offsets(selection, shape)?)?
                    }
                    _ => array.clone(),
                };
                Ok(EngineValue::Numeric(array))
            }
            SnapshotData::Json(text) => {
                let json: JsonValue = serde_json::from_str(text).map_err(|e| {
                    ImviewError::InvalidFormat(format!("bad stored value at {path}: {e}"))
                })?;

                match selection {
                    Some(selection) if !selection.is_empty() => {
                        let elems = imview_core::flatten_value(json, shape)?;
                        let mut selected: Vec<JsonValue> = flat_offsets(selection, shape)?
                            .into_iter()
                            .map(|i| elems[i].clone())
                            .collect();
                        // A fully-indexed selection yields the element
                        // itself, like the remote JSON transport does
                        if selection.shape_of(shape)?.is_empty() && selected.len() == 1 {
                            return Ok(EngineValue::Structured(selected.remove(0)));
                        }
                        Ok(EngineValue::Structured(JsonValue::Array(selected)))
                    }
                    _ => Ok(EngineValue::Structured(json)),
                }
            }
        }
    }
}

/// Row-major flat offsets of the selected elements
fn flat_offsets(selection: &Selection, dims: &[usize]) -> ImviewResult<Vec<usize>> {
    let per_dim = selection.dim_indices(dims)?;

    // Row-major strides
    let mut strides = vec![1usize; dims.len()];
    for dim in (0..dims.len().saturating_sub(1)).rev() {
        strides[dim] = strides[dim + 1] * dims[dim + 1];
    }

    let mut offsets = vec![0usize];
    for (dim, indices) in per_dim.iter().enumerate() {
        let mut next = Vec::with_capacity(offsets.len() * indices.len());
        for base in &offsets {
            for index in indices {
                next.push(base + index * strides[dim]);
            }
        }
        offsets = next;
    }
    Ok(offsets)
}
