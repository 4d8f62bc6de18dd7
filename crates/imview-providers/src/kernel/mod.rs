//! Interactive-kernel adapter
//!
//! Content-listing and read operations are proxied through a remote
//! execution channel (a kernel gateway) and normalized to the same
//! response shapes as the remote service adapter. The channel itself
//! sits behind [`KernelTransport`] so sessions can run against any
//! execution backend.

pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use imview_core::{Entity, ImviewError, ImviewResult, Value};

use crate::api::{AttrValues, DataProvider, ValueRequest};
use crate::cache::AttributeCache;
use crate::fetcher::{RawValue, ValueFetcher};
use crate::remote::{HttpRemoteClient, RemoteClient};
use crate::resolver::{AttrValueSource, EntityResolver};

use models::KernelMetaResponse;

/// One operation proxied through the execution channel
#[derive(Debug, Clone)]
pub enum KernelRequest {
    /// Metadata of a single entity
    Meta { path: String },
    /// Content listing of a group (direct children)
    Contents { path: String },
    /// Attribute values of an entity
    AttrValues { path: String },
    /// Dataset value, binary or JSON
    Data {
        path: String,
        selection: Option<String>,
        binary: bool,
    },
}

/// Reply from the execution channel
#[derive(Debug, Clone)]
pub enum KernelReply {
    Json(JsonValue),
    Bytes(Vec<u8>),
}

impl KernelReply {
    fn into_json(self) -> ImviewResult<JsonValue> {
        match self {
            KernelReply::Json(json) => Ok(json),
            KernelReply::Bytes(_) => Err(ImviewError::InvalidFormat(
                "expected JSON reply from kernel".to_string(),
            )),
        }
    }

    fn into_bytes(self) -> ImviewResult<Vec<u8>> {
        match self {
            KernelReply::Bytes(bytes) => Ok(bytes),
            KernelReply::Json(_) => Err(ImviewError::InvalidFormat(
                "expected binary reply from kernel".to_string(),
            )),
        }
    }
}

/// Remote execution channel
#[async_trait]
pub trait KernelTransport: Send + Sync {
    async fn execute(&self, request: KernelRequest) -> ImviewResult<KernelReply>;
}

/// Kernel gateway transport over HTTP
///
/// Serves the kernel content API of a gateway at `base_url` for one
/// served file (`domain`).
pub struct HttpKernelTransport {
    client: HttpRemoteClient,
    domain: String,
}

impl HttpKernelTransport {
    pub fn new(base_url: &str, domain: &str) -> ImviewResult<Self> {
        Ok(Self {
            client: HttpRemoteClient::new(base_url, Vec::new())?,
            domain: domain.to_string(),
        })
    }

    fn uri_query(&self, path: &str) -> Vec<(String, String)> {
        vec![("uri".to_string(), path.to_string())]
    }

    fn endpoint(&self, route: &str) -> String {
        format!("hdf/{route}/{}", self.domain)
    }
}

#[async_trait]
impl KernelTransport for HttpKernelTransport {
    async fn execute(&self, request: KernelRequest) -> ImviewResult<KernelReply> {
        match request {
            KernelRequest::Meta { path } => Ok(KernelReply::Json(
                self.client
                    .get_json(&self.endpoint("meta"), &self.uri_query(&path))
                    .await?,
            )),
            KernelRequest::Contents { path } => Ok(KernelReply::Json(
                self.client
                    .get_json(&self.endpoint("contents"), &self.uri_query(&path))
                    .await?,
            )),
            KernelRequest::AttrValues { path } => Ok(KernelReply::Json(
                self.client
                    .get_json(&self.endpoint("attrs"), &self.uri_query(&path))
                    .await?,
            )),
            KernelRequest::Data {
                path,
                selection,
                binary,
            } => {
                let mut query = self.uri_query(&path);
                if let Some(selection) = selection {
                    query.push(("select".to_string(), selection));
                }
                if binary {
                    query.push(("format".to_string(), "bin".to_string()));
                    Ok(KernelReply::Bytes(
                        self.client.get_bytes(&self.endpoint("data"), &query).await?,
                    ))
                } else {
                    Ok(KernelReply::Json(
                        self.client.get_json(&self.endpoint("data"), &query).await?,
                    ))
                }
            }
        }
    }
}

struct KernelAttrSource {
    transport: Arc<dyn KernelTransport>,
}

#[async_trait]
impl AttrValueSource for KernelAttrSource {
    async fn fetch_attr_values(&self, path: &str) -> ImviewResult<AttrValues> {
        let reply = self
            .transport
            .execute(KernelRequest::AttrValues {
                path: path.to_string(),
            })
            .await?;
        parse_attr_values(reply.into_json()?)
    }
}

fn parse_attr_values(json: JsonValue) -> ImviewResult<AttrValues> {
    match json {
        JsonValue::Object(map) => Ok(map.into_iter().collect()),
        other => Err(ImviewError::InvalidFormat(format!(
            "expected attribute mapping, got {other}"
        ))),
    }
}

/// Interactive-kernel provider session
pub struct KernelApi {
    transport: Arc<dyn KernelTransport>,
    cache: Arc<AttributeCache>,
    resolver: EntityResolver,
    fetcher: ValueFetcher,
}

impl KernelApi {
    /// Connect to a kernel gateway serving `domain`
    pub fn new(base_url: &str, domain: &str) -> ImviewResult<Self> {
        let transport = Arc::new(HttpKernelTransport::new(base_url, domain)?);
        Ok(Self::with_transport(transport))
    }

    /// Build a session over any execution channel
    pub fn with_transport(transport: Arc<dyn KernelTransport>) -> Self {
        let cache = Arc::new(AttributeCache::new());
        let source = Arc::new(KernelAttrSource {
            transport: Arc::clone(&transport),
        });
        let resolver = EntityResolver::new(Arc::clone(&cache), source);

        Self {
            transport,
            cache,
            resolver,
            fetcher: ValueFetcher::new(),
        }
    }

    async fn fetch_meta(&self, path: &str) -> ImviewResult<KernelMetaResponse> {
        let reply = self
            .transport
            .execute(KernelRequest::Meta {
                path: path.to_string(),
            })
            .await?;
        serde_json::from_value(reply.into_json()?)
            .map_err(|e| ImviewError::InvalidFormat(format!("invalid kernel meta: {e}")))
    }

    async fn fetch_contents(&self, path: &str) -> ImviewResult<Vec<KernelMetaResponse>> {
        let reply = self
            .transport
            .execute(KernelRequest::Contents {
                path: path.to_string(),
            })
            .await?;
        serde_json::from_value(reply.into_json()?)
            .map_err(|e| ImviewError::InvalidFormat(format!("invalid kernel contents: {e}")))
    }
}

#[async_trait]
impl DataProvider for KernelApi {
    async fn get_entity(&self, path: &str) -> ImviewResult<Entity> {
        let meta = self.fetch_meta(path).await?;

        // Groups list their direct children through a separate
        // content-listing call; everything else resolves from the meta
        // response alone.
        let children = if meta.kind == "group" {
            Some(self.fetch_contents(path).await?)
        } else {
            None
        };

        self.resolver.resolve(path, meta.into_meta(children)).await
    }

    async fn get_value(&self, request: &ValueRequest) -> ImviewResult<Option<Value>> {
        let binary = request.dataset.dtype.is_binary_fetchable();
        let kernel_request = KernelRequest::Data {
            path: request.path.clone(),
            selection: request.selection.as_ref().map(|s| s.to_string()),
            binary,
        };
        let transport = Arc::clone(&self.transport);

        self.fetcher
            .fetch(request, || async move {
                let reply = transport.execute(kernel_request).await?;
                if binary {
                    reply.into_bytes().map(RawValue::Binary)
                } else {
                    reply.into_json().map(RawValue::Structured)
                }
            })
            .await
    }

    async fn get_attr_values(&self, entity: &Entity) -> ImviewResult<AttrValues> {
        if entity.attributes.is_empty() {
            return Ok(AttrValues::new());
        }

        let transport = Arc::clone(&self.transport);
        let path = entity.path.clone();
        self.cache
            .get_or_fetch(&entity.path, || async move {
                let reply = transport
                    .execute(KernelRequest::AttrValues { path })
                    .await?;
                parse_attr_values(reply.into_json()?)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use imview_core::EntityKind;

    struct FakeKernel;

    #[async_trait]
    impl KernelTransport for FakeKernel {
        async fn execute(&self, request: KernelRequest) -> ImviewResult<KernelReply> {
            match request {
                KernelRequest::Meta { path } => Ok(KernelReply::Json(match path.as_str() {
                    "/" => serde_json::json!({ "name": "", "type": "group" }),
                    "/spectrum" => serde_json::json!({
                        "name": "spectrum", "type": "dataset",
                        "dtype": "<u2", "shape": [2]
                    }),
                    _ => return Err(ImviewError::EntityNotFound(path)),
                })),
                KernelRequest::Contents { path } => {
                    assert_eq!(path, "/");
                    Ok(KernelReply::Json(serde_json::json!([
                        { "name": "spectrum", "type": "dataset", "dtype": "<u2", "shape": [2] },
                        { "name": "mystery", "type": "external_widget" }
                    ])))
                }
                KernelRequest::AttrValues { .. } => {
                    Ok(KernelReply::Json(serde_json::json!({})))
                }
                KernelRequest::Data { binary, .. } => {
                    assert!(binary);
                    Ok(KernelReply::Bytes(
                        [7u16, 9].iter().flat_map(|x| x.to_le_bytes()).collect(),
                    ))
                }
            }
        }
    }

    fn api() -> KernelApi {
        KernelApi::with_transport(Arc::new(FakeKernel))
    }

    #[tokio::test]
    async fn test_content_listing_normalizes_to_shared_model() {
        let api = api();

        let root = api.get_entity("/").await.unwrap();
        assert_eq!(root.kind(), EntityKind::Group);

        let children = root.children().unwrap();
        assert_eq!(children[0].kind(), EntityKind::Dataset);
        // Unknown kinds from the kernel degrade instead of failing
        assert_eq!(children[1].kind(), EntityKind::Unresolved);
    }

    #[tokio::test]
    async fn test_binary_value_read() {
        let api = api();

        let root = api.get_entity("/").await.unwrap();
        let request = ValueRequest::from_entity(root.child("spectrum").unwrap(), None).unwrap();

        let value = api.get_value(&request).await.unwrap().unwrap();
        assert_eq!(
            value,
            Value::Numeric(imview_core::NumericArray::U16(vec![7, 9]))
        );
    }

    #[tokio::test]
    async fn test_missing_entity_propagates() {
        let api = api();
        let err = api.get_entity("/nope").await.unwrap_err();
        assert_eq!(err.kind(), imview_core::ErrorKind::EntityNotFound);
    }
}
