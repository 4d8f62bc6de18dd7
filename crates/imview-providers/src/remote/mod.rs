//! Remote metadata/data service adapter
//!
//! Talks to a stateless HTTP service exposing three endpoints:
//! `meta` (one-level entity metadata), `attr` (attribute values), and
//! `data` (dataset values, raw bytes with `format=bin` or JSON
//! otherwise). This adapter only translates wire shapes; resolution,
//! caching, and supersession live in the shared components.

pub mod models;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use imview_core::{Entity, ImviewError, ImviewResult, Value};

use crate::api::{AttrValues, DataProvider, ValueRequest};
use crate::cache::AttributeCache;
use crate::fetcher::{RawValue, ValueFetcher};
use crate::resolver::{AttrValueSource, EntityResolver};

use models::RemoteEntityResponse;

/// Transport seam over the remote service
///
/// The production implementation is [`HttpRemoteClient`]; tests provide
/// an in-process fake.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn get_json(&self, endpoint: &str, query: &[(String, String)])
        -> ImviewResult<JsonValue>;
    async fn get_bytes(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> ImviewResult<Vec<u8>>;
}

/// reqwest-backed [`RemoteClient`]
pub struct HttpRemoteClient {
    client: reqwest::Client,
    base_url: url::Url,
    extra_query: Vec<(String, String)>,
}

impl HttpRemoteClient {
    pub fn new(base_url: &str, extra_query: Vec<(String, String)>) -> ImviewResult<Self> {
        let base_url = url::Url::parse(base_url)
            .map_err(|e| ImviewError::InvalidFormat(format!("invalid base URL: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            client,
            base_url,
            extra_query,
        })
    }

    async fn get(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> ImviewResult<reqwest::Response> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| ImviewError::InvalidFormat(format!("invalid endpoint: {e}")))?;
        url.query_pairs_mut()
            .extend_pairs(self.extra_query.iter().map(|(k, v)| (k, v)))
            .extend_pairs(query.iter().map(|(k, v)| (k, v)));

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImviewError::Transport(e.to_string()))?;

        map_status(response).await
    }
}

/// Map HTTP failures onto the shared error taxonomy
///
/// The service reports both missing files and bad paths as 404; the
/// body text tells them apart.
async fn map_status(response: reqwest::Response) -> ImviewResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status.as_u16() {
        404 if body.contains("File not found") => ImviewError::FileNotFound(body),
        404 if body.contains("not a valid path") => ImviewError::EntityNotFound(body),
        403 => ImviewError::AccessDenied(body),
        _ => ImviewError::Transport(format!("{status}: {body}")),
    })
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn get_json(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> ImviewResult<JsonValue> {
        self.get(endpoint, query)
            .await?
            .json()
            .await
            .map_err(|e| ImviewError::InvalidFormat(format!("invalid JSON response: {e}")))
    }

    async fn get_bytes(
        &self,
        endpoint: &str,
        query: &[(String, String)],
    ) -> ImviewResult<Vec<u8>> {
        Ok(self
            .get(endpoint, query)
            .await?
            .bytes()
            .await
            .map_err(|e| ImviewError::Transport(e.to_string()))?
            .to_vec())
    }
}

struct RemoteAttrSource {
    client: Arc<dyn RemoteClient>,
    filepath: String,
}

#[async_trait]
impl AttrValueSource for RemoteAttrSource {
    async fn fetch_attr_values(&self, path: &str) -> ImviewResult<AttrValues> {
        let json = self
            .client
            .get_json("attr/", &file_path_query(&self.filepath, path))
            .await?;
        parse_attr_values(json)
    }
}

fn file_path_query(filepath: &str, path: &str) -> Vec<(String, String)> {
    vec![
        ("file".to_string(), filepath.to_string()),
        ("path".to_string(), path.to_string()),
    ]
}

fn parse_attr_values(json: JsonValue) -> ImviewResult<AttrValues> {
    match json {
        JsonValue::Object(map) => Ok(map.into_iter().collect::<HashMap<_, _>>()),
        other => Err(ImviewError::InvalidFormat(format!(
            "expected attribute mapping, got {other}"
        ))),
    }
}

/// Remote service provider session
pub struct RemoteApi {
    filepath: String,
    client: Arc<dyn RemoteClient>,
    cache: Arc<AttributeCache>,
    resolver: EntityResolver,
    fetcher: ValueFetcher,
}

impl RemoteApi {
    pub fn new(
        base_url: &str,
        filepath: &str,
        extra_query: Vec<(String, String)>,
    ) -> ImviewResult<Self> {
        let client = Arc::new(HttpRemoteClient::new(base_url, extra_query)?);
        Ok(Self::with_client(filepath, client))
    }

    /// Build a session over any [`RemoteClient`]
    pub fn with_client(filepath: &str, client: Arc<dyn RemoteClient>) -> Self {
        let cache = Arc::new(AttributeCache::new());
        let source = Arc::new(RemoteAttrSource {
            client: Arc::clone(&client),
            filepath: filepath.to_string(),
        });
        let resolver = EntityResolver::new(Arc::clone(&cache), source);

        Self {
            filepath: filepath.to_string(),
            client,
            cache,
            resolver,
            fetcher: ValueFetcher::new(),
        }
    }

    fn query(&self, path: &str) -> Vec<(String, String)> {
        file_path_query(&self.filepath, path)
    }
}

#[async_trait]
impl DataProvider for RemoteApi {
    async fn get_entity(&self, path: &str) -> ImviewResult<Entity> {
        let json = self.client.get_json("meta/", &self.query(path)).await?;
        let response: RemoteEntityResponse = serde_json::from_value(json)
            .map_err(|e| ImviewError::InvalidFormat(format!("invalid meta response: {e}")))?;
        self.resolver.resolve(path, response.into_meta()).await
    }

    async fn get_value(&self, request: &ValueRequest) -> ImviewResult<Option<Value>> {
        let mut query = self.query(&request.path);
        if let Some(selection) = &request.selection {
            query.push(("selection".to_string(), selection.to_string()));
        }

        if request.dataset.dtype.is_binary_fetchable() {
            query.push(("format".to_string(), "bin".to_string()));
            let client = Arc::clone(&self.client);
            self.fetcher
                .fetch(request, || async move {
                    client.get_bytes("data/", &query).await.map(RawValue::Binary)
                })
                .await
        } else {
            let client = Arc::clone(&self.client);
            self.fetcher
                .fetch(request, || async move {
                    client
                        .get_json("data/", &query)
                        .await
                        .map(RawValue::Structured)
                })
                .await
        }
    }

    async fn get_attr_values(&self, entity: &Entity) -> ImviewResult<AttrValues> {
        if entity.attributes.is_empty() {
            return Ok(AttrValues::new());
        }

        let client = Arc::clone(&self.client);
        let query = self.query(&entity.path);
        self.cache
            .get_or_fetch(&entity.path, || async move {
                parse_attr_values(client.get_json("attr/", &query).await?)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use imview_core::EntityKind;

    /// In-process stand-in for the remote service
    struct FakeRemote {
        meta_calls: AtomicUsize,
        attr_calls: AtomicUsize,
        data_calls: AtomicUsize,
    }

    impl FakeRemote {
        fn new() -> Self {
            Self {
                meta_calls: AtomicUsize::new(0),
                attr_calls: AtomicUsize::new(0),
                data_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteClient for FakeRemote {
        async fn get_json(
            &self,
            endpoint: &str,
            query: &[(String, String)],
        ) -> ImviewResult<JsonValue> {
            let path = query
                .iter()
                .find(|(k, _)| k == "path")
                .map(|(_, v)| v.as_str())
                .unwrap_or("/");

            match endpoint {
                "meta/" => {
                    self.meta_calls.fetch_add(1, Ordering::SeqCst);
                    match path {
                        "/" => Ok(serde_json::json!({
                            "name": "",
                            "type": "group",
                            "children": [
                                {
                                    "name": "values",
                                    "type": "dataset",
                                    "dtype": "<f8",
                                    "shape": [3],
                                    "attributes": [
                                        { "name": "units", "dtype": "|S2", "shape": [] }
                                    ]
                                },
                                { "name": "notes", "type": "dataset", "dtype": "|O", "shape": [2] }
                            ]
                        })),
                        "/missing" => Err(ImviewError::EntityNotFound(
                            "/missing is not a valid path".to_string(),
                        )),
                        _ => Err(ImviewError::EntityNotFound(path.to_string())),
                    }
                }
                "attr/" => {
                    self.attr_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(serde_json::json!({ "units": "nm" }))
                }
                "data/" => {
                    self.data_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(serde_json::json!(["a", "b"]))
                }
                other => panic!("unexpected endpoint {other}"),
            }
        }

        async fn get_bytes(
            &self,
            endpoint: &str,
            query: &[(String, String)],
        ) -> ImviewResult<Vec<u8>> {
            assert_eq!(endpoint, "data/");
            assert!(query.iter().any(|(k, v)| k == "format" && v == "bin"));
            self.data_calls.fetch_add(1, Ordering::SeqCst);
            Ok([1.0f64, 2.0, 3.0]
                .iter()
                .flat_map(|x| x.to_le_bytes())
                .collect())
        }
    }

    fn api() -> (RemoteApi, Arc<FakeRemote>) {
        let fake = Arc::new(FakeRemote::new());
        let api = RemoteApi::with_client("data.h5", Arc::clone(&fake) as Arc<dyn RemoteClient>);
        (api, fake)
    }

    #[tokio::test]
    async fn test_get_entity_resolves_children_and_attributes() {
        let (api, fake) = api();

        let root = api.get_entity("/").await.unwrap();
        assert_eq!(root.kind(), EntityKind::Group);

        let values = root.child("values").unwrap();
        assert_eq!(values.kind(), EntityKind::Dataset);
        assert_eq!(values.attr_str("units"), Some("nm"));
        assert_eq!(fake.attr_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_value_picks_binary_for_numeric_types() {
        let (api, _) = api();

        let root = api.get_entity("/").await.unwrap();
        let request =
            ValueRequest::from_entity(root.child("values").unwrap(), None).unwrap();

        let value = api.get_value(&request).await.unwrap().unwrap();
        assert_eq!(
            value,
            Value::Numeric(imview_core::NumericArray::F64(vec![1.0, 2.0, 3.0]))
        );
    }

    #[tokio::test]
    async fn test_get_value_uses_structured_transport_for_strings() {
        let (api, _) = api();

        let root = api.get_entity("/").await.unwrap();
        let request = ValueRequest::from_entity(root.child("notes").unwrap(), None).unwrap();

        let value = api.get_value(&request).await.unwrap().unwrap();
        assert_eq!(
            value,
            Value::Structured {
                shape: vec![2],
                elems: vec![serde_json::json!("a"), serde_json::json!("b")],
            }
        );
    }

    fn http_response(status: u16, body: &str) -> reqwest::Response {
        reqwest::Response::from(
            http::Response::builder()
                .status(status)
                .body(body.to_string())
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_map_status_tells_404_bodies_apart() {
        let err = map_status(http_response(404, "File not found: data.h5"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), imview_core::ErrorKind::FileNotFound);

        let err = map_status(http_response(404, "/nope is not a valid path in data.h5"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), imview_core::ErrorKind::EntityNotFound);

        // An unrecognized 404 body stays a transport failure
        let err = map_status(http_response(404, "gateway route missing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), imview_core::ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_map_status_access_denied_and_success() {
        let err = map_status(http_response(403, "Forbidden: data.h5"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), imview_core::ErrorKind::AccessDenied);

        let err = map_status(http_response(500, "boom")).await.unwrap_err();
        assert_eq!(err.kind(), imview_core::ErrorKind::Transport);

        assert!(map_status(http_response(200, "{}")).await.is_ok());
    }

    #[tokio::test]
    async fn test_entity_not_found_propagates() {
        let (api, _) = api();

        let err = api.get_entity("/missing").await.unwrap_err();
        assert_eq!(err.kind(), imview_core::ErrorKind::EntityNotFound);
    }

    #[tokio::test]
    async fn test_attr_values_cached_across_entity_and_direct_reads() {
        let (api, fake) = api();

        let root = api.get_entity("/").await.unwrap();
        let values = root.child("values").unwrap().clone();

        // Resolving the tree already fetched /values attributes
        let attrs = api.get_attr_values(&values).await.unwrap();
        assert_eq!(attrs.get("units"), Some(&serde_json::json!("nm")));
        assert_eq!(fake.attr_calls.load(Ordering::SeqCst), 1);
    }
}
