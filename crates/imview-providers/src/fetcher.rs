//! Cancellable, selection-aware value retrieval
//!
//! Each fetch is identified by its target: dataset path plus selection.
//! A newer fetch for the same identity supersedes the older in-flight
//! one; the superseded call resolves to `Ok(None)` and its result is
//! never delivered anywhere. Supersession is implemented with
//! generation tokens: each fetch bumps a per-identity counter, captures
//! its token, and checks on completion whether it is still the latest.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use imview_core::{flatten_value, ImviewResult, NumericArray, Value};

use crate::api::ValueRequest;

/// Target identity of a fetch: dataset path + canonical selection form
pub type FetchKey = (String, String);

/// Backend payload before decoding into a [`Value`]
#[derive(Debug, Clone)]
pub enum RawValue {
    /// Raw byte buffer from the binary transport
    Binary(Vec<u8>),
    /// Backend-decoded structured value
    Structured(serde_json::Value),
    /// Already-typed buffer (embedded engine reads)
    Typed(NumericArray),
}

/// Latest-wins value fetcher for one provider session
#[derive(Default)]
pub struct ValueFetcher {
    generations: Mutex<HashMap<FetchKey, u64>>,
}

impl ValueFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn begin(&self, key: &FetchKey) -> u64 {
        let mut generations = self.generations.lock().unwrap();
        let token = generations.entry(key.clone()).or_insert(0);
        *token += 1;
        *token
    }

    fn is_current(&self, key: &FetchKey, token: u64) -> bool {
        let generations = self.generations.lock().unwrap();
        generations.get(key).copied() == Some(token)
    }

    /// Run `transport` for `request` and decode the payload
    ///
    /// Returns `Ok(None)` if a newer fetch for the same identity was
    /// issued in the meantime; stale transports neither deliver a value
    /// nor surface an error.
    pub async fn fetch<F, Fut>(
        &self,
        request: &ValueRequest,
        transport: F,
    ) -> ImviewResult<Option<Value>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ImviewResult<RawValue>>,
    {
        let key = (request.path.clone(), request.selection_string());
        let token = self.begin(&key);

        let raw = transport().await;

        if !self.is_current(&key, token) {
            tracing::debug!(path = %request.path, "dropping superseded value fetch");
            return Ok(None);
        }

        Ok(Some(decode_raw(request, raw?)?))
    }
}

fn decode_raw(request: &ValueRequest, raw: RawValue) -> ImviewResult<Value> {
    let shape = request.selected_shape()?;

    match raw {
        RawValue::Binary(bytes) => {
            let array = NumericArray::from_bytes(&bytes, &request.dataset.dtype)?;
            Ok(numeric_value(array, &shape))
        }
        RawValue::Typed(array) => Ok(numeric_value(array, &shape)),
        RawValue::Structured(json) => {
            if shape.is_empty() {
                return Ok(Value::Scalar(json));
            }
            let elems = flatten_value(json, &shape)?;
            Ok(Value::Structured { shape, elems })
        }
    }
}

// Scalar-shaped binary reads return the single decoded element rather
// than a one-element buffer.
fn numeric_value(array: NumericArray, shape: &[usize]) -> Value {
    if shape.is_empty() {
        if let Some(elem) = array.json_at(0) {
            return Value::Scalar(elem);
        }
    }
    Value::Numeric(array)
}
