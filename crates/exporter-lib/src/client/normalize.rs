//! Response normalization
//!
//! The management API is not consistent about how it wraps payloads. A
//! response may be a bare array, a bare object keyed by id, a single bare
//! object, or any of those inside a `{status, message, data}` envelope.
//! [`normalize`] hides that behind a flat `Vec<T>`.
//!
//! Decoding precedence:
//! 1. An envelope with a `data` field, even an explicit `null` one. A non-OK
//!    `status` fails the whole response before `data` is looked at, and a
//!    `null` payload under an OK status is an empty result.
//! 2. The shape chain (array, keyed map, single object) against `data`.
//! 3. The same chain against the raw body.

use crate::error::{ExporterError, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{error, warn};

/// Envelope status meaning success, alongside the unset value `0`
pub const STATUS_OK: i64 = 200;

/// Maximum number of body characters quoted in a decode error
const CONTEXT_CHARS: usize = 256;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: i64,
    #[serde(default)]
    message: String,
    #[serde(default, deserialize_with = "present")]
    data: Option<Value>,
}

/// `Some` whenever the key exists, `Some(Value::Null)` included
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Outcome of a single decode attempt
#[derive(Debug)]
pub enum Decoded<T> {
    Records(Vec<T>),
    NoMatch,
}

impl<T> From<std::result::Result<Vec<T>, serde_json::Error>> for Decoded<T> {
    fn from(result: std::result::Result<Vec<T>, serde_json::Error>) -> Self {
        match result {
            Ok(records) => Decoded::Records(records),
            Err(_) => Decoded::NoMatch,
        }
    }
}

type Attempt<T> = fn(&Value) -> Decoded<T>;

/// `[T, T, ...]`
fn as_array<T: DeserializeOwned>(value: &Value) -> Decoded<T> {
    Vec::<T>::deserialize(value).into()
}

/// `{"key": T, ...}`, values in key order.
///
/// Every value must itself be an object; serde would otherwise accept a
/// record from a JSON array and misread a lone record as a map.
fn as_keyed_map<T: DeserializeOwned>(value: &Value) -> Decoded<T> {
    match value.as_object() {
        Some(map) if map.values().all(Value::is_object) => {}
        _ => return Decoded::NoMatch,
    }

    BTreeMap::<String, T>::deserialize(value)
        .map(|map| map.into_values().collect())
        .into()
}

/// A lone `T`, which must be an object; serde would otherwise fill a record
/// positionally from an array
fn as_single<T: DeserializeOwned>(value: &Value) -> Decoded<T> {
    if !value.is_object() {
        return Decoded::NoMatch;
    }

    T::deserialize(value).map(|record| vec![record]).into()
}

fn shape_chain<T: DeserializeOwned>() -> [Attempt<T>; 3] {
    [as_array::<T>, as_keyed_map::<T>, as_single::<T>]
}

fn decode_shapes<T: DeserializeOwned>(value: &Value) -> Decoded<T> {
    for attempt in shape_chain::<T>() {
        if let Decoded::Records(records) = attempt(value) {
            return Decoded::Records(records);
        }
    }
    Decoded::NoMatch
}

/// Decode `body` into a flat sequence of `T`, whichever wire shape it uses
pub fn normalize<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>> {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            error!(
                component = "normalizer",
                error = %e,
                body = %String::from_utf8_lossy(body),
                "Response body is not valid JSON"
            );
            return Err(decode_error(body));
        }
    };

    if let Ok(Envelope {
        status,
        message,
        data: Some(data),
    }) = Envelope::deserialize(&value)
    {
        if status != 0 && status != STATUS_OK {
            warn!(
                component = "normalizer",
                status = status,
                message = %message,
                "API reported an error status"
            );
            return Err(ExporterError::Api { status, message });
        }

        if data.is_null() {
            return Ok(Vec::new());
        }

        if let Decoded::Records(records) = decode_shapes(&data) {
            return Ok(records);
        }
    }

    if let Decoded::Records(records) = decode_shapes(&value) {
        return Ok(records);
    }

    error!(
        component = "normalizer",
        body = %String::from_utf8_lossy(body),
        "Failed to decode response body into any known shape"
    );
    Err(decode_error(body))
}

fn decode_error(body: &[u8]) -> ExporterError {
    let text = String::from_utf8_lossy(body);
    let mut context: String = text.chars().take(CONTEXT_CHARS).collect();
    if text.chars().count() > CONTEXT_CHARS {
        context.push_str("...");
    }
    ExporterError::Decode { context }
}
