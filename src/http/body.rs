//! Request bodies.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

/// Errors raised while encoding a body into bytes.
#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("body encoding failed: {0}")]
    Other(String),
}

/// Something that can be sent as a request body.
///
/// Encoding is deferred until the request is handed to the transport, so a
/// body that cannot be encoded fails the request there with `invalidRequest`.
pub trait Body: fmt::Debug + Send + Sync {
    fn is_empty(&self) -> bool {
        false
    }

    /// Headers the body contributes (e.g. `Content-Type`).
    fn headers(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn encode(&self) -> Result<Vec<u8>, EncodingError>;
}

/// No body at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyBody;

impl Body for EmptyBody {
    fn is_empty(&self) -> bool {
        true
    }

    fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(Vec::new())
    }
}

/// Raw bytes with caller-supplied headers.
#[derive(Debug, Clone, Default)]
pub struct DataBody {
    content: Vec<u8>,
    headers: BTreeMap<String, String>,
}

impl DataBody {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

impl Body for DataBody {
    fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    fn headers(&self) -> BTreeMap<String, String> {
        self.headers.clone()
    }

    fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        Ok(self.content.clone())
    }
}

type Encoder = dyn Fn() -> Result<Vec<u8>, serde_json::Error> + Send + Sync;

/// A serializable value encoded as JSON when the request is sent.
#[derive(Clone)]
pub struct JsonBody {
    encoder: Arc<Encoder>,
}

impl JsonBody {
    pub const CONTENT_TYPE: &'static str = "application/json; charset=utf-8";

    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self {
            encoder: Arc::new(move || serde_json::to_vec(&value)),
        }
    }
}

impl fmt::Debug for JsonBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonBody")
    }
}

impl Body for JsonBody {
    fn headers(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("Content-Type".to_string(), Self::CONTENT_TYPE.to_string())])
    }

    fn encode(&self) -> Result<Vec<u8>, EncodingError> {
        Ok((self.encoder)()?)
    }
}
