// Handler results and their normalization into responses

use crate::{Error, Response};
use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A value that renders itself into a reply, possibly asynchronously.
#[async_trait]
pub trait Render: Send + Sync {
    async fn render(&self) -> Result<Reply, Error>;
}

/// What a leaf (or a short-circuiting pre-hook) returns.
#[derive(Clone)]
pub enum Reply {
    /// `200` with a UTF-8 body and no headers.
    Text(String),
    /// `200` with a raw body and no headers.
    Bytes(Bytes),
    /// Explicit status, no headers.
    Status(u16, Bytes),
    /// Complete response, passed through unchanged.
    Full(Response),
    /// `200` with `Content-Type: application/json`.
    Json(serde_json::Value),
    /// Rendered before normalization.
    Render(Arc<dyn Render>),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text(text.into())
    }

    pub fn status(status: u16, body: impl Into<Bytes>) -> Self {
        Reply::Status(status, body.into())
    }

    pub fn json<T: Serialize>(value: &T) -> Result<Self, Error> {
        serde_json::to_value(value)
            .map(Reply::Json)
            .map_err(|err| Error::Internal(format!("JSON serialization failed: {err}")))
    }

    pub fn render<R: Render + 'static>(renderable: R) -> Self {
        Reply::Render(Arc::new(renderable))
    }

    /// Body text of a `Text` reply, or of a UTF-8 `Bytes` reply.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text(text) => Some(text),
            Reply::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Normalize into the `(status, headers, body)` triple.
    pub async fn into_response(self) -> Result<Response, Error> {
        let reply = match self {
            Reply::Render(renderable) => renderable.render().await?,
            other => other,
        };

        let response = match reply {
            Reply::Text(text) => Response::ok().with_body(text),
            Reply::Bytes(bytes) => Response::ok().with_body(bytes),
            Reply::Status(status, body) => Response::new(status).with_body(body),
            Reply::Full(response) => response,
            Reply::Json(value) => {
                let body = serde_json::to_vec(&value)
                    .map_err(|err| Error::Internal(format!("JSON serialization failed: {err}")))?;
                Response::ok()
                    .with_header("Content-Type", "application/json")
                    .with_body(body)
            }
            Reply::Render(_) => {
                return Err(Error::Internal(
                    "rendering produced another renderable".to_string(),
                ));
            }
        };
        Ok(response)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Reply::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            Reply::Status(status, body) => f.debug_tuple("Status").field(status).field(body).finish(),
            Reply::Full(response) => f.debug_tuple("Full").field(response).finish(),
            Reply::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Reply::Render(_) => f.write_str("Render(..)"),
        }
    }
}

impl PartialEq for Reply {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Reply::Text(a), Reply::Text(b)) => a == b,
            (Reply::Bytes(a), Reply::Bytes(b)) => a == b,
            (Reply::Status(s1, b1), Reply::Status(s2, b2)) => s1 == s2 && b1 == b2,
            (Reply::Full(a), Reply::Full(b)) => a == b,
            (Reply::Json(a), Reply::Json(b)) => a == b,
            (Reply::Render(a), Reply::Render(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<Bytes> for Reply {
    fn from(bytes: Bytes) -> Self {
        Reply::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Reply {
    fn from(bytes: Vec<u8>) -> Self {
        Reply::Bytes(Bytes::from(bytes))
    }
}

impl From<(u16, &str)> for Reply {
    fn from((status, body): (u16, &str)) -> Self {
        Reply::Status(status, Bytes::copy_from_slice(body.as_bytes()))
    }
}

impl From<(u16, String)> for Reply {
    fn from((status, body): (u16, String)) -> Self {
        Reply::Status(status, Bytes::from(body))
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Full(response)
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Reply::Json(value)
    }
}
