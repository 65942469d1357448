//! JSON RPC 2.0 envelopes used by request/response transports.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::{
    future::Future,
    sync::atomic::{self, AtomicU32},
};
use thiserror::Error;

/// Wraps a method call in a request envelope, hands the serialized request to
/// `roundtrip`, and unwraps the `result` of the response body it returns.
pub async fn call_async<F, Fut, E>(method: &str, params: Value, roundtrip: F) -> Result<Value, E>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = Result<String, E>>,
    E: From<Error> + From<serde_json::Error>,
{
    let request = Request::new(method, params);
    let body = roundtrip(serde_json::to_string(&request)?).await?;
    let response = serde_json::from_str::<Response>(&body)?;
    Ok(response.result?)
}

/// JSON RPC supported version.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum Version {
    /// Version 2.0 of the JSON RPC specification.
    #[serde(rename = "2.0")]
    V2,
}

/// Request and response ID.
///
/// Ids are `u32` so that they are always exactly representable by nodes that
/// parse JSON numbers as doubles.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, Hash, PartialEq)]
#[serde(transparent)]
pub struct Id(pub u32);

impl Id {
    /// Returns the next id of the process wide request counter.
    pub fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, atomic::Ordering::Relaxed))
    }
}

/// A request object.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Request {
    pub jsonrpc: Version,
    pub method: String,
    pub params: Value,
    pub id: Id,
}

impl Request {
    /// Creates a request with a fresh id.
    pub fn new(method: &str, params: Value) -> Self {
        Self {
            jsonrpc: Version::V2,
            method: method.to_owned(),
            params,
            id: Id::next(),
        }
    }
}

/// Response object. Exactly one of `result` and `error` is set on the wire.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(try_from = "RawResponse")]
pub struct Response {
    pub jsonrpc: Version,
    pub result: Result<Value, Error>,
    pub id: Option<Id>,
}

#[derive(Deserialize)]
struct RawResponse {
    jsonrpc: Version,
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Error>,
    #[serde(default)]
    id: Option<Id>,
}

/// Keeps a `null` result distinct from an absent one.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl TryFrom<RawResponse> for Response {
    type Error = &'static str;

    fn try_from(raw: RawResponse) -> Result<Self, Self::Error> {
        let result = match (raw.result, raw.error) {
            (Some(result), None) => Ok(result),
            (None, Some(error)) => Err(error),
            (Some(_), Some(_)) => return Err("response has both 'result' and 'error'"),
            (None, None) => return Err("response has neither 'result' nor 'error'"),
        };
        Ok(Self {
            jsonrpc: raw.jsonrpc,
            result,
            id: raw.id,
        })
    }
}

/// An RPC error returned by a node.
#[derive(Clone, Debug, Deserialize, Error, PartialEq, Serialize)]
#[error("{code}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

/// An error code.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
#[serde(from = "i32", into = "i32")]
pub enum ErrorCode {
    #[error("parse error")]
    ParseError,
    #[error("invalid request")]
    InvalidRequest,
    #[error("method not found")]
    MethodNotFound,
    #[error("invalid params")]
    InvalidParams,
    #[error("internal error")]
    InternalError,
    #[error("server error ({0})")]
    ServerError(i32),
    #[error("reserved ({0})")]
    Reserved(i32),
    #[error("{0}")]
    Other(i32),
}

impl ErrorCode {
    /// The numeric code.
    pub fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError(code) | Self::Reserved(code) | Self::Other(code) => code,
        }
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -32099..=-32000 => Self::ServerError(code),
            -32768..=-32100 => Self::Reserved(code),
            _ => Self::Other(code),
        }
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}
