//! Plain-data HTTP types shared by the client and its transports.
//!
//! # Design
//! Requests and responses are described as owned plain data, so transports
//! stay swappable and tests never touch the network. The decoded response
//! body is a tagged variant: façade code pattern-matches on
//! [`DecodedBody`] instead of runtime-checking the shape of a dynamic
//! value.

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

/// Mapping type for decoded envelope payloads. Backed by serde_json's
/// `preserve_order` feature, so iteration follows the key order the server
/// sent.
pub type JsonMap = Map<String, Value>;

/// HTTP verb of a request. `FromStr` accepts any casing; `as_str` always
/// renders upper case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// An HTTP request described as plain data: absolute URL, `Name: value`
/// header lines, and an already form-encoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<String>,
    pub body: Option<String>,
}

/// What a [`Transport`](crate::transport::Transport) produces: status
/// code, raw header lines (status line first), and the undecoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<String>,
    pub body: String,
}

/// The decoded response body.
///
/// `Unstructured` holds valid JSON that is not an object (array, string,
/// number…); the API never sends that on success, so façade methods treat
/// it as a domain failure rather than a decode error.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedBody {
    /// The response carried no body at all.
    Empty,
    /// A JSON object.
    Structured(JsonMap),
    /// Valid JSON of any other shape.
    Unstructured(Value),
}

/// The decoded transport response: status, raw header lines, body.
///
/// One envelope per client is retained as the "last response"; it is
/// replaced wholesale on every call.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub status: u16,
    pub headers: Vec<String>,
    pub body: DecodedBody,
}

impl Envelope {
    /// Whether this is a well-formed success response: a structured body
    /// whose `success` field is truthy.
    pub fn is_success(&self) -> bool {
        match &self.body {
            DecodedBody::Structured(map) => map.get("success").is_some_and(truthy),
            _ => false,
        }
    }

    /// The `result` payload of a success response, if any.
    pub fn result(&self) -> Option<&Value> {
        if !self.is_success() {
            return None;
        }
        match &self.body {
            DecodedBody::Structured(map) => map.get("result"),
            _ => None,
        }
    }
}

/// PHP-style truthiness, so servers sending `"success": 1` or
/// `"success": "1"` keep working: `false`, `0`, `""`, `"0"`, `null` and
/// the empty array are falsy, everything else is truthy.
pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty() && s != "0",
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Percent-encode key/value pairs into an
/// `application/x-www-form-urlencoded` string. Also used for query
/// strings.
pub(crate) fn encode_form(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Split a `Name: value` header line. Lines without a colon (e.g. the
/// status line) yield `None`.
pub(crate) fn split_header_line(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    Some((name.trim(), value.trim()))
}
