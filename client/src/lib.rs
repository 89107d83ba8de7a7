//! Blocking client for the membado marketing-automation REST API.
//!
//! # Overview
//! Every method wraps one vendor endpoint: build the URL, attach the API
//! key and form parameters, POST, decode the JSON envelope, and reshape
//! the `result` payload into a plain mapping.
//!
//! # Design
//! - Domain failure (`success` absent or false in a well-formed response)
//!   is `Ok(false)` / `Ok(None)`, never an `Err`; [`ApiError`] is reserved
//!   for transport and decode problems, so callers can branch on
//!   "rejected" versus "broken".
//! - The HTTP round trip runs behind the [`Transport`] trait; the built-in
//!   implementation is blocking ureq, and tests or embedders can bring
//!   their own.
//! - The envelope of the most recent call is retained on the client
//!   (last-response semantics, no history).

pub mod client;
pub mod contact;
pub mod error;
pub mod http;
pub mod transport;

pub use client::MembadoClient;
pub use contact::Scalar;
pub use error::ApiError;
pub use http::{DecodedBody, Envelope, HttpRequest, JsonMap, Method, RawResponse};
pub use transport::{Transport, TransportOptions, UreqTransport, USER_AGENT};
