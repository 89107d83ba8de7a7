//! Error types for the membado API client.
//!
//! # Design
//! Only two things are errors here: the network round trip failing and a
//! non-empty body that is not valid JSON. A well-formed response with
//! `success` absent or false is the dominant failure path of this API and
//! comes back as `Ok(false)` / `Ok(None)` from the façade methods, so
//! callers can branch on "my input or credentials were rejected" versus
//! "the network or service broke".

use thiserror::Error;

/// Errors raised by the transport and decode stages.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP round trip itself failed (DNS, connect, TLS, timeout,
    /// body read). Never retried.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response body was non-empty but not valid JSON.
    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_variant_carries_the_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = ApiError::from(json_err);
        assert!(matches!(err, ApiError::Decode(_)));
        assert!(err.to_string().starts_with("response body is not valid JSON"));
    }

    #[test]
    fn transport_variant_formats_its_message() {
        let err = ApiError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "transport failure: connection refused");
    }
}
