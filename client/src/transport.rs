//! The transport seam: one blocking HTTP round trip per call.
//!
//! # Design
//! [`Transport`] is a minimal trait so embedders and tests can bring their
//! own HTTP execution; the built-in [`UreqTransport`] covers the normal
//! case. Options are passed by reference into every call and applied to a
//! fresh agent, so replacing them takes effect on the very next request.

use std::time::Duration;

use log::{debug, trace};
use ureq::tls::TlsConfig;

use crate::error::ApiError;
use crate::http::{split_header_line, HttpRequest, Method, RawResponse};

/// User agent reported by the built-in transport and the client's default
/// header set.
pub const USER_AGENT: &str = concat!("membado-rust-client/v", env!("CARGO_PKG_VERSION"));

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Executes one HTTP round trip described as plain data.
///
/// Implementations signal network problems via [`ApiError::Transport`].
/// Non-2xx statuses are data, not errors; the client decodes and
/// interprets them like any other response.
pub trait Transport {
    fn execute(&self, request: &HttpRequest, options: &TransportOptions) -> Result<RawResponse, ApiError>;
}

/// Per-request transport overrides. Replaced wholesale by
/// [`MembadoClient::set_transport_options`](crate::MembadoClient::set_transport_options)
/// and applied on each request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Whole-call timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Connect-phase timeout.
    pub connect_timeout: Option<Duration>,
    /// Verify the server certificate. On by default.
    pub tls_verify: bool,
    /// Override the built-in [`USER_AGENT`].
    pub user_agent: Option<String>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: None,
            tls_verify: true,
            user_agent: None,
        }
    }
}

/// Built-in transport over a blocking ureq agent.
///
/// Non-2xx responses are returned as data (`http_status_as_error(false)`),
/// matching the API's convention of carrying failure in the JSON envelope
/// rather than the status code.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    fn agent(options: &TransportOptions) -> ureq::Agent {
        let mut config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .user_agent(options.user_agent.as_deref().unwrap_or(USER_AGENT))
            .timeout_global(options.timeout)
            .timeout_connect(options.connect_timeout);
        if !options.tls_verify {
            config = config.tls_config(TlsConfig::builder().disable_verification(true).build());
        }
        config.build().new_agent()
    }
}

fn with_headers<Any>(builder: ureq::RequestBuilder<Any>, lines: &[String]) -> ureq::RequestBuilder<Any> {
    lines
        .iter()
        .filter_map(|line| split_header_line(line))
        .fold(builder, |builder, (name, value)| builder.header(name, value))
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest, options: &TransportOptions) -> Result<RawResponse, ApiError> {
        let agent = Self::agent(options);
        debug!("{} {}", request.method, request.url);
        if let Some(body) = &request.body {
            trace!("request body: {body}");
        }

        let result = match (request.method, &request.body) {
            (Method::Get, _) => with_headers(agent.get(&request.url), &request.headers).call(),
            (Method::Delete, _) => with_headers(agent.delete(&request.url), &request.headers).call(),
            (Method::Post, Some(body)) => with_headers(agent.post(&request.url), &request.headers)
                .content_type(FORM_CONTENT_TYPE)
                .send(body.as_bytes()),
            (Method::Post, None) => with_headers(agent.post(&request.url), &request.headers).send_empty(),
            (Method::Put, Some(body)) => with_headers(agent.put(&request.url), &request.headers)
                .content_type(FORM_CONTENT_TYPE)
                .send(body.as_bytes()),
            (Method::Put, None) => with_headers(agent.put(&request.url), &request.headers).send_empty(),
        };
        let mut response = result.map_err(ApiError::from)?;

        let status = response.status().as_u16();
        let mut headers = Vec::with_capacity(response.headers().len() + 1);
        headers.push(format!("{:?} {}", response.version(), response.status()));
        for (name, value) in response.headers() {
            headers.push(format!("{name}: {}", value.to_str().unwrap_or_default()));
        }
        let body = response.body_mut().read_to_string().map_err(ApiError::from)?;
        debug!("response status {status}, {} body bytes", body.len());

        Ok(RawResponse { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_verify_tls_and_have_no_timeouts() {
        let options = TransportOptions::default();
        assert!(options.tls_verify);
        assert!(options.timeout.is_none());
        assert!(options.connect_timeout.is_none());
        assert!(options.user_agent.is_none());
    }

    #[test]
    fn user_agent_names_the_library_and_version() {
        assert!(USER_AGENT.starts_with("membado-rust-client/v"));
        assert!(USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
