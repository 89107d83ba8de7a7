//! The membado API client: configuration, URL building, the request
//! pipeline, and one typed façade method per vendor endpoint.
//!
//! # Design
//! Every façade method follows the same template: resolve the contact
//! identifier (numeric → `contact_id`, otherwise `contact_mail`), assemble
//! the remaining parameters, POST them form-encoded with the API key
//! attached, and interpret the JSON envelope. A well-formed response whose
//! `success` is absent or false is a domain failure (`Ok(false)` /
//! `Ok(None)`); `Err` is reserved for transport and decode problems.

use log::debug;
use serde_json::Value;

use crate::contact::{self, Scalar};
use crate::error::ApiError;
use crate::http::{encode_form, split_header_line, DecodedBody, Envelope, HttpRequest, JsonMap, Method};
use crate::transport::{Transport, TransportOptions, UreqTransport, USER_AGENT};

/// Blocking client for the membado web API.
///
/// Each method call is one synchronous network round trip; the envelope of
/// the most recent call is retained and readable through
/// [`last_response`](Self::last_response) (last-response semantics, not a
/// history). The API key and transport options are the only mutable
/// configuration; the client assumes a single writer and is not meant for
/// concurrent mutation from multiple threads without external
/// synchronization.
pub struct MembadoClient {
    host: String,
    headers: Vec<String>,
    version: String,
    path: Vec<String>,
    api_key: String,
    options: TransportOptions,
    transport: Box<dyn Transport>,
    last_response: Option<Envelope>,
}

impl MembadoClient {
    /// Client with default transport options against the given base host,
    /// e.g. `https://api.membado.net`.
    pub fn new(api_key: impl Into<String>, host: impl Into<String>) -> Self {
        Self::with_options(api_key, host, TransportOptions::default())
    }

    /// Client with explicit transport options (timeouts, TLS
    /// verification, user agent).
    pub fn with_options(api_key: impl Into<String>, host: impl Into<String>, options: TransportOptions) -> Self {
        Self::with_transport(api_key, host, options, Box::new(UreqTransport))
    }

    /// Client around a caller-supplied [`Transport`]. This is the seam
    /// tests and embedders use to execute requests themselves.
    pub fn with_transport(
        api_key: impl Into<String>,
        host: impl Into<String>,
        options: TransportOptions,
        transport: Box<dyn Transport>,
    ) -> Self {
        Self {
            host: host.into(),
            headers: vec![
                format!("User-Agent: {USER_AGENT}"),
                String::from("Accept: application/json"),
            ],
            version: String::new(),
            path: Vec::new(),
            api_key: api_key.into(),
            options,
            transport,
            last_response: None,
        }
    }

    /// Set the API version prefix inserted between host and endpoint path
    /// (defaults to empty).
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// The default header lines attached to every request.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// The version prefix, empty unless configured.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Extra path segments (unused by the current API surface).
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn transport_options(&self) -> &TransportOptions {
        &self.options
    }

    /// The envelope of the most recent call, if any.
    pub fn last_response(&self) -> Option<&Envelope> {
        self.last_response.as_ref()
    }

    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.api_key = api_key.into();
    }

    /// Replace the whole transport options structure. Takes effect on the
    /// next call.
    pub fn set_transport_options(&mut self, options: TransportOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// Assemble `host + version + path`, appending an encoded query string
    /// when a non-empty parameter list is supplied.
    fn build_url(&self, path: &str, query: Option<&[(String, String)]>) -> String {
        let mut url = format!("{}{}{}", self.host, self.version, path);
        if let Some(params) = query {
            if !params.is_empty() {
                url.push('?');
                url.push_str(&encode_form(params));
            }
        }
        url
    }

    /// Perform one HTTP round trip.
    ///
    /// The body parameters are augmented with the API key under `apikey`
    /// and form-encoded. Per-call headers override a default with the same
    /// name; the rest are appended after the defaults. The decoded
    /// envelope is stored as the last response before being returned.
    pub fn send(
        &mut self,
        url: &str,
        body: Option<&[(String, String)]>,
        method: Method,
        extra_headers: &[String],
    ) -> Result<Envelope, ApiError> {
        let mut params: Vec<(String, String)> = body.map(<[_]>::to_vec).unwrap_or_default();
        params.push((contact::PARAM_API_KEY.to_string(), self.api_key.clone()));

        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers: merge_headers(&self.headers, extra_headers),
            body: Some(encode_form(&params)),
        };
        let raw = self.transport.execute(&request, &self.options)?;

        let body = if raw.body.is_empty() {
            DecodedBody::Empty
        } else {
            match serde_json::from_str::<Value>(&raw.body)? {
                Value::Object(map) => DecodedBody::Structured(map),
                other => DecodedBody::Unstructured(other),
            }
        };
        let envelope = Envelope { status: raw.status, headers: raw.headers, body };
        self.last_response = Some(envelope.clone());
        Ok(envelope)
    }

    fn post(&mut self, path: &str, params: Vec<(String, String)>) -> Result<Envelope, ApiError> {
        let url = self.build_url(path, None);
        self.send(&url, Some(&params), Method::Post, &[])
    }

    /// Numeric identifiers select the id parameter, everything else the
    /// email parameter.
    fn identifier(id_or_email: &str) -> (String, String) {
        let name = if is_numeric(id_or_email) { contact::CONTACT_ID } else { contact::CONTACT_MAIL };
        (name.to_string(), id_or_email.to_string())
    }

    /// Test the API key.
    ///
    /// Interpreted under the same rule as every other endpoint: the body
    /// must be a JSON object with a truthy `success`.
    pub fn auth(&mut self) -> Result<bool, ApiError> {
        let envelope = self.post("/auth", Vec::new())?;
        Ok(envelope.is_success())
    }

    /// The account's tags as an id → name mapping, in server order.
    pub fn tags(&mut self) -> Result<Option<JsonMap>, ApiError> {
        let envelope = self.post("/tags", Vec::new())?;
        Ok(nested_map(&envelope, "tags"))
    }

    /// The account's contact fields as an id → name mapping. With
    /// `filter_default`, system fields are dropped and only ids prefixed
    /// `customfield_` remain.
    pub fn fields(&mut self, filter_default: bool) -> Result<Option<JsonMap>, ApiError> {
        let envelope = self.post("/fields", Vec::new())?;
        let Some(fields) = nested_map(&envelope, "fields") else {
            return Ok(None);
        };
        if !filter_default {
            return Ok(Some(fields));
        }
        Ok(Some(
            fields.into_iter().filter(|(id, _)| id.starts_with(contact::CUSTOM_FIELD_PREFIX)).collect(),
        ))
    }

    /// The raw contact record.
    pub fn contact(&mut self, id_or_email: &str) -> Result<Option<JsonMap>, ApiError> {
        let envelope = self.post("/contact", vec![Self::identifier(id_or_email)])?;
        Ok(result_map(&envelope))
    }

    /// The tags currently on a contact, as an id → name mapping.
    pub fn contact_tags(&mut self, id_or_email: &str) -> Result<Option<JsonMap>, ApiError> {
        let envelope = self.post("/contact/tags", vec![Self::identifier(id_or_email)])?;
        Ok(nested_map(&envelope, "tags"))
    }

    /// Create a contact or update an existing one. Field values go out as
    /// top-level form parameters; tag lists are comma-joined and omitted
    /// entirely when empty.
    pub fn contact_create_update(
        &mut self,
        id_or_email: &str,
        fields: &[(&str, Scalar)],
        add_tags: &[&str],
        remove_tags: &[&str],
        optin_id: Option<u64>,
    ) -> Result<bool, ApiError> {
        let mut params = vec![Self::identifier(id_or_email)];
        for (name, value) in fields {
            params.push((name.to_string(), value.to_string()));
        }
        if !add_tags.is_empty() {
            params.push((contact::PARAM_TAGS_ADD.to_string(), add_tags.join(",")));
        }
        if !remove_tags.is_empty() {
            params.push((contact::PARAM_TAGS_REMOVE.to_string(), remove_tags.join(",")));
        }
        if let Some(optin_id) = optin_id {
            params.push((contact::PARAM_OPTIN_ID.to_string(), optin_id.to_string()));
        }
        let envelope = self.post("/contact/create_or_update", params)?;
        Ok(envelope.is_success())
    }

    /// Selected field values of a contact as an id → value mapping. The
    /// endpoint takes the field ids in the `tags` parameter.
    pub fn contact_fields(&mut self, id_or_email: &str, field_ids: &[&str]) -> Result<Option<JsonMap>, ApiError> {
        let params = vec![
            Self::identifier(id_or_email),
            (contact::PARAM_TAGS.to_string(), field_ids.join(",")),
        ];
        let envelope = self.post("/contact/fields/get", params)?;
        Ok(result_map(&envelope))
    }

    /// Set the opt-in status of a contact. A status outside
    /// [`contact::OPTIN_STATUSES`] is rejected locally with `Ok(false)`
    /// and costs no round trip.
    pub fn contact_set_optin(&mut self, id_or_email: &str, optin_status: &str) -> Result<bool, ApiError> {
        if !contact::OPTIN_STATUSES.contains(&optin_status) {
            debug!("rejecting unknown optin status {optin_status:?} without a request");
            return Ok(false);
        }
        let params = vec![
            Self::identifier(id_or_email),
            (contact::PARAM_OPTIN_STATUS.to_string(), optin_status.to_string()),
        ];
        let envelope = self.post("/contact/set-optin-status", params)?;
        Ok(envelope.is_success())
    }

    /// Start the given opt-in process for a contact.
    pub fn contact_start_optin(&mut self, id_or_email: &str, optin_id: u64) -> Result<bool, ApiError> {
        let params = vec![
            Self::identifier(id_or_email),
            (contact::PARAM_OPTIN_ID.to_string(), optin_id.to_string()),
        ];
        let envelope = self.post("/contact/optin/start", params)?;
        Ok(envelope.is_success())
    }

    /// Add the given tags to a contact.
    pub fn contact_tags_add(&mut self, id_or_email: &str, tag_ids: &[&str]) -> Result<bool, ApiError> {
        let params = vec![
            Self::identifier(id_or_email),
            (contact::PARAM_TAGS.to_string(), tag_ids.join(",")),
        ];
        let envelope = self.post("/contact/tags/add", params)?;
        Ok(envelope.is_success())
    }

    /// Remove the given tags from a contact.
    pub fn contact_tags_remove(&mut self, id_or_email: &str, tag_ids: &[&str]) -> Result<bool, ApiError> {
        let params = vec![
            Self::identifier(id_or_email),
            (contact::PARAM_TAGS.to_string(), tag_ids.join(",")),
        ];
        let envelope = self.post("/contact/tags/remove", params)?;
        Ok(envelope.is_success())
    }

    /// The account's opt-in processes as an id → name mapping.
    pub fn optins(&mut self) -> Result<Option<JsonMap>, ApiError> {
        let envelope = self.post("/optins", Vec::new())?;
        Ok(nested_map(&envelope, "optins"))
    }
}

/// The `result` payload as an object map; `None` on domain failure or a
/// non-object payload.
fn result_map(envelope: &Envelope) -> Option<JsonMap> {
    envelope.result()?.as_object().cloned()
}

/// A named object below `result` (e.g. `result.tags`); `None` on domain
/// failure or when the substructure is missing or not an object.
fn nested_map(envelope: &Envelope, key: &str) -> Option<JsonMap> {
    envelope.result()?.get(key)?.as_object().cloned()
}

/// Numeric-looking strings (finite integers, decimals, exponent notation)
/// count as contact ids; everything else is treated as an email.
fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.parse::<f64>().map_or(false, f64::is_finite)
}

/// Merge per-call header lines onto the defaults: a per-call header
/// replaces a default with the same name, everything else is appended
/// after the defaults in order.
fn merge_headers(defaults: &[String], extra: &[String]) -> Vec<String> {
    if extra.is_empty() {
        return defaults.to_vec();
    }
    let mut merged: Vec<String> = defaults
        .iter()
        .filter(|line| {
            let Some((name, _)) = split_header_line(line) else {
                return true;
            };
            !extra
                .iter()
                .any(|e| split_header_line(e).is_some_and(|(n, _)| n.eq_ignore_ascii_case(name)))
        })
        .cloned()
        .collect();
    merged.extend(extra.iter().cloned());
    merged
}
