//! Wire-level names of the contact resource.
//!
//! The membado API identifies contacts either by numeric id or by email,
//! and its standard field names are German (`vorname`, `nachname`, …).
//! These constants are the endpoint catalogue: every request body is built
//! from them.

use std::fmt;

/// Identifier parameter for numeric contact ids.
pub const CONTACT_ID: &str = "contact_id";
/// Identifier parameter for email addresses.
pub const CONTACT_MAIL: &str = "contact_mail";

pub const FIELD_MAIL: &str = "mail";
pub const FIELD_FIRSTNAME: &str = "vorname";
pub const FIELD_LASTNAME: &str = "nachname";
pub const FIELD_STREET: &str = "strasse";
pub const FIELD_ZIP: &str = "plz";
pub const FIELD_CITY: &str = "city";
pub const FIELD_COUNTRY: &str = "country";
pub const FIELD_PHONE: &str = "tel";
pub const FIELD_MOBILE_PHONE: &str = "mobil";
pub const FIELD_OPTIN_STATUS: &str = "optin_status";

pub const PARAM_API_KEY: &str = "apikey";
pub const PARAM_TAGS: &str = "tags";
pub const PARAM_TAGS_ADD: &str = "tags_add";
pub const PARAM_TAGS_REMOVE: &str = "tags_remove";
pub const PARAM_OPTIN_ID: &str = "optin_id";
pub const PARAM_OPTIN_STATUS: &str = "optin_status";

/// Account fields whose id carries this prefix are custom fields; the
/// rest are system defaults.
pub const CUSTOM_FIELD_PREFIX: &str = "customfield_";

/// Opt-in status: undefined.
pub const OPTIN_NULL: &str = "undefiniert";
/// Opt-in status: single opt-in.
pub const OPTIN_SINGLE: &str = "single";
/// Opt-in status: opted out.
pub const OPTIN_OPTOUT: &str = "abgemeldet";

/// Every opt-in status the API accepts. Used for local validation before
/// a round trip is spent.
pub const OPTIN_STATUSES: [&str; 3] = [OPTIN_NULL, OPTIN_SINGLE, OPTIN_OPTOUT];

/// A contact field value: the API takes flat form parameters, so only
/// scalars are representable. Booleans render as `1`/`0` on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Str(s) => f.write_str(s),
            Scalar::Int(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Bool(true) => f.write_str("1"),
            Scalar::Bool(false) => f.write_str("0"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Str(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Str(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_render_as_form_values() {
        assert_eq!(Scalar::from("Ada").to_string(), "Ada");
        assert_eq!(Scalar::from(42i64).to_string(), "42");
        assert_eq!(Scalar::from(1.5f64).to_string(), "1.5");
        assert_eq!(Scalar::from(true).to_string(), "1");
        assert_eq!(Scalar::from(false).to_string(), "0");
    }

    #[test]
    fn optin_statuses_cover_the_three_wire_values() {
        assert!(OPTIN_STATUSES.contains(&"undefiniert"));
        assert!(OPTIN_STATUSES.contains(&"single"));
        assert!(OPTIN_STATUSES.contains(&"abgemeldet"));
        assert!(!OPTIN_STATUSES.contains(&"double"));
    }
}
