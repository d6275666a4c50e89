//! Qualified names for payload roots, header blocks, and fault codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A namespace-qualified name, written as `{namespace}local` in its expanded
/// string form.
///
/// Used to identify payload root elements, SOAP header blocks, and fault
/// codes. Prefixes are a serialization concern and are not modeled here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QName {
    namespace_uri: String,
    local_part: String,
}

impl QName {
    /// Create a qualified name from a namespace URI and a local part.
    #[must_use]
    pub fn new(namespace_uri: impl Into<String>, local_part: impl Into<String>) -> Self {
        Self {
            namespace_uri: namespace_uri.into(),
            local_part: local_part.into(),
        }
    }

    /// Create a name with no namespace.
    #[must_use]
    pub fn local(local_part: impl Into<String>) -> Self {
        Self {
            namespace_uri: String::new(),
            local_part: local_part.into(),
        }
    }

    /// The namespace URI; empty for unqualified names.
    #[must_use]
    pub fn namespace_uri(&self) -> &str {
        &self.namespace_uri
    }

    /// The local part of the name.
    #[must_use]
    pub fn local_part(&self) -> &str {
        &self.local_part
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_uri.is_empty() {
            write!(f, "{}", self.local_part)
        } else {
            write!(f, "{{{}}}{}", self.namespace_uri, self.local_part)
        }
    }
}

/// Error returned when parsing an expanded qualified name fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseQNameError(String);

impl fmt::Display for ParseQNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid qualified name: {}", self.0)
    }
}

impl std::error::Error for ParseQNameError {}

impl FromStr for QName {
    type Err = ParseQNameError;

    /// Parse the expanded `{namespace}local` form; input without a leading
    /// brace is treated as an unqualified local name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(rest) = s.strip_prefix('{') {
            let Some((namespace, local)) = rest.split_once('}') else {
                return Err(ParseQNameError(s.to_string()));
            };
            if local.is_empty() {
                return Err(ParseQNameError(s.to_string()));
            }
            Ok(Self::new(namespace, local))
        } else if s.is_empty() {
            Err(ParseQNameError(s.to_string()))
        } else {
            Ok(Self::local(s))
        }
    }
}
