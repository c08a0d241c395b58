//! External-ID lookup keys.

use std::fmt;

/// Marker that turns an external ID into a destination lookup key.
pub const SMART_ID_PREFIX: &str = "$foreignID:";

/// A `$foreignID:<value>` key used in place of a destination's numeric ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SmartId(String);

impl SmartId {
    /// Wrap a raw external ID.
    pub fn new(foreign_id: impl Into<String>) -> Self {
        Self(foreign_id.into())
    }

    /// Parse an already encoded `$foreignID:<value>` string.
    pub fn parse(s: &str) -> Option<Self> {
        s.strip_prefix(SMART_ID_PREFIX)
            .filter(|v| !v.is_empty())
            .map(Self::new)
    }

    /// The external ID without the prefix.
    pub fn foreign_id(&self) -> &str {
        &self.0
    }

    /// Percent-encoded form for use as a single URL path segment.
    pub fn path_segment(&self) -> String {
        url::form_urlencoded::byte_serialize(self.to_string().as_bytes())
            .collect::<String>()
            .replace('+', "%20")
    }
}

impl fmt::Display for SmartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SMART_ID_PREFIX, self.0)
    }
}
