//! Request methods.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Methods recognized on the config resource.
///
/// Only GET and POST are served; the rest are declared so that a request
/// using them can be answered with METHOD_NOT_ALLOWED instead of a parse
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// Methods the config resource actually serves.
pub const ALLOWED_METHODS: [Method; 2] = [Method::Get, Method::Post];

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Whether the config resource serves this method at all.
    pub fn is_allowed(&self) -> bool {
        ALLOWED_METHODS.contains(self)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_is_uppercase() {
        assert_eq!(serde_json::to_string(&Method::Get).unwrap(), "\"GET\"");
        assert_eq!(serde_json::to_string(&Method::Delete).unwrap(), "\"DELETE\"");
        let m: Method = serde_json::from_str("\"PATCH\"").unwrap();
        assert_eq!(m, Method::Patch);
    }

    #[test]
    fn test_only_get_and_post_allowed() {
        assert!(Method::Get.is_allowed());
        assert!(Method::Post.is_allowed());
        assert!(!Method::Put.is_allowed());
        assert!(!Method::Patch.is_allowed());
        assert!(!Method::Delete.is_allowed());
    }
}
