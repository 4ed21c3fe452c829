use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The kinds of link a user can save. The serialized names are part of the
/// wire format and the `contents.type` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Youtube,
    Twitter,
    Notion,
    Instagram,
    Facebook,
}

impl ContentType {
    pub const ALL: [ContentType; 5] = [
        ContentType::Youtube,
        ContentType::Twitter,
        ContentType::Notion,
        ContentType::Instagram,
        ContentType::Facebook,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Youtube => "Youtube",
            ContentType::Twitter => "Twitter",
            ContentType::Notion => "Notion",
            ContentType::Instagram => "Instagram",
            ContentType::Facebook => "Facebook",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownContentType(pub String);

impl fmt::Display for UnknownContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown content type: {}", self.0)
    }
}

impl std::error::Error for UnknownContentType {}

impl FromStr for ContentType {
    type Err = UnknownContentType;

    /// Exact, case-sensitive match on the wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownContentType(s.to_string()))
    }
}
