use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identity-provider user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identity profile fields used to seed a new CV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Primary email address, if the provider has one on file.
    pub email: Option<String>,
}

impl User {
    pub fn anonymous(id: UserId) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
            email: None,
        }
    }
}
