//! Scope domain model.

use serde::{Deserialize, Serialize};

/// A grantable scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Scope token as it appears in requests.
    pub code: String,
    /// Short name.
    pub title: String,
    /// Longer explanation shown to users.
    #[serde(default)]
    pub description: String,
    /// Granted when a request carries no `scope`.
    #[serde(default)]
    pub default: bool,
}

impl Scope {
    /// Creates a non-default scope.
    #[must_use]
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            title: title.into(),
            description: String::new(),
            default: false,
        }
    }

    /// Marks the scope as default.
    #[must_use]
    pub const fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
