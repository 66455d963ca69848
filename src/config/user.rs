use crate::error::Result;
use serde::{Deserialize, Serialize};

/// A login role the run may create.
///
/// ```yaml
/// users:
///   - name: alice
///     password: ${ALICE_PASSWORD}
/// ```
///
/// The password may only be empty for roles that already exist, or that
/// authenticate over the local socket.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct User {
    pub name: String,
    pub password: String,
}

impl User {
    pub fn new(name: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            password: password.to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        super::validate_identifier("user", &self.name)
    }

    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}
