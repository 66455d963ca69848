use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A database to provision, its owner and the users granted read/write
/// access to its `public` schema.
///
/// ```yaml
/// databases:
///   - name: app
///     owner: alice
///     users:
///       - bob
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Database {
    pub name: String,
    pub owner: String,
    pub users: Vec<String>,
}

impl Database {
    pub fn validate(&self) -> Result<()> {
        super::validate_identifier("database", &self.name)?;

        if self.owner.is_empty() {
            return Err(Error::config(format!(
                "database {} has no owner",
                self.name
            )));
        }
        super::validate_identifier("owner", &self.owner)?;

        for user in &self.users {
            super::validate_identifier("user", user)?;
        }

        Ok(())
    }

    /// The owner followed by the additional users, in declaration order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.owner.as_str()).chain(self.users.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database(name: &str, owner: &str, users: &[&str]) -> Database {
        Database {
            name: name.to_string(),
            owner: owner.to_string(),
            users: users.iter().map(|u| u.to_string()).collect(),
        }
    }

    #[test]
    fn test_database_validate() {
        assert!(database("app", "alice", &["bob"]).validate().is_ok());
        assert!(database("app", "alice", &[]).validate().is_ok());
    }

    #[test]
    fn test_database_validate_missing_owner() {
        let err = database("app", "", &[]).validate().unwrap_err();
        assert_eq!(err.to_string(), "config error: database app has no owner");
    }

    #[test]
    fn test_database_validate_empty_user() {
        assert!(database("app", "alice", &[""]).validate().is_err());
    }

    #[test]
    fn test_database_roles() {
        let db = database("app", "alice", &["bob", "carol"]);
        assert_eq!(db.roles().collect::<Vec<_>>(), vec!["alice", "bob", "carol"]);
    }
}
