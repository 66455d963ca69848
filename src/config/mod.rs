pub mod config_base;
pub mod database;
pub mod user;

pub use config_base::{Config, Format};
pub use database::Database;
pub use user::User;

use crate::error::{Error, Result};

/// Longest identifier the server keeps without truncating it.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Check that `name` can be used as a role or database name.
pub(crate) fn validate_identifier(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::config(format!("{} name is empty", kind)));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::config(format!(
            "{} name is longer than {} bytes: {}",
            kind, MAX_IDENTIFIER_LEN, name
        )));
    }
    if name.contains('\0') {
        return Err(Error::config(format!(
            "{} name contains a NUL character: {:?}",
            kind, name
        )));
    }

    Ok(())
}
