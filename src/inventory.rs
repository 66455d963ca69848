use crate::connection::Executor;
use crate::error::Result;
use crate::sql;
use log::debug;
use std::collections::HashSet;

/// Roles and databases known to exist on the server.
///
/// Loaded once at the start of a run and kept current as the run creates
/// objects, so a name shared between databases is only ever created once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Inventory {
    roles: HashSet<String>,
    databases: HashSet<String>,
}

impl Inventory {
    /// Snapshot the server catalogs.
    pub fn load<E: Executor + ?Sized>(conn: &mut E) -> Result<Self> {
        let roles = load_roles(conn)?;
        let databases = load_databases(conn)?;

        debug!(
            "inventory: {} role(s), {} database(s)",
            roles.len(),
            databases.len()
        );

        Ok(Self { roles, databases })
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.contains(name)
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.databases.contains(name)
    }

    pub fn record_role_created(&mut self, name: &str) {
        self.roles.insert(name.to_string());
    }

    pub fn record_database_created(&mut self, name: &str) {
        self.databases.insert(name.to_string());
    }

    /// Role names, sorted.
    pub fn roles(&self) -> Vec<&str> {
        sorted(&self.roles)
    }

    /// Database names, sorted.
    pub fn databases(&self) -> Vec<&str> {
        sorted(&self.databases)
    }
}

pub fn load_roles<E: Executor + ?Sized>(conn: &mut E) -> Result<HashSet<String>> {
    Ok(conn.query_strings(sql::SELECT_ROLES)?.into_iter().collect())
}

pub fn load_databases<E: Executor + ?Sized>(conn: &mut E) -> Result<HashSet<String>> {
    Ok(conn.query_strings(sql::SELECT_DATABASES)?.into_iter().collect())
}

fn sorted(names: &HashSet<String>) -> Vec<&str> {
    let mut names: Vec<&str> = names.iter().map(String::as_str).collect();
    names.sort_unstable();
    names
}
