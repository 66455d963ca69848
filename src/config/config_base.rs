use crate::error::{BoxError, Error, Result};
use envmnt::{ExpandOptions, ExpansionType};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub use super::{Database, User};

/// Config file formats, picked by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Yaml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Format::Toml),
            "yaml" | "yml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Configuration contains the admin connection to the server and the
/// databases and users to provision.
///  - `database`, `user`: the admin database and role used for the run.
///  - `host`, `port`, `sslmode`: where the server is. Without a host and an
///  admin password the run uses the local unix socket.
///  - `sshProxy`: an alias from the ssh client config. When set, every
///  connection is tunnelled through that host.
///  - `users`: the roles that may be created.
///  - `databases`: the databases, their owner and their users.
///
/// For example:
///
/// ```yaml
/// database: postgres
/// user: postgres
/// host: db.internal
/// port: 5432
/// sslmode: prefer
/// sshProxy: bastion
///
/// users:
///   - name: alice
///     password: ${ALICE_PASSWORD}
///   - name: bob
///     password: ${BOB_PASSWORD}
///
/// databases:
///   - name: app
///     owner: alice
///     users:
///       - bob
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub database: String,
    pub user: String,
    pub host: String,
    pub port: u16,
    pub sslmode: String,
    pub ssh_proxy: Option<String>,
    /// ssh client config used to resolve `ssh_proxy`, `~/.ssh/config` if unset.
    pub ssh_config: Option<PathBuf>,
    /// Connect timeout in seconds for every Postgres connection.
    pub connect_timeout: Option<u64>,
    pub users: Vec<User>,
    pub databases: Vec<Database>,
}

impl std::str::FromStr for Config {
    type Err = Error;

    /// Parse a YAML config. Environment variables are not expanded.
    fn from_str(s: &str) -> Result<Self> {
        let config: Config =
            serde_yaml::from_str(s).map_err(|e| Error::config(format!("invalid yaml: {}", e)))?;

        config.validate()?;

        Ok(config)
    }
}

impl Config {
    /// Load, expand and validate the config file at `config_path`.
    pub fn new(config_path: &Path) -> Result<Self> {
        if config_path.is_dir() {
            return Err(Error::config_file(config_path, "is a directory"));
        }

        let format = Format::from_path(config_path)
            .ok_or_else(|| Error::config_file(config_path, "unsupported file extension"))?;
        let content =
            fs::read_to_string(config_path).map_err(|e| Error::config_file(config_path, e))?;

        let config = Self::parse(&content, format)
            .map_err(|e| Error::config_file(config_path, e))?
            .expand_env_vars();

        config.validate()?;

        Ok(config)
    }

    /// Parse `content` without validating it.
    pub fn parse(content: &str, format: Format) -> Result<Self, BoxError> {
        let config: Config = match format {
            Format::Toml => toml::from_str(content)?,
            Format::Yaml => serde_yaml::from_str(content)?,
            Format::Json => serde_json::from_str(content)?,
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for user in &self.users {
            user.validate()?;
        }

        // Duplicates are tolerated, the first declaration wins.
        let mut user_names = HashSet::new();
        for user in &self.users {
            if !user_names.insert(user.name.as_str()) {
                warn!("duplicated user: {}, using the first declaration", user.name);
            }
        }

        let mut database_names = HashSet::new();
        for database in &self.databases {
            database.validate()?;

            if !database_names.insert(database.name.as_str()) {
                warn!("duplicated database: {}", database.name);
            }

            for role in database.roles() {
                if self.get_user(role).is_none() {
                    return Err(Error::config(format!(
                        "user not defined: {} (database {})",
                        role, database.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Find a declared user by name.
    pub fn get_user(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|u| u.name == name)
    }

    /// Password of a declared user, empty if unknown.
    pub fn get_password(&self, name: &str) -> &str {
        self.get_user(name).map_or("", |u| u.password.as_str())
    }

    /// The ssh alias to tunnel through, if any.
    pub fn ssh_proxy(&self) -> Option<&str> {
        self.ssh_proxy.as_deref().filter(|alias| !alias.is_empty())
    }

    /// Admin role for the run. Falls back to the OS user, like libpq.
    pub fn admin_user(&self) -> String {
        if self.user.is_empty() {
            envmnt::get_or("USER", "postgres")
        } else {
            self.user.clone()
        }
    }

    // Expand environment variables in host, names and passwords.
    // For example: password: ${ALICE_PASSWORD}
    fn expand_env_vars(mut self) -> Self {
        self.host = expand("host", &self.host);
        self.user = expand("user", &self.user);
        self.database = expand("database", &self.database);
        for user in &mut self.users {
            user.password = expand(&format!("password of {}", user.name), &user.password);
        }

        self
    }
}

fn expand(field: &str, value: &str) -> String {
    let options = ExpandOptions {
        expansion_type: Some(ExpansionType::UnixBracketsWithDefaults),
        default_to_empty: false,
    };

    let expanded = envmnt::expand(value, Some(options));

    // Most likely, the user forgot to export the environment variables.
    if expanded.contains("${") {
        warn!(
            "The {} may not have fully expanded environment variables",
            field
        );
    }

    expanded
}
