use std::path::PathBuf;
use thiserror::Error;

/// Boxed source error, so drivers and fakes can both report failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can abort a provisioning run.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration does not describe a run we can perform.
    #[error("config error: {0}")]
    Config(String),

    /// The config file could not be read or parsed.
    #[error("config file {path:?}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// Failed to reach Postgres, directly or through the ssh proxy.
    #[error("could not connect to {target}: {source}")]
    Connection {
        target: String,
        #[source]
        source: BoxError,
    },

    /// A catalog query failed.
    #[error("query failed `{query}`: {source}")]
    Query {
        query: String,
        #[source]
        source: BoxError,
    },

    /// An administrative statement failed. `statement` is already redacted.
    #[error("statement failed `{statement}`: {source}")]
    Statement {
        statement: String,
        #[source]
        source: BoxError,
    },
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn config_file(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Error::ConfigFile {
            path: path.into(),
            source: source.into(),
        }
    }

    pub fn connection(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Connection {
            target: target.into(),
            source: source.into(),
        }
    }
}
