//! Declarative provisioning of PostgreSQL databases, users and grants.
//!
//! A run loads a [config::Config], opens an admin connection (directly or
//! through an ssh proxy), snapshots the existing roles and databases into an
//! [inventory::Inventory] and lets the [provision::Provisioner] create what
//! is missing, set owners and grant users access.

pub mod cli;
pub mod config;
pub mod connection;
pub mod dsn;
pub mod error;
pub mod executor;
pub mod inspect;
pub mod inventory;
pub mod provision;
pub mod sql;
pub mod ssh;
pub mod validate;

pub use error::{Error, Result};
