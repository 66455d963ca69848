use crate::config::{Config, Database, User};
use crate::connection::{Connector, Provider};
use crate::error::{Error, Result};
use crate::executor::StatementExecutor;
use crate::inventory::Inventory;
use crate::sql;
use ansi_term::Colour::Purple;
use ascii_table::AsciiTable;
use log::info;
use std::path::Path;

/// What a run did for one declared database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSummary {
    pub name: String,
    pub owner: String,
    pub users: Vec<String>,
    pub database_created: bool,
    pub users_created: Vec<String>,
}

/// Converges the server towards the declared databases, users and grants.
///
/// For every database, in declaration order:
///  1. create the database if it does not exist;
///  2. create the owner and the users that do not exist;
///  3. set the owner, always;
///  4. connect to the database as the owner and grant every user access to
///     the `public` schema.
///
/// Roles to create are resolved before any statement is issued for a
/// database, so an undefined user or a missing password leaves that
/// database untouched. Any error aborts the run; nothing is rolled back and
/// running again is safe.
pub struct Provisioner<'a, C: Connector> {
    config: &'a Config,
    connector: &'a C,
    executor: StatementExecutor,
}

impl<'a, C: Connector> Provisioner<'a, C> {
    pub fn new(config: &'a Config, connector: &'a C, dryrun: bool) -> Self {
        Self {
            config,
            connector,
            executor: StatementExecutor::new(dryrun),
        }
    }

    pub fn provision(&self) -> Result<Vec<DatabaseSummary>> {
        let mut admin = self.connector.open_admin()?;
        let mut inventory = Inventory::load(&mut admin)?;

        let mut summaries = vec![];
        for database in &self.config.databases {
            let summary = self.provision_database(&mut admin, &mut inventory, database)?;
            summaries.push(summary);
        }

        Ok(summaries)
    }

    fn provision_database(
        &self,
        admin: &mut C::Connection,
        inventory: &mut Inventory,
        database: &Database,
    ) -> Result<DatabaseSummary> {
        let users_to_create = self.users_to_create(inventory, database)?;

        let database_created = !inventory.has_database(&database.name);
        if database_created {
            info!("Creating database {}", database.name);
            self.executor.create_database(admin, &database.name)?;
            inventory.record_database_created(&database.name);
        }

        for user in &users_to_create {
            info!("Creating user {}", user.name);
            self.executor.create_user(admin, &user.name, &user.password)?;
            inventory.record_role_created(&user.name);
        }

        info!(
            "Setting database {} owner to {}",
            database.name, database.owner
        );
        self.executor
            .set_database_owner(admin, &database.name, &database.owner)?;

        self.grant_users(database)?;

        Ok(DatabaseSummary {
            name: database.name.clone(),
            owner: database.owner.clone(),
            users: database.users.clone(),
            database_created,
            users_created: users_to_create.iter().map(|u| u.name.clone()).collect(),
        })
    }

    /// Declared users of `database` (owner first) missing from the server,
    /// each once.
    fn users_to_create(&self, inventory: &Inventory, database: &Database) -> Result<Vec<&'a User>> {
        let mut users: Vec<&'a User> = vec![];

        for name in database.roles() {
            if inventory.has_role(name) || users.iter().any(|u| u.name == name) {
                continue;
            }

            let user = self
                .config
                .get_user(name)
                .ok_or_else(|| Error::config(format!("user not defined: {}", name)))?;
            if !user.has_password() {
                return Err(Error::config(format!(
                    "user password not specified: {}",
                    name
                )));
            }

            users.push(user);
        }

        Ok(users)
    }

    /// Grants are issued by the owner, on a session scoped to the database.
    fn grant_users(&self, database: &Database) -> Result<()> {
        if self.executor.dryrun() {
            info!(
                "{}: connect to database {} as {}",
                Purple.paint("Dry-run"),
                database.name,
                database.owner
            );
            for user in &database.users {
                for statement in sql::grant_database_user(user) {
                    self.executor.preview(&statement);
                }
            }
            return Ok(());
        }

        let mut conn = self
            .connector
            .open_for_database(&database.name, &database.owner)?;

        for user in &database.users {
            info!("Setting database {} user to {}", database.name, user);
            self.executor.set_database_user(&mut conn, user)?;
        }

        Ok(())
    }
}

/// Provision the server described by `config`, through its ssh proxy if any.
pub fn provision(config: &Config, dryrun: bool) -> Result<Vec<DatabaseSummary>> {
    let provider = Provider::new(config)?;

    Provisioner::new(config, &provider, dryrun).provision()
}

/// Read the config from the given path and provision it.
/// If the dryrun flag is set, the changes will not be applied.
pub fn provision_file(target: &Path, dryrun: bool) -> anyhow::Result<()> {
    let config = Config::new(target)?;

    info!(
        "Provisioning {} database(s) from {}",
        config.databases.len(),
        target.display()
    );
    let summaries = provision(&config, dryrun)?;

    print_summary(&summaries, dryrun);

    Ok(())
}

/// Print summary table
fn print_summary(summaries: &[DatabaseSummary], dryrun: bool) {
    let mut rows = vec![
        vec![
            "Database".to_string(),
            "Owner".to_string(),
            "Users".to_string(),
            "Action".to_string(),
        ],
        vec![
            "---".to_string(),
            "---".to_string(),
            "---".to_string(),
            "---".to_string(),
        ],
    ];

    for summary in summaries {
        rows.push(vec![
            summary.name.clone(),
            summary.owner.clone(),
            summary.users.join(", "),
            summary.action(dryrun),
        ]);
    }

    let ascii_table = AsciiTable::default();
    info!("Summary:\n{}", ascii_table.format(rows));
}

impl DatabaseSummary {
    fn action(&self, dryrun: bool) -> String {
        let mut actions = vec![];
        if self.database_created {
            actions.push("create database".to_string());
        }
        if !self.users_created.is_empty() {
            actions.push(format!("create users [{}]", self.users_created.join(", ")));
        }
        actions.push("set owner".to_string());
        if !self.users.is_empty() {
            actions.push(format!("grant {} user(s)", self.users.len()));
        }

        let actions = actions.join(", ");
        if dryrun {
            format!("would {} (dry-run)", actions)
        } else {
            actions
        }
    }
}
