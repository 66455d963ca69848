use crate::connection::Executor;
use crate::error::Result;
use crate::sql;
use ansi_term::Colour::{Green, Purple};
use log::info;

/// Issues the administrative statements of a run, or only logs them in
/// dry-run mode. Driver errors are returned as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementExecutor {
    dryrun: bool,
}

impl StatementExecutor {
    pub fn new(dryrun: bool) -> Self {
        Self { dryrun }
    }

    pub fn dryrun(&self) -> bool {
        self.dryrun
    }

    /// Run one statement.
    pub fn run<E: Executor + ?Sized>(&self, conn: &mut E, statement: &str) -> Result<()> {
        if self.dryrun {
            self.preview(statement);
            return Ok(());
        }

        conn.execute(statement)?;
        info!("{}: {}", Green.paint("Success"), Purple.paint(sql::redact(statement)));

        Ok(())
    }

    /// Log a statement that would be executed.
    pub fn preview(&self, statement: &str) {
        info!("{}: {}", Purple.paint("Dry-run"), sql::redact(statement));
    }

    pub fn create_database<E: Executor + ?Sized>(&self, conn: &mut E, name: &str) -> Result<()> {
        self.run(conn, &sql::create_database(name))
    }

    /// Create a login role, then set its password if it has one.
    pub fn create_user<E: Executor + ?Sized>(
        &self,
        conn: &mut E,
        name: &str,
        password: &str,
    ) -> Result<()> {
        self.run(conn, &sql::create_user(name))?;
        if !password.is_empty() {
            self.run(conn, &sql::alter_user_password(name, password))?;
        }

        Ok(())
    }

    pub fn set_database_owner<E: Executor + ?Sized>(
        &self,
        conn: &mut E,
        database: &str,
        owner: &str,
    ) -> Result<()> {
        self.run(conn, &sql::alter_database_owner(database, owner))
    }

    /// Grant `user` access to the `public` schema of the database `conn` is on.
    pub fn set_database_user<E: Executor + ?Sized>(&self, conn: &mut E, user: &str) -> Result<()> {
        for statement in sql::grant_database_user(user) {
            self.run(conn, &statement)?;
        }

        Ok(())
    }
}
