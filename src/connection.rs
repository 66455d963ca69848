use crate::config::Config;
use crate::dsn::{self, DEFAULT_PORT};
use crate::error::{Error, Result};
use crate::sql;
use crate::ssh::{self, Tunnel};
use log::{debug, info};
use native_tls::TlsConnector;
use postgres::Client;
use postgres_native_tls::MakeTlsConnector;
use std::time::Duration;

/// Runs SQL on one database session.
pub trait Executor {
    /// Execute a statement that returns no rows.
    fn execute(&mut self, statement: &str) -> Result<()>;

    /// Run a query and return its first column as strings.
    fn query_strings(&mut self, query: &str) -> Result<Vec<String>>;
}

/// Opens database sessions for the run.
pub trait Connector {
    type Connection: Executor;

    /// Session on the admin database, as the admin user.
    fn open_admin(&self) -> Result<Self::Connection>;

    /// Session on `dbname`, authenticated as `user` with its configured password.
    fn open_for_database(&self, dbname: &str, user: &str) -> Result<Self::Connection>;
}

/// A live Postgres session.
pub struct DbConnection {
    connection_info: String,
    client: Client,
}

impl DbConnection {
    /// Connect with the given keyword/value connection string.
    ///
    /// `sslmode` is the mode from the config; `verify-ca` and `verify-full`
    /// are enforced by the TLS connector since the driver only knows
    /// `disable`, `prefer` and `require`.
    pub fn connect(conn: &str, sslmode: &str, timeout: Option<Duration>) -> Result<Self> {
        let connection_info = dsn::redact(conn);

        let mut pg_config =
            driver_config(conn).map_err(|e| Error::connection(&connection_info, e))?;
        if let Some(timeout) = timeout {
            pg_config.connect_timeout(timeout);
        }

        let tls = tls_connector(sslmode).map_err(|e| Error::connection(&connection_info, e))?;
        let client = pg_config
            .connect(tls)
            .map_err(|e| Error::connection(&connection_info, e))?;

        info!("Connected to database: {}", connection_info);

        Ok(Self {
            connection_info,
            client,
        })
    }

    /// Returns the connection_info, without the password
    pub fn connection_info(&self) -> &str {
        &self.connection_info
    }
}

impl Executor for DbConnection {
    fn execute(&mut self, statement: &str) -> Result<()> {
        debug!("execute: {}", sql::redact(statement));

        self.client
            .batch_execute(statement)
            .map_err(|e| Error::Statement {
                statement: sql::redact(statement),
                source: e.into(),
            })
    }

    fn query_strings(&mut self, query: &str) -> Result<Vec<String>> {
        let query_error = |e: postgres::Error| Error::Query {
            query: query.to_string(),
            source: e.into(),
        };

        let rows = self.client.query(query, &[]).map_err(query_error)?;
        let values = rows
            .iter()
            .map(|row| row.try_get::<_, String>(0))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(query_error)?;

        debug!("query_strings: {} -> {:?}", query, values);

        Ok(values)
    }
}

/// Parse a connection string. Without a host the driver refuses to connect,
/// so default to `localhost` as libpq does.
fn driver_config(conn: &str) -> std::result::Result<postgres::Config, postgres::Error> {
    let mut pg_config: postgres::Config = conn.parse()?;
    if pg_config.get_hosts().is_empty() {
        pg_config.host("localhost");
    }

    Ok(pg_config)
}

/// sslmode understood by the driver.
fn driver_sslmode(sslmode: &str) -> &str {
    match sslmode {
        "verify-ca" | "verify-full" => "require",
        other => other,
    }
}

fn tls_connector(sslmode: &str) -> std::result::Result<MakeTlsConnector, native_tls::Error> {
    let mut builder = TlsConnector::builder();
    match sslmode {
        "verify-full" => {}
        "verify-ca" => {
            builder.danger_accept_invalid_hostnames(true);
        }
        // Encrypt only, like libpq's `require`.
        _ => {
            builder.danger_accept_invalid_certs(true);
        }
    }

    Ok(MakeTlsConnector::new(builder.build()?))
}

/// Connection provider for a run. Owns the ssh tunnel, if the config asks
/// for one, so every connection of the run goes through the same ssh session.
pub struct Provider<'a> {
    config: &'a Config,
    tunnel: Option<Tunnel>,
}

impl<'a> Provider<'a> {
    pub fn new(config: &'a Config) -> Result<Self> {
        let tunnel = match config.ssh_proxy() {
            Some(alias) => {
                info!("Creating ssh proxy {}", alias);

                let host = ssh::resolve_alias(config.ssh_config.as_deref(), alias)?;
                let (remote_host, remote_port) = remote_target(config);
                Some(Tunnel::open(&host, &remote_host, remote_port)?)
            }
            None => None,
        };

        Ok(Self { config, tunnel })
    }

    /// Host and port the driver dials.
    fn endpoint(&self) -> (String, u16) {
        match &self.tunnel {
            Some(tunnel) => {
                let addr = tunnel.local_addr();
                (addr.ip().to_string(), addr.port())
            }
            None => (self.config.host.clone(), self.config.port),
        }
    }

    /// Connection string for `user` on `dbname`, with the user's password.
    pub fn connection_string(&self, dbname: &str, user: &str) -> String {
        let (host, port) = self.endpoint();
        let password = self.config.get_password(user);

        // A password means TCP, and the driver has no default host.
        let host = if host.is_empty() && !password.is_empty() {
            "localhost".to_string()
        } else {
            host
        };

        dsn::build(
            dbname,
            user,
            password,
            &host,
            port,
            driver_sslmode(&self.config.sslmode),
        )
    }

    fn open(&self, dbname: &str, user: &str) -> Result<DbConnection> {
        let conn = self.connection_string(dbname, user);

        DbConnection::connect(
            &conn,
            &self.config.sslmode,
            self.config.connect_timeout.map(Duration::from_secs),
        )
    }
}

impl Connector for Provider<'_> {
    type Connection = DbConnection;

    fn open_admin(&self) -> Result<DbConnection> {
        self.open(&self.config.database, &self.config.admin_user())
    }

    fn open_for_database(&self, dbname: &str, user: &str) -> Result<DbConnection> {
        self.open(dbname, user)
    }
}

/// Postgres address as seen from the ssh host.
fn remote_target(config: &Config) -> (String, u16) {
    let host = if config.host.is_empty() {
        "localhost".to_string()
    } else {
        config.host.clone()
    };
    let port = if config.port == 0 {
        DEFAULT_PORT
    } else {
        config.port
    };

    (host, port)
}
