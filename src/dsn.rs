/// Default Postgres port, never written to the connection string.
pub const DEFAULT_PORT: u16 = 5432;

/// Socket directory used when neither a host nor a password is configured.
pub const DEFAULT_SOCKET_DIR: &str = "/var/run/postgresql/";

/// Build a keyword/value connection string.
///
/// Only non-empty values are emitted, in the fixed order
/// `dbname user password host port sslmode`. Without a host and a password
/// the connection goes to the local unix socket, where peer/trust auth is
/// expected, and the port is dropped.
///
/// ```
/// use pgprovision::dsn::build;
///
/// assert_eq!(
///     build("app", "alice", "secret", "db.example.com", 5433, "require"),
///     "dbname=app user=alice password=secret host=db.example.com port=5433 sslmode=require"
/// );
/// ```
pub fn build(
    dbname: &str,
    user: &str,
    password: &str,
    host: &str,
    port: u16,
    sslmode: &str,
) -> String {
    let (host, port) = if host.is_empty() && password.is_empty() {
        (DEFAULT_SOCKET_DIR, 0)
    } else {
        (host, port)
    };

    let mut parts = vec![];
    if !dbname.is_empty() {
        parts.push(format!("dbname={}", escape_value(dbname)));
    }
    if !user.is_empty() {
        parts.push(format!("user={}", escape_value(user)));
    }
    if !password.is_empty() {
        parts.push(format!("password={}", escape_value(password)));
    }
    if !host.is_empty() {
        parts.push(format!("host={}", escape_value(host)));
    }
    if port != 0 && port != DEFAULT_PORT {
        parts.push(format!("port={}", port));
    }
    if !sslmode.is_empty() {
        parts.push(format!("sslmode={}", escape_value(sslmode)));
    }

    parts.join(" ")
}

/// Quote a value when the keyword/value grammar needs it.
fn escape_value(value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if !needs_quotes {
        return value.to_string();
    }

    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Hide the password of a connection string built by [build].
pub fn redact(dsn: &str) -> String {
    let mut out = vec![];
    let mut rest = dsn;

    while let Some(start) = rest.find("password=") {
        out.push(&rest[..start]);
        out.push("password=********");
        let value = &rest[start + "password=".len()..];
        rest = skip_value(value);
    }
    out.push(rest);

    out.concat()
}

/// Skip a (possibly quoted) value, returning what follows it.
fn skip_value(value: &str) -> &str {
    if let Some(quoted) = value.strip_prefix('\'') {
        let mut escaped = false;
        for (i, c) in quoted.char_indices() {
            match c {
                '\\' if !escaped => escaped = true,
                '\'' if !escaped => return &quoted[i + 1..],
                _ => escaped = false,
            }
        }
        return "";
    }

    match value.find(' ') {
        Some(end) => &value[end..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_defaults_to_unix_socket() {
        let dsn = build("app", "alice", "", "", 0, "");
        assert_eq!(dsn, "dbname=app user=alice host=/var/run/postgresql/");
        assert!(!dsn.contains("port="));
    }

    #[test]
    fn test_build_socket_default_drops_explicit_port() {
        let dsn = build("app", "alice", "", "", 5433, "");
        assert!(dsn.contains("host=/var/run/postgresql/"));
        assert!(!dsn.contains("port="));
    }

    #[test]
    fn test_build_full() {
        assert_eq!(
            build("app", "alice", "secret", "db.example.com", 5433, "require"),
            "dbname=app user=alice password=secret host=db.example.com port=5433 sslmode=require"
        );
    }

    #[test]
    fn test_build_omits_default_port() {
        let dsn = build("app", "alice", "secret", "db.example.com", 5432, "");
        assert_eq!(dsn, "dbname=app user=alice password=secret host=db.example.com");
    }

    #[test]
    fn test_build_password_without_host() {
        // A password means password auth, so no socket fallback.
        let dsn = build("app", "alice", "secret", "", 0, "");
        assert_eq!(dsn, "dbname=app user=alice password=secret");
    }

    #[test]
    fn test_build_quotes_values() {
        let dsn = build("app", "alice", "it's a secret", "db", 0, "");
        assert_eq!(dsn, r"dbname=app user=alice password='it\'s a secret' host=db");
    }

    #[test]
    fn test_redact() {
        assert_eq!(
            redact("dbname=app user=alice password=secret host=db"),
            "dbname=app user=alice password=******** host=db"
        );
        assert_eq!(
            redact(r"user=alice password='it\'s a secret' host=db"),
            "user=alice password=******** host=db"
        );
        assert_eq!(redact("user=alice"), "user=alice");
    }
}
