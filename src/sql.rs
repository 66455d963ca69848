//! Rendering of the administrative statements issued by a provisioning run.
//!
//! Names come from the config file, which is trusted input. They are still
//! quoted the way the server's `quote_ident()` does it, so plain lower-case
//! names stay readable (`CREATE DATABASE app`) and anything else is
//! double-quoted.

/// Catalog query listing the existing roles that can log in.
pub const SELECT_ROLES: &str = "SELECT usename FROM pg_catalog.pg_user";

/// Catalog query listing the existing databases.
pub const SELECT_DATABASES: &str = "SELECT datname FROM pg_catalog.pg_database";

const PASSWORD_MASK: &str = "'********'";

/// Quote an identifier unless it is a plain lower-case identifier.
pub fn quote_ident(ident: &str) -> String {
    let mut chars = ident.chars();
    let plain = match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {
            chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
        }
        _ => false,
    };

    if plain {
        ident.to_string()
    } else {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }
}

/// Quote a string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

pub fn create_database(name: &str) -> String {
    format!("CREATE DATABASE {}", quote_ident(name))
}

pub fn create_user(name: &str) -> String {
    format!("CREATE USER {}", quote_ident(name))
}

pub fn alter_user_password(name: &str, password: &str) -> String {
    format!(
        "ALTER USER {} WITH PASSWORD {}",
        quote_ident(name),
        quote_literal(password)
    )
}

pub fn alter_database_owner(database: &str, owner: &str) -> String {
    format!(
        "ALTER DATABASE {} OWNER TO {}",
        quote_ident(database),
        quote_ident(owner)
    )
}

/// Statements giving `user` read/write access to the `public` schema of the
/// current database, including objects created later by the owner.
pub fn grant_database_user(user: &str) -> Vec<String> {
    let user = quote_ident(user);

    vec![
        format!("GRANT USAGE ON SCHEMA public TO {}", user),
        format!(
            "GRANT SELECT, UPDATE, INSERT, DELETE ON ALL TABLES IN SCHEMA public TO {}",
            user
        ),
        format!(
            "GRANT USAGE, SELECT ON ALL SEQUENCES IN SCHEMA public TO {}",
            user
        ),
        format!(
            "ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT SELECT, UPDATE, INSERT, DELETE ON TABLES TO {}",
            user
        ),
        format!(
            "ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT USAGE, SELECT ON SEQUENCES TO {}",
            user
        ),
    ]
}

/// Mask the password literal of a statement before it is logged or reported.
pub fn redact(statement: &str) -> String {
    const KEYWORD: &str = " WITH PASSWORD ";

    let start = match statement.find(KEYWORD) {
        Some(pos) => pos + KEYWORD.len(),
        None => return statement.to_string(),
    };

    let literal = &statement[start..];
    let end = literal_end(literal).map_or(statement.len(), |n| start + n);

    format!("{}{}{}", &statement[..start], PASSWORD_MASK, &statement[end..])
}

/// Byte length of the leading `'...'` literal, honouring doubled quotes.
fn literal_end(s: &str) -> Option<usize> {
    let body = s.strip_prefix('\'')?;
    let mut chars = body.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c == '\'' {
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                continue;
            }
            return Some(i + 2);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("app"), "app");
        assert_eq!(quote_ident("app_v2$"), "app_v2$");
        assert_eq!(quote_ident("_tmp"), "_tmp");
        assert_eq!(quote_ident("Alice"), "\"Alice\"");
        assert_eq!(quote_ident("2fast"), "\"2fast\"");
        assert_eq!(quote_ident("my-app"), "\"my-app\"");
    }

    #[test]
    fn test_sql_injection_prevention() {
        let sql = create_database("db1\"; DROP DATABASE postgres; --");
        assert_eq!(sql, "CREATE DATABASE \"db1\"\"; DROP DATABASE postgres; --\"");

        let sql = alter_user_password("alice", "x'; DROP USER postgres; --");
        assert_eq!(
            sql,
            "ALTER USER alice WITH PASSWORD 'x''; DROP USER postgres; --'"
        );
    }

    #[test]
    fn test_create_and_owner_statements() {
        assert_eq!(create_database("app"), "CREATE DATABASE app");
        assert_eq!(create_user("alice"), "CREATE USER alice");
        assert_eq!(
            alter_user_password("alice", "secret"),
            "ALTER USER alice WITH PASSWORD 'secret'"
        );
        assert_eq!(
            alter_database_owner("app", "alice"),
            "ALTER DATABASE app OWNER TO alice"
        );
    }

    #[test]
    fn test_grant_database_user() {
        let statements = grant_database_user("bob");
        assert_eq!(
            statements,
            vec![
                "GRANT USAGE ON SCHEMA public TO bob",
                "GRANT SELECT, UPDATE, INSERT, DELETE ON ALL TABLES IN SCHEMA public TO bob",
                "GRANT USAGE, SELECT ON ALL SEQUENCES IN SCHEMA public TO bob",
                "ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT SELECT, UPDATE, INSERT, DELETE ON TABLES TO bob",
                "ALTER DEFAULT PRIVILEGES IN SCHEMA public GRANT USAGE, SELECT ON SEQUENCES TO bob",
            ]
        );
    }

    #[test]
    fn test_redact() {
        assert_eq!(
            redact(&alter_user_password("alice", "secret")),
            "ALTER USER alice WITH PASSWORD '********'"
        );
        assert_eq!(
            redact(&alter_user_password("alice", "it's")),
            "ALTER USER alice WITH PASSWORD '********'"
        );
        assert_eq!(redact("CREATE USER alice"), "CREATE USER alice");
    }
}
