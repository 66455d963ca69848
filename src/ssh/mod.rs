pub mod config;
pub mod tunnel;

pub use config::HostConfig;
pub use tunnel::Tunnel;

use crate::error::{Error, Result};
use std::path::Path;

/// Resolve an ssh alias from `ssh_config`, or from `~/.ssh/config` when no
/// file is given. A missing default file resolves the alias as a host name.
pub fn resolve_alias(ssh_config: Option<&Path>, alias: &str) -> Result<HostConfig> {
    let content = match ssh_config {
        Some(path) => {
            config::read_with_includes(path).map_err(|e| Error::config_file(path, e))?
        }
        None => {
            let path = config::expand_home("~/.ssh/config");
            config::read_with_includes(&path).unwrap_or_default()
        }
    };

    Ok(config::resolve(&content, alias))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_resolve_alias_from_file() {
        let mut file = NamedTempFile::new().expect("failed to create temp file");
        file.write_all(b"Host proxy\n  HostName 10.0.0.2\n  User bob\n")
            .expect("failed to write to temp file");

        let host = resolve_alias(Some(file.path()), "proxy").unwrap();
        assert_eq!(host.host_name, "10.0.0.2");
        assert_eq!(host.user, "bob");
    }

    #[test]
    fn test_resolve_alias_missing_file() {
        let err = resolve_alias(Some(Path::new("/tmp/pgprovision-no-ssh-config")), "proxy")
            .unwrap_err();
        assert!(matches!(err, Error::ConfigFile { .. }));
    }
}
