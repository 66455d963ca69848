use crate::config::{Config, Format};
use ansi_term::Colour::{Green, Red};
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Validate the target file, or every config file under the target directory.
pub fn validate_target(target: &Path) -> Result<()> {
    if !target.exists() {
        return Err(anyhow!(
            "{:?} ... {} - file/directory does not exist",
            target,
            Red.paint("Failed")
        ));
    }

    if !target.is_dir() {
        return validate_file(target);
    }

    // Scan all files recursive from the target directory
    // that have a config extension and validate them
    let mut files: Vec<PathBuf> = vec![];
    for entry in WalkDir::new(target) {
        let entry = entry?;
        if entry.path().is_file() && Format::from_path(entry.path()).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    let mut invalid = 0;
    for file in &files {
        // Validate but keep going
        if let Err(e) = validate_file(file) {
            println!("{}", e);
            invalid += 1;
        }
    }

    if invalid > 0 {
        return Err(anyhow!(
            "{} of {} config file(s) invalid",
            invalid,
            files.len()
        ));
    }

    Ok(())
}

/// Validate target config file
pub fn validate_file(file: &Path) -> Result<()> {
    let config = Config::new(file)
        .map_err(|e| anyhow!("{:?} ... {} - {}", file, Red.paint("invalid"), e))?;

    // "OK" in green color
    println!(
        "{:?} ... {} ({} user(s), {} database(s))",
        file,
        Green.paint("ok"),
        config.users.len(),
        config.databases.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID: &str = "users:\n  - name: alice\n    password: secret\ndatabases:\n  - name: app\n    owner: alice\n";
    const INVALID: &str = "databases:\n  - name: app\n    owner: alice\n";

    #[test]
    fn test_validate_missing_target() {
        let err = validate_target(Path::new("/tmp/pgprovision-not-found")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_validate_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("a.yaml"), VALID).unwrap();
        fs::write(dir.path().join("nested/b.yml"), VALID).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a config").unwrap();

        assert!(validate_target(dir.path()).is_ok());
    }

    #[test]
    fn test_validate_directory_with_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.yaml"), VALID).unwrap();
        fs::write(dir.path().join("b.yaml"), INVALID).unwrap();

        let err = validate_target(dir.path()).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 config file(s) invalid");
    }

    #[test]
    fn test_validate_file_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, INVALID).unwrap();

        let err = validate_file(&path).unwrap_err();
        assert!(err.to_string().contains("user not defined: alice"));
    }
}
