use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
use std::process::Command; // Run programs

#[test]
fn missing_arguments() {
    let mut cmd = Command::cargo_bin("pgprovision").unwrap();
    cmd.assert().failure();
}

#[test]
/// `pgprovision provision` must have --config or -c args
fn provision_missing_arguments() {
    let mut cmd = Command::cargo_bin("pgprovision").unwrap();
    cmd.arg("provision")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--config"));
}

#[test]
fn help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("pgprovision").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("inspect"));
}
