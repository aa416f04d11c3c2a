use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("ora2pg-assist").unwrap();
    cmd.env_remove("DATABASE_URL");
    cmd
}

#[test]
fn test_cli_help() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Oracle to PostgreSQL migration assistant"));
}

#[test]
fn test_cli_serve_help() {
    cli().arg("serve").arg("--help").assert().success().stdout(predicate::str::contains("port"));
}

#[test]
fn test_cli_migrate_help_lists_options() {
    cli()
        .args(["migrate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--clean-slate").and(predicate::str::contains("--types")));
}

#[test]
fn test_cache_clear_requires_yes() {
    cli()
        .args(["cache-clear", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("without --yes"));
}

#[test]
fn test_unknown_client_fails() {
    cli()
        .args(["cache-stats", "42"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("client 42 not found"));
}

#[test]
fn test_invalid_object_type_is_rejected() {
    cli().args(["migrate", "1", "--types", "table,bogus"]).assert().failure().code(2);
}
