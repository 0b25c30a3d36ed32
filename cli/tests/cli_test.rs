//! Drives the built `clusterforge` binary end to end.
//!
//! Every test pre-creates the certificate bundle's leaf so no external
//! certificate tool is needed.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn prepare_output_dir(dir: &Path) {
    fs::create_dir_all(dir.join("_build/emqx/rel/emqx")).unwrap();
    fs::create_dir_all(dir.join("certs")).unwrap();
    fs::write(dir.join("certs/node.pem"), "existing leaf").unwrap();
}

fn clusterforge(dir: &Path, vars: &[(&str, &str)], args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_clusterforge"));
    command
        .env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("CLUSTERFORGE_OUTPUT_DIR", dir)
        .env("CLUSTERFORGE_OS_RELEASE", dir.join("os-release"))
        .args(args);
    for (key, value) in vars {
        command.env(key, value);
    }
    command.output().unwrap()
}

#[test]
fn test_no_arguments_prints_service_definition() {
    let temp_dir = tempdir().unwrap();
    prepare_output_dir(temp_dir.path());

    let output = clusterforge(
        temp_dir.path(),
        &[
            ("CLUSTERFORGE_TOTAL_NODES", "4"),
            ("CLUSTERFORGE_CORE_NODES", "2"),
        ],
        &[],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("services:"));
    assert!(stdout.contains("  n4:"));
    assert!(!stdout.contains("  n5:"));
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("docker-compose.yml")).unwrap(),
        stdout
    );
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("certs/node.pem")).unwrap(),
        "existing leaf"
    );
}

#[test]
fn test_core_count_above_total_fails_without_writing() {
    let temp_dir = tempdir().unwrap();
    prepare_output_dir(temp_dir.path());

    let output = clusterforge(
        temp_dir.path(),
        &[
            ("CLUSTERFORGE_TOTAL_NODES", "3"),
            ("CLUSTERFORGE_CORE_NODES", "5"),
        ],
        &[],
    );

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(!temp_dir.path().join("docker-compose.yml").exists());
    assert!(!temp_dir.path().join("haproxy.cfg").exists());
}

#[test]
fn test_invalid_strategy_fails() {
    let temp_dir = tempdir().unwrap();
    prepare_output_dir(temp_dir.path());

    let output = clusterforge(
        temp_dir.path(),
        &[("CLUSTERFORGE_LB_STRATEGY", "random")],
        &[],
    );

    assert!(!output.status.success());
    assert!(!temp_dir.path().join("docker-compose.yml").exists());
}

#[cfg(unix)]
#[test]
fn test_arguments_are_forwarded_verbatim() {
    let temp_dir = tempdir().unwrap();
    prepare_output_dir(temp_dir.path());

    let output = clusterforge(
        temp_dir.path(),
        &[("CLUSTERFORGE_COMPOSE_COMMAND", "echo compose")],
        &["up", "-d", "--build"],
    );

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "compose up -d --build\n");
    assert!(temp_dir.path().join("haproxy.cfg").is_file());
}

#[cfg(unix)]
#[test]
fn test_exit_code_of_orchestration_cli_is_propagated() {
    let temp_dir = tempdir().unwrap();
    prepare_output_dir(temp_dir.path());

    let output = clusterforge(
        temp_dir.path(),
        &[("CLUSTERFORGE_COMPOSE_COMMAND", "sh -c")],
        &["exit 3"],
    );

    assert_eq!(output.status.code(), Some(3));
}

#[cfg(unix)]
#[test]
fn test_help_and_separator_are_forwarded() {
    let temp_dir = tempdir().unwrap();
    prepare_output_dir(temp_dir.path());
    let vars = [("CLUSTERFORGE_COMPOSE_COMMAND", "echo compose")];

    let help = clusterforge(temp_dir.path(), &vars, &["--help"]);
    assert!(help.status.success());
    assert_eq!(String::from_utf8(help.stdout).unwrap(), "compose --help\n");

    let separated = clusterforge(temp_dir.path(), &vars, &["--", "up"]);
    assert!(separated.status.success());
    assert_eq!(String::from_utf8(separated.stdout).unwrap(), "compose -- up\n");
}

#[cfg(unix)]
#[test]
fn test_non_utf8_environment_is_tolerated() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let temp_dir = tempdir().unwrap();
    prepare_output_dir(temp_dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_clusterforge"))
        .env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("CLUSTERFORGE_OUTPUT_DIR", temp_dir.path())
        .env("LEGACY_VAR", OsStr::from_bytes(b"\xff\xfe"))
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout).unwrap().starts_with("services:"));
}

#[cfg(unix)]
#[test]
fn test_non_utf8_generator_setting_is_rejected() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let temp_dir = tempdir().unwrap();
    prepare_output_dir(temp_dir.path());

    let output = Command::new(env!("CARGO_BIN_EXE_clusterforge"))
        .env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("CLUSTERFORGE_OUTPUT_DIR", temp_dir.path())
        .env("CLUSTERFORGE_IMAGE_TAG", OsStr::from_bytes(b"broker\xff"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(!temp_dir.path().join("docker-compose.yml").exists());
}
