//! Configuration layering across global, project and environment sources

use pm0_config::{ConfigLoader, TraceFormat, DEFAULT_REGISTERS};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ENV_VARS: [&str; 4] = [
    "PM0_REGISTERS",
    "PM0_STACK_CAPACITY",
    "PM0_MAX_CODE_LENGTH",
    "PM0_TRACE",
];

fn clear_env() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

// ============================================================================
// Layering
// ============================================================================

#[test]
#[serial]
fn test_three_layers_merge_field_by_field() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let global = write(
        temp_dir.path(),
        "global.toml",
        "[machine]\nregisters = 4\nstack_capacity = 100\n\n[trace]\nformat = \"json\"\n",
    );
    write(
        temp_dir.path(),
        "pm0.toml",
        "[machine]\nstack_capacity = 50\n",
    );
    env::set_var("PM0_TRACE", "yes");

    let mut loader = ConfigLoader::with_global_path(&global);
    let config = loader.load_from_directory(temp_dir.path()).unwrap();
    clear_env();

    assert_eq!(config.registers(), 4);
    assert_eq!(config.stack_capacity(), 50);
    assert!(config.trace_enabled());
    assert_eq!(config.trace_format(), TraceFormat::Json);
    assert_eq!(config.project_root.as_deref(), Some(temp_dir.path()));
}

#[test]
#[serial]
fn test_broken_global_config_is_ignored() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let global = write(temp_dir.path(), "global.toml", "[machine\nregisters = ");

    let mut loader = ConfigLoader::with_global_path(&global);
    let config = loader.load_from_directory(temp_dir.path()).unwrap();

    assert_eq!(config.registers(), DEFAULT_REGISTERS);
}

#[test]
#[serial]
fn test_broken_project_config_is_an_error() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "pm0.toml", "[machine]\nregisters = \"many\"\n");

    let mut loader = ConfigLoader::with_global_path(temp_dir.path().join("none.toml"));
    let err = loader.load_from_directory(temp_dir.path()).unwrap_err();

    assert!(err.to_string().contains("pm0.toml"));
}

#[rstest]
#[case("registers = 70000", "machine.registers")]
#[case("stack_capacity = 2147483648", "machine.stack_capacity")]
#[case("stack_capacity = 4611686018427387904", "machine.stack_capacity")]
#[case("max_code_length = 4294967296", "machine.max_code_length")]
#[serial]
fn test_oversized_machine_rejected(#[case] line: &str, #[case] field: &str) {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "pm0.toml", &format!("[machine]\n{}\n", line));

    let mut loader = ConfigLoader::with_global_path(temp_dir.path().join("none.toml"));
    let err = loader.load_from_directory(temp_dir.path()).unwrap_err();

    let message = err.to_string();
    assert!(message.contains(field), "{}", message);
    assert!(message.contains("exceeds the maximum"), "{}", message);
}

#[test]
#[serial]
fn test_oversized_env_capacity_rejected() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    env::set_var("PM0_STACK_CAPACITY", "4611686018427387904");

    let mut loader = ConfigLoader::with_global_path(temp_dir.path().join("none.toml"));
    let result = loader.load_from_directory(temp_dir.path());
    clear_env();

    assert!(result.unwrap_err().to_string().contains("exceeds the maximum"));
}

// ============================================================================
// Environment
// ============================================================================

#[rstest]
#[case("PM0_REGISTERS", "0", "machine.registers")]
#[case("PM0_STACK_CAPACITY", "2", "machine.stack_capacity")]
#[case("PM0_MAX_CODE_LENGTH", "0", "machine.max_code_length")]
#[serial]
fn test_env_values_are_validated(#[case] var: &str, #[case] value: &str, #[case] field: &str) {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    env::set_var(var, value);

    let mut loader = ConfigLoader::with_global_path(temp_dir.path().join("none.toml"));
    let result = loader.load_from_directory(temp_dir.path());
    clear_env();

    let err = result.unwrap_err();
    assert!(err.to_string().contains(field), "{}", err);
}

#[rstest]
#[case("1", true)]
#[case("TRUE", true)]
#[case("no", false)]
#[case("0", false)]
#[serial]
fn test_env_trace_switch(#[case] value: &str, #[case] expected: bool) {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "pm0.toml", "[trace]\nenabled = true\n");
    env::set_var("PM0_TRACE", value);

    let mut loader = ConfigLoader::with_global_path(temp_dir.path().join("none.toml"));
    let config = loader.load_from_directory(temp_dir.path()).unwrap();
    clear_env();

    assert_eq!(config.trace_enabled(), expected);
}
