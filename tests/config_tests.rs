mod common;
use common::{dialect_cmd, setup_patched_config};
use dialect_rs::model::{Config, ConfigError};
use predicates::prelude::*;
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

#[test]
#[serial]
fn test_config_generation() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("test-config.toml");

    dialect_cmd()
        .arg("config")
        .arg("--output")
        .arg(&config_path)
        .current_dir(&temp_dir)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[dialect]"));
    assert!(content.contains("name = \"generic\""));
    assert!(content.contains("[logging]"));
}

#[test]
#[serial]
fn test_config_generation_with_env() {
    let temp_dir = tempdir().unwrap();

    dialect_cmd()
        .arg("config")
        .arg("--for-env")
        .arg("test")
        .current_dir(&temp_dir)
        .assert()
        .success();

    assert!(temp_dir.path().join("config.toml").exists());
    assert!(temp_dir.path().join("config/test.toml").exists());
}

#[test]
#[serial]
fn test_config_selects_dialect_and_patches() {
    let temp_dir = setup_patched_config();

    dialect_cmd()
        .arg("show")
        .current_dir(&temp_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("dialect: intersystems 2023.1"))
        .stdout(predicate::str::contains("use_sql_comments=true"))
        .stdout(predicate::str::contains("statement_batch_size=50"));

    dialect_cmd()
        .args(["function", "shout", "name"])
        .current_dir(&temp_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("upper(name) || '!'"));
}

#[test]
#[serial]
fn test_flags_override_config() {
    let temp_dir = setup_patched_config();

    dialect_cmd()
        .args(["show", "--dialect", "postgres", "--db-version", "15.0"])
        .current_dir(&temp_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("dialect: postgres 15.0"));
}

#[test]
#[serial]
fn test_environment_config_overrides_base() {
    let temp_dir = setup_patched_config();
    fs::create_dir(temp_dir.path().join("config")).unwrap();
    fs::write(
        temp_dir.path().join("config/staging.toml"),
        "[dialect]\nname = \"mysql\"\nversion = \"8.0\"\n",
    )
    .unwrap();

    dialect_cmd()
        .args(["show", "--env", "staging"])
        .current_dir(&temp_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("dialect: mysql 8.0"));
}

#[test]
#[serial]
fn test_missing_patch_file_fails() {
    let temp_dir = tempdir().unwrap();
    fs::write(
        temp_dir.path().join("config.toml"),
        "[dialect]\nname = \"postgres\"\npatches = [\"missing.toml\"]\n",
    )
    .unwrap();

    dialect_cmd()
        .arg("show")
        .current_dir(&temp_dir)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Failed to load dialect patches"));
}

#[test]
#[serial]
fn test_invalid_config_file_fails() {
    let temp_dir = tempdir().unwrap();
    fs::write(temp_dir.path().join("config.toml"), "[dialect\nname = ").unwrap();

    dialect_cmd()
        .arg("dialects")
        .current_dir(&temp_dir)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Failed to load configuration"));
}

#[test]
#[serial]
fn test_logging_only_environment_keeps_dialect() {
    let temp_dir = setup_patched_config();
    fs::create_dir(temp_dir.path().join("config")).unwrap();
    fs::write(
        temp_dir.path().join("config/prod.toml"),
        "[logging]\nlevel = \"error\"\n",
    )
    .unwrap();

    dialect_cmd()
        .args(["show", "--env", "prod"])
        .current_dir(&temp_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("dialect: intersystems 2023.1"))
        .stdout(predicate::str::contains("statement_batch_size=50"));
}

#[test]
#[serial]
fn test_environment_overlay_through_library() {
    let temp_dir = tempdir().unwrap();
    fs::write(
        temp_dir.path().join("config.toml"),
        "[dialect]\nname = \"intersystems\"\n\n[logging]\nlevel = \"debug\"\ncolored = false\n",
    )
    .unwrap();
    fs::create_dir(temp_dir.path().join("config")).unwrap();
    fs::write(
        temp_dir.path().join("config/prod.toml"),
        "[logging]\nlevel = \"warn\"\n",
    )
    .unwrap();

    let original_dir = std::env::current_dir().unwrap();
    std::env::set_current_dir(temp_dir.path()).unwrap();
    let loaded = Config::load(None, Some("prod"));
    std::env::set_current_dir(original_dir).unwrap();

    let config = loaded.unwrap();
    assert_eq!(config.dialect.name, "intersystems");
    assert_eq!(config.logging.level, "warn");
    assert!(!config.logging.colored);
}

#[test]
#[serial]
fn test_malformed_local_config_fails() {
    let temp_dir = setup_patched_config();
    fs::create_dir(temp_dir.path().join("config")).unwrap();
    fs::write(temp_dir.path().join("config/local.toml"), "[dialect\nname = ").unwrap();

    dialect_cmd()
        .arg("show")
        .current_dir(&temp_dir)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Failed to load configuration"))
        .stdout(predicate::str::contains("config/local.toml"));

    let original_dir = std::env::current_dir().unwrap();
    std::env::set_current_dir(temp_dir.path()).unwrap();
    let loaded = Config::load(None, None);
    std::env::set_current_dir(original_dir).unwrap();

    assert!(matches!(loaded, Err(ConfigError::Parse(path, _)) if path == "config/local.toml"));
}

#[test]
#[serial]
fn test_malformed_environment_config_fails() {
    let temp_dir = setup_patched_config();
    fs::create_dir(temp_dir.path().join("config")).unwrap();
    fs::write(
        temp_dir.path().join("config/staging.toml"),
        "[logging]\ncolored = \"maybe\"\n",
    )
    .unwrap();

    dialect_cmd()
        .args(["show", "--env", "staging"])
        .current_dir(&temp_dir)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Failed to load configuration"));
}
