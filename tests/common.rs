#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use tempfile::{tempdir, TempDir};

/// Returns a configured Command for `dialect_rs`
pub fn dialect_cmd() -> Command {
    Command::cargo_bin("dialect_rs").expect("Binary not found")
}

/// Prepares a temp dir holding a config file that selects IRIS and layers a
/// patch file over its definition
pub fn setup_patched_config() -> TempDir {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    fs::write(
        temp_dir.path().join("iris-patch.toml"),
        r#"
[properties]
statement_batch_size = 50

[functions.shout]
render = "pattern"
pattern = "upper(?1) || '!'"
returns = "varchar"
"#,
    )
    .unwrap();

    fs::write(
        temp_dir.path().join("config.toml"),
        r#"
[dialect]
name = "iris"
version = "2023.1"
patches = ["iris-patch.toml"]

[logging]
level = "warn"
colored = false

[properties]
use_sql_comments = true
"#,
    )
    .unwrap();

    temp_dir
}
