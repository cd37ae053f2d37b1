// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;
use tempfile::tempdir;

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempdir().unwrap();
    let config = MeridianConfig::load(&dir.path().join("config.toml")).unwrap();
    assert_eq!(config, MeridianConfig::default());
    assert_eq!(config.max_retries, 3);
    assert_eq!(config.guardrail_timeout_secs, 30.0);
}

#[test]
fn test_partial_file_keeps_defaults_for_unset_keys() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "max_retries = 1").unwrap();
    writeln!(file, "[output]").unwrap();
    writeln!(file, "verbosity = \"quiet\"").unwrap();

    let config = MeridianConfig::load(&path).unwrap();
    assert_eq!(config.max_retries, 1);
    assert_eq!(config.retry_backoff_secs, 1.0);
    assert_eq!(config.output.verbosity, "quiet");
}

#[test]
fn test_invalid_toml_is_a_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "max_retries = [not toml").unwrap();
    let err = MeridianConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigParse { .. }));
}
