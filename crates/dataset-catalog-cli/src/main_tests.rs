// crates/dataset-catalog-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and patch assembly.
// Purpose: Ensure update flags and patch files combine predictably.
// Dependencies: dataset-catalog-cli main helpers
// ============================================================================

//! ## Overview
//! Validates clap wiring, `--input` merging, and bounded patch reads.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use clap::Parser;
use dataset_catalog_core::DatasetId;

use super::Cli;
use super::Commands;
use super::ReadLimitError;
use super::UpdateCommand;
use super::build_patch;
use super::read_bytes_with_limit;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn update_args(args: &[&str]) -> UpdateCommand {
    let mut argv = vec!["dataset-catalog", "update"];
    argv.extend_from_slice(args);
    match Cli::try_parse_from(argv).expect("parse").command {
        Commands::Update(command) => command,
        other => panic!("unexpected command: {other:?}"),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn repeated_flags_collect_into_lists() {
    let patch = build_patch(update_args(&[
        "--name",
        "Sales",
        "--drive-url",
        "https://drive.example.com/sales.csv",
        "--tag",
        "finance",
        "--tag",
        "q3",
        "--column",
        "region",
    ]))
    .expect("patch");

    assert_eq!(patch.id, None);
    assert_eq!(patch.name.as_deref(), Some("Sales"));
    assert_eq!(patch.tags, Some(vec!["finance".to_string(), "q3".to_string()]));
    assert_eq!(patch.columns, Some(vec!["region".to_string()]));
    assert_eq!(patch.description, None);
}

#[test]
fn flags_override_input_file_fields() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("patch.json");
    fs::write(&path, r#"{"id": 3, "name": "Old", "description": "kept", "tags": ["a"]}"#)
        .expect("write patch");

    let patch = build_patch(update_args(&[
        "--input",
        path.to_str().expect("utf-8 path"),
        "--name",
        "New",
    ]))
    .expect("patch");

    assert_eq!(patch.id, DatasetId::from_raw(3));
    assert_eq!(patch.name.as_deref(), Some("New"));
    assert_eq!(patch.description.as_deref(), Some("kept"));
    assert_eq!(patch.tags, Some(vec!["a".to_string()]));
}

#[test]
fn input_file_with_unknown_field_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("patch.json");
    fs::write(&path, r#"{"name": "A", "owner": "me"}"#).expect("write patch");

    let err = build_patch(update_args(&["--input", path.to_str().expect("utf-8 path")]))
        .expect_err("unknown field");
    assert!(err.to_string().contains("invalid patch"), "{err}");
}

#[test]
fn update_without_fields_is_rejected() {
    let err = build_patch(update_args(&["--id", "1"])).expect_err("empty patch");
    assert!(err.to_string().contains("at least one field"), "{err}");
}

#[test]
fn zero_id_is_rejected_by_the_parser() {
    assert!(Cli::try_parse_from(["dataset-catalog", "get", "0"]).is_err());
    assert!(Cli::try_parse_from(["dataset-catalog", "get", "abc"]).is_err());
}

#[test]
fn global_config_flag_is_accepted_after_subcommand() {
    let cli = Cli::try_parse_from(["dataset-catalog", "list", "--config", "catalog.toml"])
        .expect("parse");
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("catalog.toml")));
}

#[test]
fn read_bytes_with_limit_allows_small_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("small.json");
    fs::write(&path, b"ok").expect("write small file");

    let bytes = read_bytes_with_limit(&path, 16).expect("read small file");
    assert_eq!(bytes, b"ok");
}

#[test]
fn read_bytes_with_limit_rejects_large_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("large.json");
    fs::write(&path, vec![b'x'; 32]).expect("write large file");

    match read_bytes_with_limit(&path, 16) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 32);
            assert_eq!(limit, 16);
        }
        other => panic!("expected size limit error, got {other:?}"),
    }
}
