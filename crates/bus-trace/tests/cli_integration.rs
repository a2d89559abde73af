//! Integration tests for the i8008-trace CLI.

#![allow(clippy::pedantic, clippy::nursery)]

use bus_trace as _;
use i8008_bus::CycleState;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use thiserror as _;

fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.join("i8008-trace")
}

fn bits(value: Option<u8>, width: u32) -> String {
    (0..width)
        .map(|bit| match value {
            Some(v) => if (v >> bit) & 1 == 1 { "1" } else { "0" }.to_string(),
            None => "?".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Renders states as an analyzer export: three samples per state, SYNC high
/// then low twice. `glitch` replaces the data of one sample by index.
fn render(states: &[(CycleState, Option<u8>, bool)], glitch: Option<(usize, u8)>) -> String {
    let mut text = String::from("Exported capture\n");
    text.push_str("Time(s), D0, D1, D2, D3, D4, D5, D6, D7, INT, S0, S1, S2, SYNC\n");
    let mut n = 0;
    for (state, data, int) in states {
        for sync in [true, false, false] {
            let data = match glitch {
                Some((index, value)) if index == n => Some(value),
                _ => *data,
            };
            writeln!(
                text,
                "{:.7}, {}, {}, {}, {}",
                n as f64 * 1e-6,
                bits(data, 8),
                u8::from(*int),
                bits(Some(state.status_bits()), 3),
                u8::from(sync)
            )
            .unwrap();
            n += 1;
        }
    }
    text
}

fn boot_states() -> Vec<(CycleState, Option<u8>, bool)> {
    vec![
        (CycleState::Stopped, None, false),
        (CycleState::Stopped, None, true),
        (CycleState::T1I, Some(0x00), true),
        (CycleState::T2, Some(0x00), true),
        (CycleState::T3, Some(0x05), true),
        (CycleState::T4, None, false),
        (CycleState::T1, Some(0x00), false),
        (CycleState::T2, Some(0x40), false),
        (CycleState::T3, Some(0x99), false),
        (CycleState::T1, Some(0x01), false),
        (CycleState::T2, Some(0x00), false),
        (CycleState::T3, Some(0xC0), false),
    ]
}

fn write_capture(dir: &Path, name: &str, glitch: Option<(usize, u8)>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, render(&boot_states(), glitch)).unwrap();
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(binary_path())
        .args(args)
        .output()
        .expect("failed to run i8008-trace")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn states_groups_cycles() {
    let temp_dir = tempfile::tempdir().unwrap();
    let capture = write_capture(temp_dir.path(), "boot.csv", None);

    let output = run(&["states", capture.to_str().unwrap()]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("--- Cycle #1 ---"));
    assert!(text.contains("--- Cycle #3 ---"));
    assert!(text.contains("T1I"));
    assert!(text.contains("type=PCR"));
    assert!(text.contains("12 states"));
}

#[test]
fn states_honours_time_window() {
    let temp_dir = tempfile::tempdir().unwrap();
    let capture = write_capture(temp_dir.path(), "boot.csv", None);

    let output = run(&[
        "states",
        capture.to_str().unwrap(),
        "--from",
        "5.5",
        "--to",
        "12.5",
    ]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("3 states"));
}

#[test]
fn int_edges_are_listed() {
    let temp_dir = tempfile::tempdir().unwrap();
    let capture = write_capture(temp_dir.path(), "boot.csv", None);

    let output = run(&["int-edges", capture.to_str().unwrap()]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Found 1 INT rising edges"));
}

#[test]
fn clean_capture_has_no_glitches() {
    let temp_dir = tempfile::tempdir().unwrap();
    let capture = write_capture(temp_dir.path(), "boot.csv", None);

    let output = run(&["glitches", capture.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout(&output).contains("0 data glitches"));
}

#[test]
fn data_glitch_sets_exit_status() {
    let temp_dir = tempfile::tempdir().unwrap();
    // Third sample of the acknowledge T3.
    let capture = write_capture(temp_dir.path(), "glitch.csv", Some((14, 0x07)));

    let output = run(&["glitches", capture.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(2));
    let text = stdout(&output);
    assert!(text.contains("GLITCH #1"));
    assert!(text.contains("0x05"));
    assert!(text.contains("0x07"));
}

#[test]
fn fetches_start_at_acknowledge() {
    let temp_dir = tempfile::tempdir().unwrap();
    let capture = write_capture(temp_dir.path(), "boot.csv", None);

    let output = run(&["fetches", capture.to_str().unwrap(), "--max", "5"]);

    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Opcode=0x05 (interrupt)"));
    assert!(text.contains("Opcode=0xC0"));
    assert!(!text.contains("Opcode=0x99"));
    assert!(text.contains("Traced 2 fetches"));
}

#[test]
fn missing_capture_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let missing = temp_dir.path().join("absent.csv");

    let output = run(&["states", missing.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: failed to read"));
}

#[test]
fn malformed_capture_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("bad.csv");
    fs::write(&path, "no header\n").unwrap();

    let output = run(&["int-edges", path.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn unknown_command_fails() {
    let output = run(&["decode", "x.csv"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown command"));
    assert!(stderr.contains("Usage:"));
}

#[test]
fn help_prints_usage() {
    let output = run(&["--help"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains("Usage: i8008-trace"));
}
