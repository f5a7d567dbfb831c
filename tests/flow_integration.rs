// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use braceasm::symbol::GLOBAL_ZONE;
use braceasm::{assemble_file, Options, RunReport};

fn unique_temp_dir() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_micros();
    let dir = std::env::temp_dir().join(format!("braceasm-flow-it-{now}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_text(path: &PathBuf, text: &str) {
    fs::write(path, text).expect("write file");
}

fn value(report: &RunReport, name: &str) -> i64 {
    report.symbols.lookup(GLOBAL_ZONE, name).expect(name).value
}

#[test]
fn include_resumes_in_reverse_order_with_state_intact() {
    let dir = unique_temp_dir();
    let main = dir.join("main.a");
    let sub = dir.join("sub.a");
    // the include runs in the middle; statements after it must see its effects
    write_text(&main, "!set trace = 1\n!source \"sub.a\"\n!set trace = trace * 10 + 3\n");
    write_text(&sub, "!set trace = trace * 10 + 2\n");

    let report = assemble_file(&main, &Options::default()).expect("run completes");
    assert!(report.diagnostics.is_empty());
    assert_eq!(value(&report, "trace"), 123);
}

#[test]
fn nested_includes_within_depth_complete() {
    let dir = unique_temp_dir();
    write_text(&dir.join("a.a"), "!set depth = 1\n!source \"b.a\"\n");
    write_text(&dir.join("b.a"), "!set depth = depth + 1\n!source \"c.a\"\n");
    write_text(&dir.join("c.a"), "!set depth = depth + 1\n");

    let mut options = Options::default();
    options.max_include_depth = 2;
    let report = assemble_file(&dir.join("a.a"), &options).expect("run completes");
    assert!(report.diagnostics.is_empty());
    assert_eq!(value(&report, "depth"), 3);
}

#[test]
fn exceeding_include_depth_aborts_the_run() {
    let dir = unique_temp_dir();
    // self-inclusion recurses until the budget is spent
    write_text(&dir.join("loop.a"), "!source \"loop.a\"\n");

    let mut options = Options::default();
    options.max_include_depth = 8;
    let err = assemble_file(&dir.join("loop.a"), &options).expect_err("run aborts");
    assert!(err.error.message().contains("Too deeply nested"));
    assert!(!err.diagnostics.is_empty());
}

#[test]
fn missing_include_is_recoverable_and_located() {
    let dir = unique_temp_dir();
    let main = dir.join("main.a");
    write_text(&main, "!source \"gone.a\"\n!set after = 1\n");

    let report = assemble_file(&main, &Options::default()).expect("run completes");
    assert_eq!(report.error_count(), 1);
    let diag = &report.diagnostics[0];
    assert!(diag.message().contains("Cannot open input file"));
    assert_eq!(diag.file(), Some(main.display().to_string().as_str()));
    assert_eq!(diag.line(), 1);
    assert_eq!(value(&report, "after"), 1);
}

#[test]
fn diagnostics_inside_an_include_name_the_included_file() {
    let dir = unique_temp_dir();
    let main = dir.join("main.a");
    let sub = dir.join("sub.a");
    write_text(&main, "!source \"sub.a\"\n");
    write_text(&sub, "\n!bogus\n");

    let report = assemble_file(&main, &Options::default()).expect("run completes");
    assert_eq!(report.error_count(), 1);
    let diag = &report.diagnostics[0];
    assert!(diag.message().contains("Unknown directive"));
    assert_eq!(diag.file(), Some(sub.display().to_string().as_str()));
    assert_eq!(diag.line(), 2);
}

#[test]
fn loop_body_may_include_a_file_each_iteration() {
    let dir = unique_temp_dir();
    let main = dir.join("main.a");
    let inc = dir.join("inc.a");
    write_text(&main, "!set n = 0\n!for i, 3 {\n!source \"inc.a\"\n}\n");
    write_text(&inc, "!set n = n + i\n");

    let report = assemble_file(&main, &Options::default()).expect("run completes");
    assert!(report.warning_count() <= 1);
    assert_eq!(value(&report, "n"), 6);
}

#[test]
fn conditionals_select_between_included_files() {
    let dir = unique_temp_dir();
    write_text(
        &dir.join("main.a"),
        "!set mode = 2\n!if mode = 1 {\n!source \"one.a\"\n} else {\n!source \"two.a\"\n}\n",
    );
    write_text(&dir.join("one.a"), "!set picked = 1\n");
    write_text(&dir.join("two.a"), "!set picked = 2\n");

    let report = assemble_file(&dir.join("main.a"), &Options::default()).expect("run completes");
    assert!(report.diagnostics.is_empty());
    assert_eq!(value(&report, "picked"), 2);
}

#[test]
fn macro_defined_in_include_is_visible_afterwards() {
    let dir = unique_temp_dir();
    write_text(&dir.join("main.a"), "!source \"lib.a\"\n");
    write_text(&dir.join("lib.a"), "!macro wait {\nnop\n}\n");

    let report = assemble_file(&dir.join("main.a"), &Options::default()).expect("run completes");
    assert!(report.diagnostics.is_empty());
    assert_eq!(report.macros.len(), 1);
    assert!(report.macros.get(GLOBAL_ZONE, "wait").is_some());
}

#[test]
fn crlf_sources_keep_line_numbers_straight() {
    let dir = unique_temp_dir();
    let main = dir.join("main.a");
    write_text(&main, "!set a = 1\r\n!set b = 2\r\n!bogus\r\n");

    let report = assemble_file(&main, &Options::default()).expect("run completes");
    assert_eq!(report.error_count(), 1);
    assert_eq!(report.diagnostics[0].line(), 3);
    assert_eq!(value(&report, "b"), 2);
}

#[test]
fn block_spanning_loop_reports_body_lines_per_iteration() {
    let dir = unique_temp_dir();
    let main = dir.join("main.a");
    // the undefined symbol is hit inside the loop body on line 3
    write_text(&main, "!set i = 0\n!do while i < 1 {\n!set x = missing\n}\n");

    let report = assemble_file(&main, &Options::default()).expect("run completes");
    assert!(report.error_count() >= 1);
    let diag = report
        .diagnostics
        .iter()
        .find(|d| d.message().contains("Value not defined"))
        .expect("undefined symbol diagnostic");
    assert_eq!(diag.line(), 3);
}

#[test]
fn unreadable_main_file_is_a_run_error() {
    let dir = unique_temp_dir();
    let err = assemble_file(&dir.join("absent.a"), &Options::default()).expect_err("run aborts");
    assert!(err.error.message().contains("Cannot open input file"));
    assert!(err.diagnostics.is_empty());
}
