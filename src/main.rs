// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for braceasm.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use serde_json::json;

use braceasm::error::{Diagnostic, Severity};
use braceasm::{assemble_file, Options, RunReport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(
    name = "braceasm",
    version = VERSION,
    about = "Flow-control front end for brace-block assembly sources (loops, conditionals, macros, includes)"
)]
struct Cli {
    /// Source file to assemble.
    pub input: PathBuf,
    #[arg(
        long = "format",
        value_enum,
        default_value_t = OutputFormat::Text,
        long_help = "Select output format. text is default; json emits one machine-readable object per diagnostic."
    )]
    pub format: OutputFormat,
    #[arg(
        short = 'q',
        long = "quiet",
        action = ArgAction::SetTrue,
        long_help = "Suppress the summary line for successful runs. Diagnostics are still reported."
    )]
    pub quiet: bool,
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        long_help = "Increase verbosity. At -vvv, included files are announced as they are parsed."
    )]
    pub verbose: u8,
    #[arg(
        long = "max-include-depth",
        value_name = "N",
        default_value_t = 64,
        long_help = "Maximum nesting depth for !source inclusions before the run is aborted."
    )]
    pub max_include_depth: u32,
    #[arg(
        long = "warn-old-for",
        action = ArgAction::SetTrue,
        long_help = "Warn about the legacy two-argument !for form instead of the three-argument one."
    )]
    pub warn_old_for: bool,
    #[arg(
        short = 's',
        long = "symbols",
        action = ArgAction::SetTrue,
        long_help = "Dump the symbol table after a completed run."
    )]
    pub symbols: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn format_diagnostic_line(diag: &Diagnostic, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => diag.format(),
        OutputFormat::Json => json!({
            "code": diag.code(),
            "severity": match diag.severity() {
                Severity::Warning => "warning",
                Severity::Error => "error",
            },
            "message": diag.message(),
            "file": diag.file(),
            "line": diag.line(),
        })
        .to_string(),
    }
}

fn emit_diagnostics(diagnostics: &[Diagnostic], format: OutputFormat) {
    for diag in diagnostics {
        eprintln!("{}", format_diagnostic_line(diag, format));
    }
}

fn dump_symbols(report: &RunReport) {
    for ((zone, name), symbol) in report.symbols.sorted() {
        let scope = if *zone == braceasm::symbol::GLOBAL_ZONE {
            String::new()
        } else {
            format!(" (zone {zone})")
        };
        println!("{name}{scope} = {} ; used {}x", symbol.value, symbol.usage);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let options = Options {
        max_include_depth: cli.max_include_depth,
        warn_old_for: cli.warn_old_for,
        verbose: cli.verbose,
    };

    match assemble_file(&cli.input, &options) {
        Ok(report) => {
            emit_diagnostics(&report.diagnostics, cli.format);
            if cli.symbols {
                dump_symbols(&report);
            }
            if report.error_count() > 0 {
                return ExitCode::FAILURE;
            }
            if !cli.quiet {
                println!(
                    "Assembled {} statements, {} warning(s)",
                    report.counts.statements,
                    report.warning_count()
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            emit_diagnostics(&err.diagnostics, cli.format);
            if err.diagnostics.is_empty() {
                eprintln!("ERROR - {}", err.error.message());
            }
            ExitCode::FAILURE
        }
    }
}
