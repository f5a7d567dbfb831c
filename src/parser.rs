// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Statement dispatch and pass orchestration.
//!
//! A [`Session`] owns everything one assembly run needs: the frame stack,
//! the symbol table, the macro registry, diagnostics, and the current pass
//! index. Flow directives are ordinary recursive calls on the session; the
//! only process-wide state of the original design (active input pointer,
//! pass counter, include depth) is threaded through the session instead.

use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use crate::error::{
    AsmError, AsmErrorKind, Diagnostic, FlowError, PassCounts, Severity,
};
use crate::flow::{DirectiveSet, StatementEnd};
use crate::lexer;
use crate::macros::MacroRegistry;
use crate::source::{SourceStream, CHAR_EOB, CHAR_EOF, CHAR_EOS};
use crate::symbol::{SymbolTable, Zone, GLOBAL_ZONE};

/// Number of passes over the source.
const PASS_COUNT: u32 = 2;

/// Assembly options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Maximum depth of nested `!source` inclusions.
    pub max_include_depth: u32,
    /// Warn about the legacy two-argument `!for` form instead of the
    /// three-argument one.
    pub warn_old_for: bool,
    /// Verbosity level; above 2, included files are announced.
    pub verbose: u8,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_include_depth: 64,
            warn_old_for: false,
            verbose: 0,
        }
    }
}

/// Report from a completed assembly run.
#[derive(Debug)]
pub struct RunReport {
    pub diagnostics: Vec<Diagnostic>,
    pub symbols: SymbolTable,
    pub macros: MacroRegistry,
    pub counts: PassCounts,
}

impl RunReport {
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity() == Severity::Warning)
            .count()
    }
}

/// Error from an aborted assembly run.
#[derive(Debug)]
pub struct RunError {
    pub error: AsmError,
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for RunError {}

/// One assembly run: frame stack, tables, diagnostics, pass state.
pub struct Session {
    pub(crate) stream: SourceStream,
    pub(crate) symbols: SymbolTable,
    pub(crate) macros: MacroRegistry,
    pub(crate) directives: DirectiveSet,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) counts: PassCounts,
    pub(crate) pass: u32,
    pub(crate) includes_left: u32,
    pub(crate) current_zone: Zone,
    pub(crate) zone_counter: Zone,
    pub(crate) options: Options,
}

impl Session {
    pub fn new(options: Options) -> Self {
        Self {
            stream: SourceStream::new(),
            symbols: SymbolTable::new(),
            macros: MacroRegistry::new(),
            directives: DirectiveSet::new(),
            diagnostics: Vec::new(),
            counts: PassCounts::new(),
            pass: 0,
            includes_left: options.max_include_depth,
            current_zone: 1,
            zone_counter: 1,
            options,
        }
    }

    /// Reset per-pass state. Symbols and registered macros persist.
    pub(crate) fn begin_pass(&mut self, pass: u32) {
        self.pass = pass;
        self.stream = SourceStream::new();
        self.counts = PassCounts::new();
        self.includes_left = self.options.max_include_depth;
        self.current_zone = 1;
        self.zone_counter = 1;
    }

    // --- diagnostics -----------------------------------------------------

    pub(crate) fn record(&mut self, severity: Severity, error: AsmError) {
        match severity {
            Severity::Error => self.counts.errors += 1,
            Severity::Warning => self.counts.warnings += 1,
        }
        let diag = Diagnostic::new(self.stream.line(), severity, error)
            .with_file(self.stream.file_name().map(str::to_string));
        self.diagnostics.push(diag);
    }

    /// Recoverable error: recorded, parsing continues.
    pub(crate) fn error(&mut self, kind: AsmErrorKind, msg: &str, param: Option<&str>) {
        self.record(Severity::Error, AsmError::new(kind, msg, param));
    }

    pub(crate) fn warning(&mut self, kind: AsmErrorKind, msg: &str, param: Option<&str>) {
        self.record(Severity::Warning, AsmError::new(kind, msg, param));
    }

    /// Informational warning reported on the first pass only.
    pub(crate) fn first_pass_warning(&mut self, kind: AsmErrorKind, msg: &str) {
        if self.pass == 0 {
            self.warning(kind, msg, None);
        }
    }

    /// Serious error: recorded here, aborts the current pass via `?`.
    pub(crate) fn serious(
        &mut self,
        kind: AsmErrorKind,
        msg: &str,
        param: Option<&str>,
    ) -> FlowError {
        let error = AsmError::new(kind, msg, param);
        self.record(Severity::Error, error.clone());
        FlowError::Serious(error)
    }

    /// Fatal error: recorded here, aborts the whole run via `?`.
    pub(crate) fn fatal(
        &mut self,
        kind: AsmErrorKind,
        msg: &str,
        param: Option<&str>,
    ) -> FlowError {
        let error = AsmError::new(kind, msg, param);
        self.record(Severity::Error, error.clone());
        FlowError::Fatal(error)
    }

    // --- statement loop --------------------------------------------------

    /// Parse statements from the active frame until an end-of-block
    /// delimiter or end of input is the last byte.
    pub(crate) fn parse_until_eob_or_eof(&mut self) -> Result<(), FlowError> {
        self.stream.get_byte();
        loop {
            match self.stream.last() {
                CHAR_EOF | CHAR_EOB => return Ok(()),
                CHAR_EOS | b' ' | b'\t' => {
                    self.stream.get_byte();
                }
                b'!' => {
                    self.counts.statements += 1;
                    self.stream.get_byte();
                    let end = self.dispatch_directive()?;
                    self.finish_statement(end);
                }
                _ => self.consume_inert_statement(),
            }
        }
    }

    fn dispatch_directive(&mut self) -> Result<StatementEnd, FlowError> {
        let keyword = lexer::read_keyword(&mut self.stream);
        if keyword.is_empty() {
            self.error(
                AsmErrorKind::Directive,
                "Expected directive name after '!'",
                None,
            );
            return Ok(StatementEnd::SkipRemainder);
        }
        match self.directives.lookup(&keyword) {
            Some(directive) => self.execute_directive(directive),
            None => {
                self.error(AsmErrorKind::Directive, "Unknown directive", Some(&keyword));
                Ok(StatementEnd::SkipRemainder)
            }
        }
    }

    fn finish_statement(&mut self, end: StatementEnd) {
        match end {
            StatementEnd::ParseRemainder => {}
            StatementEnd::SkipRemainder => self.stream.skip_remainder(),
            StatementEnd::EnsureEos => self.ensure_eos(),
            // the handler already left the cursor resting at the end of
            // the statement (frame restore put it back there)
            StatementEnd::AtEosAnyway => {}
        }
    }

    /// Statements that are not flow directives (labels, instructions, data)
    /// are outside this front end's scope; consume them inertly.
    fn consume_inert_statement(&mut self) {
        self.counts.statements += 1;
        while !matches!(self.stream.last(), CHAR_EOS | CHAR_EOF | CHAR_EOB) {
            self.stream.get_byte();
        }
    }

    /// Require the statement to be over; complain and resynchronize if not.
    pub(crate) fn ensure_eos(&mut self) {
        self.stream.skip_space();
        if self.stream.last() != CHAR_EOS && self.stream.last() != CHAR_EOF {
            self.error(AsmErrorKind::Syntax, "Garbage data at end of statement", None);
            self.stream.skip_remainder();
        }
    }

    // --- frame helpers ---------------------------------------------------

    /// Read a symbol reference: optional `.` local-zone marker plus a name.
    pub(crate) fn read_zone_and_keyword(&mut self) -> Option<(Zone, String)> {
        self.stream.skip_space();
        let zone = if self.stream.last() == b'.' {
            self.stream.get_byte();
            self.current_zone
        } else {
            GLOBAL_ZONE
        };
        let name = lexer::read_name(&mut self.stream);
        if name.is_empty() {
            self.error(AsmErrorKind::Symbol, "Expected symbol name", None);
            return None;
        }
        Some((zone, name))
    }

    /// Capture or skip a block; escalates a missing terminator.
    pub(crate) fn capture_block(&mut self, store: bool) -> Result<Option<Rc<[u8]>>, FlowError> {
        match self.stream.skip_or_store_block(store) {
            Ok(body) => Ok(body.map(Rc::from)),
            Err(error) => {
                self.record(Severity::Error, error.clone());
                Err(FlowError::Serious(error))
            }
        }
    }

    /// Re-parse a captured block against a fresh memory frame.
    pub(crate) fn run_memory_block(
        &mut self,
        body: &Rc<[u8]>,
        start_line: u32,
    ) -> Result<(), FlowError> {
        self.stream.push_memory(Rc::clone(body), start_line);
        let outcome = match self.parse_until_eob_or_eof() {
            Ok(()) => {
                if self.stream.last() == CHAR_EOB {
                    Ok(())
                } else {
                    Err(self.serious(AsmErrorKind::Syntax, "Illegal block terminator", None))
                }
            }
            Err(err) => Err(err),
        };
        self.stream.pop();
        outcome
    }

    /// Parse a whole source file against a fresh file frame. The frame is
    /// released on every exit path.
    pub(crate) fn parse_and_close_file(
        &mut self,
        name: &str,
        data: Vec<u8>,
    ) -> Result<(), FlowError> {
        if self.options.verbose > 2 {
            println!("Parsing source file '{name}'");
        }
        self.stream.push_file(name, data);
        let outcome = match self.parse_until_eob_or_eof() {
            Ok(()) => {
                if self.stream.last() != CHAR_EOF {
                    self.error(AsmErrorKind::Syntax, "Found '}' instead of end-of-file", None);
                }
                Ok(())
            }
            Err(err) => Err(err),
        };
        self.stream.pop();
        outcome
    }
}

// --- drivers -------------------------------------------------------------

/// Assemble a source file from disk.
pub fn assemble_file(path: &Path, options: &Options) -> Result<RunReport, RunError> {
    let data = fs::read(path).map_err(|err| RunError {
        error: AsmError::new(
            AsmErrorKind::Io,
            "Cannot open input file",
            Some(&format!("{} ({err})", path.display())),
        ),
        diagnostics: Vec::new(),
    })?;
    run_source(&path.display().to_string(), data, options)
}

/// Assemble source text directly (tests, tooling).
pub fn assemble_str(source: &str, options: &Options) -> Result<RunReport, RunError> {
    run_source("<input>", source.as_bytes().to_vec(), options)
}

fn run_source(name: &str, data: Vec<u8>, options: &Options) -> Result<RunReport, RunError> {
    let mut session = Session::new(options.clone());
    let mut first_pass_warnings: Vec<Diagnostic> = Vec::new();

    for pass in 0..PASS_COUNT {
        session.begin_pass(pass);
        match session.parse_and_close_file(name, data.clone()) {
            Ok(()) => {}
            // recorded where it was raised; the rest of this pass is
            // abandoned, the next pass (or the report) still happens
            Err(FlowError::Serious(_)) => {}
            Err(FlowError::Fatal(error)) => {
                let mut diagnostics = first_pass_warnings;
                diagnostics.append(&mut session.diagnostics);
                return Err(RunError { error, diagnostics });
            }
        }
        if pass == 0 {
            // only the pass-gated warnings survive from the first pass;
            // errors either repeat on the final pass or were resolved by it
            first_pass_warnings = session
                .diagnostics
                .drain(..)
                .filter(|diag| diag.severity() == Severity::Warning)
                .collect();
        }
    }

    let mut counts = session.counts;
    counts.warnings += first_pass_warnings.len() as u32;
    let mut diagnostics = first_pass_warnings;
    diagnostics.append(&mut session.diagnostics);
    Ok(RunReport {
        diagnostics,
        symbols: session.symbols,
        macros: session.macros,
        counts,
    })
}
