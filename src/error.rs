// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Error types, diagnostics, and reporting for the assembler front end.

use std::fmt;

/// Categories of assembler errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmErrorKind {
    Conditional,
    Directive,
    Expression,
    Io,
    Macro,
    Source,
    Symbol,
    Syntax,
}

/// An assembler error with a kind and message.
#[derive(Debug, Clone)]
pub struct AsmError {
    kind: AsmErrorKind,
    message: String,
}

impl AsmError {
    pub fn new(kind: AsmErrorKind, msg: &str, param: Option<&str>) -> Self {
        Self {
            kind,
            message: format_error(msg, param),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> AsmErrorKind {
        self.kind
    }
}

impl fmt::Display for AsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AsmError {}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A diagnostic message with location context.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub(crate) line: u32,
    pub(crate) file: Option<String>,
    pub(crate) code: String,
    pub(crate) severity: Severity,
    pub(crate) error: AsmError,
}

impl Diagnostic {
    pub fn new(line: u32, severity: Severity, error: AsmError) -> Self {
        Self {
            line,
            file: None,
            code: default_diagnostic_code(error.kind()).to_string(),
            severity,
            error,
        }
    }

    pub fn with_file(mut self, file: Option<String>) -> Self {
        self.file = file;
        self
    }

    pub fn format(&self) -> String {
        let sev = match self.severity {
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        };
        match &self.file {
            Some(file) => format!(
                "{file}:{}: {sev} [{}] - {}",
                self.line,
                self.code,
                self.error.message()
            ),
            None => format!(
                "{}: {sev} [{}] - {}",
                self.line,
                self.code,
                self.error.message()
            ),
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> &str {
        self.error.message()
    }
}

/// How a flow-control handler aborts the surrounding parse.
///
/// The diagnostic has already been recorded by the time one of these is
/// raised; the variants only carry how far the abort must travel. A serious
/// error unwinds to the pass driver (the current pass is abandoned), a fatal
/// error aborts the whole run.
#[derive(Debug)]
pub enum FlowError {
    Serious(AsmError),
    Fatal(AsmError),
}

impl FlowError {
    pub fn error(&self) -> &AsmError {
        match self {
            FlowError::Serious(e) => e,
            FlowError::Fatal(e) => e,
        }
    }

    /// Escalate to a run-aborting error.
    pub fn into_fatal(self) -> FlowError {
        match self {
            FlowError::Serious(e) | FlowError::Fatal(e) => FlowError::Fatal(e),
        }
    }
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error())
    }
}

impl std::error::Error for FlowError {}

/// Pass statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassCounts {
    pub statements: u32,
    pub errors: u32,
    pub warnings: u32,
}

impl PassCounts {
    pub fn new() -> Self {
        Self::default()
    }
}

fn default_diagnostic_code(kind: AsmErrorKind) -> &'static str {
    match kind {
        AsmErrorKind::Conditional => "asm201",
        AsmErrorKind::Directive => "asm202",
        AsmErrorKind::Macro => "asm203",
        AsmErrorKind::Symbol => "asm301",
        AsmErrorKind::Expression => "asm401",
        AsmErrorKind::Io => "asm501",
        AsmErrorKind::Source => "asm502",
        AsmErrorKind::Syntax => "asm102",
    }
}

/// Format an error message with an optional parameter.
pub fn format_error(msg: &str, param: Option<&str>) -> String {
    match param {
        Some(p) => format!("{msg}: {p}"),
        None => msg.to_string(),
    }
}
