// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Flow-control directives.
//!
//! Everything here is built on one primitive: capturing or skipping a
//! brace-delimited span of source and later re-parsing it against a fresh
//! memory-backed frame. Loops, conditional assembly, macro capture, and
//! source inclusion are all block parsers; `!source` treats the named file
//! as a block, and the top-level driver parses the main file the same way.
//!
//! Every handler is re-entrant: a loop body may itself contain another
//! loop, an include, or a conditional. Re-entrancy is plain recursion on
//! the session; each handler restores the frame stack and any budget it
//! touched on every exit path.

mod conditional;
mod include;
mod loops;
mod macros;

use std::collections::HashMap;

use crate::error::{AsmErrorKind, FlowError};
use crate::lexer;
use crate::parser::Session;

/// What a directive handler asks of the statement dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementEnd {
    /// The remainder of the statement should be parsed normally.
    ParseRemainder,
    /// Discard the remainder of the statement.
    SkipRemainder,
    /// The statement must be over; complain otherwise.
    EnsureEos,
    /// The cursor already rests at the statement's end (the handler
    /// switched frames and the restored frame stopped there).
    AtEosAnyway,
}

/// The closed set of flow directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Do,
    For,
    If,
    Ifdef,
    Ifndef,
    Macro,
    Source,
    Set,
    Zone,
}

/// Keyword tables, built once at session construction.
pub struct DirectiveSet {
    directives: HashMap<&'static str, Directive>,
    conditions: HashMap<&'static str, bool>,
}

impl DirectiveSet {
    pub fn new() -> Self {
        let mut directives = HashMap::new();
        directives.insert("do", Directive::Do);
        directives.insert("for", Directive::For);
        directives.insert("if", Directive::If);
        directives.insert("ifdef", Directive::Ifdef);
        directives.insert("ifndef", Directive::Ifndef);
        directives.insert("macro", Directive::Macro);
        directives.insert("source", Directive::Source);
        directives.insert("src", Directive::Source);
        directives.insert("set", Directive::Set);
        directives.insert("zone", Directive::Zone);

        let mut conditions = HashMap::new();
        // UNTIL inverts the condition, WHILE does not
        conditions.insert("until", true);
        conditions.insert("while", false);

        Self {
            directives,
            conditions,
        }
    }

    pub fn lookup(&self, keyword: &str) -> Option<Directive> {
        self.directives.get(keyword).copied()
    }

    /// `until`/`while` keyword to invert flag.
    pub fn condition_invert(&self, keyword: &str) -> Option<bool> {
        self.conditions.get(keyword).copied()
    }
}

impl Default for DirectiveSet {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub(crate) fn execute_directive(
        &mut self,
        directive: Directive,
    ) -> Result<StatementEnd, FlowError> {
        match directive {
            Directive::Do => self.po_do(),
            Directive::For => self.po_for(),
            Directive::If => self.po_if(),
            Directive::Ifdef => self.po_ifdef_ifndef(false),
            Directive::Ifndef => self.po_ifdef_ifndef(true),
            Directive::Macro => self.po_macro(),
            Directive::Source => self.po_source(),
            Directive::Set => self.po_set(),
            Directive::Zone => self.po_zone(),
        }
    }

    /// `!set NAME = EXPR` — assign a symbol.
    fn po_set(&mut self) -> Result<StatementEnd, FlowError> {
        let Some((zone, name)) = self.read_zone_and_keyword() else {
            return Ok(StatementEnd::SkipRemainder);
        };
        let force = lexer::read_force_bit(&mut self.stream);
        if self.stream.last() != b'=' {
            self.error(AsmErrorKind::Syntax, "Expected '=' after symbol name", None);
            return Ok(StatementEnd::SkipRemainder);
        }
        self.stream.get_byte();
        let value = self.eval_defined_int()?;
        self.symbols.set_value(zone, &name, force, value);
        Ok(StatementEnd::EnsureEos)
    }

    /// `!zone [TITLE]` — start a new local-symbol zone.
    fn po_zone(&mut self) -> Result<StatementEnd, FlowError> {
        self.zone_counter += 1;
        self.current_zone = self.zone_counter;
        // an optional title is commentary only
        Ok(StatementEnd::SkipRemainder)
    }
}
