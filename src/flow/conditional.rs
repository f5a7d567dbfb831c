// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Conditional assembly: `!if`, `!ifdef`, `!ifndef`.

use crate::error::{AsmErrorKind, FlowError};
use crate::flow::StatementEnd;
use crate::lexer;
use crate::parser::Session;
use crate::source::{CHAR_EOB, CHAR_EOF, CHAR_EOS, CHAR_SOB};

impl Session {
    /// `!if EXPR { … } [else { … }]` — re-entrant.
    pub(crate) fn po_if(&mut self) -> Result<StatementEnd, FlowError> {
        let condition = self.eval_defined_int()?;
        if self.stream.last() != CHAR_SOB {
            return Err(self.no_left_brace());
        }
        self.parse_block_else_block(condition != 0)?;
        Ok(StatementEnd::EnsureEos)
    }

    /// `!ifdef NAME …` / `!ifndef NAME …` — re-entrant.
    ///
    /// With a block, behaves like `!if` on "NAME is defined". Without one,
    /// the directive governs the rest of the statement: defined means parse
    /// it, undefined means discard it.
    pub(crate) fn po_ifdef_ifndef(&mut self, invert: bool) -> Result<StatementEnd, FlowError> {
        let Some((zone, name)) = self.read_zone_and_keyword() else {
            return Ok(StatementEnd::SkipRemainder);
        };
        let first_pass = self.pass == 0;
        let mut defined = false;
        if let Some(symbol) = self.symbols.lookup_mut(zone, &name) {
            if first_pass {
                symbol.usage += 1;
            }
            defined = symbol.defined;
        }
        self.stream.skip_space();
        if invert {
            defined = !defined;
        }
        if self.stream.last() != CHAR_SOB {
            return Ok(if defined {
                StatementEnd::ParseRemainder
            } else {
                StatementEnd::SkipRemainder
            });
        }
        self.parse_block_else_block(defined)?;
        Ok(StatementEnd::EnsureEos)
    }

    /// Parse `{block} [else {block}]`, taking exactly one of the two.
    /// Call with the cursor at the first block's `{`.
    pub(crate) fn parse_block_else_block(&mut self, parse_first: bool) -> Result<(), FlowError> {
        self.skip_or_parse_block(parse_first)?;
        // cursor is at the first block's '}'; look for an "else" part
        self.stream.get_byte();
        self.stream.skip_space();
        if self.stream.last() == CHAR_EOS || self.stream.last() == CHAR_EOF {
            return Ok(());
        }
        let keyword = lexer::read_keyword(&mut self.stream);
        if keyword != "else" {
            self.error(AsmErrorKind::Conditional, "Expected 'else' or end of statement", None);
            return Ok(());
        }
        self.stream.skip_space();
        if self.stream.last() != CHAR_SOB {
            return Err(self.no_left_brace());
        }
        self.skip_or_parse_block(!parse_first)?;
        self.stream.get_byte();
        Ok(())
    }

    /// Parse or skip one block; either way the skipped/parsed text must be
    /// delimiter-balanced. Afterwards the cursor is at the block's `}`.
    fn skip_or_parse_block(&mut self, parse: bool) -> Result<(), FlowError> {
        if !parse {
            self.capture_block(false)?;
            return Ok(());
        }
        // the taken branch re-enters the statement dispatcher in place,
        // no frame switch involved
        self.parse_until_eob_or_eof()?;
        if self.stream.last() != CHAR_EOB {
            return Err(self.serious(
                AsmErrorKind::Conditional,
                "Found end of file instead of end of block ('}')",
                None,
            ));
        }
        Ok(())
    }

    pub(crate) fn no_left_brace(&mut self) -> FlowError {
        self.serious(AsmErrorKind::Syntax, "Expected '{'", None)
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{assemble_str, Options, RunReport};
    use crate::symbol::GLOBAL_ZONE;

    fn assemble(source: &str) -> RunReport {
        assemble_str(source, &Options::default()).expect("run completes")
    }

    fn value(report: &RunReport, name: &str) -> Option<i64> {
        report
            .symbols
            .lookup(GLOBAL_ZONE, name)
            .filter(|s| s.defined)
            .map(|s| s.value)
    }

    #[test]
    fn exactly_one_branch_is_parsed() {
        let report = assemble("!if 1 {\n!set a = 1\n} else {\n!set b = 1\n}\n");
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "a"), Some(1));
        assert_eq!(value(&report, "b"), None);

        let report = assemble("!if 0 {\n!set a = 1\n} else {\n!set b = 1\n}\n");
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "a"), None);
        assert_eq!(value(&report, "b"), Some(1));
    }

    #[test]
    fn missing_else_is_not_an_error() {
        let report = assemble("!if 0 {\n!set a = 1\n}\n!set after = 1\n");
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "a"), None);
        assert_eq!(value(&report, "after"), Some(1));
    }

    #[test]
    fn skipped_branch_must_be_brace_balanced() {
        let report = assemble("!if 1 {\n!set a = 1\n} else {\nnever closed\n");
        assert!(report.error_count() >= 1);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.message().contains("end of block")));
    }

    #[test]
    fn skipped_branch_may_contain_invalid_statements() {
        // the untaken branch is only brace-checked, never parsed
        let report = assemble("!if 0 {\n!set x = undefined_thing\n}\n!set ok = 1\n");
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "ok"), Some(1));
    }

    #[test]
    fn ifndef_takes_first_block_when_undefined() {
        let report = assemble("!ifndef flag {\n!set a = 1\n} else {\n!set b = 1\n}\n");
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "a"), Some(1));
        assert_eq!(value(&report, "b"), None);

        let report =
            assemble("!set flag = 1\n!ifndef flag {\n!set a = 1\n} else {\n!set b = 1\n}\n");
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "a"), None);
        assert_eq!(value(&report, "b"), Some(1));
    }

    #[test]
    fn blockless_ifdef_governs_rest_of_statement() {
        let report = assemble("!set flag = 1\n!ifdef flag !set seen = 1\n");
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "seen"), Some(1));

        let report = assemble("!ifdef flag !set seen = 1\n");
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "seen"), None);
    }

    #[test]
    fn first_pass_lookup_counts_usage() {
        let report = assemble("!set flag = 1\n!ifdef flag {\n}\n!ifdef flag {\n}\n");
        // two lookups, counted on the first pass only
        assert_eq!(report.symbols.lookup(GLOBAL_ZONE, "flag").unwrap().usage, 2);
    }

    #[test]
    fn stray_token_after_else_keyword_position_is_reported() {
        let report = assemble("!if 1 {\n!set a = 1\n} otherwise {\n!set b = 1\n}\n");
        assert!(report.error_count() >= 1);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.message().contains("Expected 'else'")));
    }
}
