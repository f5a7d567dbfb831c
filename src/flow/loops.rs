// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Looping assembly: `!do` and `!for`.
//!
//! Both directives capture their body once and re-parse the same buffer
//! against a fresh memory frame for every iteration.

use std::rc::Rc;

use crate::error::{AsmErrorKind, FlowError};
use crate::flow::StatementEnd;
use crate::lexer;
use crate::parser::Session;
use crate::source::{CHAR_EOS, CHAR_SOB};
use crate::symbol::Zone;

/// A stored loop condition.
///
/// `body == None` means the condition is always true, whatever `invert`
/// says. The buffer is re-parsed through a memory frame on every check.
struct LoopCondition {
    line: u32,
    invert: bool,
    body: Option<Rc<[u8]>>,
}

const ALWAYS_TRUE: LoopCondition = LoopCondition {
    line: 0,
    invert: false,
    body: None,
};

impl Session {
    /// `![head] do { … } [tail]` is not the syntax; conditions attach to
    /// `!do` itself: `!do [head-cond] { … } [tail-cond]` — re-entrant.
    pub(crate) fn po_do(&mut self) -> Result<StatementEnd, FlowError> {
        self.stream.skip_space();
        let head = self.store_condition(CHAR_SOB);
        if self.stream.last() != CHAR_SOB {
            return Err(self.no_left_brace());
        }
        let loop_start = self.stream.line();
        let body = self
            .capture_block(true)?
            .expect("stored capture returns a body");
        // cursor is at '}'; the tail condition runs to end of statement
        self.stream.get_byte();
        self.stream.skip_space();
        let tail = self.store_condition(CHAR_EOS);

        loop {
            // head false on the very first check: zero iterations, and the
            // tail condition is never evaluated
            if !self.check_condition(&head)? {
                break;
            }
            self.run_memory_block(&body, loop_start)?;
            if !self.check_condition(&tail)? {
                break;
            }
        }
        // the restored outer frame already rests at the tail's terminator
        Ok(StatementEnd::AtEosAnyway)
    }

    /// `!for VAR, END { … }` (counts 1..=END) or
    /// `!for VAR, START, END { … }` (counts START..=END) — re-entrant.
    pub(crate) fn po_for(&mut self) -> Result<StatementEnd, FlowError> {
        let Some((zone, name)) = self.read_zone_and_keyword() else {
            return Ok(StatementEnd::SkipRemainder);
        };
        let force = lexer::read_force_bit(&mut self.stream);
        if !lexer::accept_comma(&mut self.stream) {
            self.error(AsmErrorKind::Syntax, "Expected ',' after loop symbol", None);
            return Ok(StatementEnd::SkipRemainder);
        }
        let first_arg = self.eval_defined_int()?;

        let old_form;
        let counter_first;
        let counter_last;
        let increment: i64;
        if lexer::accept_comma(&mut self.stream) {
            old_form = false;
            if !self.options.warn_old_for {
                self.first_pass_warning(AsmErrorKind::Directive, "Found new \"!for\" syntax");
            }
            counter_first = first_arg;
            counter_last = self.eval_defined_int()?;
            increment = if counter_last < counter_first { -1 } else { 1 };
        } else {
            old_form = true;
            if self.options.warn_old_for {
                self.first_pass_warning(AsmErrorKind::Directive, "Found old \"!for\" syntax");
            }
            if first_arg < 0 {
                return Err(self.serious(AsmErrorKind::Directive, "Loop count is negative", None));
            }
            // the old algorithm pre-increments, so counting starts at 1
            counter_first = 0;
            counter_last = first_arg;
            increment = 1;
        }
        if self.stream.last() != CHAR_SOB {
            return Err(self.no_left_brace());
        }
        let loop_start = self.stream.line();
        let body = self
            .capture_block(true)?
            .expect("stored capture returns a body");

        let mut counter = counter_first;
        self.set_loop_counter(zone, &name, force, counter);
        if old_form {
            if counter_last != 0 {
                loop {
                    counter += increment;
                    self.set_loop_counter(zone, &name, force, counter);
                    self.run_memory_block(&body, loop_start)?;
                    if counter >= counter_last {
                        break;
                    }
                }
            }
        } else {
            // wrapping arithmetic keeps the end test well-defined when END
            // sits at the edge of the value range
            let stop = counter_last.wrapping_add(increment);
            loop {
                self.run_memory_block(&body, loop_start)?;
                counter = counter.wrapping_add(increment);
                self.set_loop_counter(zone, &name, force, counter);
                if counter == stop {
                    break;
                }
            }
        }
        // move past the body's '}' on the outer frame
        self.stream.get_byte();
        Ok(StatementEnd::EnsureEos)
    }

    fn set_loop_counter(&mut self, zone: Zone, name: &str, force: u8, value: i64) {
        // overwrite is permitted for loop counters
        self.symbols.set_value(zone, name, force, value);
    }

    /// Try to read an `until`/`while` condition into a buffer, up to (not
    /// including) `terminator`. No condition at all yields "always true";
    /// an unknown keyword is a recoverable syntax error and degenerates the
    /// same way.
    fn store_condition(&mut self, terminator: u8) -> LoopCondition {
        let line = self.stream.line();
        if self.stream.last() == terminator {
            return ALWAYS_TRUE;
        }
        let keyword = lexer::read_keyword(&mut self.stream);
        if keyword.is_empty() {
            self.error(AsmErrorKind::Syntax, "Expected 'until' or 'while'", None);
            return ALWAYS_TRUE;
        }
        let Some(invert) = self.directives.condition_invert(&keyword) else {
            self.error(
                AsmErrorKind::Syntax,
                "Expected 'until' or 'while'",
                Some(&keyword),
            );
            return ALWAYS_TRUE;
        };
        self.stream.skip_space();
        let mut buffer = self.stream.read_until_terminator(terminator);
        buffer.push(CHAR_EOS);
        LoopCondition {
            line,
            invert,
            body: Some(Rc::from(buffer)),
        }
    }

    /// Evaluate a stored condition against a fresh memory frame.
    fn check_condition(&mut self, condition: &LoopCondition) -> Result<bool, FlowError> {
        let Some(body) = &condition.body else {
            return Ok(true);
        };
        self.stream.push_memory(Rc::clone(body), condition.line);
        self.stream.get_byte();
        let outcome = match self.eval_defined_int() {
            Ok(value) => {
                if self.stream.last() != CHAR_EOS {
                    Err(self.serious(
                        AsmErrorKind::Syntax,
                        "Garbage data at end of condition",
                        None,
                    ))
                } else {
                    Ok(condition.invert != (value != 0))
                }
            }
            Err(err) => Err(err),
        };
        self.stream.pop();
        outcome
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{assemble_str, Options, RunReport};
    use crate::symbol::GLOBAL_ZONE;

    fn assemble(source: &str) -> RunReport {
        assemble_str(source, &Options::default()).expect("run completes")
    }

    fn value(report: &RunReport, name: &str) -> i64 {
        report.symbols.lookup(GLOBAL_ZONE, name).expect(name).value
    }

    #[test]
    fn do_while_head_counts_up() {
        let source = "!set i = 0\n!do while i < 3 {\n!set i = i + 1\n}\n";
        let report = assemble(source);
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "i"), 3);
    }

    #[test]
    fn do_with_tail_until_runs_once() {
        let source = "!set n = 0\n!do {\n!set n = n + 1\n} until 1\n";
        let report = assemble(source);
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "n"), 1);
    }

    #[test]
    fn do_head_false_never_evaluates_tail() {
        // the tail references an undefined symbol; evaluating it would be
        // a serious error, so a clean run proves it was never checked
        let source = "!set t = 0\n!do while 0 {\n!set t = 1\n} until never_defined\n";
        let report = assemble(source);
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "t"), 0);
    }

    #[test]
    fn do_head_and_tail_combine() {
        let source = "!set i = 0\n!do while i < 5 {\n!set i = i + 1\n} until i = 3\n";
        let report = assemble(source);
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "i"), 3);
    }

    #[test]
    fn do_statement_after_loop_continues_normally() {
        let source = "!set i = 0\n!do while i < 2 {\n!set i = i + 1\n}\n!set after = i * 10\n";
        let report = assemble(source);
        assert!(report.diagnostics.is_empty());
        assert_eq!(value(&report, "after"), 20);
    }

    #[test]
    fn do_with_unknown_condition_keyword_degenerates() {
        // "whilst" is a recoverable syntax error; the condition degenerates
        // to always-true, and the cursor then fails the '{' check
        let source = "!do whilst x { }\n";
        let report = assemble(source);
        assert!(report.error_count() >= 1);
    }

    #[test]
    fn for_old_form_counts_from_one() {
        let source = "!set total = 0\n!for i, 3 {\n!set total = total * 10 + i\n}\n";
        let report = assemble(source);
        assert!(report.warning_count() <= 1);
        assert_eq!(value(&report, "total"), 123);
        assert_eq!(value(&report, "i"), 3);
    }

    #[test]
    fn for_old_form_zero_count_skips_loop() {
        let source = "!set total = 0\n!for i, 0 {\n!set total = 1\n}\n";
        let report = assemble(source);
        assert_eq!(value(&report, "total"), 0);
        // the counter is still initialized
        assert_eq!(value(&report, "i"), 0);
    }

    #[test]
    fn for_old_form_negative_count_is_serious() {
        let report = assemble("!for i, 0 - 2 {\n}\n");
        assert!(report.error_count() >= 1);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.message().contains("negative")));
    }

    #[test]
    fn for_new_form_ascending() {
        let source = "!set total = 0\n!for i, 2, 5 {\n!set total = total * 10 + i\n}\n";
        let report = assemble(source);
        assert_eq!(value(&report, "total"), 2345);
        // post-test loop leaves the counter one step past END
        assert_eq!(value(&report, "i"), 6);
    }

    #[test]
    fn for_new_form_descending() {
        let source = "!set total = 0\n!for i, 5, 2 {\n!set total = total * 10 + i\n}\n";
        let report = assemble(source);
        assert_eq!(value(&report, "total"), 5432);
        assert_eq!(value(&report, "i"), 1);
    }

    #[test]
    fn for_new_form_ending_at_i64_max_terminates() {
        let source = "!set hits = 0\n!for i, $7ffffffffffffffe, $7fffffffffffffff {\n!set hits = hits + 1\n}\n";
        let report = assemble(source);
        assert_eq!(value(&report, "hits"), 2);
        // the post-test step past END wraps around the value range
        assert_eq!(value(&report, "i"), i64::MIN);
    }

    #[test]
    fn for_new_form_single_value_runs_once() {
        let source = "!set hits = 0\n!for i, 7, 7 {\n!set hits = hits + 1\n}\n";
        let report = assemble(source);
        assert_eq!(value(&report, "hits"), 1);
        assert_eq!(value(&report, "i"), 8);
    }

    #[test]
    fn nested_loops_reenter_cleanly() {
        let source = "!set total = 0\n!for i, 2 {\n!for j, 2 {\n!set total = total + i * 10 + j\n}\n}\n";
        let report = assemble(source);
        assert!(report.diagnostics.is_empty());
        // (11 + 12) + (21 + 22)
        assert_eq!(value(&report, "total"), 66);
    }

    #[test]
    fn new_for_syntax_warns_on_first_pass_only() {
        let source = "!for i, 1, 2 {\n}\n";
        let report = assemble(source);
        assert_eq!(report.warning_count(), 1);
        assert!(report.diagnostics[0].message().contains("new \"!for\" syntax"));

        let mut options = Options::default();
        options.warn_old_for = true;
        let report = assemble_str(source, &options).unwrap();
        assert_eq!(report.warning_count(), 0);

        let report = assemble_str("!for i, 2 {\n}\n", &options).unwrap();
        assert_eq!(report.warning_count(), 1);
        assert!(report.diagnostics[0].message().contains("old \"!for\" syntax"));
    }

    #[test]
    fn loop_condition_with_trailing_garbage_is_reported() {
        let source = "!set i = 0\n!do while i < 1 junk {\n!set i = 1\n}\n";
        let report = assemble(source);
        assert!(report.error_count() >= 1);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.message().contains("end of condition")));
    }
}
