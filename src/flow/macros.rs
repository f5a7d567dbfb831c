// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Macro-body capture: `!macro`.
//!
//! Definition happens on the first pass only; the registry persists across
//! passes, so later passes just skip over the definition.

use crate::error::{AsmErrorKind, FlowError};
use crate::flow::StatementEnd;
use crate::lexer;
use crate::macros::MacroDef;
use crate::parser::Session;
use crate::source::{CHAR_EOF, CHAR_EOS, CHAR_SOB};
use crate::symbol::GLOBAL_ZONE;

impl Session {
    /// `!macro [.]NAME { … }`
    pub(crate) fn po_macro(&mut self) -> Result<StatementEnd, FlowError> {
        if self.pass == 0 {
            // definition errors cannot repeat on the final pass (later
            // passes only skip the block), so they abort the run
            self.parse_macro_definition()
                .map_err(FlowError::into_fatal)?;
        } else {
            // already registered; scan to the block and skip it
            while self.stream.last() != CHAR_SOB {
                if self.stream.last() == CHAR_EOS || self.stream.last() == CHAR_EOF {
                    return Err(self.no_left_brace());
                }
                self.stream.get_byte();
            }
            self.capture_block(false)?;
        }
        self.stream.get_byte();
        Ok(StatementEnd::EnsureEos)
    }

    fn parse_macro_definition(&mut self) -> Result<(), FlowError> {
        self.stream.skip_space();
        let zone = if self.stream.last() == b'.' {
            self.stream.get_byte();
            self.current_zone
        } else {
            GLOBAL_ZONE
        };
        let name = lexer::read_name(&mut self.stream);
        if name.is_empty() {
            return Err(self.serious(AsmErrorKind::Macro, "Expected macro name", None));
        }
        self.stream.skip_space();
        if self.stream.last() != CHAR_SOB {
            return Err(self.no_left_brace());
        }
        let line = self.stream.line();
        let body = self
            .capture_block(true)?
            .expect("stored capture returns a body");
        let def = MacroDef {
            zone,
            name,
            line,
            body,
        };
        if let Err(error) = self.macros.add(def) {
            let message = error.message().to_string();
            return Err(self.serious(AsmErrorKind::Macro, &message, None));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{assemble_str, Options};
    use crate::symbol::GLOBAL_ZONE;

    #[test]
    fn body_is_captured_and_registered_once() {
        let source = "!macro blink {\nlda #1\nsta $d020\n}\n";
        let report = assemble_str(source, &Options::default()).unwrap();
        assert!(report.diagnostics.is_empty());
        assert_eq!(report.macros.len(), 1);
        let def = report.macros.get(GLOBAL_ZONE, "blink").unwrap();
        let text = String::from_utf8_lossy(&def.body);
        assert!(text.contains("sta $d020"));
        assert_eq!(def.line, 1);
    }

    #[test]
    fn body_is_skipped_not_parsed() {
        // directives inside a macro body must not run at definition time
        let source = "!macro init {\n!set leaked = 1\n}\n";
        let report = assemble_str(source, &Options::default()).unwrap();
        assert!(report.diagnostics.is_empty());
        assert!(report.symbols.lookup(GLOBAL_ZONE, "leaked").is_none());
    }

    #[test]
    fn local_macro_lands_in_current_zone() {
        let source = "!zone\n!macro .helper {\nnop\n}\n";
        let report = assemble_str(source, &Options::default()).unwrap();
        assert!(report.diagnostics.is_empty());
        assert!(report.macros.get(GLOBAL_ZONE, "helper").is_none());
        assert!(report.macros.get(2, "helper").is_some());
    }

    #[test]
    fn redefinition_aborts_the_run() {
        let source = "!macro m {\n}\n!macro m {\n}\n";
        let err = assemble_str(source, &Options::default()).unwrap_err();
        assert!(err.error.message().contains("already defined"));
    }

    #[test]
    fn definition_without_block_aborts_the_run() {
        let err = assemble_str("!macro m\n!set ok = 1\n", &Options::default()).unwrap_err();
        assert!(err.error.message().contains("Expected '{'"));
        assert!(!err.diagnostics.is_empty());
    }

    #[test]
    fn malformed_macro_name_aborts_the_run() {
        // the error cannot recur on a later pass, so it must not vanish
        // with the rest of the first pass's diagnostics
        let err = assemble_str("!macro 123 {\n}\n", &Options::default()).unwrap_err();
        assert!(err.error.message().contains("Expected macro name"));
        assert_eq!(err.diagnostics.len(), 1);
        assert_eq!(err.diagnostics[0].line(), 1);
    }
}
