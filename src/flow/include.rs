// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Source inclusion: `!source FILE`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AsmErrorKind, FlowError};
use crate::flow::StatementEnd;
use crate::lexer;
use crate::parser::Session;

impl Session {
    /// `!source "FILE"` / `!src FILE` — parse the named file in place,
    /// then resume the including frame right where it left off.
    pub(crate) fn po_source(&mut self) -> Result<StatementEnd, FlowError> {
        if self.includes_left == 0 {
            return Err(self.fatal(
                AsmErrorKind::Source,
                "Too deeply nested. Recursive \"!source\"?",
                None,
            ));
        }
        let Some(name) = lexer::read_filename(&mut self.stream) else {
            self.error(AsmErrorKind::Source, "Expected file name", None);
            return Ok(StatementEnd::SkipRemainder);
        };
        let path = self.resolve_include(&name);
        match fs::read(&path) {
            Ok(data) => {
                self.includes_left -= 1;
                let outcome = self.parse_and_close_file(&path.display().to_string(), data);
                self.includes_left += 1;
                outcome?;
            }
            Err(err) => {
                self.error(
                    AsmErrorKind::Io,
                    "Cannot open input file",
                    Some(&format!("{} ({err})", path.display())),
                );
            }
        }
        Ok(StatementEnd::EnsureEos)
    }

    /// Relative names resolve against the including file's directory.
    fn resolve_include(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self
            .stream
            .file_name()
            .map(Path::new)
            .and_then(Path::parent)
        {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}
