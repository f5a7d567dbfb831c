// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// Library entry exposing the assembler flow front end.
pub mod error;
pub mod flow;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod source;
pub mod symbol;

mod eval;

pub use parser::{assemble_file, assemble_str, Options, RunError, RunReport};
