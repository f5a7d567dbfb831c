// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Integer expression evaluation over the active input frame.
//!
//! The evaluator consumes bytes from the session's stream starting at the
//! expression's first character and leaves the cursor on the first byte
//! that is not part of the expression. Values must be defined at the
//! current pass; an undefined symbol is a serious error.

use crate::error::{AsmErrorKind, FlowError};
use crate::lexer;
use crate::parser::Session;
use crate::source::{CHAR_EOF, CHAR_EOS};
use crate::symbol::GLOBAL_ZONE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    LogicOr,
    LogicAnd,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl Session {
    /// Evaluate an expression to a defined integer value. Trailing spaces
    /// are skipped; checking what follows is the caller's business.
    pub(crate) fn eval_defined_int(&mut self) -> Result<i64, FlowError> {
        let value = self.eval_binary(1)?;
        self.stream.skip_space();
        Ok(value)
    }

    fn eval_binary(&mut self, min_prec: u8) -> Result<i64, FlowError> {
        let mut lhs = self.eval_term()?;
        loop {
            self.stream.skip_space();
            let Some((op, prec, width)) = self.peek_operator() else {
                return Ok(lhs);
            };
            if prec < min_prec {
                return Ok(lhs);
            }
            for _ in 0..width {
                self.stream.get_byte();
            }
            let rhs = self.eval_binary(prec + 1)?;
            lhs = self.apply_binary(op, lhs, rhs)?;
        }
    }

    fn eval_term(&mut self) -> Result<i64, FlowError> {
        self.stream.skip_space();
        match self.stream.last() {
            b'(' => {
                self.stream.get_byte();
                let value = self.eval_binary(1)?;
                self.stream.skip_space();
                if self.stream.last() != b')' {
                    return Err(self.serious(
                        AsmErrorKind::Expression,
                        "Expected ')' in expression",
                        None,
                    ));
                }
                self.stream.get_byte();
                Ok(value)
            }
            b'-' => {
                self.stream.get_byte();
                Ok(self.eval_term()?.wrapping_neg())
            }
            b'!' => {
                self.stream.get_byte();
                Ok((self.eval_term()? == 0) as i64)
            }
            b'~' => {
                self.stream.get_byte();
                Ok(!self.eval_term()?)
            }
            b'$' => {
                self.stream.get_byte();
                self.read_digits(16)
            }
            b'%' => {
                self.stream.get_byte();
                self.read_digits(2)
            }
            b'0'..=b'9' => self.read_digits(10),
            b'\'' => self.read_char_literal(),
            b'.' | b'_' | b'a'..=b'z' | b'A'..=b'Z' => self.read_symbol_value(),
            _ => Err(self.serious(AsmErrorKind::Expression, "Syntax error in expression", None)),
        }
    }

    fn read_digits(&mut self, base: u32) -> Result<i64, FlowError> {
        let mut value: i64 = 0;
        let mut seen = false;
        while let Some(digit) = (self.stream.last() as char).to_digit(base) {
            value = value.wrapping_mul(base as i64).wrapping_add(digit as i64);
            seen = true;
            self.stream.get_byte();
        }
        if !seen {
            return Err(self.serious(AsmErrorKind::Expression, "Expected a digit", None));
        }
        Ok(value)
    }

    fn read_char_literal(&mut self) -> Result<i64, FlowError> {
        let byte = self.stream.get_quoted_byte();
        if byte == CHAR_EOS || byte == CHAR_EOF {
            return Err(self.serious(
                AsmErrorKind::Expression,
                "Unterminated character literal",
                None,
            ));
        }
        if self.stream.get_quoted_byte() != b'\'' {
            return Err(self.serious(
                AsmErrorKind::Expression,
                "Unterminated character literal",
                None,
            ));
        }
        self.stream.get_byte();
        Ok(byte as i64)
    }

    fn read_symbol_value(&mut self) -> Result<i64, FlowError> {
        let zone = if self.stream.last() == b'.' {
            self.stream.get_byte();
            self.current_zone
        } else {
            GLOBAL_ZONE
        };
        let name = lexer::read_name(&mut self.stream);
        if name.is_empty() {
            return Err(self.serious(AsmErrorKind::Expression, "Syntax error in expression", None));
        }
        match self.symbols.lookup(zone, &name) {
            Some(symbol) if symbol.defined => Ok(symbol.value),
            _ => Err(self.serious(AsmErrorKind::Expression, "Value not defined", Some(&name))),
        }
    }

    /// Identify the operator at the cursor without consuming it.
    /// Returns the operator, its precedence, and its byte width.
    fn peek_operator(&self) -> Option<(BinaryOp, u8, u8)> {
        let next = self.stream.peek_raw();
        match self.stream.last() {
            b'|' if next == b'|' => Some((BinaryOp::LogicOr, 1, 2)),
            b'|' => Some((BinaryOp::BitOr, 3, 1)),
            b'&' if next == b'&' => Some((BinaryOp::LogicAnd, 2, 2)),
            b'&' => Some((BinaryOp::BitAnd, 5, 1)),
            b'^' => Some((BinaryOp::BitXor, 4, 1)),
            b'=' if next == b'=' => Some((BinaryOp::Eq, 6, 2)),
            b'=' => Some((BinaryOp::Eq, 6, 1)),
            b'!' if next == b'=' => Some((BinaryOp::Ne, 6, 2)),
            b'<' if next == b'<' => Some((BinaryOp::Shl, 8, 2)),
            b'<' if next == b'=' => Some((BinaryOp::Le, 7, 2)),
            b'<' if next == b'>' => Some((BinaryOp::Ne, 6, 2)),
            b'<' => Some((BinaryOp::Lt, 7, 1)),
            b'>' if next == b'>' => Some((BinaryOp::Shr, 8, 2)),
            b'>' if next == b'=' => Some((BinaryOp::Ge, 7, 2)),
            b'>' => Some((BinaryOp::Gt, 7, 1)),
            b'+' => Some((BinaryOp::Add, 9, 1)),
            b'-' => Some((BinaryOp::Sub, 9, 1)),
            b'*' => Some((BinaryOp::Mul, 10, 1)),
            b'/' => Some((BinaryOp::Div, 10, 1)),
            b'%' => Some((BinaryOp::Mod, 10, 1)),
            _ => None,
        }
    }

    fn apply_binary(&mut self, op: BinaryOp, lhs: i64, rhs: i64) -> Result<i64, FlowError> {
        let value = match op {
            BinaryOp::LogicOr => ((lhs != 0) || (rhs != 0)) as i64,
            BinaryOp::LogicAnd => ((lhs != 0) && (rhs != 0)) as i64,
            BinaryOp::BitOr => lhs | rhs,
            BinaryOp::BitXor => lhs ^ rhs,
            BinaryOp::BitAnd => lhs & rhs,
            BinaryOp::Eq => (lhs == rhs) as i64,
            BinaryOp::Ne => (lhs != rhs) as i64,
            BinaryOp::Lt => (lhs < rhs) as i64,
            BinaryOp::Le => (lhs <= rhs) as i64,
            BinaryOp::Gt => (lhs > rhs) as i64,
            BinaryOp::Ge => (lhs >= rhs) as i64,
            BinaryOp::Shl => lhs.wrapping_shl(rhs as u32 & 63),
            BinaryOp::Shr => lhs.wrapping_shr(rhs as u32 & 63),
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
            BinaryOp::Div => match lhs.checked_div(rhs) {
                Some(v) => v,
                None => {
                    return Err(self.serious(AsmErrorKind::Expression, "Division by zero", None))
                }
            },
            BinaryOp::Mod => match lhs.checked_rem(rhs) {
                Some(v) => v,
                None => {
                    return Err(self.serious(AsmErrorKind::Expression, "Division by zero", None))
                }
            },
        };
        Ok(value)
    }
}
