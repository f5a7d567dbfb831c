// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Input cursor frames and block capture.
//!
//! Parsing position is a stack of [`Frame`]s owned by the stream: pushing a
//! frame enters a nested byte source (an included file or a captured block in
//! memory), popping restores the outer one. Each frame carries its own
//! last-delivered byte, so a pop restores the caller's cursor exactly as it
//! was — there is no separately tracked "last byte" to save around a switch.
//!
//! Bytes are normalized on delivery: newlines, `:` separators, and comments
//! all become the end-of-statement byte, and end of input becomes a
//! distinguished EOF byte. Captured blocks store the raw source text plus a
//! trailing end-of-statement sentinel, so re-parsing them goes through the
//! same normalization and can never run past the block's logical end.

use std::rc::Rc;

use crate::error::{AsmError, AsmErrorKind};

/// End-of-statement byte, also the sentinel appended to captured blocks.
pub const CHAR_EOS: u8 = 0;
/// End-of-input byte, delivered when the active frame is exhausted.
pub const CHAR_EOF: u8 = 26;
/// Start-of-block delimiter.
pub const CHAR_SOB: u8 = b'{';
/// End-of-block delimiter.
pub const CHAR_EOB: u8 = b'}';

/// Origin of a frame's bytes.
enum Origin {
    File { name: String, data: Vec<u8>, pos: usize },
    Memory { data: Rc<[u8]>, pos: usize },
}

/// A cursor into one byte source: line number, last delivered byte, origin.
struct Frame {
    line: u32,
    last: u8,
    /// A newline was delivered as end-of-statement; the line counter moves
    /// when the next byte is fetched, so diagnostics recorded at the end of
    /// a statement still name the statement's own line.
    advance_line: bool,
    origin: Origin,
}

impl Frame {
    fn next_raw(&mut self) -> Option<u8> {
        let (data, pos): (&[u8], &mut usize) = match &mut self.origin {
            Origin::File { data, pos, .. } => (data, pos),
            Origin::Memory { data, pos } => (data, pos),
        };
        let byte = data.get(*pos).copied()?;
        *pos += 1;
        Some(byte)
    }

    fn peek_raw(&self) -> u8 {
        let (data, pos): (&[u8], usize) = match &self.origin {
            Origin::File { data, pos, .. } => (data, *pos),
            Origin::Memory { data, pos } => (data, *pos),
        };
        data.get(pos).copied().unwrap_or(0)
    }
}

/// Stack of input cursor frames; the top frame is the active byte source.
pub struct SourceStream {
    frames: Vec<Frame>,
}

impl SourceStream {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    /// Install a file-backed frame as the active source.
    pub fn push_file(&mut self, name: &str, data: Vec<u8>) {
        self.frames.push(Frame {
            line: 1,
            last: CHAR_EOS,
            advance_line: false,
            origin: Origin::File {
                name: name.to_string(),
                data,
                pos: 0,
            },
        });
    }

    /// Install a memory-backed frame over a captured block.
    pub fn push_memory(&mut self, data: Rc<[u8]>, start_line: u32) {
        self.frames.push(Frame {
            line: start_line,
            last: CHAR_EOS,
            advance_line: false,
            origin: Origin::Memory { data, pos: 0 },
        });
    }

    /// Restore the previously active frame, including its last byte.
    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Last byte delivered from the active frame.
    pub fn last(&self) -> u8 {
        match self.frames.last() {
            Some(frame) => frame.last,
            None => CHAR_EOF,
        }
    }

    /// Line number of the active frame.
    pub fn line(&self) -> u32 {
        match self.frames.last() {
            Some(frame) => frame.line,
            None => 0,
        }
    }

    /// Name of the innermost file-backed frame, for diagnostics.
    pub fn file_name(&self) -> Option<&str> {
        self.frames.iter().rev().find_map(|frame| match &frame.origin {
            Origin::File { name, .. } => Some(name.as_str()),
            Origin::Memory { .. } => None,
        })
    }

    /// Raw byte after the cursor, without consuming or normalizing it.
    pub fn peek_raw(&self) -> u8 {
        match self.frames.last() {
            Some(frame) => frame.peek_raw(),
            None => 0,
        }
    }

    /// Deliver the next normalized byte and remember it as `last`.
    ///
    /// Newline and `:` become [`CHAR_EOS`]; a `;` comment is consumed through
    /// its newline and becomes [`CHAR_EOS`]; exhausted input becomes
    /// [`CHAR_EOF`] (sticky). The line counter advances when the byte after
    /// a newline is fetched, not when the newline itself is delivered.
    pub fn get_byte(&mut self) -> u8 {
        let Some(frame) = self.frames.last_mut() else {
            return CHAR_EOF;
        };
        if frame.advance_line {
            frame.line += 1;
            frame.advance_line = false;
        }
        let out = match frame.next_raw() {
            None => CHAR_EOF,
            Some(b'\n') => {
                frame.advance_line = true;
                CHAR_EOS
            }
            Some(b'\r') => {
                if frame.peek_raw() == b'\n' {
                    frame.next_raw();
                }
                frame.advance_line = true;
                CHAR_EOS
            }
            Some(b';') => loop {
                match frame.next_raw() {
                    None => break CHAR_EOF,
                    Some(b'\n') => {
                        frame.advance_line = true;
                        break CHAR_EOS;
                    }
                    Some(b'\r') => {
                        if frame.peek_raw() == b'\n' {
                            frame.next_raw();
                        }
                        frame.advance_line = true;
                        break CHAR_EOS;
                    }
                    Some(_) => {}
                }
            },
            Some(b':') => CHAR_EOS,
            Some(CHAR_EOS) => CHAR_EOS, // stored sentinel
            Some(byte) => byte,
        };
        frame.last = out;
        out
    }

    /// Deliver the next byte without normalization, for string and char
    /// literal contexts. Newlines still end the statement and count lines.
    pub fn get_quoted_byte(&mut self) -> u8 {
        let Some(frame) = self.frames.last_mut() else {
            return CHAR_EOF;
        };
        if frame.advance_line {
            frame.line += 1;
            frame.advance_line = false;
        }
        let out = match frame.next_raw() {
            None => CHAR_EOF,
            Some(b'\n') => {
                frame.advance_line = true;
                CHAR_EOS
            }
            Some(byte) => byte,
        };
        frame.last = out;
        out
    }

    /// Advance past spaces and tabs.
    pub fn skip_space(&mut self) {
        while self.last() == b' ' || self.last() == b'\t' {
            self.get_byte();
        }
    }

    /// Consume bytes up to the next end of statement (or end of input).
    pub fn skip_remainder(&mut self) {
        while self.last() != CHAR_EOS && self.last() != CHAR_EOF {
            self.get_byte();
        }
    }

    /// Collect normalized bytes until `terminator`, end of statement, or end
    /// of input; the stopping byte is left as `last` and not collected.
    /// Terminator bytes inside string literals do not stop the scan.
    pub fn read_until_terminator(&mut self, terminator: u8) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut quote: Option<u8> = None;
        loop {
            let byte = self.last();
            if byte == CHAR_EOS || byte == CHAR_EOF {
                break;
            }
            match quote {
                Some(q) => {
                    if byte == q {
                        quote = None;
                    }
                }
                None => {
                    if byte == terminator {
                        break;
                    }
                    if byte == b'"' || byte == b'\'' {
                        quote = Some(byte);
                    }
                }
            }
            buf.push(byte);
            self.get_byte();
        }
        buf
    }

    /// Consume a block from after its opening delimiter through the matching
    /// closing one, tracking nesting, string literals, and comments.
    ///
    /// Call with `last` at the opening `{`. Afterwards `last` is the matching
    /// `}`. With `store`, the consumed text (including the final `}`) is
    /// returned with a trailing [`CHAR_EOS`] sentinel; otherwise the bytes
    /// are discarded. A missing closing delimiter is an error for the caller
    /// to escalate.
    pub fn skip_or_store_block(&mut self, store: bool) -> Result<Option<Vec<u8>>, AsmError> {
        let mut buf = Vec::new();
        let mut depth: u32 = 1;
        let mut quote: Option<u8> = None;
        let mut in_comment = false;
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Err(missing_terminator());
            };
            let Some(byte) = frame.next_raw() else {
                frame.last = CHAR_EOF;
                return Err(missing_terminator());
            };
            if byte == b'\n' {
                // capture consumes the newline and its follower in one
                // sweep, so the counter can move right away here
                frame.line += 1;
                in_comment = false;
                quote = None; // string literals do not span lines
            } else if !in_comment {
                match quote {
                    Some(q) => {
                        if byte == q {
                            quote = None;
                        }
                    }
                    None => match byte {
                        b'"' | b'\'' => quote = Some(byte),
                        b';' => in_comment = true,
                        CHAR_SOB => depth += 1,
                        CHAR_EOB => {
                            depth -= 1;
                            if depth == 0 {
                                frame.last = CHAR_EOB;
                                if store {
                                    buf.push(CHAR_EOB);
                                    buf.push(CHAR_EOS);
                                    return Ok(Some(buf));
                                }
                                return Ok(None);
                            }
                        }
                        _ => {}
                    },
                }
            }
            if store {
                buf.push(byte);
            }
        }
    }
}

impl Default for SourceStream {
    fn default() -> Self {
        Self::new()
    }
}

fn missing_terminator() -> AsmError {
    AsmError::new(
        AsmErrorKind::Syntax,
        "Found end of file instead of end of block ('}')",
        None,
    )
}
