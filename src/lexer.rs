// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Keyword, name, and filename readers over the source stream.

use crate::source::{SourceStream, CHAR_EOF, CHAR_EOS};

/// Read an identifier starting at the current byte and lowercase it.
/// Returns an empty string if the current byte cannot start one.
pub fn read_keyword(stream: &mut SourceStream) -> String {
    let mut keyword = read_name(stream);
    keyword.make_ascii_lowercase();
    keyword
}

/// Read an identifier starting at the current byte, preserving case.
/// Afterwards the stream rests on the first byte past the identifier.
pub fn read_name(stream: &mut SourceStream) -> String {
    let mut name = String::new();
    let first = stream.last();
    if !first.is_ascii_alphabetic() && first != b'_' {
        return name;
    }
    while is_ident_char(stream.last()) {
        name.push(stream.last() as char);
        stream.get_byte();
    }
    name
}

/// Skip spaces, then consume a comma if present. Spaces after the comma are
/// skipped too.
pub fn accept_comma(stream: &mut SourceStream) -> bool {
    stream.skip_space();
    if stream.last() != b',' {
        return false;
    }
    stream.get_byte();
    stream.skip_space();
    true
}

/// Read an optional force-bit suffix (`+1`, `+2`, `+3`) after a symbol name.
/// Returns 0 when absent. Trailing spaces are skipped.
pub fn read_force_bit(stream: &mut SourceStream) -> u8 {
    let mut force = 0;
    if stream.last() == b'+' {
        let digit = stream.peek_raw();
        if (b'1'..=b'3').contains(&digit) {
            stream.get_byte();
            force = stream.last() - b'0';
            stream.get_byte();
        }
    }
    stream.skip_space();
    force
}

/// Read a filename argument: either a quoted string or a bare token of
/// non-space bytes. Returns `None` when no filename is present or a quoted
/// name is unterminated. Afterwards the stream rests past the filename.
pub fn read_filename(stream: &mut SourceStream) -> Option<String> {
    stream.skip_space();
    let mut name = Vec::new();
    if stream.last() == b'"' {
        loop {
            let byte = stream.get_quoted_byte();
            match byte {
                b'"' => break,
                CHAR_EOS | CHAR_EOF => return None,
                _ => name.push(byte),
            }
        }
        stream.get_byte();
    } else {
        while !matches!(stream.last(), b' ' | b'\t' | CHAR_EOS | CHAR_EOF) {
            name.push(stream.last());
            stream.get_byte();
        }
    }
    if name.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(&name).to_string())
}

fn is_ident_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}
