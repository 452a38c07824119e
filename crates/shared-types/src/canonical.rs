//! # Canonical Encoding
//!
//! The single deterministic byte encoding every hash and signature in the
//! protocol is computed over.
//!
//! ## Grammar
//!
//! ```text
//! value   := null | bool | number | string | array | object
//! null    := "null"
//! bool    := "true" | "false"
//! number  := shortest decimal rendering; no NaN, no Infinity,
//!            no leading zeros, no trailing fractional zeros
//! string  := '"' utf8 with minimal JSON escapes '"'
//! array   := '[' value (',' value)* ']'        (declared order)
//! object  := '{' member (',' member)* '}'      (keys sorted ascending
//!                                               by Unicode codepoint)
//! ```
//!
//! The encoding is injective across all values used by the protocol:
//! two semantically distinct values never share canonical bytes, and
//! parsing then re-encoding canonical bytes is the identity.
//!
//! An off-the-shelf JSON serializer is deliberately not used here; key
//! order, number rendering, and NaN handling must stay pinned.

use std::collections::BTreeMap;
use std::fmt;

/// A value in the canonical data model.
///
/// Object keys live in a [`BTreeMap`], which keeps them sorted by codepoint
/// so encoding never depends on insertion order.
#[derive(Clone, Debug, PartialEq)]
pub enum CanonicalValue {
    Null,
    Bool(bool),
    /// Non-negative integers (heights, sats, timestamps).
    UInt(u64),
    /// Negative integers. Non-negative values must use `UInt` so that
    /// equal numbers always share one representation.
    Int(i64),
    /// Finite floats (attestation confidence). NaN and infinities are
    /// rejected at construction.
    Float(f64),
    String(String),
    Array(Vec<CanonicalValue>),
    Object(BTreeMap<String, CanonicalValue>),
}

impl CanonicalValue {
    /// Build a float value, rejecting NaN and infinities.
    pub fn float(v: f64) -> Result<Self, CanonicalError> {
        if !v.is_finite() {
            return Err(CanonicalError::NonFiniteNumber);
        }
        Ok(CanonicalValue::Float(v))
    }

    /// Build an integer value with the canonical sign split.
    pub fn int(v: i64) -> Self {
        if v >= 0 {
            CanonicalValue::UInt(v as u64)
        } else {
            CanonicalValue::Int(v)
        }
    }

    /// Encode to canonical bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            CanonicalValue::Null => out.extend_from_slice(b"null"),
            CanonicalValue::Bool(true) => out.extend_from_slice(b"true"),
            CanonicalValue::Bool(false) => out.extend_from_slice(b"false"),
            CanonicalValue::UInt(n) => {
                let mut buf = itoa_u64(*n);
                out.append(&mut buf);
            }
            CanonicalValue::Int(n) => {
                // Int is negative by construction (see `int`).
                out.push(b'-');
                let mut buf = itoa_u64(n.unsigned_abs());
                out.append(&mut buf);
            }
            CanonicalValue::Float(f) => {
                // Display for f64 is the shortest decimal that round-trips.
                let rendered = format!("{f}");
                out.extend_from_slice(rendered.as_bytes());
            }
            CanonicalValue::String(s) => write_escaped(s, out),
            CanonicalValue::Array(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b',');
                    }
                    item.write(out);
                }
                out.push(b']');
            }
            CanonicalValue::Object(members) => {
                out.push(b'{');
                for (i, (key, value)) in members.iter().enumerate() {
                    if i > 0 {
                        out.push(b',');
                    }
                    write_escaped(key, out);
                    out.push(b':');
                    value.write(out);
                }
                out.push(b'}');
            }
        }
    }

    /// Parse canonical bytes back into a value.
    ///
    /// Used by tests to check the encode/parse identity and by observers
    /// re-validating stored event bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, CanonicalError> {
        let mut parser = Parser { input: bytes, pos: 0 };
        let value = parser.value()?;
        if parser.pos != bytes.len() {
            return Err(CanonicalError::TrailingBytes(parser.pos));
        }
        Ok(value)
    }
}

/// Builder for canonical objects.
///
/// Absent optional fields are omitted entirely, never encoded as null.
#[derive(Default)]
pub struct ObjectBuilder {
    members: BTreeMap<String, CanonicalValue>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, key: &str, value: CanonicalValue) -> Self {
        self.members.insert(key.to_string(), value);
        self
    }

    pub fn string(self, key: &str, value: &str) -> Self {
        self.field(key, CanonicalValue::String(value.to_string()))
    }

    pub fn uint(self, key: &str, value: u64) -> Self {
        self.field(key, CanonicalValue::UInt(value))
    }

    pub fn hex(self, key: &str, bytes: &[u8]) -> Self {
        self.field(key, CanonicalValue::String(hex::encode(bytes)))
    }

    /// Insert only when the value is present.
    pub fn opt(self, key: &str, value: Option<CanonicalValue>) -> Self {
        match value {
            Some(v) => self.field(key, v),
            None => self,
        }
    }

    pub fn build(self) -> CanonicalValue {
        CanonicalValue::Object(self.members)
    }
}

/// Errors from canonical encoding or parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanonicalError {
    #[error("non-finite number cannot be encoded")]
    NonFiniteNumber,
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEnd(usize),
    #[error("unexpected byte {byte:#04x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: usize },
    #[error("invalid number literal at offset {0}")]
    InvalidNumber(usize),
    #[error("invalid string escape at offset {0}")]
    InvalidEscape(usize),
    #[error("invalid utf-8 in string at offset {0}")]
    InvalidUtf8(usize),
    #[error("trailing bytes after value at offset {0}")]
    TrailingBytes(usize),
    #[error("object keys not sorted at offset {0}")]
    UnsortedKeys(usize),
}

impl fmt::Display for CanonicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.encode()))
    }
}

fn itoa_u64(mut n: u64) -> Vec<u8> {
    if n == 0 {
        return vec![b'0'];
    }
    let mut digits = Vec::with_capacity(20);
    while n > 0 {
        digits.push(b'0' + (n % 10) as u8);
        n /= 10;
    }
    digits.reverse();
    digits
}

fn write_escaped(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for ch in s.chars() {
        match ch {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Result<u8, CanonicalError> {
        self.input
            .get(self.pos)
            .copied()
            .ok_or(CanonicalError::UnexpectedEnd(self.pos))
    }

    fn bump(&mut self) -> Result<u8, CanonicalError> {
        let b = self.peek()?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, token: &[u8]) -> Result<(), CanonicalError> {
        if self.input[self.pos..].starts_with(token) {
            self.pos += token.len();
            Ok(())
        } else {
            Err(CanonicalError::UnexpectedByte {
                byte: self.peek()?,
                offset: self.pos,
            })
        }
    }

    fn value(&mut self) -> Result<CanonicalValue, CanonicalError> {
        match self.peek()? {
            b'n' => {
                self.expect(b"null")?;
                Ok(CanonicalValue::Null)
            }
            b't' => {
                self.expect(b"true")?;
                Ok(CanonicalValue::Bool(true))
            }
            b'f' => {
                self.expect(b"false")?;
                Ok(CanonicalValue::Bool(false))
            }
            b'"' => self.string().map(CanonicalValue::String),
            b'[' => self.array(),
            b'{' => self.object(),
            b'-' | b'0'..=b'9' => self.number(),
            byte => Err(CanonicalError::UnexpectedByte { byte, offset: self.pos }),
        }
    }

    fn number(&mut self) -> Result<CanonicalValue, CanonicalError> {
        let start = self.pos;
        let negative = self.peek()? == b'-';
        if negative {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(&b) = self.input.get(self.pos) {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' | b'e' | b'E' | b'+' | b'-' => {
                    is_float = true;
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| CanonicalError::InvalidNumber(start))?;
        if is_float {
            let v: f64 = text.parse().map_err(|_| CanonicalError::InvalidNumber(start))?;
            CanonicalValue::float(v).map_err(|_| CanonicalError::InvalidNumber(start))
        } else if negative {
            let v: i64 = text.parse().map_err(|_| CanonicalError::InvalidNumber(start))?;
            Ok(CanonicalValue::Int(v))
        } else {
            let v: u64 = text.parse().map_err(|_| CanonicalError::InvalidNumber(start))?;
            Ok(CanonicalValue::UInt(v))
        }
    }

    fn string(&mut self) -> Result<String, CanonicalError> {
        self.expect(b"\"")?;
        let mut out = String::new();
        loop {
            let b = self.bump()?;
            match b {
                b'"' => return Ok(out),
                b'\\' => {
                    let esc = self.bump()?;
                    match esc {
                        b'"' => out.push('"'),
                        b'\\' => out.push('\\'),
                        b'/' => out.push('/'),
                        b'n' => out.push('\n'),
                        b'r' => out.push('\r'),
                        b't' => out.push('\t'),
                        b'b' => out.push('\u{0008}'),
                        b'f' => out.push('\u{000c}'),
                        b'u' => {
                            if self.pos + 4 > self.input.len() {
                                return Err(CanonicalError::UnexpectedEnd(self.pos));
                            }
                            let hex_digits =
                                std::str::from_utf8(&self.input[self.pos..self.pos + 4])
                                    .map_err(|_| CanonicalError::InvalidEscape(self.pos))?;
                            let code = u32::from_str_radix(hex_digits, 16)
                                .map_err(|_| CanonicalError::InvalidEscape(self.pos))?;
                            self.pos += 4;
                            out.push(
                                char::from_u32(code)
                                    .ok_or(CanonicalError::InvalidEscape(self.pos))?,
                            );
                        }
                        _ => return Err(CanonicalError::InvalidEscape(self.pos - 1)),
                    }
                }
                _ => {
                    // Re-sync to the start of the utf-8 sequence.
                    self.pos -= 1;
                    let rest = &self.input[self.pos..];
                    let len = utf8_len(rest[0]).ok_or(CanonicalError::InvalidUtf8(self.pos))?;
                    if rest.len() < len {
                        return Err(CanonicalError::UnexpectedEnd(self.pos));
                    }
                    let s = std::str::from_utf8(&rest[..len])
                        .map_err(|_| CanonicalError::InvalidUtf8(self.pos))?;
                    out.push_str(s);
                    self.pos += len;
                }
            }
        }
    }

    fn array(&mut self) -> Result<CanonicalValue, CanonicalError> {
        self.expect(b"[")?;
        let mut items = Vec::new();
        if self.peek()? == b']' {
            self.pos += 1;
            return Ok(CanonicalValue::Array(items));
        }
        loop {
            items.push(self.value()?);
            match self.bump()? {
                b',' => continue,
                b']' => return Ok(CanonicalValue::Array(items)),
                byte => {
                    return Err(CanonicalError::UnexpectedByte { byte, offset: self.pos - 1 })
                }
            }
        }
    }

    fn object(&mut self) -> Result<CanonicalValue, CanonicalError> {
        self.expect(b"{")?;
        let mut members = BTreeMap::new();
        if self.peek()? == b'}' {
            self.pos += 1;
            return Ok(CanonicalValue::Object(members));
        }
        let mut last_key: Option<String> = None;
        loop {
            let key_offset = self.pos;
            let key = self.string()?;
            if let Some(prev) = &last_key {
                if key <= *prev {
                    return Err(CanonicalError::UnsortedKeys(key_offset));
                }
            }
            self.expect(b":")?;
            let value = self.value()?;
            last_key = Some(key.clone());
            members.insert(key, value);
            match self.bump()? {
                b',' => continue,
                b'}' => return Ok(CanonicalValue::Object(members)),
                byte => {
                    return Err(CanonicalError::UnexpectedByte { byte, offset: self.pos - 1 })
                }
            }
        }
    }
}

fn utf8_len(first: u8) -> Option<usize> {
    match first {
        0x00..=0x7f => Some(1),
        0xc0..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf7 => Some(4),
        _ => None,
    }
}
