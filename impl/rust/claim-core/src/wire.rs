//! Protobuf wire-format reader driven by static layout tables.
//!
//! Each message layout is a `&'static [FieldSpec]`. The reader checks wire
//! types against the table, skips tags it does not know (counting the bytes
//! as ignored) and, on [`MessageReader::finish`], reports required fields
//! that never showed up. Every error carries the dotted path of the field
//! being read and the absolute payload offset where that read began.

use prost::bytes::{Buf, BufMut};
use prost::encoding::{decode_key, decode_varint, encode_key, encode_varint, skip_field, DecodeContext};
pub use prost::encoding::WireType;

use crate::{Error, MalformedKind, Result};

/// One row of a message layout.
#[derive(Debug)]
pub struct FieldSpec {
    pub tag: u32,
    pub name: &'static str,
    pub wire: WireType,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(tag: u32, name: &'static str, wire: WireType) -> Self {
        Self {
            tag,
            name,
            wire,
            required: true,
        }
    }

    pub const fn optional(tag: u32, name: &'static str, wire: WireType) -> Self {
        Self {
            tag,
            name,
            wire,
            required: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Fixed32(u32),
    Len(&'a [u8]),
}

/// A field read from a message, tied to its layout row.
#[derive(Debug)]
pub struct Field<'a> {
    pub spec: &'static FieldSpec,
    pub value: WireValue<'a>,
    /// Dotted path, e.g. `stream.metadata.title`.
    pub path: String,
    /// Absolute offset of the field key.
    pub offset: usize,
    /// Absolute offset of the value bytes (after the length prefix for `Len`).
    pub value_offset: usize,
}

impl<'a> Field<'a> {
    fn invalid(&self, what: &str) -> Error {
        Error::malformed(
            self.path.clone(),
            self.offset,
            MalformedKind::InvalidValue(what.to_string()),
        )
    }

    pub fn as_u64(&self) -> Result<u64> {
        match self.value {
            WireValue::Varint(v) => Ok(v),
            _ => Err(self.invalid("expected varint")),
        }
    }

    /// `int64` fields are two's complement in a plain varint.
    pub fn as_i64(&self) -> Result<i64> {
        self.as_u64().map(|v| v as i64)
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self.as_u64()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(self.invalid(&format!("bool out of range: {other}"))),
        }
    }

    pub fn as_f32(&self) -> Result<f32> {
        match self.value {
            WireValue::Fixed32(bits) => Ok(f32::from_bits(bits)),
            _ => Err(self.invalid("expected fixed32")),
        }
    }

    pub fn as_bytes(&self) -> Result<&'a [u8]> {
        match self.value {
            WireValue::Len(b) => Ok(b),
            _ => Err(self.invalid("expected length-delimited")),
        }
    }

    pub fn as_str(&self) -> Result<&'a str> {
        let bytes = self.as_bytes()?;
        std::str::from_utf8(bytes).map_err(|e| {
            Error::malformed(
                self.path.clone(),
                self.value_offset + e.valid_up_to(),
                MalformedKind::InvalidUtf8,
            )
        })
    }

    pub fn as_string(&self) -> Result<String> {
        self.as_str().map(str::to_string)
    }

    /// Open the value as a nested message with its own layout.
    pub fn message(&self, layout: &'static [FieldSpec]) -> Result<MessageReader<'a>> {
        let bytes = self.as_bytes()?;
        Ok(MessageReader::new(
            bytes,
            self.value_offset,
            self.path.clone(),
            layout,
        ))
    }
}

// ---------------------------------------------------------------------------
// MessageReader
// ---------------------------------------------------------------------------

pub struct MessageReader<'a> {
    buf: &'a [u8],
    /// Unread tail of `buf`; advanced in place by the prost decoders.
    rest: &'a [u8],
    base: usize,
    path: String,
    layout: &'static [FieldSpec],
    seen: Vec<bool>,
    ignored: usize,
}

impl<'a> MessageReader<'a> {
    /// `base` is the absolute offset of `buf[0]` inside the payload.
    pub fn new(buf: &'a [u8], base: usize, path: String, layout: &'static [FieldSpec]) -> Self {
        Self {
            buf,
            rest: buf,
            base,
            path,
            layout,
            seen: vec![false; layout.len()],
            ignored: 0,
        }
    }

    fn pos(&self) -> usize {
        self.buf.len() - self.rest.remaining()
    }

    fn child_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path, name)
        }
    }

    fn err(&self, path: String, offset: usize, kind: MalformedKind) -> Error {
        Error::malformed(path, self.base + offset, kind)
    }

    /// Explain a key `decode_key` refused.
    fn key_error(&self, start: usize) -> Error {
        let at = &self.buf[start..];
        let mut peek = at;
        let kind = match decode_varint(&mut peek) {
            Err(_) => varint_failure(at),
            Ok(key) if matches!(key & 0x7, 6 | 7) => MalformedKind::WireType((key & 0x7) as u8),
            Ok(_) => MalformedKind::InvalidValue("invalid field number".into()),
        };
        self.err(self.child_path("<key>"), start, kind)
    }

    fn read_value(&mut self, wire: WireType, path: &str, start: usize) -> Result<WireValue<'a>> {
        let before = self.rest;
        let truncated = |r: &Self| r.err(path.to_string(), start, MalformedKind::Truncated);
        Ok(match wire {
            WireType::Varint => {
                let v = decode_varint(&mut self.rest)
                    .map_err(|_| self.err(path.to_string(), start, varint_failure(before)))?;
                WireValue::Varint(v)
            }
            WireType::SixtyFourBit => {
                if self.rest.remaining() < 8 {
                    return Err(truncated(self));
                }
                WireValue::Fixed64(self.rest.get_u64_le())
            }
            WireType::ThirtyTwoBit => {
                if self.rest.remaining() < 4 {
                    return Err(truncated(self));
                }
                WireValue::Fixed32(self.rest.get_u32_le())
            }
            WireType::LengthDelimited => {
                let len = decode_varint(&mut self.rest)
                    .map_err(|_| self.err(path.to_string(), start, varint_failure(before)))?;
                let rest = self.rest;
                let len = usize::try_from(len)
                    .ok()
                    .filter(|&n| n <= rest.len())
                    .ok_or_else(|| truncated(self))?;
                let (value, tail) = rest.split_at(len);
                self.rest = tail;
                WireValue::Len(value)
            }
            WireType::StartGroup | WireType::EndGroup => {
                return Err(self.err(path.to_string(), start, MalformedKind::WireType(wire as u8)));
            }
        })
    }

    /// Next field known to the layout, or `None` at the end of the message.
    pub fn next_field(&mut self) -> Result<Option<Field<'a>>> {
        loop {
            if !self.rest.has_remaining() {
                return Ok(None);
            }
            let start = self.pos();
            let (tag, wire) = match decode_key(&mut self.rest) {
                Ok(key) => key,
                Err(_) => return Err(self.key_error(start)),
            };

            let Some(index) = self.layout.iter().position(|spec| spec.tag == tag) else {
                let before = self.rest;
                if skip_field(wire, tag, &mut self.rest, DecodeContext::default()).is_err() {
                    let path = self.child_path(&format!("#{tag}"));
                    return Err(self.err(path, start, skip_failure(wire, before)));
                }
                self.ignored += self.pos() - start;
                continue;
            };

            let layout = self.layout;
            let spec = &layout[index];
            let path = self.child_path(spec.name);
            if wire != spec.wire {
                return Err(self.err(path, start, MalformedKind::WireType(wire as u8)));
            }
            let value = self.read_value(wire, &path, start)?;
            let value_offset = match value {
                WireValue::Len(b) => self.base + self.pos() - b.len(),
                _ => self.base + start,
            };
            self.seen[index] = true;
            return Ok(Some(Field {
                spec,
                value,
                path,
                offset: self.base + start,
                value_offset,
            }));
        }
    }

    /// Check required fields and return the count of skipped bytes.
    pub fn finish(self) -> Result<usize> {
        for (spec, seen) in self.layout.iter().zip(&self.seen) {
            if spec.required && !seen {
                return Err(Error::malformed(
                    self.child_path(spec.name),
                    self.base,
                    MalformedKind::Missing,
                ));
            }
        }
        Ok(self.ignored)
    }
}

/// prost reports a bad varint without saying why; tell running out of
/// bytes apart from an overlong encoding.
fn varint_failure(bytes: &[u8]) -> MalformedKind {
    if bytes.len() < 10 && bytes.iter().all(|b| b & 0x80 != 0) {
        MalformedKind::Truncated
    } else {
        MalformedKind::InvalidVarint
    }
}

fn skip_failure(wire: WireType, value: &[u8]) -> MalformedKind {
    match wire {
        WireType::Varint => varint_failure(value),
        WireType::LengthDelimited => {
            let mut peek = value;
            match decode_varint(&mut peek) {
                Err(_) => varint_failure(value),
                Ok(_) => MalformedKind::Truncated,
            }
        }
        WireType::SixtyFourBit | WireType::ThirtyTwoBit => MalformedKind::Truncated,
        WireType::StartGroup | WireType::EndGroup => {
            MalformedKind::InvalidValue("unbalanced group".into())
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder helpers. The decoder never needs them; tests and tooling build
// fixtures with them.
// ---------------------------------------------------------------------------

pub fn put_varint(buf: &mut Vec<u8>, value: u64) {
    encode_varint(value, buf);
}

pub fn put_key(buf: &mut Vec<u8>, tag: u32, wire: WireType) {
    encode_key(tag, wire, buf);
}

pub fn put_varint_field(buf: &mut Vec<u8>, tag: u32, value: u64) {
    put_key(buf, tag, WireType::Varint);
    put_varint(buf, value);
}

pub fn put_len_field(buf: &mut Vec<u8>, tag: u32, bytes: &[u8]) {
    put_key(buf, tag, WireType::LengthDelimited);
    put_varint(buf, bytes.len() as u64);
    buf.put_slice(bytes);
}

pub fn put_fixed32_field(buf: &mut Vec<u8>, tag: u32, bits: u32) {
    put_key(buf, tag, WireType::ThirtyTwoBit);
    buf.put_u32_le(bits);
}
