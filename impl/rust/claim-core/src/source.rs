use crate::{Error, Result};

// ---------------------------------------------------------------------------
// ByteSource: raw claim payload
//
// The daemon hands the payload back as a string in which every character
// stands for one byte (code points 0..=255). The string must be reduced to
// bytes one character at a time, NOT UTF-8 encoded. A character above 0xFF
// cannot stand for a byte and is rejected outright.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ByteSource {
    bytes: Vec<u8>,
}

impl ByteSource {
    /// Build from one code point per byte.
    pub fn from_code_points<I>(code_points: I) -> Result<Self>
    where
        I: IntoIterator<Item = u32>,
    {
        let iter = code_points.into_iter();
        let mut bytes = Vec::with_capacity(iter.size_hint().0);
        for (index, code_point) in iter.enumerate() {
            let byte = u8::try_from(code_point).map_err(|_| Error::Encoding { index, code_point })?;
            bytes.push(byte);
        }
        Ok(Self { bytes })
    }

    /// Build from a string whose characters each carry one byte.
    pub fn from_chars(s: &str) -> Result<Self> {
        Self::from_code_points(s.chars().map(u32::from))
    }

    /// Wrap bytes that are already binary.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Inverse of [`ByteSource::from_chars`].
    pub fn to_chars(&self) -> String {
        self.bytes.iter().map(|&b| char::from(b)).collect()
    }
}
