//! `claim-core`: decoder for LBRY claim payloads.
//!
//! A claim payload is an opaque blob attached to a name on chain. Over the
//! years it has been written in three layouts:
//!
//! - flat JSON (`0.0.1` .. `0.0.3`), unsigned
//! - the v1 protobuf "claim dict", optionally carrying a publisher signature
//! - the current container: a marker byte, an optional channel signature,
//!   then the v2 protobuf body
//!
//! The pipeline is `ByteSource → sniff → per-revision decoder → normalize`.
//! Every stage is pure; nothing is cached between calls.

use std::fmt;

pub mod current;
pub mod language;
pub mod legacy;
pub mod normalize;
pub mod protobuf;
pub mod sniff;
pub mod source;
pub mod wire;

pub use normalize::{normalize, ClaimType, NormalizedClaim};
pub use sniff::{sniff, Container, Format, SchemaRevision};
pub use source::ByteSource;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// What went wrong while reading a single field.
///
/// Protobuf errors carry the absolute offset where the field starts. JSON
/// syntax errors carry the offset of the bad byte; field-level JSON errors
/// (`Missing`, `InvalidValue`) report offset 0, as the parsed tree keeps no
/// positions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedKind {
    #[error("ran out of bytes")]
    Truncated,
    #[error("required field missing")]
    Missing,
    #[error("invalid varint")]
    InvalidVarint,
    #[error("invalid UTF-8")]
    InvalidUtf8,
    #[error("unexpected wire type {0}")]
    WireType(u8),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("invalid JSON: {0}")]
    Json(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A character could not stand for a single raw byte.
    #[error("EncodingError(code point {code_point:#x} at index {index})")]
    Encoding { index: usize, code_point: u32 },
    /// The payload is not valid for the revision it was sniffed as.
    ///
    /// `offset` is absolute within the payload, except for field-level
    /// errors in legacy JSON claims, which report 0.
    #[error("MalformedClaim({field} at byte {offset}: {kind})")]
    Malformed {
        field: String,
        offset: usize,
        kind: MalformedKind,
    },
    #[error("UnrecognizedFormat(marker {marker:?})")]
    UnrecognizedFormat { marker: Option<u8> },
    /// A decoded claim was handed to the normalizer under the wrong revision.
    #[error("RevisionMismatch(expected {expected}, got {found})")]
    RevisionMismatch {
        expected: SchemaRevision,
        found: SchemaRevision,
    },
}

impl Error {
    pub fn malformed(field: impl Into<String>, offset: usize, kind: MalformedKind) -> Self {
        Error::Malformed {
            field: field.into(),
            offset,
            kind,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Decoded claims
// ---------------------------------------------------------------------------

/// Revision-specific decoder output. One variant per [`SchemaRevision`].
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedClaim {
    Legacy(legacy::LegacyClaim),
    Protobuf(protobuf::ProtobufClaim),
    Current(current::CurrentClaim),
}

impl DecodedClaim {
    pub fn revision(&self) -> SchemaRevision {
        match self {
            DecodedClaim::Legacy(_) => SchemaRevision::LegacyJson,
            DecodedClaim::Protobuf(_) => SchemaRevision::Protobuf,
            DecodedClaim::Current(_) => SchemaRevision::Current,
        }
    }
}

/// Side information collected while decoding. Never part of the claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Bytes skipped as unknown fields or trailing data.
    pub ignored_bytes: usize,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.ignored_bytes == 0
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ignored_bytes={}", self.ignored_bytes)
    }
}

/// Run the decoder matching `format` over `bytes`.
pub fn decode_as(bytes: &[u8], format: Format) -> Result<(DecodedClaim, Diagnostics)> {
    match format.revision {
        SchemaRevision::LegacyJson => {
            let (claim, diag) = legacy::decode(bytes)?;
            Ok((DecodedClaim::Legacy(claim), diag))
        }
        SchemaRevision::Protobuf => {
            let (claim, diag) = protobuf::decode(bytes)?;
            Ok((DecodedClaim::Protobuf(claim), diag))
        }
        SchemaRevision::Current => {
            let (claim, diag) = current::decode(bytes, format.container)?;
            Ok((DecodedClaim::Current(claim), diag))
        }
    }
}

/// Full pipeline output.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub format: Format,
    pub claim: NormalizedClaim,
    pub diagnostics: Diagnostics,
}

/// Sniff, decode and normalize a payload.
pub fn decode(bytes: &[u8]) -> Result<Decoded> {
    let format = sniff(bytes).ok_or(Error::UnrecognizedFormat {
        marker: bytes.first().copied(),
    })?;
    let (decoded, diagnostics) = decode_as(bytes, format)?;
    let claim = normalize(&decoded, format.revision)?;
    Ok(Decoded {
        format,
        claim,
        diagnostics,
    })
}

/// Same as [`decode`], starting from a payload delivered as characters.
pub fn decode_chars(payload: &str) -> Result<Decoded> {
    let source = ByteSource::from_chars(payload)?;
    decode(source.bytes())
}
