use serde::Serialize;
use std::fmt;

/// Marker bytes. They are pairwise distinct, so at most one revision matches.
pub const MARKER_JSON: u8 = b'{';
/// Protobuf key for field 1 (`Claim.version`), wire type varint.
pub const MARKER_PROTOBUF: u8 = 0x08;
pub const MARKER_UNSIGNED: u8 = 0x00;
pub const MARKER_SIGNED: u8 = 0x01;

/// Shortest input the sniffer can classify.
pub const MIN_PREFIX_LEN: usize = 1;

/// Binary format generation of a claim payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaRevision {
    /// Flat JSON, unsigned.
    LegacyJson,
    /// v1 protobuf claim dict with optional publisher signature.
    Protobuf,
    /// Marker-prefixed v2 protobuf with optional channel linkage.
    Current,
}

impl SchemaRevision {
    pub fn as_str(self) -> &'static str {
        match self {
            SchemaRevision::LegacyJson => "legacy_json",
            SchemaRevision::Protobuf => "protobuf",
            SchemaRevision::Current => "current",
        }
    }
}

impl fmt::Display for SchemaRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the body is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    Json,
    Bare,
    /// Channel hash and signature precede the body.
    Signed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Format {
    pub revision: SchemaRevision,
    pub container: Container,
}

/// Classify a payload by its leading marker. `None` means unrecognized.
///
/// Reads only the prefix; decoding (and any length checks past the marker)
/// belongs to the matched decoder.
pub fn sniff(bytes: &[u8]) -> Option<Format> {
    if bytes.len() < MIN_PREFIX_LEN {
        return None;
    }
    let (revision, container) = match bytes[0] {
        MARKER_JSON => (SchemaRevision::LegacyJson, Container::Json),
        MARKER_PROTOBUF => (SchemaRevision::Protobuf, Container::Bare),
        MARKER_UNSIGNED => (SchemaRevision::Current, Container::Bare),
        MARKER_SIGNED => (SchemaRevision::Current, Container::Signed),
        _ => return None,
    };
    Some(Format {
        revision,
        container,
    })
}
