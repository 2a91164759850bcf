//! v1 protobuf claim dict (proto2, required fields enforced).

use crate::wire::{FieldSpec, MessageReader, WireType::*};
use crate::{Diagnostics, Error, MalformedKind, Result};

/// `Version._0_0_1`, the only version the v1 envelope messages shipped.
pub const VERSION_0_0_1: u64 = 1;

/// `Metadata.Version`: the metadata message moved on independently of the
/// envelope. lbry-app wrote `_0_1_0`.
static METADATA_VERSIONS: &[(u64, &str)] = &[
    (1, "0.0.1"),
    (2, "0.0.2"),
    (3, "0.0.3"),
    (4, "0.1.0"),
];

/// Dotted name of a `Metadata.Version` value.
pub fn metadata_version_name(version: u64) -> Option<&'static str> {
    METADATA_VERSIONS
        .iter()
        .find(|(v, _)| *v == version)
        .map(|(_, name)| *name)
}

pub const CLAIM_TYPE_STREAM: u64 = 1;
pub const CLAIM_TYPE_CERTIFICATE: u64 = 2;

static CLAIM: &[FieldSpec] = &[
    FieldSpec::required(1, "version", Varint),
    FieldSpec::required(2, "claimType", Varint),
    FieldSpec::optional(3, "stream", LengthDelimited),
    FieldSpec::optional(4, "certificate", LengthDelimited),
    FieldSpec::optional(5, "publisherSignature", LengthDelimited),
];

static STREAM: &[FieldSpec] = &[
    FieldSpec::required(1, "version", Varint),
    FieldSpec::required(2, "metadata", LengthDelimited),
    FieldSpec::required(3, "source", LengthDelimited),
];

static METADATA: &[FieldSpec] = &[
    FieldSpec::required(1, "version", Varint),
    FieldSpec::required(2, "language", Varint),
    FieldSpec::required(3, "title", LengthDelimited),
    FieldSpec::required(4, "description", LengthDelimited),
    FieldSpec::required(5, "author", LengthDelimited),
    FieldSpec::required(6, "license", LengthDelimited),
    FieldSpec::required(7, "nsfw", Varint),
    FieldSpec::optional(8, "fee", LengthDelimited),
    FieldSpec::optional(9, "thumbnail", LengthDelimited),
    FieldSpec::optional(10, "preview", LengthDelimited),
    FieldSpec::optional(11, "licenseUrl", LengthDelimited),
];

static FEE: &[FieldSpec] = &[
    FieldSpec::required(1, "version", Varint),
    FieldSpec::required(2, "currency", Varint),
    FieldSpec::required(3, "address", LengthDelimited),
    FieldSpec::required(4, "amount", ThirtyTwoBit),
];

static SOURCE: &[FieldSpec] = &[
    FieldSpec::required(1, "version", Varint),
    FieldSpec::required(2, "sourceType", Varint),
    FieldSpec::required(3, "source", LengthDelimited),
    FieldSpec::required(4, "contentType", LengthDelimited),
];

static CERTIFICATE: &[FieldSpec] = &[
    FieldSpec::required(1, "version", Varint),
    FieldSpec::required(2, "keyType", Varint),
    FieldSpec::optional(4, "publicKey", LengthDelimited),
];

static SIGNATURE: &[FieldSpec] = &[
    FieldSpec::required(1, "version", Varint),
    FieldSpec::required(2, "signatureType", Varint),
    FieldSpec::required(3, "signature", LengthDelimited),
    FieldSpec::required(4, "certificateId", LengthDelimited),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ProtobufClaim {
    pub version: u64,
    pub claim_type: u64,
    pub stream: Option<Stream>,
    pub certificate: Option<Certificate>,
    pub signature: Option<Signature>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub metadata: Metadata,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub version: u64,
    pub language: u64,
    pub title: String,
    pub description: String,
    pub author: String,
    pub license: String,
    pub nsfw: bool,
    pub fee: Option<Fee>,
    pub thumbnail: Option<String>,
    pub preview: Option<String>,
    pub license_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fee {
    pub currency: u64,
    pub address: Vec<u8>,
    pub amount: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub source_type: u64,
    pub source: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Certificate {
    pub key_type: u64,
    pub public_key: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub signature_type: u64,
    pub signature: Vec<u8>,
    pub certificate_id: Vec<u8>,
}

pub fn decode(bytes: &[u8]) -> Result<(ProtobufClaim, Diagnostics)> {
    let mut ignored = 0;
    let mut r = MessageReader::new(bytes, 0, String::new(), CLAIM);
    let mut version = 0;
    let mut claim_type = 0;
    let mut stream = None;
    let mut certificate = None;
    let mut signature = None;

    while let Some(f) = r.next_field()? {
        match f.spec.tag {
            1 => version = check_version(f.as_u64()?, &f.path, f.offset)?,
            2 => claim_type = f.as_u64()?,
            3 => stream = Some(decode_stream(f.message(STREAM)?, &mut ignored)?),
            4 => certificate = Some(decode_certificate(f.message(CERTIFICATE)?, &mut ignored)?),
            5 => signature = Some(decode_signature(f.message(SIGNATURE)?, &mut ignored)?),
            _ => {}
        }
    }
    ignored += r.finish()?;

    match claim_type {
        CLAIM_TYPE_STREAM if stream.is_none() => {
            return Err(Error::malformed("stream", 0, MalformedKind::Missing));
        }
        CLAIM_TYPE_CERTIFICATE if certificate.is_none() => {
            return Err(Error::malformed("certificate", 0, MalformedKind::Missing));
        }
        _ => {}
    }

    let claim = ProtobufClaim {
        version,
        claim_type,
        stream,
        certificate,
        signature,
    };
    Ok((
        claim,
        Diagnostics {
            ignored_bytes: ignored,
        },
    ))
}

fn check_version(v: u64, path: &str, offset: usize) -> Result<u64> {
    if v == VERSION_0_0_1 {
        Ok(v)
    } else {
        Err(unknown_version(v, path, offset))
    }
}

fn unknown_version(v: u64, path: &str, offset: usize) -> Error {
    Error::malformed(
        path,
        offset,
        MalformedKind::InvalidValue(format!("unknown version {v}")),
    )
}

// Required fields are verified by `finish()` before the structs are built,
// so the `unwrap_or_default` calls below never fill a required slot.

fn decode_stream(mut r: MessageReader<'_>, ignored: &mut usize) -> Result<Stream> {
    let mut metadata = None;
    let mut source = None;
    while let Some(f) = r.next_field()? {
        match f.spec.tag {
            1 => {
                check_version(f.as_u64()?, &f.path, f.offset)?;
            }
            2 => metadata = Some(decode_metadata(f.message(METADATA)?, ignored)?),
            3 => source = Some(decode_source(f.message(SOURCE)?, ignored)?),
            _ => {}
        }
    }
    *ignored += r.finish()?;
    match (metadata, source) {
        (Some(metadata), Some(source)) => Ok(Stream { metadata, source }),
        _ => Err(Error::malformed("stream", 0, MalformedKind::Missing)),
    }
}

fn decode_metadata(mut r: MessageReader<'_>, ignored: &mut usize) -> Result<Metadata> {
    let mut version = VERSION_0_0_1;
    let mut language = 0;
    let mut title = None;
    let mut description = None;
    let mut author = None;
    let mut license = None;
    let mut nsfw = false;
    let mut fee = None;
    let mut thumbnail = None;
    let mut preview = None;
    let mut license_url = None;
    while let Some(f) = r.next_field()? {
        match f.spec.tag {
            1 => {
                let v = f.as_u64()?;
                if metadata_version_name(v).is_none() {
                    return Err(unknown_version(v, &f.path, f.offset));
                }
                version = v;
            }
            2 => language = f.as_u64()?,
            3 => title = Some(f.as_string()?),
            4 => description = Some(f.as_string()?),
            5 => author = Some(f.as_string()?),
            6 => license = Some(f.as_string()?),
            7 => nsfw = f.as_bool()?,
            8 => fee = Some(decode_fee(f.message(FEE)?, ignored)?),
            9 => thumbnail = Some(f.as_string()?),
            10 => preview = Some(f.as_string()?),
            11 => license_url = Some(f.as_string()?),
            _ => {}
        }
    }
    *ignored += r.finish()?;
    Ok(Metadata {
        version,
        language,
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        author: author.unwrap_or_default(),
        license: license.unwrap_or_default(),
        nsfw,
        fee,
        thumbnail,
        preview,
        license_url,
    })
}

fn decode_fee(mut r: MessageReader<'_>, ignored: &mut usize) -> Result<Fee> {
    let mut currency = 0;
    let mut address = Vec::new();
    let mut amount = 0.0f32;
    while let Some(f) = r.next_field()? {
        match f.spec.tag {
            1 => {
                check_version(f.as_u64()?, &f.path, f.offset)?;
            }
            2 => currency = f.as_u64()?,
            3 => address = f.as_bytes()?.to_vec(),
            4 => {
                amount = f.as_f32()?;
                if !amount.is_finite() {
                    return Err(Error::malformed(
                        f.path.clone(),
                        f.offset,
                        MalformedKind::InvalidValue(format!("fee amount {amount} is not finite")),
                    ));
                }
            }
            _ => {}
        }
    }
    *ignored += r.finish()?;
    Ok(Fee {
        currency,
        address,
        amount,
    })
}

fn decode_source(mut r: MessageReader<'_>, ignored: &mut usize) -> Result<Source> {
    let mut source_type = 0;
    let mut source = Vec::new();
    let mut content_type = String::new();
    while let Some(f) = r.next_field()? {
        match f.spec.tag {
            1 => {
                check_version(f.as_u64()?, &f.path, f.offset)?;
            }
            2 => source_type = f.as_u64()?,
            3 => source = f.as_bytes()?.to_vec(),
            4 => content_type = f.as_string()?,
            _ => {}
        }
    }
    *ignored += r.finish()?;
    Ok(Source {
        source_type,
        source,
        content_type,
    })
}

fn decode_certificate(mut r: MessageReader<'_>, ignored: &mut usize) -> Result<Certificate> {
    let mut key_type = 0;
    let mut public_key = None;
    while let Some(f) = r.next_field()? {
        match f.spec.tag {
            1 => {
                check_version(f.as_u64()?, &f.path, f.offset)?;
            }
            2 => key_type = f.as_u64()?,
            4 => public_key = Some(f.as_bytes()?.to_vec()),
            _ => {}
        }
    }
    *ignored += r.finish()?;
    Ok(Certificate {
        key_type,
        public_key,
    })
}

fn decode_signature(mut r: MessageReader<'_>, ignored: &mut usize) -> Result<Signature> {
    let mut signature_type = 0;
    let mut signature = Vec::new();
    let mut certificate_id = Vec::new();
    while let Some(f) = r.next_field()? {
        match f.spec.tag {
            1 => {
                check_version(f.as_u64()?, &f.path, f.offset)?;
            }
            2 => signature_type = f.as_u64()?,
            3 => signature = f.as_bytes()?.to_vec(),
            4 => certificate_id = f.as_bytes()?.to_vec(),
            _ => {}
        }
    }
    *ignored += r.finish()?;
    Ok(Signature {
        signature_type,
        signature,
        certificate_id,
    })
}
