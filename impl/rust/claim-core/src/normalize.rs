//! Revision-independent claim shape.
//!
//! Field sets per `(claim_type, version)`:
//!
//! | type        | version        | fields |
//! |-------------|----------------|--------|
//! | stream      | 0.0.x, 0.1.0   | title description author language license license_url nsfw thumbnail preview content_type sd_hash fee |
//! | certificate | 0.0.1          | key_type public_key |
//! | unknown     | 0.0.1          | (none) |
//! | stream      | 2              | common + author license license_url release_time content_type sd_hash file_name file_size nsfw fee |
//! | certificate | 2              | common + public_key email website_url cover |
//! | unknown     | 2              | common |
//!
//! where `common` is `title description thumbnail tags languages`.
//! Optional fields missing from a payload take the defaults below; they
//! are never emitted as `null`. `certificate_id` is the one field whose
//! presence depends on the payload.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::current::{self, ClaimKind, CurrentClaim};
use crate::legacy::{LegacyClaim, LegacyFee};
use crate::protobuf::{self, ProtobufClaim};
use crate::{language, DecodedClaim, Error, Result, SchemaRevision};

pub const DEFAULT_LANGUAGE: &str = "en";
pub const CURRENT_VERSION: &str = "2";
const PROTOBUF_VERSION: &str = "0.0.1";
const MATURE_TAG: &str = "mature";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Stream,
    Certificate,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedClaim {
    pub claim_type: ClaimType,
    pub version: String,
    pub fields: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
}

impl NormalizedClaim {
    fn new(claim_type: ClaimType, version: &str) -> Self {
        Self {
            claim_type,
            version: version.to_string(),
            fields: BTreeMap::new(),
            certificate_id: None,
        }
    }

    fn put(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Map a decoded claim onto the stable shape. Fails only when `revision`
/// does not match the decoder that produced `decoded`.
pub fn normalize(decoded: &DecodedClaim, revision: SchemaRevision) -> Result<NormalizedClaim> {
    if decoded.revision() != revision {
        return Err(Error::RevisionMismatch {
            expected: revision,
            found: decoded.revision(),
        });
    }
    Ok(match decoded {
        DecodedClaim::Legacy(c) => from_legacy(c),
        DecodedClaim::Protobuf(c) => from_protobuf(c),
        DecodedClaim::Current(c) => from_current(c),
    })
}

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

fn free_fee() -> Value {
    fee_value("LBC", "", 0.0)
}

fn fee_value(currency: &str, address: &str, amount: f64) -> Value {
    json!({ "currency": currency, "address": address, "amount": amount })
}

fn currency_name(code: u64) -> &'static str {
    match code {
        1 => "LBC",
        2 => "BTC",
        3 => "USD",
        _ => "unknown",
    }
}

/// Current-revision amounts are integers in the currency's smallest unit.
fn current_amount(fee: &current::Fee) -> f64 {
    let scale = if fee.currency == 3 { 100.0 } else { 100_000_000.0 };
    fee.amount as f64 / scale
}

fn key_type_name(code: u64) -> &'static str {
    match code {
        1 => "NIST256p",
        2 => "NIST384p",
        3 => "SECP256k1",
        _ => "unknown",
    }
}

// ---------------------------------------------------------------------------
// Per revision
// ---------------------------------------------------------------------------

fn from_legacy(c: &LegacyClaim) -> NormalizedClaim {
    let fee = c
        .fee
        .as_ref()
        .map(|LegacyFee { currency, address, amount }| fee_value(currency, address, *amount))
        .unwrap_or_else(free_fee);
    let mut n = NormalizedClaim::new(ClaimType::Stream, c.version.as_str());
    n.put("title", c.title.as_str())
        .put("description", c.description.clone().unwrap_or_default())
        .put("author", c.author.clone().unwrap_or_default())
        .put(
            "language",
            c.language.clone().unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        )
        .put("license", c.license.clone().unwrap_or_default())
        .put("license_url", c.license_url.clone().unwrap_or_default())
        .put("nsfw", c.nsfw.unwrap_or(false))
        .put("thumbnail", c.thumbnail.clone().unwrap_or_default())
        .put("preview", c.preview.clone().unwrap_or_default())
        .put("content_type", c.content_type.as_str())
        .put("sd_hash", c.sd_hash.as_str())
        .put("fee", fee);
    n
}

fn from_protobuf(c: &ProtobufClaim) -> NormalizedClaim {
    let claim_type = match c.claim_type {
        protobuf::CLAIM_TYPE_STREAM => ClaimType::Stream,
        protobuf::CLAIM_TYPE_CERTIFICATE => ClaimType::Certificate,
        _ => ClaimType::Unknown,
    };
    // Streams report the metadata version; the envelope is always 0.0.1.
    let version = c
        .stream
        .as_ref()
        .and_then(|s| protobuf::metadata_version_name(s.metadata.version))
        .unwrap_or(PROTOBUF_VERSION);
    let mut n = NormalizedClaim::new(claim_type, version);
    match (claim_type, &c.stream, &c.certificate) {
        (ClaimType::Stream, Some(stream), _) => {
            let m = &stream.metadata;
            let fee = m
                .fee
                .as_ref()
                .map(|f| {
                    fee_value(
                        currency_name(f.currency),
                        &hex::encode(&f.address),
                        f64::from(f.amount),
                    )
                })
                .unwrap_or_else(free_fee);
            n.put("title", m.title.as_str())
                .put("description", m.description.as_str())
                .put("author", m.author.as_str())
                .put("language", language::code(m.language))
                .put("license", m.license.as_str())
                .put("license_url", m.license_url.clone().unwrap_or_default())
                .put("nsfw", m.nsfw)
                .put("thumbnail", m.thumbnail.clone().unwrap_or_default())
                .put("preview", m.preview.clone().unwrap_or_default())
                .put("content_type", stream.source.content_type.as_str())
                .put("sd_hash", hex::encode(&stream.source.source))
                .put("fee", fee);
        }
        (ClaimType::Certificate, _, Some(cert)) => {
            n.put("key_type", key_type_name(cert.key_type)).put(
                "public_key",
                cert.public_key.as_deref().map(hex::encode).unwrap_or_default(),
            );
        }
        _ => {}
    }
    n.certificate_id = c
        .signature
        .as_ref()
        .map(|sig| hex::encode(&sig.certificate_id));
    n
}

fn from_current(c: &CurrentClaim) -> NormalizedClaim {
    let claim_type = match c.kind {
        ClaimKind::Stream(_) => ClaimType::Stream,
        ClaimKind::Channel(_) => ClaimType::Certificate,
        ClaimKind::Collection | ClaimKind::Repost | ClaimKind::Untyped => ClaimType::Unknown,
    };
    let mut n = NormalizedClaim::new(claim_type, CURRENT_VERSION);
    let languages: Vec<&str> = c.languages.iter().map(|&l| language::code(l)).collect();
    n.put("title", c.title.as_str())
        .put("description", c.description.as_str())
        .put("thumbnail", source_url(c.thumbnail.as_ref()))
        .put("tags", c.tags.clone())
        .put("languages", languages);

    match &c.kind {
        ClaimKind::Stream(s) => {
            let fee = s
                .fee
                .as_ref()
                .map(|f| {
                    fee_value(
                        currency_name(f.currency),
                        &hex::encode(&f.address),
                        current_amount(f),
                    )
                })
                .unwrap_or_else(free_fee);
            n.put("author", s.author.as_str())
                .put("license", s.license.as_str())
                .put("license_url", s.license_url.as_str())
                .put("release_time", s.release_time)
                .put("content_type", s.source.media_type.as_str())
                .put("sd_hash", hex::encode(&s.source.sd_hash))
                .put("file_name", s.source.name.as_str())
                .put("file_size", s.source.size)
                .put("nsfw", c.tags.iter().any(|t| t == MATURE_TAG))
                .put("fee", fee);
        }
        ClaimKind::Channel(ch) => {
            n.put("public_key", hex::encode(&ch.public_key))
                .put("email", ch.email.as_str())
                .put("website_url", ch.website_url.as_str())
                .put("cover", source_url(ch.cover.as_ref()));
        }
        ClaimKind::Collection | ClaimKind::Repost | ClaimKind::Untyped => {}
    }
    n.certificate_id = c.signing.as_ref().map(|s| s.channel_claim_id());
    n
}

fn source_url(source: Option<&current::Source>) -> String {
    source.map(|s| s.url.clone()).unwrap_or_default()
}
