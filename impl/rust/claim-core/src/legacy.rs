//! Flat JSON claims (`ver` 0.0.1 .. 0.0.3).
//!
//! Parsed JSON carries no positions, so field-level errors point at the
//! start of the object (offset 0). Syntax errors get the exact offset.

use serde_json::{Map, Value};

use crate::{Diagnostics, Error, MalformedKind, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyVersion {
    V0_0_1,
    V0_0_2,
    V0_0_3,
}

impl LegacyVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            LegacyVersion::V0_0_1 => "0.0.1",
            LegacyVersion::V0_0_2 => "0.0.2",
            LegacyVersion::V0_0_3 => "0.0.3",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "0.0.1" => Some(LegacyVersion::V0_0_1),
            "0.0.2" => Some(LegacyVersion::V0_0_2),
            "0.0.3" => Some(LegacyVersion::V0_0_3),
            _ => None,
        }
    }

    /// Key holding the MIME type; renamed after 0.0.1.
    fn content_type_keys(self) -> [&'static str; 2] {
        match self {
            LegacyVersion::V0_0_1 => ["content-type", "content_type"],
            _ => ["content_type", "content-type"],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyFee {
    pub currency: String,
    pub address: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegacyClaim {
    pub version: LegacyVersion,
    pub title: String,
    pub content_type: String,
    pub sd_hash: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub license: Option<String>,
    pub license_url: Option<String>,
    pub thumbnail: Option<String>,
    pub preview: Option<String>,
    pub nsfw: Option<bool>,
    pub fee: Option<LegacyFee>,
}

pub fn decode(bytes: &[u8]) -> Result<(LegacyClaim, Diagnostics)> {
    let mut stream = serde_json::Deserializer::from_slice(bytes).into_iter::<Value>();
    let value = match stream.next() {
        Some(Ok(v)) => v,
        Some(Err(e)) => return Err(syntax_error(bytes, &e)),
        None => return Err(Error::malformed("json", 0, MalformedKind::Truncated)),
    };
    let consumed = stream.byte_offset();
    let ignored_bytes = bytes[consumed..].trim_ascii().len();

    let Value::Object(obj) = value else {
        return Err(invalid("json", "expected an object"));
    };

    let version = match opt_str(&obj, "ver")? {
        None => LegacyVersion::V0_0_1,
        Some(v) => LegacyVersion::parse(&v)
            .ok_or_else(|| invalid("ver", &format!("unknown version {v:?}")))?,
    };

    let [primary, fallback] = version.content_type_keys();
    let content_type = match opt_str(&obj, primary)? {
        Some(ct) => ct,
        None => opt_str(&obj, fallback)?.ok_or_else(|| missing(primary))?,
    };

    let sources = match obj.get("sources") {
        Some(Value::Object(m)) => m,
        Some(Value::Null) | None => return Err(missing("sources")),
        Some(_) => return Err(invalid("sources", "expected an object")),
    };
    let sd_hash = req_str(sources, "lbry_sd_hash", "sources.lbry_sd_hash")?;

    let claim = LegacyClaim {
        version,
        title: req_str(&obj, "title", "title")?,
        content_type,
        sd_hash,
        description: opt_str(&obj, "description")?,
        author: opt_str(&obj, "author")?,
        language: opt_str(&obj, "language")?,
        license: opt_str(&obj, "license")?,
        license_url: opt_str(&obj, "license_url")?,
        thumbnail: opt_str(&obj, "thumbnail")?,
        preview: opt_str(&obj, "preview")?,
        nsfw: opt_bool(&obj, "nsfw")?,
        fee: fee(&obj)?,
    };
    Ok((claim, Diagnostics { ignored_bytes }))
}

fn fee(obj: &Map<String, Value>) -> Result<Option<LegacyFee>> {
    let fee = match obj.get("fee") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(m)) => m,
        Some(_) => return Err(invalid("fee", "expected an object")),
    };

    // Flat shape: {"currency", "address", "amount"}
    if fee.contains_key("currency") {
        return Ok(Some(LegacyFee {
            currency: req_str(fee, "currency", "fee.currency")?,
            address: req_str(fee, "address", "fee.address")?,
            amount: req_amount(fee, "fee.amount")?,
        }));
    }

    // Keyed shape: {"LBC": {"address", "amount"}}
    let mut entries = fee.iter();
    let (currency, body) = match (entries.next(), entries.next()) {
        (Some(entry), None) => entry,
        (None, _) => return Err(missing("fee.currency")),
        (Some(_), Some(_)) => return Err(invalid("fee", "more than one currency")),
    };
    let Value::Object(body) = body else {
        return Err(invalid(&format!("fee.{currency}"), "expected an object"));
    };
    Ok(Some(LegacyFee {
        currency: currency.clone(),
        address: req_str(body, "address", &format!("fee.{currency}.address"))?,
        amount: req_amount(body, &format!("fee.{currency}.amount"))?,
    }))
}

fn missing(path: &str) -> Error {
    Error::malformed(path, 0, MalformedKind::Missing)
}

fn invalid(path: &str, what: &str) -> Error {
    Error::malformed(path, 0, MalformedKind::InvalidValue(what.to_string()))
}

fn opt_str(obj: &Map<String, Value>, key: &str) -> Result<Option<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(key, "expected a string")),
    }
}

fn req_str(obj: &Map<String, Value>, key: &str, path: &str) -> Result<String> {
    match obj.get(key) {
        None | Some(Value::Null) => Err(missing(path)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(invalid(path, "expected a string")),
    }
}

fn opt_bool(obj: &Map<String, Value>, key: &str) -> Result<Option<bool>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(invalid(key, "expected a bool")),
    }
}

fn req_amount(obj: &Map<String, Value>, path: &str) -> Result<f64> {
    match obj.get("amount") {
        None | Some(Value::Null) => Err(missing(path)),
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| invalid(path, "amount out of range")),
        Some(_) => Err(invalid(path, "expected a number")),
    }
}

/// Map serde_json's 1-based line/column back to a byte offset.
fn syntax_error(bytes: &[u8], e: &serde_json::Error) -> Error {
    let kind = if e.is_eof() {
        MalformedKind::Truncated
    } else {
        MalformedKind::Json(e.to_string())
    };
    let line_start = bytes
        .iter()
        .enumerate()
        .filter(|(_, b)| **b == b'\n')
        .nth(e.line().saturating_sub(2))
        .map(|(i, _)| i + 1)
        .filter(|_| e.line() > 1)
        .unwrap_or(0);
    let offset = (line_start + e.column().saturating_sub(1)).min(bytes.len());
    Error::malformed("json", offset, kind)
}
