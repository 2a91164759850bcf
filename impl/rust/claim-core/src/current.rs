//! Current claims: marker byte, optional channel signature, v2 protobuf body.
//!
//! ```text
//! unsigned: 0x00 | body
//! signed:   0x01 | channel_hash[20] | signature[64] | body
//! ```
//!
//! The body is proto3, so scalars default to zero values. The only
//! structural requirement beyond the container is that a stream names
//! its source.

use crate::sniff::{Container, MARKER_SIGNED, MARKER_UNSIGNED};
use crate::wire::{Field, FieldSpec, MessageReader, WireType::*};
use crate::{Diagnostics, Error, MalformedKind, Result};

pub const CHANNEL_HASH_LEN: usize = 20;
pub const SIGNATURE_LEN: usize = 64;
const SIGNED_HEADER_LEN: usize = 1 + CHANNEL_HASH_LEN + SIGNATURE_LEN;

static CLAIM: &[FieldSpec] = &[
    FieldSpec::optional(1, "stream", LengthDelimited),
    FieldSpec::optional(2, "channel", LengthDelimited),
    FieldSpec::optional(3, "collection", LengthDelimited),
    FieldSpec::optional(4, "repost", LengthDelimited),
    FieldSpec::optional(8, "title", LengthDelimited),
    FieldSpec::optional(9, "description", LengthDelimited),
    FieldSpec::optional(10, "thumbnail", LengthDelimited),
    FieldSpec::optional(11, "tags", LengthDelimited),
    FieldSpec::optional(12, "languages", LengthDelimited),
];

static STREAM: &[FieldSpec] = &[
    FieldSpec::required(1, "source", LengthDelimited),
    FieldSpec::optional(2, "author", LengthDelimited),
    FieldSpec::optional(3, "license", LengthDelimited),
    FieldSpec::optional(4, "license_url", LengthDelimited),
    FieldSpec::optional(5, "release_time", Varint),
    FieldSpec::optional(6, "fee", LengthDelimited),
];

static CHANNEL: &[FieldSpec] = &[
    FieldSpec::optional(1, "public_key", LengthDelimited),
    FieldSpec::optional(2, "email", LengthDelimited),
    FieldSpec::optional(3, "website_url", LengthDelimited),
    FieldSpec::optional(4, "cover", LengthDelimited),
];

static SOURCE: &[FieldSpec] = &[
    FieldSpec::optional(1, "hash", LengthDelimited),
    FieldSpec::optional(2, "name", LengthDelimited),
    FieldSpec::optional(3, "size", Varint),
    FieldSpec::optional(4, "media_type", LengthDelimited),
    FieldSpec::optional(5, "url", LengthDelimited),
    FieldSpec::optional(6, "sd_hash", LengthDelimited),
];

static FEE: &[FieldSpec] = &[
    FieldSpec::optional(1, "currency", Varint),
    FieldSpec::optional(2, "address", LengthDelimited),
    FieldSpec::optional(3, "amount", Varint),
];

static LANGUAGE: &[FieldSpec] = &[FieldSpec::optional(1, "language", Varint)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSignature {
    /// As stored on the wire (little-endian claim hash).
    pub channel_hash: [u8; CHANNEL_HASH_LEN],
    pub signature: Vec<u8>,
}

impl ChannelSignature {
    /// Claim id of the signing channel, in the usual display byte order.
    pub fn channel_claim_id(&self) -> String {
        let mut id = self.channel_hash;
        id.reverse();
        hex::encode(id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Source {
    pub hash: Vec<u8>,
    pub name: String,
    pub size: u64,
    pub media_type: String,
    pub url: String,
    pub sd_hash: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fee {
    pub currency: u64,
    pub address: Vec<u8>,
    /// Hundred-millionths for LBC/BTC, cents for USD.
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub source: Source,
    pub author: String,
    pub license: String,
    pub license_url: String,
    pub release_time: i64,
    pub fee: Option<Fee>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    pub public_key: Vec<u8>,
    pub email: String,
    pub website_url: String,
    pub cover: Option<Source>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimKind {
    Stream(Stream),
    Channel(Channel),
    Collection,
    Repost,
    /// No type field at all.
    Untyped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentClaim {
    pub signing: Option<ChannelSignature>,
    pub kind: ClaimKind,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<Source>,
    pub tags: Vec<String>,
    pub languages: Vec<u64>,
}

pub fn decode(bytes: &[u8], container: Container) -> Result<(CurrentClaim, Diagnostics)> {
    let (signing, body_offset) = match container {
        Container::Bare => {
            expect_marker(bytes, MARKER_UNSIGNED)?;
            (None, 1)
        }
        Container::Signed => {
            expect_marker(bytes, MARKER_SIGNED)?;
            (Some(read_signature(bytes)?), SIGNED_HEADER_LEN)
        }
        Container::Json => {
            return Err(Error::malformed(
                "marker",
                0,
                MalformedKind::InvalidValue("JSON container in a binary claim".into()),
            ));
        }
    };

    let mut ignored = 0;
    let mut r = MessageReader::new(&bytes[body_offset..], body_offset, String::new(), CLAIM);
    let mut kind = ClaimKind::Untyped;
    let mut title = String::new();
    let mut description = String::new();
    let mut thumbnail = None;
    let mut tags = Vec::new();
    let mut languages = Vec::new();

    while let Some(f) = r.next_field()? {
        match f.spec.tag {
            // oneof: the last type field on the wire wins
            1 => kind = ClaimKind::Stream(decode_stream(&f, &mut ignored)?),
            2 => kind = ClaimKind::Channel(decode_channel(&f, &mut ignored)?),
            3 => kind = ClaimKind::Collection,
            4 => kind = ClaimKind::Repost,
            8 => title = f.as_string()?,
            9 => description = f.as_string()?,
            10 => thumbnail = Some(decode_source(&f, &mut ignored)?),
            11 => tags.push(f.as_string()?),
            12 => languages.push(decode_language(&f, &mut ignored)?),
            _ => {}
        }
    }
    ignored += r.finish()?;

    let claim = CurrentClaim {
        signing,
        kind,
        title,
        description,
        thumbnail,
        tags,
        languages,
    };
    Ok((
        claim,
        Diagnostics {
            ignored_bytes: ignored,
        },
    ))
}

fn expect_marker(bytes: &[u8], marker: u8) -> Result<()> {
    match bytes.first() {
        Some(&b) if b == marker => Ok(()),
        Some(&b) => Err(Error::malformed(
            "marker",
            0,
            MalformedKind::InvalidValue(format!("expected {marker:#04x}, got {b:#04x}")),
        )),
        None => Err(Error::malformed("marker", 0, MalformedKind::Truncated)),
    }
}

fn read_signature(bytes: &[u8]) -> Result<ChannelSignature> {
    let hash_end = 1 + CHANNEL_HASH_LEN;
    let hash = bytes
        .get(1..hash_end)
        .ok_or_else(|| Error::malformed("channel_hash", 1, MalformedKind::Truncated))?;
    let signature = bytes
        .get(hash_end..SIGNED_HEADER_LEN)
        .ok_or_else(|| Error::malformed("signature", hash_end, MalformedKind::Truncated))?;
    let mut channel_hash = [0u8; CHANNEL_HASH_LEN];
    channel_hash.copy_from_slice(hash);
    Ok(ChannelSignature {
        channel_hash,
        signature: signature.to_vec(),
    })
}

fn decode_stream(f: &Field<'_>, ignored: &mut usize) -> Result<Stream> {
    let mut r = f.message(STREAM)?;
    let mut source = Source::default();
    let mut author = String::new();
    let mut license = String::new();
    let mut license_url = String::new();
    let mut release_time = 0;
    let mut fee = None;
    while let Some(f) = r.next_field()? {
        match f.spec.tag {
            1 => source = decode_source(&f, ignored)?,
            2 => author = f.as_string()?,
            3 => license = f.as_string()?,
            4 => license_url = f.as_string()?,
            5 => release_time = f.as_i64()?,
            6 => fee = Some(decode_fee(&f, ignored)?),
            _ => {}
        }
    }
    *ignored += r.finish()?;
    Ok(Stream {
        source,
        author,
        license,
        license_url,
        release_time,
        fee,
    })
}

fn decode_channel(f: &Field<'_>, ignored: &mut usize) -> Result<Channel> {
    let mut r = f.message(CHANNEL)?;
    let mut channel = Channel::default();
    while let Some(f) = r.next_field()? {
        match f.spec.tag {
            1 => channel.public_key = f.as_bytes()?.to_vec(),
            2 => channel.email = f.as_string()?,
            3 => channel.website_url = f.as_string()?,
            4 => channel.cover = Some(decode_source(&f, ignored)?),
            _ => {}
        }
    }
    *ignored += r.finish()?;
    Ok(channel)
}

fn decode_source(f: &Field<'_>, ignored: &mut usize) -> Result<Source> {
    let mut r = f.message(SOURCE)?;
    let mut source = Source::default();
    while let Some(f) = r.next_field()? {
        match f.spec.tag {
            1 => source.hash = f.as_bytes()?.to_vec(),
            2 => source.name = f.as_string()?,
            3 => source.size = f.as_u64()?,
            4 => source.media_type = f.as_string()?,
            5 => source.url = f.as_string()?,
            6 => source.sd_hash = f.as_bytes()?.to_vec(),
            _ => {}
        }
    }
    *ignored += r.finish()?;
    Ok(source)
}

fn decode_fee(f: &Field<'_>, ignored: &mut usize) -> Result<Fee> {
    let mut r = f.message(FEE)?;
    let mut fee = Fee::default();
    while let Some(f) = r.next_field()? {
        match f.spec.tag {
            1 => fee.currency = f.as_u64()?,
            2 => fee.address = f.as_bytes()?.to_vec(),
            3 => fee.amount = f.as_u64()?,
            _ => {}
        }
    }
    *ignored += r.finish()?;
    Ok(fee)
}

fn decode_language(f: &Field<'_>, ignored: &mut usize) -> Result<u64> {
    let mut r = f.message(LANGUAGE)?;
    let mut code = 0;
    while let Some(f) = r.next_field()? {
        if f.spec.tag == 1 {
            code = f.as_u64()?;
        }
    }
    *ignored += r.finish()?;
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{put_len_field, put_varint_field};

    fn stream_body() -> Vec<u8> {
        let mut source = Vec::new();
        put_len_field(&mut source, 2, b"song.mp3");
        put_varint_field(&mut source, 3, 4096);
        put_len_field(&mut source, 4, b"audio/mpeg");
        put_len_field(&mut source, 6, &[0xab; 48]);
        let mut stream = Vec::new();
        put_len_field(&mut stream, 1, &source);
        put_len_field(&mut stream, 2, b"someone");
        put_varint_field(&mut stream, 5, 1_546_300_800);
        let mut claim = Vec::new();
        put_len_field(&mut claim, 1, &stream);
        put_len_field(&mut claim, 8, b"A Song");
        put_len_field(&mut claim, 11, b"music");
        put_len_field(&mut claim, 11, b"mature");
        claim
    }

    #[test]
    fn unsigned_stream() {
        let mut payload = vec![MARKER_UNSIGNED];
        payload.extend(stream_body());
        let (claim, diag) = decode(&payload, Container::Bare).unwrap();
        assert!(claim.signing.is_none());
        assert_eq!(claim.title, "A Song");
        assert_eq!(claim.tags, vec!["music", "mature"]);
        let ClaimKind::Stream(stream) = claim.kind else {
            panic!("expected a stream");
        };
        assert_eq!(stream.source.name, "song.mp3");
        assert_eq!(stream.source.size, 4096);
        assert_eq!(stream.release_time, 1_546_300_800);
        assert!(stream.fee.is_none());
        assert!(diag.is_clean());
    }

    #[test]
    fn signed_container_exposes_reversed_channel_id() {
        let mut payload = vec![MARKER_SIGNED];
        let hash: Vec<u8> = (1..=20).collect();
        payload.extend(&hash);
        payload.extend([0x55; SIGNATURE_LEN]);
        payload.extend(stream_body());
        let (claim, _) = decode(&payload, Container::Signed).unwrap();
        let signing = claim.signing.unwrap();
        assert_eq!(signing.signature, vec![0x55; SIGNATURE_LEN]);
        assert_eq!(
            signing.channel_claim_id(),
            "14131211100f0e0d0c0b0a090807060504030201"
        );
    }

    #[test]
    fn short_signed_header_names_the_cut_field() {
        let mut payload = vec![MARKER_SIGNED];
        payload.extend([0u8; 10]);
        assert_eq!(
            decode(&payload, Container::Signed).unwrap_err(),
            Error::malformed("channel_hash", 1, MalformedKind::Truncated)
        );

        let mut payload = vec![MARKER_SIGNED];
        payload.extend([0u8; CHANNEL_HASH_LEN + 3]);
        assert_eq!(
            decode(&payload, Container::Signed).unwrap_err(),
            Error::malformed("signature", 21, MalformedKind::Truncated)
        );
    }

    #[test]
    fn stream_without_source_is_missing() {
        let mut stream = Vec::new();
        put_len_field(&mut stream, 2, b"someone");
        let mut payload = vec![MARKER_UNSIGNED];
        put_len_field(&mut payload, 1, &stream);
        assert_eq!(
            decode(&payload, Container::Bare).unwrap_err(),
            Error::malformed("stream.source", 3, MalformedKind::Missing)
        );
    }

    #[test]
    fn channel_with_cover() {
        let mut cover = Vec::new();
        put_len_field(&mut cover, 5, b"https://example.com/cover.png");
        let mut channel = Vec::new();
        put_len_field(&mut channel, 1, &[0x04, 0x01, 0x02]);
        put_len_field(&mut channel, 2, b"me@example.com");
        put_len_field(&mut channel, 4, &cover);
        let mut payload = vec![MARKER_UNSIGNED];
        put_len_field(&mut payload, 2, &channel);
        let mut lang = Vec::new();
        put_varint_field(&mut lang, 1, 1);
        put_len_field(&mut payload, 12, &lang);

        let (claim, _) = decode(&payload, Container::Bare).unwrap();
        assert_eq!(claim.languages, vec![1]);
        let ClaimKind::Channel(channel) = claim.kind else {
            panic!("expected a channel");
        };
        assert_eq!(channel.public_key, vec![0x04, 0x01, 0x02]);
        assert_eq!(channel.email, "me@example.com");
        assert_eq!(channel.cover.unwrap().url, "https://example.com/cover.png");
    }

    #[test]
    fn body_offsets_account_for_the_header() {
        let mut payload = vec![MARKER_UNSIGNED];
        // title claims 50 bytes, only 2 follow
        payload.extend([0x42, 50, b'h', b'i']);
        assert_eq!(
            decode(&payload, Container::Bare).unwrap_err(),
            Error::malformed("title", 1, MalformedKind::Truncated)
        );
    }
}
