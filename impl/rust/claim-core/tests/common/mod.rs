#![allow(dead_code)]

use claim_core::wire::{put_fixed32_field, put_len_field, put_varint_field};

pub const SD_HASH: [u8; 48] = [0xd5; 48];
pub const CERT_ID: [u8; 20] = [0x11; 20];

pub fn legacy_v3_json() -> Vec<u8> {
    br#"{"ver":"0.0.3","title":"Morning Walk","description":"birds","author":"j.doe",
"language":"en","license":"Public Domain","license_url":"","content_type":"video/mp4","nsfw":true,
"thumbnail":"https://example.com/t.jpg","sources":{"lbry_sd_hash":"d5d5"},
"fee":{"LBC":{"address":"bFeeAddr","amount":0.5}}}"#
        .to_vec()
}

pub fn legacy_minimal_json() -> Vec<u8> {
    br#"{"title":"Bare","content-type":"text/plain","sources":{"lbry_sd_hash":"00ff"}}"#.to_vec()
}

fn v1_metadata(version: u64, with_fee: bool) -> Vec<u8> {
    let mut m = Vec::new();
    put_varint_field(&mut m, 1, version);
    put_varint_field(&mut m, 2, 1);
    put_len_field(&mut m, 3, b"Morning Walk");
    put_len_field(&mut m, 4, b"birds");
    put_len_field(&mut m, 5, b"j.doe");
    put_len_field(&mut m, 6, b"Public Domain");
    put_varint_field(&mut m, 7, 0);
    if with_fee {
        let mut fee = Vec::new();
        put_varint_field(&mut fee, 1, 1);
        put_varint_field(&mut fee, 2, 3);
        put_len_field(&mut fee, 3, &[0x55, 0x01]);
        put_fixed32_field(&mut fee, 4, 1.25f32.to_bits());
        put_len_field(&mut m, 8, &fee);
    }
    m
}

fn v1_source() -> Vec<u8> {
    let mut s = Vec::new();
    put_varint_field(&mut s, 1, 1);
    put_varint_field(&mut s, 2, 1);
    put_len_field(&mut s, 3, &SD_HASH);
    put_len_field(&mut s, 4, b"video/mp4");
    s
}

/// v1 stream claim; `signed` appends a publisher signature.
pub fn v1_stream(with_fee: bool, signed: bool) -> Vec<u8> {
    v1_stream_with_metadata(1, with_fee, signed)
}

/// v1 stream whose metadata message carries `Metadata.Version` `version`.
pub fn v1_stream_with_metadata(version: u64, with_fee: bool, signed: bool) -> Vec<u8> {
    let mut stream = Vec::new();
    put_varint_field(&mut stream, 1, 1);
    put_len_field(&mut stream, 2, &v1_metadata(version, with_fee));
    put_len_field(&mut stream, 3, &v1_source());

    let mut claim = Vec::new();
    put_varint_field(&mut claim, 1, 1);
    put_varint_field(&mut claim, 2, 1);
    put_len_field(&mut claim, 3, &stream);
    if signed {
        let mut sig = Vec::new();
        put_varint_field(&mut sig, 1, 1);
        put_varint_field(&mut sig, 2, 1);
        put_len_field(&mut sig, 3, &[0x99; 64]);
        put_len_field(&mut sig, 4, &CERT_ID);
        put_len_field(&mut claim, 5, &sig);
    }
    claim
}

/// v1 certificate claim (SECP256k1 key).
pub fn v1_certificate() -> Vec<u8> {
    let mut cert = Vec::new();
    put_varint_field(&mut cert, 1, 1);
    put_varint_field(&mut cert, 2, 3);
    put_len_field(&mut cert, 4, &[0x30, 0x56, 0x30, 0x10]);

    let mut claim = Vec::new();
    put_varint_field(&mut claim, 1, 1);
    put_varint_field(&mut claim, 2, 2);
    put_len_field(&mut claim, 4, &cert);
    claim
}

/// v1 claim whose claimType is neither stream nor certificate.
pub fn v1_unknown_type() -> Vec<u8> {
    let mut claim = Vec::new();
    put_varint_field(&mut claim, 1, 1);
    put_varint_field(&mut claim, 2, 9);
    claim
}

/// Unsigned current channel claim with a cover image.
pub fn current_channel() -> Vec<u8> {
    let mut cover = Vec::new();
    put_len_field(&mut cover, 5, b"https://example.com/cover.png");

    let mut channel = Vec::new();
    put_len_field(&mut channel, 1, &[0x04; 33]);
    put_len_field(&mut channel, 2, b"ops@example.com");
    put_len_field(&mut channel, 3, b"https://example.com");
    put_len_field(&mut channel, 4, &cover);

    let mut claim = vec![0x00];
    put_len_field(&mut claim, 2, &channel);
    put_len_field(&mut claim, 8, b"Example Channel");
    put_len_field(&mut claim, 11, b"news");
    claim
}

pub fn current_stream_body() -> Vec<u8> {
    let mut source = Vec::new();
    put_len_field(&mut source, 2, b"walk.mp4");
    put_varint_field(&mut source, 3, 1_000_000);
    put_len_field(&mut source, 4, b"video/mp4");
    put_len_field(&mut source, 6, &SD_HASH);

    let mut fee = Vec::new();
    put_varint_field(&mut fee, 1, 1);
    put_len_field(&mut fee, 2, &[0x55, 0x01]);
    put_varint_field(&mut fee, 3, 50_000_000);

    let mut stream = Vec::new();
    put_len_field(&mut stream, 1, &source);
    put_len_field(&mut stream, 2, b"j.doe");
    put_len_field(&mut stream, 3, b"CC-BY");
    put_varint_field(&mut stream, 5, 1_600_000_000);
    put_len_field(&mut stream, 6, &fee);

    let mut thumb = Vec::new();
    put_len_field(&mut thumb, 5, b"https://example.com/t.jpg");

    let mut lang = Vec::new();
    put_varint_field(&mut lang, 1, 1);

    let mut claim = Vec::new();
    put_len_field(&mut claim, 1, &stream);
    put_len_field(&mut claim, 8, b"Morning Walk");
    put_len_field(&mut claim, 9, b"birds");
    put_len_field(&mut claim, 10, &thumb);
    put_len_field(&mut claim, 11, b"nature");
    put_len_field(&mut claim, 12, &lang);
    claim
}

pub fn current_unsigned() -> Vec<u8> {
    let mut payload = vec![0x00];
    payload.extend(current_stream_body());
    payload
}

/// Signed with channel hash bytes 0x01..=0x14 (claim id reads backwards).
pub fn current_signed() -> Vec<u8> {
    let mut payload = vec![0x01];
    payload.extend(1u8..=20);
    payload.extend([0x77; 64]);
    payload.extend(current_stream_body());
    payload
}

pub fn all_valid() -> Vec<Vec<u8>> {
    vec![
        legacy_v3_json(),
        legacy_minimal_json(),
        v1_stream(true, true),
        v1_stream(false, false),
        current_unsigned(),
        current_signed(),
        v1_certificate(),
        v1_unknown_type(),
        current_channel(),
        v1_stream_with_metadata(4, true, false),
    ]
}
