//! Binary transport for gateway input uploads: msgpack, optionally gzipped.

use std::io::{Read, Write};

use axum::body::Bytes;
use axum::http::header::{HeaderName, CONTENT_ENCODING};
use axum::http::HeaderMap;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::FhevmError;

pub const MSGPACK_CONTENT_TYPE: &str = "application/msgpack";

fn header_contains(headers: &HeaderMap, key: HeaderName, needle: &str) -> bool {
    headers
        .get(key)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_ascii_lowercase().contains(needle))
        .unwrap_or(false)
}

fn maybe_decompress(headers: &HeaderMap, body: Bytes) -> Result<Vec<u8>, FhevmError> {
    if header_contains(headers, CONTENT_ENCODING, "gzip") {
        let mut decoder = GzDecoder::new(body.as_ref());
        let mut decoded = Vec::new();
        decoder.read_to_end(&mut decoded).map_err(|error| {
            FhevmError::InvalidInput(format!("invalid gzip payload: {error}"))
        })?;
        Ok(decoded)
    } else {
        Ok(body.to_vec())
    }
}

/// Decode a msgpack request body, honoring `Content-Encoding: gzip`.
pub fn decode_msgpack<T: DeserializeOwned>(
    headers: &HeaderMap,
    body: Bytes,
) -> Result<T, FhevmError> {
    let raw = maybe_decompress(headers, body)?;
    let parsed = rmp_serde::from_slice(&raw)?;
    Ok(parsed)
}

/// Encode `payload` as named-field msgpack and gzip it for upload.
pub fn encode_msgpack_gzip<T: Serialize>(payload: &T) -> Result<Vec<u8>, FhevmError> {
    let encoded = rmp_serde::to_vec_named(payload)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&encoded)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        handle: String,
        #[serde(with = "serde_bytes")]
        ciphertext: Vec<u8>,
    }

    #[test]
    fn gzipped_upload_decodes_with_header() {
        let payload = Payload {
            handle: "0x01".into(),
            ciphertext: vec![1, 2, 3],
        };
        let body = encode_msgpack_gzip(&payload).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        let decoded: Payload = decode_msgpack(&headers, Bytes::from(body.clone())).unwrap();
        assert_eq!(decoded, payload);

        let without_header: Result<Payload, _> = decode_msgpack(&HeaderMap::new(), Bytes::from(body));
        assert!(without_header.is_err());
    }
}
