//! AWS chunked streaming signing.
//!
//! Wire format, per chunk:
//!
//! ```text
//! <hex-length>;chunk-signature=<64 hex chars>\r\n
//! <data>\r\n
//! ```
//!
//! Each chunk's signature covers the previous one, so the body must be
//! consumed in order, single-pass, by a single consumer. The stream ends
//! with a mandatory zero-length chunk signed the same way.

use crate::constants::{CHUNK_SIZE, STREAMING_PAYLOAD_ALGORITHM};
use bytes::{BufMut, Bytes, BytesMut};
use streamsign_core::hash::{hex_hmac_sha256, hex_sha256, EMPTY_STRING_SHA256};
use streamsign_core::{Body, Result, Stream};

/// Length of the per-chunk signature metadata, excluding the hex length:
/// `;chunk-signature=` + 64 hex chars + CRLF after the header + CRLF after
/// the data.
const CHUNK_OVERHEAD: u64 = 17 + 64 + 2 + 2;

/// Compute the exact wire length of a chunk-signed body whose decoded
/// length is `decoded_len`.
///
/// Counts every full block, the possibly-shorter last block, and the
/// zero-length terminator.
pub fn chunked_wire_length(decoded_len: u64) -> u64 {
    let full_chunks = decoded_len / CHUNK_SIZE;
    let remainder = decoded_len % CHUNK_SIZE;

    let mut total = full_chunks * frame_length(CHUNK_SIZE);
    if remainder > 0 {
        total += frame_length(remainder);
    }
    total + frame_length(0)
}

fn frame_length(data_len: u64) -> u64 {
    hex_digits(data_len) + CHUNK_OVERHEAD + data_len
}

fn hex_digits(n: u64) -> u64 {
    if n == 0 {
        return 1;
    }
    (64 - n.leading_zeros() as u64).div_ceil(4)
}

/// A body wrapper that frames 64 KiB blocks with rolling chunk signatures.
///
/// Created by the signer after the request signature is known: the request
/// signature seeds the rolling chain.
pub struct ChunkedSigningStream {
    inner: Body,
    signing_key: Vec<u8>,
    previous_signature: String,
    date: String,
    scope: String,
    wire_length: u64,
    terminated: bool,
}

impl ChunkedSigningStream {
    /// Wrap `body` for chunk signing.
    ///
    /// `seed_signature` is the request's final SigV4 signature, `date` the
    /// compact ISO 8601 signing time, and `scope` the credential scope.
    pub fn new(
        body: Body,
        signing_key: Vec<u8>,
        seed_signature: String,
        date: String,
        scope: String,
        decoded_len: u64,
    ) -> Self {
        Self {
            inner: body.into_fixed_size(CHUNK_SIZE as usize),
            signing_key,
            previous_signature: seed_signature,
            date,
            scope,
            wire_length: chunked_wire_length(decoded_len),
            terminated: false,
        }
    }

    fn sign_chunk(&mut self, data: &[u8]) -> String {
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            STREAMING_PAYLOAD_ALGORITHM,
            self.date,
            self.scope,
            self.previous_signature,
            EMPTY_STRING_SHA256,
            hex_sha256(data),
        );
        let signature = hex_hmac_sha256(&self.signing_key, string_to_sign.as_bytes());
        self.previous_signature = signature.clone();
        signature
    }

    fn frame(&mut self, data: Bytes) -> Bytes {
        let signature = self.sign_chunk(&data);
        let header = format!("{:x};chunk-signature={}\r\n", data.len(), signature);

        let mut frame = BytesMut::with_capacity(header.len() + data.len() + 2);
        frame.put_slice(header.as_bytes());
        frame.put_slice(&data);
        frame.put_slice(b"\r\n");
        frame.freeze()
    }
}

impl Stream for ChunkedSigningStream {
    fn len(&self) -> Option<u64> {
        Some(self.wire_length)
    }

    fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.terminated {
            return Ok(None);
        }

        match self.inner.next_chunk()? {
            Some(data) => Ok(Some(self.frame(data))),
            None => {
                self.terminated = true;
                Ok(Some(self.frame(Bytes::new())))
            }
        }
    }
}

impl std::fmt::Debug for ChunkedSigningStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedSigningStream")
            .field("wire_length", &self.wire_length)
            .field("terminated", &self.terminated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drain(body: &mut impl Stream) -> Bytes {
        let mut out = BytesMut::new();
        while let Some(chunk) = body.next_chunk().expect("next_chunk must succeed") {
            out.put_slice(&chunk);
        }
        out.freeze()
    }

    /// Split a chunk-signed wire body back into (signature, data) frames.
    fn decode_frames(mut wire: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut frames = Vec::new();
        while !wire.is_empty() {
            let header_end = wire
                .windows(2)
                .position(|w| w == b"\r\n")
                .expect("frame header must end with CRLF");
            let header = std::str::from_utf8(&wire[..header_end]).expect("header must be utf-8");
            let (len, signature) = header
                .split_once(";chunk-signature=")
                .expect("header must carry a chunk signature");
            let len = usize::from_str_radix(len, 16).expect("length must be hex");

            let data_start = header_end + 2;
            let data = wire[data_start..data_start + len].to_vec();
            assert_eq!(&wire[data_start + len..data_start + len + 2], b"\r\n");

            frames.push((signature.to_string(), data));
            wire = &wire[data_start + len + 2..];
        }
        frames
    }

    #[test]
    fn test_hex_digits() {
        assert_eq!(hex_digits(0), 1);
        assert_eq!(hex_digits(0xf), 1);
        assert_eq!(hex_digits(0x10), 2);
        assert_eq!(hex_digits(0xffff), 4);
        assert_eq!(hex_digits(0x10000), 5);
    }

    #[test]
    fn test_wire_length_small_body() {
        // One short chunk plus the terminator.
        let decoded = 100u64;
        let expected = (2 + CHUNK_OVERHEAD + 100) + (1 + CHUNK_OVERHEAD);
        assert_eq!(chunked_wire_length(decoded), expected);
    }

    #[test]
    fn test_wire_length_exact_multiple_has_no_short_chunk() {
        let decoded = 2 * CHUNK_SIZE;
        let expected = 2 * (5 + CHUNK_OVERHEAD + CHUNK_SIZE) + (1 + CHUNK_OVERHEAD);
        assert_eq!(chunked_wire_length(decoded), expected);
    }

    #[test]
    fn test_stream_framing_and_rolling_signatures() {
        let payload = vec![b'a'; (CHUNK_SIZE + 4464) as usize];
        let signing_key = b"test-signing-key".to_vec();
        let seed = "0".repeat(64);
        let date = "20130524T000000Z".to_string();
        let scope = "20130524/us-east-1/s3/aws4_request".to_string();

        let mut stream = ChunkedSigningStream::new(
            Body::from_bytes(payload.clone()),
            signing_key.clone(),
            seed.clone(),
            date.clone(),
            scope.clone(),
            payload.len() as u64,
        );
        let expected_len = stream.len().expect("length must be known");
        let wire = drain(&mut stream);

        // The advertised wire length is exact.
        assert_eq!(wire.len() as u64, expected_len);

        let frames = decode_frames(&wire);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].1.len(), CHUNK_SIZE as usize);
        assert_eq!(frames[1].1.len(), 4464);
        assert_eq!(frames[2].1.len(), 0);

        // Re-assembling the frames reproduces the payload.
        let decoded: Vec<u8> = frames.iter().flat_map(|(_, d)| d.clone()).collect();
        assert_eq!(decoded, payload);

        // Each signature covers the previous one, seeded by the request
        // signature.
        let mut previous = seed;
        for (signature, data) in &frames {
            let string_to_sign = format!(
                "{}\n{}\n{}\n{}\n{}\n{}",
                STREAMING_PAYLOAD_ALGORITHM,
                date,
                scope,
                previous,
                EMPTY_STRING_SHA256,
                hex_sha256(data),
            );
            assert_eq!(
                signature,
                &hex_hmac_sha256(&signing_key, string_to_sign.as_bytes())
            );
            previous = signature.clone();
        }
    }

    #[test]
    fn test_exact_multiple_emits_only_full_chunks_and_terminator() {
        let payload = vec![b'b'; (2 * CHUNK_SIZE) as usize];
        let mut stream = ChunkedSigningStream::new(
            Body::from_bytes(payload.clone()),
            b"key".to_vec(),
            "0".repeat(64),
            "20130524T000000Z".to_string(),
            "20130524/us-east-1/s3/aws4_request".to_string(),
            payload.len() as u64,
        );
        let wire = drain(&mut stream);
        assert_eq!(wire.len() as u64, chunked_wire_length(payload.len() as u64));

        let frames = decode_frames(&wire);
        let sizes: Vec<usize> = frames.iter().map(|(_, d)| d.len()).collect();
        assert_eq!(sizes, vec![CHUNK_SIZE as usize, CHUNK_SIZE as usize, 0]);
    }
}
