use crate::chunked_body::{chunked_wire_length, ChunkedSigningStream};
use crate::constants::{
    AWS_QUERY_ENCODE_SET, AWS_URI_ENCODE_SET, CHUNK_SIZE, STREAMING_PAYLOAD,
    UNSIGNABLE_HEADERS, UNSIGNED_PAYLOAD, X_AMZ_CONTENT_SHA_256, X_AMZ_DATE,
    X_AMZ_DECODED_CONTENT_LENGTH, X_AMZ_SECURITY_TOKEN,
};
use crate::Credential;
use async_trait::async_trait;
use http::{header, HeaderValue};
use log::debug;
use percent_encoding::utf8_percent_encode;
use streamsign_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use streamsign_core::time::{format_date, format_iso8601, now, DateTime};
use streamsign_core::{Body, Context, Error, SignRequest, SigningRequest, Stream};
use std::fmt::Write;
use std::mem;
use std::time::Duration;

/// RequestSigner that implements AWS SigV4.
///
/// - [Signature Version 4 signing process](https://docs.aws.amazon.com/general/latest/gr/signature-version-4.html)
#[derive(Debug)]
pub struct RequestSigner {
    service: String,
    region: String,

    payload_signing: bool,
    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new builder for AWS V4 signer.
    pub fn new(service: &str, region: &str) -> Self {
        Self {
            service: service.into(),
            region: region.into(),

            payload_signing: false,
            time: None,
        }
    }

    /// Sign the payload the S3 way: small bodies get an
    /// `x-amz-content-sha256` digest header, bodies of 64 KiB and above are
    /// rewritten into aws-chunked streaming frames with rolling chunk
    /// signatures.
    ///
    /// Without this, the payload hash is only part of the canonical request
    /// and no content hash header is injected.
    pub fn with_signed_payload(mut self) -> Self {
        self.payload_signing = true;
        self
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }
}

/// How the payload enters the canonical request.
enum Payload {
    /// A fixed hash value as the last canonical request line.
    Hash(String),
    /// Chunk-signed streaming: the sentinel hash is signed now, the body is
    /// swapped for a [`ChunkedSigningStream`] once the seed signature is
    /// known.
    Streaming { decoded_len: u64 },
}

#[async_trait]
impl SignRequest for RequestSigner {
    type Credential = Credential;

    async fn sign_request(
        &self,
        _: &Context,
        req: &mut http::Request<Body>,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> streamsign_core::Result<()> {
        let now = self.time.unwrap_or_else(now);

        // Unsigned requests are allowed (public buckets), but the body
        // still needs a definite content length before it goes out.
        let Some(cred) = credential else {
            if expires_in.is_none() {
                let length = resolve_content_length(req)?;
                req.headers_mut()
                    .insert(header::CONTENT_LENGTH, HeaderValue::from(length));
            }
            return Ok(());
        };

        let content_length = if expires_in.is_none() {
            Some(resolve_content_length(req)?)
        } else {
            None
        };

        let mut signed_req = SigningRequest::build(req)?;

        // canonicalize context
        canonicalize_header(&mut signed_req, cred, expires_in, now)?;
        let payload = match content_length {
            Some(length) => self.prepare_payload(&mut signed_req, req.body_mut(), length)?,
            // Presigned URLs do not cover the body unless the caller hashed
            // it explicitly.
            None => match signed_req.headers.get(X_AMZ_CONTENT_SHA_256) {
                Some(v) => Payload::Hash(header_value_to_str(v)?.to_string()),
                None => Payload::Hash(UNSIGNED_PAYLOAD.to_string()),
            },
        };
        let signed_headers = signed_header_names(&signed_req);
        canonicalize_query(
            &mut signed_req,
            cred,
            expires_in,
            now,
            &self.service,
            &self.region,
            &signed_headers,
        )?;

        // build canonical request and string to sign.
        let creq = canonical_request_string(&signed_req, &signed_headers, &payload)?;
        let encoded_req = hex_sha256(creq.as_bytes());

        // Scope: "20220313/<region>/<service>/aws4_request"
        let scope = format!(
            "{}/{}/{}/aws4_request",
            format_date(now),
            self.region,
            self.service
        );
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/<service>/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "AWS4-HMAC-SHA256")
                .map_err(|e| Error::unexpected(format!("failed to write algorithm: {}", e)))?;
            writeln!(f, "{}", format_iso8601(now))
                .map_err(|e| Error::unexpected(format!("failed to write timestamp: {}", e)))?;
            writeln!(f, "{}", &scope)
                .map_err(|e| Error::unexpected(format!("failed to write scope: {}", e)))?;
            write!(f, "{}", &encoded_req)
                .map_err(|e| Error::unexpected(format!("failed to write encoded request: {}", e)))?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, &self.service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        if expires_in.is_some() {
            signed_req
                .query
                .push(("X-Amz-Signature".into(), signature.clone()));
        } else {
            let mut authorization = HeaderValue::from_str(&format!(
                "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
                cred.access_key_id,
                scope,
                signed_headers.join(";"),
                signature
            ))
            .map_err(|e| {
                Error::unexpected(format!("failed to create authorization header: {}", e))
            })?;
            authorization.set_sensitive(true);

            signed_req
                .headers
                .insert(header::AUTHORIZATION, authorization);
        }

        // Apply to the request.
        signed_req.apply(req)?;

        // The request signature seeds the rolling chunk signatures, so the
        // body swap has to wait until here.
        if let Payload::Streaming { decoded_len } = payload {
            let inner = mem::take(req.body_mut());
            *req.body_mut() = Body::from_stream(ChunkedSigningStream::new(
                inner,
                signing_key,
                signature,
                format_iso8601(now),
                scope,
                decoded_len,
            ));
        }

        Ok(())
    }
}

impl RequestSigner {
    fn prepare_payload(
        &self,
        ctx: &mut SigningRequest,
        body: &mut Body,
        content_length: u64,
    ) -> streamsign_core::Result<Payload> {
        if !self.payload_signing {
            ctx.headers
                .insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
            // An explicit digest header stays untouched and is signed as-is.
            return match ctx.headers.get(X_AMZ_CONTENT_SHA_256) {
                Some(v) => Ok(Payload::Hash(header_value_to_str(v)?.to_string())),
                None => Ok(Payload::Hash(hex_sha256(&materialize(body)?))),
            };
        }

        if content_length < CHUNK_SIZE {
            let data = materialize(body)?;
            let hash = hex_sha256(&data);
            ctx.headers.insert(
                X_AMZ_CONTENT_SHA_256,
                HeaderValue::from_str(&hash)
                    .map_err(|e| Error::unexpected(format!("invalid digest header: {}", e)))?,
            );
            ctx.headers.insert(
                header::CONTENT_LENGTH,
                HeaderValue::from(data.len() as u64),
            );
            return Ok(Payload::Hash(hash));
        }

        // Chunk-signed streaming: the signature covers the sentinel, the
        // per-chunk hashes are signed as the body is consumed.
        ctx.headers.insert(
            header::CONTENT_ENCODING,
            HeaderValue::from_static("aws-chunked"),
        );
        ctx.headers.insert(
            X_AMZ_DECODED_CONTENT_LENGTH,
            HeaderValue::from(content_length),
        );
        ctx.headers
            .insert(X_AMZ_CONTENT_SHA_256, HeaderValue::from_static(STREAMING_PAYLOAD));
        ctx.headers.insert(
            header::CONTENT_LENGTH,
            HeaderValue::from(chunked_wire_length(content_length)),
        );

        Ok(Payload::Streaming {
            decoded_len: content_length,
        })
    }
}

/// Resolve the decoded body length: explicit header, then the stream's own
/// length, and as the last resort a full materialization. Materializing is
/// the only way to get a definite length out of an arbitrary producer.
fn resolve_content_length(req: &mut http::Request<Body>) -> streamsign_core::Result<u64> {
    if let Some(v) = req.headers().get(header::CONTENT_LENGTH) {
        return header_value_to_str(v)?
            .parse()
            .map_err(|e| Error::request_invalid(format!("invalid content-length header: {}", e)));
    }

    match req.body().len() {
        Some(length) => Ok(length),
        None => Ok(materialize(req.body_mut())?.len() as u64),
    }
}

/// Drain `body` and replace it with an equivalent in-memory stream.
fn materialize(body: &mut Body) -> streamsign_core::Result<bytes::Bytes> {
    let data = body.read_to_bytes()?;
    *body = Body::from_bytes(data.clone());
    Ok(data)
}

fn header_value_to_str(v: &HeaderValue) -> streamsign_core::Result<&str> {
    v.to_str()
        .map_err(|e| Error::request_invalid(format!("header value is not valid utf-8: {}", e)))
}

/// Sorted header names that take part in the signature.
fn signed_header_names(ctx: &SigningRequest) -> Vec<String> {
    let mut names = ctx
        .headers
        .keys()
        .map(|k| k.as_str())
        .filter(|name| !UNSIGNABLE_HEADERS.contains(name))
        .map(|name| name.to_string())
        .collect::<Vec<_>>();
    names.sort_unstable();

    names
}

fn canonical_request_string(
    ctx: &SigningRequest,
    signed_headers: &[String],
    payload: &Payload,
) -> streamsign_core::Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    // Insert method
    writeln!(f, "{}", ctx.method)
        .map_err(|e| Error::unexpected(format!("failed to write method: {}", e)))?;
    // Insert encoded path.
    //
    // Services other than S3 expect the path double-encoded; the encode set
    // leaves `/` alone and escapes `%`, so running the raw path through it
    // once more is exactly that.
    writeln!(f, "{}", utf8_percent_encode(&ctx.path, &AWS_URI_ENCODE_SET))
        .map_err(|e| Error::unexpected(format!("failed to write encoded path: {}", e)))?;
    // Insert query
    writeln!(
        f,
        "{}",
        ctx.query
            .iter()
            .map(|(k, v)| { format!("{k}={v}") })
            .collect::<Vec<_>>()
            .join("&")
    )
    .map_err(|e| Error::unexpected(format!("failed to write query: {}", e)))?;
    // Insert signed headers, multi-valued headers comma-joined after
    // sorting their values.
    for name in signed_headers.iter() {
        let mut values = ctx
            .headers
            .get_all(name.as_str())
            .iter()
            .map(header_value_to_str)
            .collect::<streamsign_core::Result<Vec<_>>>()?;
        values.sort_unstable();

        writeln!(f, "{}:{}", name, values.join(","))
            .map_err(|e| Error::unexpected(format!("failed to write header: {}", e)))?;
    }
    writeln!(f).map_err(|e| Error::unexpected(format!("failed to write newline: {}", e)))?;
    writeln!(f, "{}", signed_headers.join(";"))
        .map_err(|e| Error::unexpected(format!("failed to write signed headers: {}", e)))?;

    let hash = match payload {
        Payload::Hash(hash) => hash.as_str(),
        Payload::Streaming { .. } => STREAMING_PAYLOAD,
    };
    write!(f, "{}", hash)
        .map_err(|e| Error::unexpected(format!("failed to write payload hash: {}", e)))?;

    Ok(f)
}

fn canonicalize_header(
    ctx: &mut SigningRequest,
    cred: &Credential,
    expires_in: Option<Duration>,
    now: DateTime,
) -> streamsign_core::Result<()> {
    // Header names and values need to be normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    for (_, value) in ctx.headers.iter_mut() {
        SigningRequest::header_value_normalize(value)
    }

    // Insert HOST header if not present.
    if ctx.headers.get(header::HOST).is_none() {
        ctx.headers.insert(
            header::HOST,
            ctx.authority.as_str().parse().map_err(|e| {
                Error::unexpected(format!("failed to parse authority as header value: {}", e))
            })?,
        );
    }

    if expires_in.is_none() {
        // Insert DATE header if not present.
        if ctx.headers.get(X_AMZ_DATE).is_none() {
            let date_header = HeaderValue::try_from(format_iso8601(now))
                .map_err(|e| Error::unexpected(format!("failed to create date header: {}", e)))?;
            ctx.headers.insert(X_AMZ_DATE, date_header);
        }

        // Insert X_AMZ_SECURITY_TOKEN header if security token exists.
        if let Some(token) = &cred.session_token {
            let mut value = HeaderValue::from_str(token).map_err(|e| {
                Error::unexpected(format!("failed to create security token header: {}", e))
            })?;
            // Set token value sensitive to avoid leaking.
            value.set_sensitive(true);

            ctx.headers.insert(X_AMZ_SECURITY_TOKEN, value);
        }
    }

    Ok(())
}

fn canonicalize_query(
    ctx: &mut SigningRequest,
    cred: &Credential,
    expires_in: Option<Duration>,
    now: DateTime,
    service: &str,
    region: &str,
    signed_headers: &[String],
) -> streamsign_core::Result<()> {
    // A stale signature in the incoming query must never be signed over.
    ctx.query.retain(|(k, _)| k.as_str() != "X-Amz-Signature");

    if let Some(expire) = expires_in {
        ctx.query
            .push(("X-Amz-Algorithm".into(), "AWS4-HMAC-SHA256".into()));
        ctx.query.push((
            "X-Amz-Credential".into(),
            format!(
                "{}/{}/{}/{}/aws4_request",
                cred.access_key_id,
                format_date(now),
                region,
                service
            ),
        ));
        ctx.query.push(("X-Amz-Date".into(), format_iso8601(now)));
        ctx.query
            .push(("X-Amz-Expires".into(), expire.as_secs().to_string()));
        ctx.query
            .push(("X-Amz-SignedHeaders".into(), signed_headers.join(";")));

        if let Some(token) = &cred.session_token {
            ctx.query
                .push(("X-Amz-Security-Token".into(), token.into()));
        }
    }

    // Return if query is empty.
    if ctx.query.is_empty() {
        return Ok(());
    }

    // Sort by param name
    ctx.query.sort();

    ctx.query = ctx
        .query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect();

    Ok(())
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STREAMING_PAYLOAD_ALGORITHM;
    use bytes::{BufMut, Bytes, BytesMut};
    use pretty_assertions::assert_eq;
    use streamsign_core::hash::EMPTY_STRING_SHA256;
    use streamsign_core::time::parse_rfc3339;
    use streamsign_file_read_tokio::TokioFileRead;
    use streamsign_http_send_reqwest::ReqwestHttpSend;

    fn test_context() -> Context {
        Context::new(TokioFileRead, ReqwestHttpSend::default())
    }

    fn suite_credential() -> Credential {
        Credential::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY")
    }

    fn suite_time() -> DateTime {
        parse_rfc3339("2011-09-09T23:36:00Z").expect("time must parse")
    }

    async fn sign_suite_request() -> http::Request<Body> {
        let mut req = http::Request::builder()
            .method(http::Method::POST)
            .uri("http://host.foo.com/")
            .header("ZOO", "zoobar")
            .body(Body::empty())
            .expect("request must build");

        let signer = RequestSigner::new("host", "us-east-1").with_time(suite_time());
        signer
            .sign_request(&test_context(), &mut req, Some(&suite_credential()), None)
            .await
            .expect("signing must succeed");
        req
    }

    #[tokio::test]
    async fn test_signature_matches_aws_suite_vector() {
        let req = sign_suite_request().await;

        assert_eq!(
            req.headers()
                .get(header::AUTHORIZATION)
                .expect("authorization must be set")
                .to_str()
                .expect("must be valid"),
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20110909/us-east-1/host/aws4_request, \
             SignedHeaders=host;x-amz-date;zoo, \
             Signature=b28a4d452e58edf8ff150a9518b6f4135c9960e4724dc3daab4d7ccc26e90b9b"
        );
        assert_eq!(req.headers().get(X_AMZ_DATE).unwrap(), "20110909T233600Z");
        assert_eq!(req.headers().get(header::HOST).unwrap(), "host.foo.com");
        // The empty body still gets a definite length, excluded from the
        // signed header set.
        assert_eq!(req.headers().get(header::CONTENT_LENGTH).unwrap(), "0");
    }

    #[tokio::test]
    async fn test_signing_is_deterministic() {
        let first = sign_suite_request().await;
        let second = sign_suite_request().await;

        assert_eq!(
            first.headers().get(header::AUTHORIZATION).unwrap(),
            second.headers().get(header::AUTHORIZATION).unwrap()
        );
    }

    #[tokio::test]
    async fn test_no_credential_only_sets_content_length() {
        let mut req = http::Request::builder()
            .method(http::Method::PUT)
            .uri("http://127.0.0.1:9000/hello")
            .body(Body::from_bytes("Hello,World!"))
            .expect("request must build");

        let signer = RequestSigner::new("s3", "us-east-1");
        signer
            .sign_request(&test_context(), &mut req, None, None)
            .await
            .expect("unsigned request must pass");

        assert_eq!(req.headers().get(header::CONTENT_LENGTH).unwrap(), "12");
        assert!(req.headers().get(header::AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn test_presign_query_parameters() {
        let mut req = http::Request::builder()
            .method(http::Method::GET)
            .uri("https://example-bucket.s3.amazonaws.com/object.txt")
            .body(Body::empty())
            .expect("request must build");

        let cred = Credential::new("access_key_id", "secret_access_key")
            .with_session_token("security_token");
        let signer = RequestSigner::new("s3", "us-east-1").with_time(suite_time());
        signer
            .sign_request(
                &test_context(),
                &mut req,
                Some(&cred),
                Some(Duration::from_secs(3600)),
            )
            .await
            .expect("presigning must succeed");

        assert!(req.headers().get(header::AUTHORIZATION).is_none());

        let query: Vec<(String, String)> =
            form_urlencoded::parse(req.uri().query().unwrap_or_default().as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
        let get = |name: &str| {
            query
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .unwrap_or_else(|| panic!("{name} must be present"))
        };

        assert_eq!(get("X-Amz-Algorithm"), "AWS4-HMAC-SHA256");
        assert_eq!(
            get("X-Amz-Credential"),
            "access_key_id/20110909/us-east-1/s3/aws4_request"
        );
        assert_eq!(get("X-Amz-Date"), "20110909T233600Z");
        assert_eq!(get("X-Amz-Expires"), "3600");
        assert_eq!(get("X-Amz-SignedHeaders"), "host");
        assert_eq!(get("X-Amz-Security-Token"), "security_token");
        assert_eq!(get("X-Amz-Signature").len(), 64);
    }

    #[tokio::test]
    async fn test_signed_payload_small_body_gets_digest_header() {
        let content = "Hello,World!";
        let mut req = http::Request::builder()
            .method(http::Method::PUT)
            .uri("http://127.0.0.1:9000/hello")
            .body(Body::from_bytes(content))
            .expect("request must build");

        let signer = RequestSigner::new("s3", "us-east-1")
            .with_signed_payload()
            .with_time(suite_time());
        signer
            .sign_request(
                &test_context(),
                &mut req,
                Some(&Credential::new("access_key_id", "secret_access_key")),
                None,
            )
            .await
            .expect("signing must succeed");

        assert_eq!(
            req.headers().get(X_AMZ_CONTENT_SHA_256).unwrap(),
            hex_sha256(content.as_bytes()).as_str()
        );
        assert_eq!(req.headers().get(header::CONTENT_LENGTH).unwrap(), "12");
        assert!(req.headers().get(header::CONTENT_ENCODING).is_none());
        assert_eq!(
            req.body_mut().read_to_bytes().expect("must read"),
            content.as_bytes()
        );
    }

    #[tokio::test]
    async fn test_signed_payload_large_body_switches_to_chunked() {
        let payload = vec![b'x'; 70000];
        let mut req = http::Request::builder()
            .method(http::Method::PUT)
            .uri("http://127.0.0.1:9000/hello")
            .body(Body::from_bytes(payload.clone()))
            .expect("request must build");

        let cred = Credential::new("access_key_id", "secret_access_key");
        let time = suite_time();
        let signer = RequestSigner::new("s3", "us-east-1")
            .with_signed_payload()
            .with_time(time);
        signer
            .sign_request(&test_context(), &mut req, Some(&cred), None)
            .await
            .expect("signing must succeed");

        assert_eq!(
            req.headers().get(header::CONTENT_ENCODING).unwrap(),
            "aws-chunked"
        );
        assert_eq!(
            req.headers().get(X_AMZ_DECODED_CONTENT_LENGTH).unwrap(),
            "70000"
        );
        assert_eq!(
            req.headers().get(X_AMZ_CONTENT_SHA_256).unwrap(),
            STREAMING_PAYLOAD
        );

        let advertised: u64 = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .unwrap()
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(advertised, chunked_wire_length(70000));

        // Drain the rewritten body and take the framing apart.
        let mut wire = BytesMut::new();
        while let Some(chunk) = req.body_mut().next_chunk().expect("must read") {
            wire.put_slice(&chunk);
        }
        assert_eq!(wire.len() as u64, advertised);

        let mut frames = Vec::new();
        let mut rest = &wire[..];
        while !rest.is_empty() {
            let header_end = rest.windows(2).position(|w| w == b"\r\n").unwrap();
            let header = std::str::from_utf8(&rest[..header_end]).unwrap();
            let (len, signature) = header.split_once(";chunk-signature=").unwrap();
            let len = usize::from_str_radix(len, 16).unwrap();
            frames.push((signature.to_string(), rest[header_end + 2..header_end + 2 + len].to_vec()));
            rest = &rest[header_end + 2 + len + 2..];
        }

        let sizes: Vec<usize> = frames.iter().map(|(_, d)| d.len()).collect();
        assert_eq!(sizes, vec![65536, 4464, 0]);
        let decoded: Vec<u8> = frames.iter().flat_map(|(_, d)| d.clone()).collect();
        assert_eq!(decoded, payload);

        // The chain is seeded by the request signature from the
        // authorization header.
        let authorization = req
            .headers()
            .get(header::AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap();
        let seed = authorization
            .split_once("Signature=")
            .expect("authorization must carry a signature")
            .1;
        let signing_key =
            generate_signing_key(&cred.secret_access_key, time, "us-east-1", "s3");
        let scope = format!("{}/us-east-1/s3/aws4_request", format_date(time));

        let mut previous = seed.to_string();
        for (signature, data) in &frames {
            let string_to_sign = format!(
                "{}\n{}\n{}\n{}\n{}\n{}",
                STREAMING_PAYLOAD_ALGORITHM,
                format_iso8601(time),
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
    fn test_canonical_path_is_double_encoded() {
        let mut req = http::Request::builder()
            .method(http::Method::GET)
            .uri("http://example.com/a%20b/c")
            .body(Body::empty())
            .expect("request must build");

        let ctx = SigningRequest::build(&mut req).expect("must build");
        let creq = canonical_request_string(
            &ctx,
            &[],
            &Payload::Hash(EMPTY_STRING_SHA256.to_string()),
        )
        .expect("must render");

        let path_line = creq.lines().nth(1).expect("path line must exist");
        assert_eq!(path_line, "/a%2520b/c");
    }

    #[test]
    fn test_unsignable_headers_are_excluded() {
        let mut req = http::Request::builder()
            .method(http::Method::PUT)
            .uri("http://example.com/")
            .header(header::CONTENT_LENGTH, "12")
            .header(header::USER_AGENT, "curl/8.0")
            .header(header::RANGE, "bytes=0-1023")
            .header("x-amz-meta-color", "blue")
            .body(Body::empty())
            .expect("request must build");

        let ctx = SigningRequest::build(&mut req).expect("must build");
        assert_eq!(
            signed_header_names(&ctx),
            vec!["x-amz-meta-color".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unknown_length_body_is_materialized() {
        let parts: Vec<Bytes> = vec![
            Bytes::from_static(b"hello "),
            Bytes::from_static(b"world"),
        ];
        let mut iter = parts.into_iter();
        let mut req = http::Request::builder()
            .method(http::Method::PUT)
            .uri("http://127.0.0.1:9000/hello")
            .body(Body::from_callable(move || {
                Ok(iter.next().unwrap_or_default())
            }))
            .expect("request must build");
        assert_eq!(req.body().len(), None);

        let signer = RequestSigner::new("s3", "us-east-1").with_time(suite_time());
        signer
            .sign_request(
                &test_context(),
                &mut req,
                Some(&Credential::new("access_key_id", "secret_access_key")),
                None,
            )
            .await
            .expect("signing must succeed");

        assert_eq!(req.headers().get(header::CONTENT_LENGTH).unwrap(), "11");
        assert_eq!(
            req.body_mut().read_to_bytes().expect("must read"),
            "hello world".as_bytes()
        );
    }
}
