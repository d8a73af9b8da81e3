use std::mem;
use std::str::FromStr;

use crate::{Error, Result};
use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::Uri;

/// Signing context for a request.
///
/// Built by moving the URI and headers out of an `http::Request`, mutated
/// during canonicalization, then applied back. Header lookups stay
/// case-insensitive throughout because `http::HeaderMap` lowercases names
/// on insert.
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path.
    pub path: String,
    /// HTTP query parameters.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from an `http::Request`, taking its URI and
    /// headers.
    ///
    /// A request without an authority cannot be signed: the `host` header
    /// and the presigned URL both need it.
    pub fn build<B>(req: &mut http::Request<B>) -> Result<Self> {
        let uri = mem::take(req.uri_mut()).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(SigningRequest {
            method: req.method().clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path: paq.path().to_string(),
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Take the headers out of the request to avoid copy.
            // They are returned in apply().
            headers: mem::take(req.headers_mut()),
        })
    }

    /// Apply the signing context back to the request.
    pub fn apply<B>(mut self, req: &mut http::Request<B>) -> Result<()> {
        let query_size = self.query_size();

        mem::swap(req.headers_mut(), &mut self.headers);
        *req.method_mut() = self.method;
        *req.uri_mut() = {
            let mut uri_parts = mem::take(req.uri_mut()).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let paq = if query_size == 0 {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(query_size + 1);

                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }

                        s.push_str(k);
                        if !v.is_empty() {
                            s.push('=');
                            s.push_str(v);
                        }
                    }

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len() + 1)
            .sum::<usize>()
    }

    /// Push a new query pair into the query list.
    #[inline]
    pub fn query_push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.push((key.into(), value.into()));
    }

    /// Normalize a header value by trimming leading and trailing spaces.
    pub fn header_value_normalize(v: &mut HeaderValue) {
        let bs = v.as_bytes();

        let starting_index = bs.iter().position(|b| *b != b' ').unwrap_or(0);
        let ending_offset = bs.iter().rev().position(|b| *b != b' ').unwrap_or(0);
        let ending_index = bs.len() - ending_offset;

        // This can't fail because we started with a valid HeaderValue and then only trimmed spaces
        *v = HeaderValue::from_bytes(&bs[starting_index..ending_index])
            .expect("invalid header value")
    }

    /// Get header names as a sorted vector.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Body;
    use pretty_assertions::assert_eq;

    fn test_request() -> http::Request<Body> {
        http::Request::builder()
            .method(Method::PUT)
            .uri("https://example.com/path/to/object?b=2&a=1")
            .body(Body::empty())
            .expect("request must build")
    }

    #[test]
    fn test_build_and_apply_round_trip() {
        let mut req = test_request();
        req.headers_mut()
            .insert("x-custom", HeaderValue::from_static("value"));

        let signed = SigningRequest::build(&mut req).expect("must build");
        assert_eq!(signed.method, Method::PUT);
        assert_eq!(signed.authority.as_str(), "example.com");
        assert_eq!(signed.path, "/path/to/object");
        assert_eq!(
            signed.query,
            vec![
                ("b".to_string(), "2".to_string()),
                ("a".to_string(), "1".to_string())
            ]
        );

        signed.apply(&mut req).expect("must apply");
        assert_eq!(req.uri(), "https://example.com/path/to/object?b=2&a=1");
        assert_eq!(req.headers().get("x-custom").unwrap(), "value");
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let mut req = test_request();
        req.headers_mut()
            .insert("X-AmZ-DaTe", HeaderValue::from_static("20220313T072004Z"));

        let signed = SigningRequest::build(&mut req).expect("must build");
        assert_eq!(
            signed.headers.get("x-amz-date").unwrap(),
            "20220313T072004Z"
        );
        assert_eq!(
            signed.headers.get("X-AMZ-DATE").unwrap(),
            "20220313T072004Z"
        );

        // Later inserts overwrite rather than duplicate.
        let mut signed = signed;
        signed
            .headers
            .insert("X-Amz-Date", HeaderValue::from_static("20220314T000000Z"));
        assert_eq!(signed.headers.get_all("x-amz-date").iter().count(), 1);
    }

    #[test]
    fn test_missing_authority_is_rejected() {
        let mut req = http::Request::builder()
            .method(Method::GET)
            .uri("/relative/only")
            .body(Body::empty())
            .expect("request must build");

        let err = SigningRequest::build(&mut req).expect_err("must fail");
        assert_eq!(err.kind(), crate::ErrorKind::RequestInvalid);
    }

    #[test]
    fn test_header_value_normalize() {
        let mut v = HeaderValue::from_static("  zoobar  ");
        SigningRequest::header_value_normalize(&mut v);
        assert_eq!(v, "zoobar");
    }
}
