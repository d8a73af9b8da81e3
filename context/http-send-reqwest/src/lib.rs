//! Reqwest-based HTTP sending for streamsign.
//!
//! Provides [`ReqwestHttpSend`], the `HttpSend` implementation used by
//! credential providers that talk to metadata services or STS. The signer
//! itself never sends requests; this client exists only for credential
//! resolution.

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::{Client, Request};
use streamsign_core::{Error, HttpSend, Result};

/// Reqwest-based implementation of the `HttpSend` trait.
#[derive(Debug, Default)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a custom `reqwest::Client`.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| {
                Error::unexpected("failed to send http request")
                    .with_source(e)
                    .set_retryable(true)
            })?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| Error::unexpected("failed to read response body").with_source(e))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
