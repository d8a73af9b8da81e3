use crate::Result;
use bytes::Bytes;
use std::fmt::Debug;

/// HttpSend is used to send http requests during the signing process.
///
/// For example, fetching instance metadata credentials or calling STS.
/// This trait exists for the signer only, don't use it as a general http
/// client.
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send http request and return the response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}
