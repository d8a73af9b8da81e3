//! AWS SigV4 request signing: header signing, query presigning, and
//! chunk-signed streaming bodies.
//!
//! ```no_run
//! use streamsign_aws_v4::{DefaultCredentialProvider, RequestSigner};
//! use streamsign_core::{Body, Context, Signer};
//! use streamsign_file_read_tokio::TokioFileRead;
//! use streamsign_http_send_reqwest::ReqwestHttpSend;
//!
//! # async fn example() -> streamsign_core::Result<()> {
//! let ctx = Context::new(TokioFileRead, ReqwestHttpSend::default());
//! let signer = Signer::new(
//!     ctx,
//!     DefaultCredentialProvider::new(),
//!     RequestSigner::new("s3", "us-east-1").with_signed_payload(),
//! );
//!
//! let mut req = http::Request::builder()
//!     .method(http::Method::PUT)
//!     .uri("https://example-bucket.s3.amazonaws.com/hello")
//!     .body(Body::from_bytes("Hello, World!"))
//!     .expect("request must build");
//! signer.sign(&mut req, None).await?;
//! # Ok(())
//! # }
//! ```

mod chunked_body;
pub use chunked_body::chunked_wire_length;
pub use chunked_body::ChunkedSigningStream;

mod credential;
pub use credential::Credential;

mod provide_credential;
pub use provide_credential::AssumeRoleCredentialProvider;
pub use provide_credential::DefaultCredentialProvider;
pub use provide_credential::EnvCredentialProvider;
pub use provide_credential::InstanceMetadataCredentialProvider;
pub use provide_credential::ProfileCredentialProvider;
pub use provide_credential::ProvideCredentialChain;
pub use provide_credential::StaticCredentialProvider;

mod sign_request;
pub use sign_request::RequestSigner;

mod constants;
