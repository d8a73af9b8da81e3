use crate::Result;
use std::fmt::Debug;

/// FileRead is used to read a file's content entirely into `Vec<u8>`.
///
/// Credential providers use this to load shared config files without
/// binding the core to a concrete runtime.
#[async_trait::async_trait]
pub trait FileRead: Debug + Send + Sync + 'static {
    /// Read the file content entirely in `Vec<u8>`.
    async fn file_read(&self, path: &str) -> Result<Vec<u8>>;
}
