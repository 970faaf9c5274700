use async_trait::async_trait;

use crate::utils::error::AcquireError;

/// One acquisition run owns exactly one source; `open` acquires the
/// underlying hardware/OS resource and `close` must run on every exit path.
#[async_trait]
pub trait ByteSource: Send {
    /// Identity used in logs and error context, e.g. "GPIO 15 @ 9600 baud".
    fn descriptor(&self) -> String;

    async fn open(&mut self) -> Result<(), AcquireError>;

    /// Returns whatever bytes accumulated since the last call; may be empty.
    /// Non-blocking or short-blocking, never an end-of-stream condition.
    async fn poll(&mut self) -> Result<Vec<u8>, AcquireError>;

    async fn close(&mut self) -> Result<(), AcquireError>;
}
