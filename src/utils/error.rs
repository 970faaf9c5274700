use thiserror::Error;

#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("No frame matched within {timeout_secs}s on {source_name}")]
    AcquisitionTimeout { source_name: String, timeout_secs: u64 },

    #[error("Decoded {lines_seen} frame(s) from {source_name} but none matched the pattern")]
    MalformedFrame { source_name: String, lines_seen: u64 },

    #[error("Acquisition interrupted on {0}")]
    Interrupted(String),

    #[error("Failed to close source {source_name}: {reason}")]
    SourceClose { source_name: String, reason: String },

    #[error("Failed to connect to sink {sink}: {reason}")]
    SinkConnect { sink: String, reason: String },

    #[error("Failed to publish to sink {sink}: {reason}")]
    SinkPublish { sink: String, reason: String },

    #[error("Failed to disconnect from sink {sink}: {reason}")]
    SinkDisconnect { sink: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{primary} (cleanup also failed: {cleanup})")]
    CleanupAfter {
        primary: Box<AcquireError>,
        cleanup: Box<AcquireError>,
    },
}

impl AcquireError {
    // Attach a failed cleanup to an earlier failure instead of masking either one
    pub fn with_cleanup(self, cleanup: AcquireError) -> Self {
        AcquireError::CleanupAfter {
            primary: Box::new(self),
            cleanup: Box::new(cleanup),
        }
    }
}
