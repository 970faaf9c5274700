pub mod frame;
pub mod pattern;

pub use frame::{FrameAssembler, FRAME_DELIMITER};
pub use pattern::PatternExtractor;

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::source::ByteSource;
use crate::utils::error::AcquireError;

/// One timestamped result of a successful frame match. Immutable once
/// constructed; serializes to the wire payload `{"timestamp":..,"value":..}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub timestamp: i64,
    pub value: String,
}

/// Drives a `ByteSource` through the frame assembler and pattern extractor
/// until one line matches, the timeout elapses, or the run is interrupted.
pub struct AcquisitionLoop {
    extractor: PatternExtractor,
    timeout: Option<Duration>,
    poll_interval: Duration,
}

impl AcquisitionLoop {
    pub fn new(
        extractor: PatternExtractor,
        timeout: Option<Duration>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            extractor,
            timeout,
            poll_interval,
        }
    }

    /// Runs one acquisition. The source is opened here and closed on every
    /// exit path; a close failure escalates even over a successful match.
    pub async fn run(&self, mut source: Box<dyn ByteSource>) -> Result<Reading, AcquireError> {
        let descriptor = source.descriptor();

        // Open failure means nothing was acquired, so there is nothing to close
        source.open().await?;
        info!("📡 Polling {} for a matching frame...", descriptor);

        let outcome = self.poll_until_match(&mut *source, &descriptor).await;
        let closed = source.close().await;

        match (outcome, closed) {
            (Ok(reading), Ok(())) => Ok(reading),
            (Ok(_), Err(close_err)) => {
                warn!("⚠️ Reading acquired but source cleanup failed: {}", close_err);
                Err(close_err)
            }
            (Err(primary), Ok(())) => Err(primary),
            (Err(primary), Err(close_err)) => Err(primary.with_cleanup(close_err)),
        }
    }

    async fn poll_until_match(
        &self,
        source: &mut dyn ByteSource,
        descriptor: &str,
    ) -> Result<Reading, AcquireError> {
        let mut assembler = FrameAssembler::new();
        let started = Instant::now();
        let mut lines_seen: u64 = 0;

        loop {
            let data = source.poll().await?;
            // One timestamp per iteration; every line from this poll shares it
            let unix_time = Utc::now().timestamp();
            if !data.is_empty() {
                debug!(
                    "Read {} bytes from {}: {}",
                    data.len(),
                    descriptor,
                    hex::encode(&data)
                );
            }

            for line in assembler.feed(&data) {
                lines_seen += 1;
                if let Some(value) = self.extractor.extract(&line) {
                    info!("✅ Frame '{}' matched on {}", line, descriptor);
                    return Ok(Reading {
                        timestamp: unix_time,
                        value,
                    });
                }
                debug!(
                    "Line '{}' did not match pattern {}",
                    line,
                    self.extractor.as_str()
                );
            }

            if let Some(bound) = self.timeout {
                if started.elapsed() >= bound {
                    warn!(
                        "⏰ No matching frame from {} within {:?}",
                        descriptor, bound
                    );
                    if lines_seen > 0 {
                        return Err(AcquireError::MalformedFrame {
                            source_name: descriptor.to_string(),
                            lines_seen,
                        });
                    }
                    return Err(AcquireError::AcquisitionTimeout {
                        source_name: descriptor.to_string(),
                        timeout_secs: bound.as_secs(),
                    });
                }
            }

            // The inter-iteration sleep is the only intentional suspension
            // point; an interrupt is honored at this boundary
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    warn!("🛑 Interrupt received, stopping acquisition on {}", descriptor);
                    if lines_seen > 0 {
                        return Err(AcquireError::MalformedFrame {
                            source_name: descriptor.to_string(),
                            lines_seen,
                        });
                    }
                    return Err(AcquireError::Interrupted(descriptor.to_string()));
                }
                _ = sleep(self.poll_interval) => {}
            }
        }
    }
}
