use log::{error, info};
use std::time::Duration;

use crate::acquire::{AcquisitionLoop, PatternExtractor, Reading};
use crate::config::{Config, SourceSelect};
use crate::output::{ConsoleSink, MqttSink, ReadingSink};
use crate::source::{ByteSource, GpioBitBangSource, UartSource};
use crate::utils::error::AcquireError;

/// Wires the configuration to one ByteSource and one sink, and runs a
/// single acquisition.
pub struct AcquisitionService {
    config: Config,
}

impl AcquisitionService {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(&self) -> Result<Reading, AcquireError> {
        // Fail fast on configuration problems before any hardware is touched
        let selected = self.config.validate()?;
        let extractor = PatternExtractor::new(&self.config.pattern)?;
        let timeout = self.config.effective_timeout(&selected);

        let source = self.build_source(&selected);
        let descriptor = source.descriptor();
        match timeout {
            Some(bound) => info!(
                "🚀 Acquiring one reading from {} (timeout {:?})",
                descriptor, bound
            ),
            None => info!("🚀 Acquiring one reading from {} (no timeout)", descriptor),
        }

        let acquisition = AcquisitionLoop::new(
            extractor,
            timeout,
            Duration::from_millis(self.config.poll_interval_ms),
        );
        let reading = acquisition.run(source).await?;
        info!(
            "✅ Reading from {}: timestamp={} value={}",
            descriptor, reading.timestamp, reading.value
        );

        let sink = self.build_sink();
        match sink.publish(&reading).await {
            Ok(()) => Ok(reading),
            Err(e) => {
                // The acquisition itself succeeded; keep the reading visible
                // next to the delivery failure
                error!(
                    "❌ Delivery of reading {},{} to {} '{}' failed: {}",
                    reading.timestamp,
                    reading.value,
                    sink.sink_type(),
                    sink.destination(),
                    e
                );
                Err(e)
            }
        }
    }

    fn build_source(&self, selected: &SourceSelect) -> Box<dyn ByteSource> {
        match selected {
            SourceSelect::Gpio(pin) => Box::new(GpioBitBangSource::new(
                *pin,
                self.config.baud_rate,
                self.config.data_bits,
            )),
            SourceSelect::Uart(path) => Box::new(UartSource::new(
                path.clone(),
                self.config.baud_rate,
                self.config.data_bits,
            )),
        }
    }

    fn build_sink(&self) -> Box<dyn ReadingSink> {
        match &self.config.mqtt {
            Some(mqtt) => Box::new(MqttSink::new(mqtt.clone())),
            None => Box::new(ConsoleSink),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ambiguous_source_fails_before_acquisition() {
        let config = Config {
            serial_gpio: Some(15),
            serial_port: Some("/dev/ttyS0".to_string()),
            ..Config::default()
        };

        let result = AcquisitionService::new(config).run().await;
        assert!(matches!(result, Err(AcquireError::Config(_))));
    }

    #[tokio::test]
    async fn missing_source_fails_before_acquisition() {
        let result = AcquisitionService::new(Config::default()).run().await;
        assert!(matches!(result, Err(AcquireError::Config(_))));
    }

    #[tokio::test]
    async fn bad_pattern_fails_before_acquisition() {
        let config = Config {
            serial_gpio: Some(15),
            pattern: r"^R\d{4}$".to_string(),
            ..Config::default()
        };

        let result = AcquisitionService::new(config).run().await;
        assert!(matches!(result, Err(AcquireError::Config(_))));
    }
}
