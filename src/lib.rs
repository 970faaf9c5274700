//! Serial Ranging Sensor Acquisition Library
//!
//! This library acquires a single reading from a distance-ranging sensor
//! speaking a line-oriented ASCII protocol over bit-banged GPIO (via the
//! pigpio daemon) or a hardware UART, and forwards the parsed reading to
//! an MQTT broker.

pub mod acquire;
pub mod cli;
pub mod config;
pub mod output;
pub mod services;
pub mod source;
pub mod utils;

// Re-export commonly used types
pub use acquire::{AcquisitionLoop, FrameAssembler, PatternExtractor, Reading};
pub use config::{Config, MqttConfig, SourceSelect};
pub use output::{ConsoleSink, MqttSink, ReadingSink};
pub use services::AcquisitionService;
pub use source::{ByteSource, GpioBitBangSource, UartSource};
pub use utils::error::AcquireError;

pub const VERSION: &str = "1.0.0";
