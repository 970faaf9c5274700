pub mod settings;

pub use settings::{Config, MqttConfig, SourceSelect};
