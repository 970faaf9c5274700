pub mod senders;

pub use senders::{ConsoleSink, MqttSink, ReadingSink};
