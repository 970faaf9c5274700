use clap::parser::ValueSource;
use clap::ArgMatches;
use log::{debug, log_enabled, Level};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::utils::error::AcquireError;

pub const DEFAULT_PATTERN: &str = r"^R(\d{4})$";
pub const DEFAULT_BAUD_RATE: u32 = 9600;
pub const DEFAULT_DATA_BITS: u8 = 8;
pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_MQTT_TOPIC: &str = "snowdata/921a_18";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
// The UART pipeline has always run with a 20s bound; the GPIO one never had
// one, so its absence stays meaningful (poll forever)
pub const DEFAULT_UART_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Source selection - exactly one of these must be set
    pub serial_gpio: Option<u8>,
    pub serial_port: Option<String>,

    // Serial framing
    pub baud_rate: u32,
    pub data_bits: u8,

    // Line matching
    pub pattern: String,

    // Acquisition policy
    pub timeout_secs: Option<u64>,
    pub poll_interval_ms: u64,

    // Logging
    pub log_level: String,

    // Sink settings; kept last so the serialized form stays valid TOML
    pub mqtt: Option<MqttConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker: String,
    pub port: u16,
    pub topic: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// The source variant picked by validation; drives which ByteSource the
/// orchestrator builds.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceSelect {
    Gpio(u8),
    Uart(String),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            serial_gpio: None,
            serial_port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DEFAULT_DATA_BITS,
            pattern: DEFAULT_PATTERN.to_string(),
            mqtt: None,
            timeout_secs: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, AcquireError> {
        let mut config = if let Some(path) = matches.get_one::<String>("config") {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        if let Some(value) = matches.get_one::<String>("serial-gpio") {
            config.serial_gpio = Some(parse_arg("serial-gpio", value)?);
        }
        if let Some(value) = matches.get_one::<String>("serial-port") {
            config.serial_port = Some(value.clone());
        }
        if let Some(value) = cli_value(matches, "baud-rate") {
            config.baud_rate = parse_arg("baud-rate", value)?;
        }
        if let Some(value) = cli_value(matches, "data-bits") {
            config.data_bits = parse_arg("data-bits", value)?;
        }
        if let Some(value) = cli_value(matches, "pattern") {
            config.pattern = value.clone();
        }
        if let Some(value) = cli_value(matches, "timeout") {
            config.timeout_secs = Some(parse_arg("timeout", value)?);
        }
        if let Some(value) = cli_value(matches, "poll-interval-ms") {
            config.poll_interval_ms = parse_arg("poll-interval-ms", value)?;
        }
        if let Some(value) = cli_value(matches, "log-level") {
            config.log_level = value.clone();
        }

        // The sink only exists once a broker is named (CLI or config file)
        if let Some(broker) = matches.get_one::<String>("mqtt-broker") {
            let mut mqtt = config.mqtt.take().unwrap_or_else(|| MqttConfig {
                broker: String::new(),
                port: DEFAULT_MQTT_PORT,
                topic: DEFAULT_MQTT_TOPIC.to_string(),
                username: None,
                password: None,
            });
            mqtt.broker = broker.clone();
            config.mqtt = Some(mqtt);
        }
        if let Some(mqtt) = config.mqtt.as_mut() {
            if let Some(value) = cli_value(matches, "mqtt-port") {
                mqtt.port = parse_arg("mqtt-port", value)?;
            }
            if let Some(value) = cli_value(matches, "mqtt-topic") {
                mqtt.topic = value.clone();
            }
            if let Some(value) = matches.get_one::<String>("mqtt-user") {
                mqtt.username = Some(value.clone());
            }
            if let Some(value) = matches.get_one::<String>("mqtt-password") {
                mqtt.password = Some(value.clone());
            }
        }

        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AcquireError> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            AcquireError::Config(format!(
                "Cannot read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            AcquireError::Config(format!(
                "Cannot parse config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    /// Checks the whole configuration and resolves the source selection.
    /// Runs before any hardware is touched.
    pub fn validate(&self) -> Result<SourceSelect, AcquireError> {
        let selected = match (&self.serial_gpio, &self.serial_port) {
            (Some(pin), None) => SourceSelect::Gpio(*pin),
            (None, Some(path)) if !path.is_empty() => SourceSelect::Uart(path.clone()),
            (None, Some(_)) => {
                return Err(AcquireError::Config(
                    "Serial port path must not be empty".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(AcquireError::Config(
                    "Ambiguous source selection: set either --serial-gpio or --serial-port, not both"
                        .to_string(),
                ))
            }
            (None, None) => {
                return Err(AcquireError::Config(
                    "No source selected: set --serial-gpio or --serial-port".to_string(),
                ))
            }
        };

        if !(5..=8).contains(&self.data_bits) {
            return Err(AcquireError::Config(format!(
                "Invalid data bits value: {} (must be 5, 6, 7, or 8)",
                self.data_bits
            )));
        }
        if self.baud_rate == 0 {
            return Err(AcquireError::Config("Baud rate must be non-zero".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(AcquireError::Config(
                "Poll interval must be non-zero".to_string(),
            ));
        }

        if let Some(mqtt) = &self.mqtt {
            if mqtt.broker.is_empty() {
                return Err(AcquireError::Config(
                    "MQTT broker address must not be empty".to_string(),
                ));
            }
            if mqtt.port == 0 {
                return Err(AcquireError::Config(
                    "MQTT port must be within 1-65535".to_string(),
                ));
            }
            match (&mqtt.username, &mqtt.password) {
                (Some(_), None) | (None, Some(_)) => {
                    return Err(AcquireError::Config(
                        "MQTT username and password must be provided together".to_string(),
                    ))
                }
                _ => {}
            }
        }

        Ok(selected)
    }

    /// Explicit --timeout wins; otherwise the UART path keeps its 20s bound
    /// and the GPIO path polls forever.
    pub fn effective_timeout(&self, selected: &SourceSelect) -> Option<Duration> {
        match self.timeout_secs {
            Some(secs) => Some(Duration::from_secs(secs)),
            None => match selected {
                SourceSelect::Uart(_) => Some(Duration::from_secs(DEFAULT_UART_TIMEOUT_SECS)),
                SourceSelect::Gpio(_) => None,
            },
        }
    }

    pub fn display(&self) {
        if log_enabled!(Level::Debug) {
            match toml::to_string_pretty(self) {
                Ok(summary) => debug!("Configuration summary:\n{}", summary),
                Err(e) => debug!("Configuration summary unavailable: {}", e),
            }
        }
    }
}

// Only honor an argument when the user actually typed it, so config-file
// values survive clap's defaults
fn cli_value<'a>(matches: &'a ArgMatches, id: &str) -> Option<&'a String> {
    match matches.value_source(id) {
        Some(ValueSource::CommandLine) => matches.get_one::<String>(id),
        _ => None,
    }
}

fn parse_arg<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AcquireError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| AcquireError::Config(format!("Invalid value for --{}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gpio_config() -> Config {
        Config {
            serial_gpio: Some(15),
            ..Config::default()
        }
    }

    #[test]
    fn gpio_selection_validates() {
        assert_eq!(gpio_config().validate().unwrap(), SourceSelect::Gpio(15));
    }

    #[test]
    fn uart_selection_validates() {
        let config = Config {
            serial_port: Some("/dev/ttyS0".to_string()),
            ..Config::default()
        };
        assert_eq!(
            config.validate().unwrap(),
            SourceSelect::Uart("/dev/ttyS0".to_string())
        );
    }

    #[test]
    fn both_sources_set_is_ambiguous() {
        let config = Config {
            serial_gpio: Some(15),
            serial_port: Some("/dev/ttyS0".to_string()),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AcquireError::Config(_))));
    }

    #[test]
    fn no_source_set_is_rejected() {
        assert!(matches!(
            Config::default().validate(),
            Err(AcquireError::Config(_))
        ));
    }

    #[test]
    fn data_bits_outside_5_to_8_are_rejected() {
        let mut config = gpio_config();
        config.data_bits = 9;
        assert!(matches!(config.validate(), Err(AcquireError::Config(_))));

        config.data_bits = 4;
        assert!(matches!(config.validate(), Err(AcquireError::Config(_))));
    }

    #[test]
    fn half_configured_credentials_are_rejected() {
        let mut config = gpio_config();
        config.mqtt = Some(MqttConfig {
            broker: "192.168.1.39".to_string(),
            port: DEFAULT_MQTT_PORT,
            topic: DEFAULT_MQTT_TOPIC.to_string(),
            username: Some("sensor".to_string()),
            password: None,
        });
        assert!(matches!(config.validate(), Err(AcquireError::Config(_))));
    }

    #[test]
    fn mqtt_port_zero_is_rejected() {
        let mut config = gpio_config();
        config.mqtt = Some(MqttConfig {
            broker: "192.168.1.39".to_string(),
            port: 0,
            topic: DEFAULT_MQTT_TOPIC.to_string(),
            username: None,
            password: None,
        });
        assert!(matches!(config.validate(), Err(AcquireError::Config(_))));
    }

    #[test]
    fn uart_gets_default_timeout_gpio_polls_forever() {
        let config = Config::default();
        assert_eq!(
            config.effective_timeout(&SourceSelect::Uart("/dev/ttyS0".to_string())),
            Some(Duration::from_secs(DEFAULT_UART_TIMEOUT_SECS))
        );
        assert_eq!(config.effective_timeout(&SourceSelect::Gpio(15)), None);
    }

    #[test]
    fn explicit_timeout_overrides_source_default() {
        let mut config = Config::default();
        config.timeout_secs = Some(5);
        assert_eq!(
            config.effective_timeout(&SourceSelect::Gpio(15)),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn config_file_round_trips() {
        let config = Config {
            serial_gpio: Some(15),
            mqtt: Some(MqttConfig {
                broker: "192.168.1.39".to_string(),
                port: DEFAULT_MQTT_PORT,
                topic: DEFAULT_MQTT_TOPIC.to_string(),
                username: None,
                password: None,
            }),
            ..Config::default()
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let restored: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(restored.serial_gpio, Some(15));
        assert_eq!(restored.mqtt.unwrap().broker, "192.168.1.39");
    }
}
