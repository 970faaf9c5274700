use clap::{Arg, Command};

pub fn build_cli() -> Command {
    Command::new("ranger-acquire")
        .version(crate::VERSION)
        .about("Acquires one reading from a serial ranging sensor and forwards it to MQTT")
        .arg(
            Arg::new("serial-gpio")
                .long("serial-gpio")
                .value_name("PIN")
                .help("GPIO pin connected to the serial device (bit-bang via pigpiod)"),
        )
        .arg(
            Arg::new("serial-port")
                .long("serial-port")
                .value_name("PATH")
                .help("Serial port connected to the serial device (e.g. /dev/ttyS0)"),
        )
        .arg(
            Arg::new("baud-rate")
                .long("baud-rate")
                .value_name("BPS")
                .default_value("9600")
                .help("Data transfer rate in bits per second (bps)"),
        )
        .arg(
            Arg::new("data-bits")
                .long("data-bits")
                .value_name("BITS")
                .default_value("8")
                .help("Number of data bits per frame (5, 6, 7, or 8)"),
        )
        .arg(
            Arg::new("pattern")
                .long("pattern")
                .value_name("REGEX")
                .default_value(r"^R(\d{4})$")
                .help("Pattern used for processing data (exactly one capture group)"),
        )
        .arg(
            Arg::new("mqtt-broker")
                .long("mqtt-broker")
                .value_name("HOST")
                .help("MQTT broker address (omit to print the reading to stdout)"),
        )
        .arg(
            Arg::new("mqtt-port")
                .long("mqtt-port")
                .value_name("PORT")
                .default_value("1883")
                .help("MQTT broker port (valid range: 1-65535)"),
        )
        .arg(
            Arg::new("mqtt-topic")
                .long("mqtt-topic")
                .value_name("TOPIC")
                .default_value("snowdata/921a_18")
                .help("MQTT topic to publish data to"),
        )
        .arg(
            Arg::new("mqtt-user")
                .long("mqtt-user")
                .value_name("USER")
                .help("Username for MQTT broker authentication"),
        )
        .arg(
            Arg::new("mqtt-password")
                .long("mqtt-password")
                .value_name("PASSWORD")
                .help("Password for MQTT broker authentication"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECONDS")
                .help("Acquisition timeout; defaults to 20s for UART, unbounded for GPIO"),
        )
        .arg(
            Arg::new("poll-interval-ms")
                .long("poll-interval-ms")
                .value_name("MS")
                .default_value("100")
                .help("Sleep between source polls in milliseconds"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .default_value("info")
                .help("Set logging verbosity level (debug, info, warn, error)"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Load settings from a TOML file; explicit flags override it"),
        )
}
