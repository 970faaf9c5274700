pub mod gpio;
pub mod pigpio;
pub mod traits;
pub mod uart;

pub use gpio::GpioBitBangSource;
pub use pigpio::PigpioClient;
pub use traits::ByteSource;
pub use uart::UartSource;
