pub mod error;

pub use error::AcquireError;
