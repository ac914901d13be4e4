pub mod channel;
pub mod classify;
pub mod clock;
pub mod compile;
pub mod config;
pub mod error;
pub mod power;
pub mod profile;

pub use config::BenchConfig;
pub use error::{BenchError, Result};
