//! Core types: ordered response maps, timestamps, tracing setup

pub mod time;
pub mod tracing;
pub mod value;

pub use time::{from_epoch_millis, parse_legacy, parse_timestamp};
pub use self::tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
pub use value::{ResponseMap, Value};
