//! Logging abstractions so the engine can report through the host's logger

mod traits;
mod noop;
mod console;

pub use traits::{Logger, SharedLogger};
pub use noop::NoOpLogger;
pub use console::{ConsoleLogger, LogLevel};
