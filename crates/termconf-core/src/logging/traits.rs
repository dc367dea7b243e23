//! The logger seam between the engine and its host

use std::sync::Arc;

/// Where the configuration engine reports loads, saves and reloads
///
/// The engine never picks a sink itself. A host hands in [`NoOpLogger`],
/// [`ConsoleLogger`] or an adapter onto its own logging.
///
/// [`NoOpLogger`]: super::NoOpLogger
/// [`ConsoleLogger`]: super::ConsoleLogger
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// A logger shared by the service, its views and its listener task
pub type SharedLogger = Arc<dyn Logger>;

#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)*) => {
        $logger.error(&format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Capture {
        lines: Mutex<Vec<String>>,
    }

    impl Logger for Capture {
        fn debug(&self, message: &str) {
            self.lines.lock().push(format!("debug:{}", message));
        }
        fn info(&self, message: &str) {
            self.lines.lock().push(format!("info:{}", message));
        }
        fn warn(&self, message: &str) {
            self.lines.lock().push(format!("warn:{}", message));
        }
        fn error(&self, message: &str) {
            self.lines.lock().push(format!("error:{}", message));
        }
    }

    #[test]
    fn test_macros_route_by_level() {
        let capture = Capture::default();
        log_info!(capture, "loaded {} bytes", 42);
        log_warn!(capture, "stale key {}", "a.b");

        let shared: SharedLogger = Arc::new(Capture::default());
        log_error!(shared, "save failed: {}", "denied");
        log_debug!(capture, "ready");

        let lines = capture.lines.lock();
        assert_eq!(*lines, vec!["info:loaded 42 bytes", "warn:stale key a.b", "debug:ready"]);
    }
}
