use std::sync::Arc;

use crate::error::FrameError;
use crate::protocol::{Encoding, LogicalFrame};
use crate::utils::format::{ascii_frame, bytes_to_hex};

/// Log levels for the callback logging system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Error messages
    Error,
    /// Warning messages
    Warn,
    /// Informational messages
    Info,
    /// Debug messages
    Debug,
}

/// Logging mode for frame display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// Show wire bytes only
    Raw,
    /// Show the decoded frame fields
    Interpreted,
    /// Show both decoded fields and wire bytes
    Both,
}

impl LogLevel {
    /// Convert log level to string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Direction of a logged frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

impl Direction {
    fn arrow(self) -> &'static str {
        match self {
            Direction::Sent => "->",
            Direction::Received => "<-",
        }
    }
}

/// Type alias for log callback functions
///
/// The callback receives a log level and message string
pub type LogCallback = Box<dyn Fn(LogLevel, &str) + Send + Sync>;

/// Logger that uses callbacks for flexible logging
///
/// Attached per interface with
/// [`Interface::set_logger`](crate::interface::Interface::set_logger); it is
/// called from the deferred worker and from client tasks, never from the
/// interrupt path.
#[derive(Clone)]
pub struct CallbackLogger {
    callback: Option<Arc<LogCallback>>,
    min_level: LogLevel,
    mode: LoggingMode,
}

impl CallbackLogger {
    /// Create a new callback logger
    pub fn new(callback: Option<LogCallback>, min_level: LogLevel) -> Self {
        Self {
            callback: callback.map(Arc::new),
            min_level,
            mode: LoggingMode::Interpreted,
        }
    }

    /// Create a new callback logger with specific mode
    pub fn with_mode(callback: Option<LogCallback>, min_level: LogLevel, mode: LoggingMode) -> Self {
        Self {
            callback: callback.map(Arc::new),
            min_level,
            mode,
        }
    }

    /// Create a logger with default console output
    pub fn console() -> Self {
        let callback: LogCallback = Box::new(|level, message| {
            let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
            match level {
                LogLevel::Error => eprintln!("[{}] ERROR: {}", timestamp, message),
                LogLevel::Warn => eprintln!("[{}] WARN: {}", timestamp, message),
                LogLevel::Info => println!("[{}] INFO: {}", timestamp, message),
                LogLevel::Debug => println!("[{}] DEBUG: {}", timestamp, message),
            }
        });
        Self::new(Some(callback), LogLevel::Info)
    }

    /// Create a logger that outputs nothing (disabled)
    pub fn disabled() -> Self {
        Self::new(None, LogLevel::Error)
    }

    /// Set logging mode
    pub fn set_mode(&mut self, mode: LoggingMode) {
        self.mode = mode;
    }

    /// Get current logging mode
    pub fn get_mode(&self) -> LoggingMode {
        self.mode
    }

    /// Log a message at the specified level
    pub fn log(&self, level: LogLevel, message: &str) {
        if self.should_log(level) {
            if let Some(ref callback) = self.callback {
                callback(level, message);
            }
        }
    }

    /// Log an error message
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Log a warning message
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Log an info message
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Log a debug message
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Check if a message at the given level should be logged
    fn should_log(&self, level: LogLevel) -> bool {
        self.callback.is_some() && level as u8 <= self.min_level as u8
    }

    /// Whether the current mode needs the wire bytes
    pub fn wants_raw(&self) -> bool {
        self.callback.is_some() && matches!(self.mode, LoggingMode::Raw | LoggingMode::Both)
    }

    /// Log a frame that crossed the interface
    ///
    /// `wire` holds the encoded bytes; it may be empty when the mode does not
    /// need them.
    pub fn log_frame(&self, direction: Direction, encoding: Encoding, frame: &LogicalFrame, wire: &[u8]) {
        match self.mode {
            LoggingMode::Raw => {
                self.info(&self.raw_message(direction, encoding, wire));
            }
            LoggingMode::Interpreted => {
                self.info(&self.interpreted_message(direction, encoding, frame));
            }
            LoggingMode::Both => {
                self.info(&self.interpreted_message(direction, encoding, frame));
                self.debug(&self.raw_message(direction, encoding, wire));
            }
        }
    }

    /// Log a received byte run that failed to decode
    pub fn log_frame_error(&self, encoding: Encoding, error: &FrameError, wire: &[u8]) {
        let message = format!("Modbus {} frame <- rejected: {}", encoding, error);
        self.warn(&message);
        if self.wants_raw() {
            self.debug(&self.raw_message(Direction::Received, encoding, wire));
        }
    }

    fn raw_message(&self, direction: Direction, encoding: Encoding, wire: &[u8]) -> String {
        let rendered = match encoding {
            Encoding::Rtu => bytes_to_hex(wire),
            Encoding::Ascii => ascii_frame(wire),
        };
        format!("Modbus {} frame {} Raw: {}", encoding, direction.arrow(), rendered)
    }

    fn interpreted_message(&self, direction: Direction, encoding: Encoding, frame: &LogicalFrame) -> String {
        let kind = if frame.is_exception() {
            "Exception"
        } else {
            self.get_function_name(frame.function_code)
        };
        format!(
            "Modbus {} frame {} Node: {}, Function: {} (0x{:02X}), Payload: [{}], Checksum: 0x{:04X}",
            encoding,
            direction.arrow(),
            frame.address,
            kind,
            frame.function_code,
            bytes_to_hex(&frame.payload),
            frame.checksum
        )
    }

    /// Get human-readable function name
    fn get_function_name(&self, function_code: u8) -> &'static str {
        match function_code {
            0x01 => "Read Coils",
            0x02 => "Read Discrete Inputs",
            0x03 => "Read Holding Registers",
            0x04 => "Read Input Registers",
            0x05 => "Write Single Coil",
            0x06 => "Write Single Register",
            0x08 => "Diagnostics",
            0x0F => "Write Multiple Coils",
            0x10 => "Write Multiple Registers",
            _ => "Unknown Function",
        }
    }
}

impl Default for CallbackLogger {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for CallbackLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackLogger")
            .field("enabled", &self.callback.is_some())
            .field("min_level", &self.min_level)
            .field("mode", &self.mode)
            .finish()
    }
}

/// Convenience macro for creating a simple console logger
#[macro_export]
macro_rules! console_logger {
    () => {
        $crate::logging::CallbackLogger::console()
    };
}

/// Convenience macro for creating a custom logger
#[macro_export]
macro_rules! custom_logger {
    ($callback:expr) => {
        $crate::logging::CallbackLogger::new(Some($callback), $crate::logging::LogLevel::Info)
    };
    ($callback:expr, $level:expr) => {
        $crate::logging::CallbackLogger::new(Some($callback), $level)
    };
    ($callback:expr, $level:expr, $mode:expr) => {
        $crate::logging::CallbackLogger::with_mode(Some($callback), $level, $mode)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn capture(level: LogLevel, mode: LoggingMode) -> (CallbackLogger, Arc<Mutex<Vec<(LogLevel, String)>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let logger = CallbackLogger::with_mode(
            Some(Box::new(move |level: LogLevel, msg: &str| sink.lock().unwrap().push((level, msg.to_string())))),
            level,
            mode,
        );
        (logger, lines)
    }

    #[test]
    fn test_level_filtering() {
        let (logger, lines) = capture(LogLevel::Warn, LoggingMode::Interpreted);
        logger.debug("hidden");
        logger.info("hidden");
        logger.warn("shown");
        logger.error("shown");
        assert_eq!(lines.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_frame_modes() {
        let frame = LogicalFrame {
            address: 0x11,
            function_code: 0x03,
            payload: vec![0x00, 0x6B, 0x00, 0x03],
            checksum: 0x8776,
        };
        let wire = [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87];

        let (logger, lines) = capture(LogLevel::Debug, LoggingMode::Raw);
        logger.log_frame(Direction::Sent, Encoding::Rtu, &frame, &wire);
        assert_eq!(
            lines.lock().unwrap()[0].1,
            "Modbus RTU frame -> Raw: 11 03 00 6B 00 03 76 87"
        );

        let (logger, lines) = capture(LogLevel::Debug, LoggingMode::Both);
        logger.log_frame(Direction::Received, Encoding::Rtu, &frame, &wire);
        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].1.contains("Read Holding Registers"));
        assert!(lines[0].1.contains("Node: 17"));
        assert_eq!(lines[1].0, LogLevel::Debug);
    }

    #[test]
    fn test_switching_mode() {
        let frame = LogicalFrame::new(0x05, 0x03, vec![0x00, 0x6B, 0x00, 0x03]).unwrap();
        let (mut logger, lines) = capture(LogLevel::Info, LoggingMode::Interpreted);
        assert!(!logger.wants_raw());

        logger.set_mode(LoggingMode::Raw);
        assert_eq!(logger.get_mode(), LoggingMode::Raw);
        assert!(logger.wants_raw());
        logger.log_frame(Direction::Sent, Encoding::Ascii, &frame, b":0503006B00038A\r\n");
        assert_eq!(
            lines.lock().unwrap()[0].1,
            "Modbus ASCII frame -> Raw: :0503006B00038A\\r\\n"
        );
    }

    #[test]
    fn test_disabled_logger() {
        let logger = CallbackLogger::disabled();
        assert!(!logger.wants_raw());
        logger.error("nothing happens");
    }
}
