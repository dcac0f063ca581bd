/// Utility functions and helpers for serial Modbus operations
///
/// This module contains exchange metrics, parameter validation and
/// formatting helpers shared by the interface core and the binaries.

use std::time::{Duration, Instant};
use log::debug;
use serde::Serialize;
use crate::error::{ModbusError, ModbusResult};

/// Timing metrics for client exchanges
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExchangeMetrics {
    pub total_exchanges: u64,
    pub successful_exchanges: u64,
    pub failed_exchanges: u64,
    pub total_duration: Duration,
    pub min_duration: Option<Duration>,
    pub max_duration: Option<Duration>,
    pub avg_duration: Duration,
}

impl ExchangeMetrics {
    /// Create new empty metrics
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed exchange
    pub fn record_success(&mut self, duration: Duration) {
        self.total_exchanges += 1;
        self.successful_exchanges += 1;
        self.total_duration += duration;

        self.min_duration = Some(
            self.min_duration.map_or(duration, |min| min.min(duration))
        );
        self.max_duration = Some(
            self.max_duration.map_or(duration, |max| max.max(duration))
        );

        self.update_average();
    }

    /// Record a failed exchange (timeout or bad response)
    pub fn record_failure(&mut self, duration: Duration) {
        self.total_exchanges += 1;
        self.failed_exchanges += 1;
        self.total_duration += duration;

        self.update_average();
    }

    fn update_average(&mut self) {
        if self.total_exchanges > 0 {
            self.avg_duration = self.total_duration / self.total_exchanges as u32;
        }
    }

    /// Get success rate as percentage
    pub fn success_rate(&self) -> f64 {
        if self.total_exchanges == 0 {
            return 0.0;
        }
        (self.successful_exchanges as f64 / self.total_exchanges as f64) * 100.0
    }

    /// Reset all metrics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Timer for measuring operation duration
pub struct OperationTimer {
    start: Instant,
    operation_name: String,
}

impl OperationTimer {
    /// Start a new timer
    pub fn start(operation_name: &str) -> Self {
        debug!("Starting operation: {}", operation_name);
        Self {
            start: Instant::now(),
            operation_name: operation_name.to_string(),
        }
    }

    /// Stop the timer and return duration
    pub fn stop(self) -> Duration {
        let duration = self.start.elapsed();
        debug!("Operation '{}' completed in {:?}", self.operation_name, duration);
        duration
    }
}

/// Parameter validation utilities
pub mod validation {
    use super::*;

    /// Validate a server node address (1-247)
    pub fn validate_node_address(address: u8) -> ModbusResult<()> {
        if address == 0 || address > 247 {
            return Err(ModbusError::configuration(
                format!("Invalid node address: {} (must be 1-247)", address)
            ));
        }
        Ok(())
    }

    /// Validate a baud rate
    pub fn validate_baud_rate(baud_rate: u32) -> ModbusResult<()> {
        if baud_rate == 0 {
            return Err(ModbusError::configuration("Baud rate must be non-zero"));
        }
        Ok(())
    }

    /// Validate a client response timeout
    pub fn validate_timeout(timeout: Duration) -> ModbusResult<()> {
        if timeout.is_zero() {
            return Err(ModbusError::configuration("Response timeout must be non-zero"));
        }
        Ok(())
    }
}

/// Formatting and display utilities
pub mod format {
    use super::*;

    /// Format byte array as hex string
    pub fn bytes_to_hex(bytes: &[u8]) -> String {
        bytes.iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render an ASCII frame for logs, escaping CR and LF
    pub fn ascii_frame(bytes: &[u8]) -> String {
        bytes.iter()
            .map(|&b| match b {
                b'\r' => "\\r".to_string(),
                b'\n' => "\\n".to_string(),
                0x20..=0x7E => (b as char).to_string(),
                other => format!("\\x{:02X}", other),
            })
            .collect()
    }

    /// Format duration in a human-readable way
    pub fn format_duration(duration: Duration) -> String {
        let millis = duration.as_millis();
        if millis < 1000 {
            format!("{}ms", millis)
        } else if millis < 60_000 {
            format!("{:.2}s", duration.as_secs_f64())
        } else {
            let mins = millis / 60_000;
            let secs = (millis % 60_000) as f64 / 1000.0;
            format!("{}m {:.1}s", mins, secs)
        }
    }

    /// Format exchange metrics as a table
    pub fn format_metrics(metrics: &ExchangeMetrics) -> String {
        format!(
            "Exchange Metrics:\n\
             ├─ Total Exchanges: {}\n\
             ├─ Successful: {} ({:.1}%)\n\
             ├─ Failed: {}\n\
             ├─ Average Duration: {}\n\
             ├─ Min Duration: {}\n\
             └─ Max Duration: {}",
            metrics.total_exchanges,
            metrics.successful_exchanges,
            metrics.success_rate(),
            metrics.failed_exchanges,
            format_duration(metrics.avg_duration),
            metrics.min_duration.map_or("N/A".to_string(), format_duration),
            metrics.max_duration.map_or("N/A".to_string(), format_duration),
        )
    }
}

/// Logging utilities
pub mod logging {
    /// Initialize simple logger for testing
    pub fn init_test_logger() {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exchange_metrics() {
        let mut metrics = ExchangeMetrics::new();

        metrics.record_success(Duration::from_millis(100));
        metrics.record_success(Duration::from_millis(200));
        metrics.record_failure(Duration::from_millis(150));

        assert_eq!(metrics.total_exchanges, 3);
        assert_eq!(metrics.successful_exchanges, 2);
        assert_eq!(metrics.failed_exchanges, 1);
        assert_eq!(metrics.min_duration, Some(Duration::from_millis(100)));
        assert_eq!(metrics.max_duration, Some(Duration::from_millis(200)));
        assert_eq!(metrics.avg_duration, Duration::from_millis(150));
        assert!((metrics.success_rate() - 66.67).abs() < 0.1);

        metrics.reset();
        assert_eq!(metrics.total_exchanges, 0);
    }

    #[test]
    fn test_validation() {
        assert!(validation::validate_node_address(1).is_ok());
        assert!(validation::validate_node_address(247).is_ok());
        assert!(validation::validate_node_address(0).is_err());
        assert!(validation::validate_node_address(248).is_err());

        assert!(validation::validate_baud_rate(9600).is_ok());
        assert!(validation::validate_baud_rate(0).is_err());

        assert!(validation::validate_timeout(Duration::from_millis(1)).is_ok());
        assert!(validation::validate_timeout(Duration::ZERO).is_err());
    }

    #[test]
    fn test_formatting() {
        let bytes = vec![0x01, 0x03, 0x10, 0xFF];
        assert_eq!(format::bytes_to_hex(&bytes), "01 03 10 FF");
        assert_eq!(format::ascii_frame(b":0103FC\r\n"), ":0103FC\\r\\n");

        let duration = Duration::from_millis(1500);
        assert_eq!(format::format_duration(duration), "1.50s");
    }
}
