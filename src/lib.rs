//! # Voltage Modbus Serial - Modbus RTU/ASCII Transport Core
//!
//! **Author:** Evan Liu <evan.liu@voltageenergy.com>
//! **Version:** 0.3.0
//! **License:** MIT
//!
//! Interrupt-driven Modbus serial line core for RS-232/RS-485 links: framing,
//! checksums, inter-frame silence detection, half-duplex direction control and
//! the hand-off between interrupt context and deferred processing.
//!
//! ## Features
//!
//! - **🔧 Both Encodings**: RTU (binary, CRC16, silence delimited) and ASCII
//!   (hex text, LRC8, `:` ... CR LF delimited)
//! - **⏱️ Silence Detection**: 3.5 character window derived from the baud rate
//! - **🔀 Direction Control**: optional DE/RE lines toggled around every frame
//! - **🧩 Hardware Seams**: any UART behind [`SerialDevice`], plus a hosted
//!   backend over `tokio-serial`
//! - **📊 Built-in Monitoring**: per-interface counters and exchange timing
//!
//! Function-code semantics (register maps, exception generation) live above
//! this crate: clients send a [`LogicalFrame`] and get one back, servers
//! receive one in a [`RequestHandler`] and may queue a response.
//!
//! ## Quick Start
//!
//! ### Client Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use voltage_modbus_serial::{
//!     Encoding, InterfaceConfig, LogicalFrame, ModbusResult, Registry, SerialLink,
//!     SerialPortDevice,
//! };
//!
//! #[tokio::main]
//! async fn main() -> ModbusResult<()> {
//!     let registry = Registry::new()?;
//!     let uart = Arc::new(SerialPortDevice::new("/dev/ttyUSB0")?);
//!     let config = InterfaceConfig::client(Encoding::Rtu, 19200, Duration::from_millis(500));
//!     let iface = registry.configure(0, &config, SerialLink::new(uart), None)?;
//!
//!     // Read 3 holding registers at 0x006B from node 17
//!     let request = LogicalFrame::new(0x11, 0x03, vec![0x00, 0x6B, 0x00, 0x03])?;
//!     let response = iface.request(&request).await?;
//!     println!("Response: {}", response);
//!     Ok(())
//! }
//! ```
//!
//! ### Server Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voltage_modbus_serial::{
//!     Encoding, FrameError, Interface, InterfaceConfig, LogicalFrame, Registry,
//!     RequestHandler, SerialLink, SerialPortDevice,
//! };
//!
//! struct Echo;
//!
//! impl RequestHandler for Echo {
//!     fn handle_request(&self, iface: &Interface, request: Result<&LogicalFrame, FrameError>) -> bool {
//!         match request {
//!             Ok(frame) => iface.queue_response(frame).is_ok(),
//!             Err(_) => false,
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::new()?;
//!     let uart = Arc::new(SerialPortDevice::new("/dev/ttyUSB1")?);
//!     let config = InterfaceConfig::server(Encoding::Ascii, 5, 9600);
//!     registry.configure(1, &config, SerialLink::new(uart), Some(Arc::new(Echo)))?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │  Client Caller  │    │ Request Handler │
//! └─────────────────┘    └─────────────────┘
//!          │                       ▲
//! ┌─────────────────────────────────────────┐
//! │   Registry + Deferred Worker (Tokio)    │
//! └─────────────────────────────────────────┘
//!          │                       ▲
//! ┌─────────────────┐    ┌─────────────────┐
//! │  Frame Codec    │    │ Silence Timer   │
//! │  (RTU/ASCII)    │    │   (RTU only)    │
//! └─────────────────┘    └─────────────────┘
//!          │                       ▲
//! ┌─────────────────────────────────────────┐
//! │   Interrupt Path: UART FIFO + DE/RE     │
//! └─────────────────────────────────────────┘
//! ```

/// Core error types and result handling
///
/// Author: Evan Liu <evan.liu@voltageenergy.com>
pub mod error;

/// CRC16 and LRC8 checksum engines
///
/// Author: Evan Liu <evan.liu@voltageenergy.com>
pub mod checksum;

/// Logical frame, roles, encodings and line parameters
///
/// Author: Evan Liu <evan.liu@voltageenergy.com>
pub mod protocol;

/// Fixed-capacity frame buffer
pub mod buffer;

/// RTU and ASCII frame encoding and decoding
///
/// Author: Evan Liu <evan.liu@voltageenergy.com>
pub mod codec;

/// Inter-frame silence window and timer
pub mod timing;

/// UART and GPIO abstractions
///
/// Author: Evan Liu <evan.liu@voltageenergy.com>
pub mod hal;

mod transceiver;

/// Per-interface state machine, client exchanges and server dispatch
///
/// Author: Evan Liu <evan.liu@voltageenergy.com>
pub mod interface;

/// Interface registry and deferred worker
///
/// Author: Evan Liu <evan.liu@voltageenergy.com>
pub mod registry;

/// Serde-backed interface configuration
pub mod config;

/// Hosted serial port backend over tokio-serial
///
/// Author: Evan Liu <evan.liu@voltageenergy.com>
pub mod serial;

/// Utility functions and helpers
///
/// Author: Evan Liu <evan.liu@voltageenergy.com>
pub mod utils;

/// Callback-based logging system
///
/// Author: Evan Liu <evan.liu@voltageenergy.com>
pub mod logging;

// Re-export main types for convenience
pub use error::{FrameError, ModbusError, ModbusResult};
pub use protocol::{
    DataBits, Encoding, LineConfig, LogicalFrame, Parity, Role, SlaveId, StopBits,
    BROADCAST_ADDRESS,
};
pub use buffer::ByteBuffer;
pub use checksum::{crc16, lrc8};
pub use timing::{silence_window, SilenceTimer};
pub use hal::{IrqCallback, OutputLine, SerialDevice, SerialLink};
pub use interface::{Interface, InterfaceStats, Phase, RequestHandler};
pub use registry::{Registry, MAX_INTERFACES};
pub use config::InterfaceConfig;
pub use serial::SerialPortDevice;
pub use utils::{ExchangeMetrics, OperationTimer};
pub use logging::{CallbackLogger, Direction, LogCallback, LogLevel, LoggingMode};

/// Default client response timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = config::DEFAULT_RX_TIMEOUT_MS;

/// Largest RTU frame on the wire
pub const MAX_RTU_FRAME_SIZE: usize = protocol::BUFFER_CAPACITY;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
