//! # Hardware Seams
//!
//! The interface core never touches a UART or a GPIO directly. It drives them
//! through the two traits in this module, so the same state machine runs over
//! a memory-mapped UART, the hosted [`SerialPortDevice`](crate::serial::SerialPortDevice)
//! or a test double.
//!
//! ## Interrupt model
//!
//! A [`SerialDevice`] delivers one callback, registered with
//! [`SerialDevice::set_irq_callback`], whenever it has something to report.
//! The callback is the interrupt service routine: it asks the device which
//! condition is pending through [`SerialDevice::rx_ready`] and
//! [`SerialDevice::tx_ready`] and moves bytes with the FIFO methods. It must
//! never block, so implementations have to tolerate the FIFO methods being
//! called from inside the callback. The interrupt enable/disable methods and
//! `set_irq_callback` must not invoke the callback synchronously; the core
//! calls them while holding its buffer lock.
//!
//! ## Direction control
//!
//! RS-485 transceivers expose a driver-enable (DE) and a receiver-enable (RE)
//! line. [`OutputLine`] levels are logical: `true` means asserted, i.e. driver
//! on for DE and receiver on for RE. Active-low wiring belongs in the
//! implementation.

use std::sync::Arc;

use crate::error::ModbusResult;
use crate::protocol::LineConfig;

/// Interrupt callback registered by the interface core
pub type IrqCallback = Arc<dyn Fn() + Send + Sync>;

/// Interrupt-driven UART
///
/// All methods take `&self`; implementations synchronise internally.
pub trait SerialDevice: Send + Sync {
    /// Whether the device can be used
    fn is_ready(&self) -> bool;

    /// Apply baud rate, parity, stop bits and data bits
    fn configure(&self, line: &LineConfig) -> ModbusResult<()>;

    /// Install (or remove) the interrupt callback
    fn set_irq_callback(&self, callback: Option<IrqCallback>);

    fn enable_rx_interrupt(&self);
    fn disable_rx_interrupt(&self);
    fn enable_tx_interrupt(&self);
    fn disable_tx_interrupt(&self);

    /// RX interrupt enabled and at least one byte waiting in the FIFO
    fn rx_ready(&self) -> bool;

    /// TX interrupt enabled and the FIFO can accept at least one byte
    fn tx_ready(&self) -> bool;

    /// Whether every byte handed to the FIFO has left the shift register
    ///
    /// Devices that cannot tell report `true`.
    fn tx_complete(&self) -> bool {
        true
    }

    /// Move up to `buf.len()` received bytes into `buf`, returning the count
    fn fifo_read(&self, buf: &mut [u8]) -> usize;

    /// Hand up to `data.len()` bytes to the transmitter, returning the count
    fn fifo_fill(&self, data: &[u8]) -> usize;
}

/// Digital output driving a transceiver direction pin
pub trait OutputLine: Send + Sync {
    /// Whether the line can be used
    fn is_ready(&self) -> bool {
        true
    }

    /// Configure the pin as an output at the given logical level
    fn configure_as_output(&self, asserted: bool) -> ModbusResult<()>;

    /// Drive the pin to the given logical level
    fn set_level(&self, asserted: bool);
}

/// UART plus the optional direction lines of one bus attachment
#[derive(Clone)]
pub struct SerialLink {
    pub uart: Arc<dyn SerialDevice>,
    pub de: Option<Arc<dyn OutputLine>>,
    pub re: Option<Arc<dyn OutputLine>>,
}

impl SerialLink {
    /// Link without direction control (RS-232 or auto-direction RS-485)
    pub fn new(uart: Arc<dyn SerialDevice>) -> Self {
        Self {
            uart,
            de: None,
            re: None,
        }
    }

    /// Attach a driver-enable line
    pub fn with_de(mut self, line: Arc<dyn OutputLine>) -> Self {
        self.de = Some(line);
        self
    }

    /// Attach a receiver-enable line
    pub fn with_re(mut self, line: Arc<dyn OutputLine>) -> Self {
        self.re = Some(line);
        self
    }
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("de", &self.de.is_some())
            .field("re", &self.re.is_some())
            .finish()
    }
}
