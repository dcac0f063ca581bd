/// Modbus serial protocol definitions and data structures
///
/// This module contains the logical frame record shared by both wire
/// encodings, plus the role/encoding/line-discipline enumerations used to
/// configure an interface.

use serde::{Deserialize, Serialize};
use std::fmt;
use crate::error::{ModbusError, ModbusResult};

/// Modbus slave/unit identifier (1-247, 0 = broadcast)
pub type SlaveId = u8;

/// Broadcast address; servers process but never answer it
pub const BROADCAST_ADDRESS: SlaveId = 0;

/// Capacity of the per-interface byte buffer
pub const BUFFER_CAPACITY: usize = 256;

/// Address + function code + 2-byte CRC
pub const RTU_ENVELOPE_SIZE: usize = 4;

/// Smallest valid RTU frame (empty payload)
pub const RTU_MIN_FRAME_SIZE: usize = RTU_ENVELOPE_SIZE;

/// Largest payload a logical frame may carry
pub const MAX_PAYLOAD: usize = BUFFER_CAPACITY - RTU_ENVELOPE_SIZE;

/// ASCII start marker
pub const ASCII_START: u8 = b':';

/// ASCII end markers
pub const ASCII_END: [u8; 2] = [b'\r', b'\n'];

/// Smallest valid ASCII frame: `:` + address + function + LRC (hex) + CR LF
pub const ASCII_MIN_FRAME_SIZE: usize = 1 + 2 + 2 + 2 + 2;

/// Modbus node role on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Bus master issuing requests and waiting for responses
    Client,
    /// Bus slave answering requests addressed to its node address
    Server,
}

impl Role {
    /// Lower-case role name
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Server => "server",
        }
    }

    /// Whether support for this role was compiled in
    pub fn is_supported(self) -> bool {
        match self {
            Role::Client => cfg!(feature = "client"),
            Role::Server => cfg!(feature = "server"),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire encoding of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Binary frames, CRC16 checked, delimited by line silence
    #[default]
    Rtu,
    /// Hex text frames, LRC8 checked, delimited by `:` and CR LF
    Ascii,
}

impl Encoding {
    /// Data bits per character for this encoding
    pub fn data_bits(self) -> DataBits {
        match self {
            Encoding::Rtu => DataBits::Eight,
            Encoding::Ascii => DataBits::Seven,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::Rtu => f.write_str("RTU"),
            Encoding::Ascii => f.write_str("ASCII"),
        }
    }
}

/// Serial parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    #[default]
    Even,
    Odd,
}

/// Serial stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopBits {
    #[serde(rename = "1")]
    One,
    #[serde(rename = "2")]
    Two,
}

impl StopBits {
    /// Modbus line discipline: two stop bits without parity, one otherwise
    pub fn for_parity(parity: Parity) -> Self {
        match parity {
            Parity::None => StopBits::Two,
            Parity::Even | Parity::Odd => StopBits::One,
        }
    }
}

/// Serial data bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataBits {
    Seven,
    Eight,
}

/// Complete UART line setup handed to the serial device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineConfig {
    pub baud_rate: u32,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub data_bits: DataBits,
}

/// Logical Modbus serial frame
///
/// The envelope-independent view of a frame: address, function code and
/// payload. `checksum` holds the CRC16 (RTU) or the widened LRC8 (ASCII) of the
/// last encode or decode; it is zero on a freshly built frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogicalFrame {
    pub address: SlaveId,
    pub function_code: u8,
    pub payload: Vec<u8>,
    pub checksum: u16,
}

impl LogicalFrame {
    /// Create a new frame, rejecting payloads that cannot fit the buffer
    ///
    /// # Examples
    ///
    /// ```rust
    /// use voltage_modbus_serial::LogicalFrame;
    ///
    /// let frame = LogicalFrame::new(0x11, 0x03, vec![0x00, 0x6B, 0x00, 0x03])?;
    /// assert_eq!(frame.payload.len(), 4);
    /// # Ok::<(), voltage_modbus_serial::ModbusError>(())
    /// ```
    pub fn new(address: SlaveId, function_code: u8, payload: Vec<u8>) -> ModbusResult<Self> {
        if payload.len() > MAX_PAYLOAD {
            return Err(ModbusError::invalid_data(format!(
                "Payload of {} bytes exceeds maximum {}",
                payload.len(),
                MAX_PAYLOAD
            )));
        }
        Ok(Self {
            address,
            function_code,
            payload,
            checksum: 0,
        })
    }

    /// Check if the frame targets every node on the bus
    pub fn is_broadcast(&self) -> bool {
        self.address == BROADCAST_ADDRESS
    }

    /// Check if the function code carries the exception flag
    pub fn is_exception(&self) -> bool {
        self.function_code & 0x80 != 0
    }

    /// Address, function code and payload as contiguous bytes
    pub fn body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(2 + self.payload.len());
        body.push(self.address);
        body.push(self.function_code);
        body.extend_from_slice(&self.payload);
        body
    }
}

impl fmt::Display for LogicalFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "addr={} fc=0x{:02X} payload=[{}]",
            self.address,
            self.function_code,
            crate::utils::format::bytes_to_hex(&self.payload)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = LogicalFrame::new(0x01, 0x03, vec![0x00, 0x00, 0x00, 0x02]).unwrap();
        assert_eq!(frame.body(), vec![0x01, 0x03, 0x00, 0x00, 0x00, 0x02]);
        assert!(!frame.is_broadcast());
        assert!(!frame.is_exception());

        assert!(LogicalFrame::new(0x01, 0x03, vec![0; MAX_PAYLOAD]).is_ok());
        assert!(LogicalFrame::new(0x01, 0x03, vec![0; MAX_PAYLOAD + 1]).is_err());
    }

    #[test]
    fn test_line_discipline() {
        assert_eq!(StopBits::for_parity(Parity::None), StopBits::Two);
        assert_eq!(StopBits::for_parity(Parity::Even), StopBits::One);
        assert_eq!(StopBits::for_parity(Parity::Odd), StopBits::One);
        assert_eq!(Encoding::Rtu.data_bits(), DataBits::Eight);
        assert_eq!(Encoding::Ascii.data_bits(), DataBits::Seven);
    }

    #[test]
    fn test_display() {
        let frame = LogicalFrame::new(0x05, 0x83, vec![0x02]).unwrap();
        assert!(frame.is_exception());
        assert_eq!(frame.to_string(), "addr=5 fc=0x83 payload=[02]");
        assert_eq!(Role::Server.to_string(), "server");
        assert_eq!(Encoding::Ascii.to_string(), "ASCII");
    }
}
