//! # Modbus Serial Frame Codec
//!
//! Converts between [`LogicalFrame`] records and the two serial wire encodings.
//!
//! ## RTU Frame Format
//!
//! ```text
//! Address -> Function -> Data -> CRC (low, high)
//!   11          03      006B0003   76 87
//! ```
//!
//! The frame has no length field; the receiver learns where it ends from line
//! silence. CRC16 covers every byte before it.
//!
//! ## ASCII Frame Format
//!
//! ```text
//! Start -> Address -> Function -> Data -> LRC -> End
//!   :        05         03       006B0003  8A   \r\n
//! ```
//!
//! Every binary byte becomes two hex characters, most significant nibble first.
//! LRC8 covers the binary address, function code and payload.

use crate::buffer::ByteBuffer;
use crate::checksum::{crc16, lrc8};
use crate::error::{FrameError, ModbusError, ModbusResult};
use crate::protocol::{
    Encoding, LogicalFrame, ASCII_END, ASCII_MIN_FRAME_SIZE, ASCII_START, BUFFER_CAPACITY,
    RTU_ENVELOPE_SIZE, RTU_MIN_FRAME_SIZE,
};

impl Encoding {
    /// Encode `frame` into `buf`, replacing its contents
    ///
    /// The computed checksum is written back into `frame.checksum`.
    pub fn encode(self, frame: &mut LogicalFrame, buf: &mut ByteBuffer) -> ModbusResult<()> {
        match self {
            Encoding::Rtu => encode_rtu(frame, buf),
            Encoding::Ascii => encode_ascii(frame, buf),
        }
    }

    /// Decode the bytes captured in `buf`
    ///
    /// For RTU, a buffer that refused bytes is reported as
    /// [`FrameError::FrameTooLong`]. ASCII capture ignores excess bytes, which
    /// then fail the length or marker checks.
    pub fn decode(self, buf: &ByteBuffer) -> Result<LogicalFrame, FrameError> {
        match self {
            Encoding::Rtu => {
                if buf.overflowed() {
                    return Err(FrameError::FrameTooLong {
                        len: buf.len() + buf.dropped(),
                        max: buf.capacity(),
                    });
                }
                decode_rtu(buf.as_slice())
            }
            Encoding::Ascii => decode_ascii(buf.as_slice()),
        }
    }
}

/// Convert byte to 2-character upper-case ASCII hex
fn byte_to_ascii_hex(byte: u8) -> [u8; 2] {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    [DIGITS[(byte >> 4) as usize], DIGITS[(byte & 0x0F) as usize]]
}

fn payload_too_long(frame: &LogicalFrame, max: usize, encoding: Encoding) -> ModbusError {
    ModbusError::invalid_data(format!(
        "{} payload of {} bytes exceeds maximum {}",
        encoding,
        frame.payload.len(),
        max
    ))
}

/// Encode an RTU frame: address, function code, payload, CRC low, CRC high
pub fn encode_rtu(frame: &mut LogicalFrame, buf: &mut ByteBuffer) -> ModbusResult<()> {
    let max = BUFFER_CAPACITY - RTU_ENVELOPE_SIZE;
    if frame.payload.len() > max {
        return Err(payload_too_long(frame, max, Encoding::Rtu));
    }

    buf.reset();
    buf.push(frame.address);
    buf.push(frame.function_code);
    buf.extend_from_slice(&frame.payload);

    let crc = crc16(buf.as_slice());
    buf.extend_from_slice(&crc.to_le_bytes());
    frame.checksum = crc;
    Ok(())
}

/// Decode a captured RTU byte run
pub fn decode_rtu(bytes: &[u8]) -> Result<LogicalFrame, FrameError> {
    let len = bytes.len();
    if len < RTU_MIN_FRAME_SIZE {
        return Err(FrameError::FrameTooShort { len, min: RTU_MIN_FRAME_SIZE });
    }
    if len > BUFFER_CAPACITY {
        return Err(FrameError::FrameTooLong { len, max: BUFFER_CAPACITY });
    }

    let data_len = len - 2;
    let received = u16::from_le_bytes([bytes[data_len], bytes[data_len + 1]]);
    let calculated = crc16(&bytes[..data_len]);
    if received != calculated {
        return Err(FrameError::ChecksumMismatch {
            expected: calculated,
            actual: received,
        });
    }

    Ok(LogicalFrame {
        address: bytes[0],
        function_code: bytes[1],
        payload: bytes[2..data_len].to_vec(),
        checksum: received,
    })
}

/// Encode an ASCII frame: `:`, hex body, hex LRC, CR LF
pub fn encode_ascii(frame: &mut LogicalFrame, buf: &mut ByteBuffer) -> ModbusResult<()> {
    let max = (BUFFER_CAPACITY - ASCII_MIN_FRAME_SIZE) / 2;
    if frame.payload.len() > max {
        return Err(payload_too_long(frame, max, Encoding::Ascii));
    }

    let body = frame.body();
    let lrc = lrc8(&body);

    buf.reset();
    buf.push(ASCII_START);
    for &byte in &body {
        buf.extend_from_slice(&byte_to_ascii_hex(byte));
    }
    buf.extend_from_slice(&byte_to_ascii_hex(lrc));
    buf.extend_from_slice(&ASCII_END);
    frame.checksum = lrc as u16;
    Ok(())
}

/// Decode a captured ASCII byte run, markers included
pub fn decode_ascii(bytes: &[u8]) -> Result<LogicalFrame, FrameError> {
    let len = bytes.len();
    // ':' plus CR LF is three bytes, so an even hex body means an odd total
    if len % 2 == 0 {
        return Err(FrameError::OddLength { len });
    }
    if len < ASCII_MIN_FRAME_SIZE {
        return Err(FrameError::FrameTooShort { len, min: ASCII_MIN_FRAME_SIZE });
    }
    if bytes[0] != ASCII_START || bytes[len - 2..] != ASCII_END {
        return Err(FrameError::FrameMarkerError);
    }

    let hex_body = &bytes[1..len - 2];
    let mut raw = [0u8; BUFFER_CAPACITY / 2];
    let raw_len = hex_body.len() / 2;
    hex::decode_to_slice(hex_body, &mut raw[..raw_len]).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { c, .. } => FrameError::InvalidHexDigit { byte: c as u8 },
        hex::FromHexError::OddLength => FrameError::OddLength { len },
        _ => FrameError::FrameTooLong { len, max: BUFFER_CAPACITY },
    })?;

    let (data, lrc) = raw[..raw_len].split_at(raw_len - 1);
    let received = lrc[0];
    let calculated = lrc8(data);
    if received != calculated {
        return Err(FrameError::ChecksumMismatch {
            expected: calculated as u16,
            actual: received as u16,
        });
    }

    Ok(LogicalFrame {
        address: data[0],
        function_code: data[1],
        payload: data[2..].to_vec(),
        checksum: received as u16,
    })
}
