//! # Interface Configuration
//!
//! [`InterfaceConfig`] carries everything `Registry::configure` needs apart from
//! the hardware handles: role, encoding, node address, line parameters and the
//! client response timeout. It is serde-friendly so deployments can keep bus
//! settings in YAML or JSON next to the binaries.
//!
//! ```yaml
//! role: server
//! encoding: ascii
//! node_address: 5
//! baud_rate: 9600
//! parity: none
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ModbusError, ModbusResult};
use crate::protocol::{Encoding, LineConfig, Parity, Role, SlaveId, StopBits};
use crate::utils::validation;

/// Default client response timeout
pub const DEFAULT_RX_TIMEOUT_MS: u64 = 1000;

fn default_rx_timeout_ms() -> u64 {
    DEFAULT_RX_TIMEOUT_MS
}

/// Configuration of one registry slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceConfig {
    pub role: Role,
    #[serde(default)]
    pub encoding: Encoding,
    /// Own address; required for servers, ignored for clients
    #[serde(default)]
    pub node_address: Option<SlaveId>,
    pub baud_rate: u32,
    #[serde(default)]
    pub parity: Parity,
    /// Explicit stop bits; only clients may override the parity-derived value
    #[serde(default)]
    pub stop_bits: Option<StopBits>,
    /// Client response timeout in milliseconds
    #[serde(default = "default_rx_timeout_ms")]
    pub rx_timeout_ms: u64,
    /// Keep the receiver enabled while transmitting
    #[serde(default)]
    pub full_duplex: bool,
}

impl InterfaceConfig {
    /// Client configuration with even parity
    pub fn client(encoding: Encoding, baud_rate: u32, rx_timeout: Duration) -> Self {
        Self {
            role: Role::Client,
            encoding,
            node_address: None,
            baud_rate,
            parity: Parity::default(),
            stop_bits: None,
            rx_timeout_ms: rx_timeout.as_millis() as u64,
            full_duplex: false,
        }
    }

    /// Server configuration with even parity
    pub fn server(encoding: Encoding, node_address: SlaveId, baud_rate: u32) -> Self {
        Self {
            role: Role::Server,
            encoding,
            node_address: Some(node_address),
            baud_rate,
            parity: Parity::default(),
            stop_bits: None,
            rx_timeout_ms: DEFAULT_RX_TIMEOUT_MS,
            full_duplex: false,
        }
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = Some(stop_bits);
        self
    }

    pub fn with_full_duplex(mut self, full_duplex: bool) -> Self {
        self.full_duplex = full_duplex;
        self
    }

    /// Check the configuration for consistency
    pub fn validate(&self) -> ModbusResult<()> {
        validation::validate_baud_rate(self.baud_rate)?;
        match self.role {
            Role::Server => {
                let address = self.node_address.ok_or_else(|| {
                    ModbusError::configuration("Server role requires a node address")
                })?;
                validation::validate_node_address(address)?;
                if self.stop_bits.is_some() {
                    return Err(ModbusError::configuration(
                        "Stop bits override is only available to clients",
                    ));
                }
            }
            Role::Client => {
                validation::validate_timeout(self.rx_timeout())?;
            }
        }
        Ok(())
    }

    /// UART line setup derived from encoding, parity and stop bits
    pub fn line_config(&self) -> LineConfig {
        let stop_bits = match (self.role, self.stop_bits) {
            (Role::Client, Some(explicit)) => explicit,
            _ => StopBits::for_parity(self.parity),
        };
        LineConfig {
            baud_rate: self.baud_rate,
            parity: self.parity,
            stop_bits,
            data_bits: self.encoding.data_bits(),
        }
    }

    pub fn rx_timeout(&self) -> Duration {
        Duration::from_millis(self.rx_timeout_ms)
    }

    /// Load a configuration from a YAML or JSON file, chosen by extension
    pub fn from_file<P: AsRef<Path>>(path: P) -> ModbusResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    pub fn from_json_str(text: &str) -> ModbusResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(text: &str) -> ModbusResult<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::DataBits;

    #[test]
    fn test_line_config_derivation() {
        let ascii = InterfaceConfig::server(Encoding::Ascii, 5, 9600).with_parity(Parity::None);
        assert_eq!(
            ascii.line_config(),
            LineConfig {
                baud_rate: 9600,
                parity: Parity::None,
                stop_bits: StopBits::Two,
                data_bits: DataBits::Seven,
            }
        );

        let rtu = InterfaceConfig::client(Encoding::Rtu, 19200, Duration::from_millis(500));
        let line = rtu.line_config();
        assert_eq!(line.stop_bits, StopBits::One);
        assert_eq!(line.data_bits, DataBits::Eight);
    }

    #[test]
    fn test_client_stop_bits_override() {
        let client = InterfaceConfig::client(Encoding::Rtu, 9600, Duration::from_millis(100))
            .with_parity(Parity::None)
            .with_stop_bits(StopBits::One);
        assert!(client.validate().is_ok());
        assert_eq!(client.line_config().stop_bits, StopBits::One);

        let server = InterfaceConfig::server(Encoding::Rtu, 1, 9600).with_stop_bits(StopBits::One);
        assert!(server.validate().is_err());
    }

    #[test]
    fn test_validation() {
        assert!(InterfaceConfig::server(Encoding::Rtu, 0, 9600).validate().is_err());
        assert!(InterfaceConfig::server(Encoding::Rtu, 248, 9600).validate().is_err());
        assert!(InterfaceConfig::server(Encoding::Rtu, 1, 0).validate().is_err());
        assert!(InterfaceConfig::client(Encoding::Rtu, 9600, Duration::ZERO).validate().is_err());

        let mut missing = InterfaceConfig::server(Encoding::Rtu, 1, 9600);
        missing.node_address = None;
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_yaml_loading() {
        let config = InterfaceConfig::from_yaml_str(
            "role: server\nencoding: ascii\nnode_address: 5\nbaud_rate: 9600\nparity: none\n",
        )
        .unwrap();
        assert_eq!(config.role, Role::Server);
        assert_eq!(config.encoding, Encoding::Ascii);
        assert_eq!(config.node_address, Some(5));
        assert_eq!(config.rx_timeout_ms, DEFAULT_RX_TIMEOUT_MS);
        assert!(!config.full_duplex);

        let client = InterfaceConfig::from_yaml_str(
            "role: client\nbaud_rate: 19200\nstop_bits: \"2\"\nrx_timeout_ms: 250\n",
        )
        .unwrap();
        assert_eq!(client.encoding, Encoding::Rtu);
        assert_eq!(client.parity, Parity::Even);
        assert_eq!(client.stop_bits, Some(StopBits::Two));
        assert_eq!(client.rx_timeout(), Duration::from_millis(250));

        assert!(InterfaceConfig::from_yaml_str("role: client\nbaud_rate: 9600\nbogus: 1\n").is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = InterfaceConfig::server(Encoding::Rtu, 17, 38400).with_full_duplex(true);
        let json = serde_json::to_string(&config).unwrap();
        let back = InterfaceConfig::from_json_str(&json).unwrap();
        assert_eq!(back, config);

        // loaded configurations are validated
        let invalid = json.replace("\"node_address\":17", "\"node_address\":0");
        assert!(matches!(
            InterfaceConfig::from_json_str(&invalid),
            Err(ModbusError::Configuration { .. })
        ));
    }
}
