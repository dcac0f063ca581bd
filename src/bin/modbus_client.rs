/// Modbus Serial Client
///
/// Author: Evan Liu <evan.liu@voltageenergy.com>
/// Sends one request over an RTU or ASCII serial line and prints the response.
///
/// Configuration comes from a YAML/JSON file named by `MODBUS_CONFIG`, or from
/// the individual environment variables below:
///
/// - `MODBUS_PORT` (default `/dev/ttyUSB0`)
/// - `MODBUS_ENCODING` (`rtu` or `ascii`, default `rtu`)
/// - `MODBUS_BAUD` (default 9600)
/// - `MODBUS_TIMEOUT_MS` (default 1000)
/// - `MODBUS_SLAVE_ID` (default 1)
/// - `MODBUS_FUNCTION` (hex function code, default `03`)
/// - `MODBUS_PAYLOAD` (hex payload, default `00000001`)
/// - `MODBUS_REPEAT` (number of requests, default 1)

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{error, info};

use voltage_modbus_serial::utils::format::format_metrics;
use voltage_modbus_serial::{
    CallbackLogger, Encoding, InterfaceConfig, LogicalFrame, Registry, Role, SerialLink,
    SerialPortDevice,
};

struct ClientOptions {
    port: String,
    interface: InterfaceConfig,
    slave_id: u8,
    function_code: u8,
    payload: Vec<u8>,
    repeat: u32,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl ClientOptions {
    /// Load options from the environment
    fn from_env() -> Result<Self> {
        let interface = match env::var("MODBUS_CONFIG") {
            Ok(path) => InterfaceConfig::from_file(&path)
                .with_context(|| format!("loading interface configuration from {}", path))?,
            Err(_) => {
                let encoding = match env::var("MODBUS_ENCODING").as_deref() {
                    Ok("ascii") | Ok("ASCII") => Encoding::Ascii,
                    _ => Encoding::Rtu,
                };
                InterfaceConfig::client(
                    encoding,
                    env_or("MODBUS_BAUD", 9600),
                    Duration::from_millis(env_or("MODBUS_TIMEOUT_MS", 1000)),
                )
            }
        };
        if interface.role != Role::Client {
            bail!("configuration describes a {} interface, expected client", interface.role);
        }

        let function = env::var("MODBUS_FUNCTION").unwrap_or_else(|_| "03".to_string());
        let function_code = u8::from_str_radix(function.trim_start_matches("0x"), 16)
            .with_context(|| format!("invalid function code {}", function))?;
        let payload = hex::decode(env::var("MODBUS_PAYLOAD").unwrap_or_else(|_| "00000001".to_string()))
            .context("MODBUS_PAYLOAD must be hex")?;

        Ok(Self {
            port: env::var("MODBUS_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string()),
            interface,
            slave_id: env_or("MODBUS_SLAVE_ID", 1),
            function_code,
            payload,
            repeat: env_or("MODBUS_REPEAT", 1),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let options = ClientOptions::from_env()?;
    println!("Voltage Modbus Serial Client");
    println!("============================");
    println!("Port: {} ({} @ {} baud)", options.port, options.interface.encoding, options.interface.baud_rate);

    let registry = Registry::new()?;
    let uart = Arc::new(SerialPortDevice::new(&options.port)?);
    let iface = registry
        .configure(0, &options.interface, SerialLink::new(uart), None)
        .with_context(|| format!("configuring {}", options.port))?;
    iface.set_logger(Some(CallbackLogger::console()));

    let request = LogicalFrame::new(options.slave_id, options.function_code, options.payload)?;

    for round in 1..=options.repeat {
        match iface.request(&request).await {
            Ok(response) => info!("[{}] {}", round, response),
            Err(e) => error!("[{}] {}", round, e),
        }
    }

    println!("{}", format_metrics(&iface.metrics()));
    println!("{}", serde_json::to_string_pretty(&iface.stats())?);

    registry.disable(0)?;
    Ok(())
}
