/// Modbus Serial Server
///
/// Author: Evan Liu <evan.liu@voltageenergy.com>
/// Listens on an RTU or ASCII serial line and echoes every request addressed to
/// its node, which makes it a loopback partner for `modbus_client`.
///
/// Configuration comes from a YAML/JSON file named by `MODBUS_CONFIG`, or from
/// `MODBUS_PORT`, `MODBUS_ENCODING`, `MODBUS_BAUD` and `MODBUS_SLAVE_ID`.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::{info, warn};
use tokio::signal;
use tokio::time::interval;

use voltage_modbus_serial::{
    CallbackLogger, Encoding, FrameError, Interface, InterfaceConfig, LogicalFrame, Registry,
    RequestHandler, Role, SerialLink, SerialPortDevice,
};

/// Echoes requests back; reports decode failures
struct EchoHandler;

impl RequestHandler for EchoHandler {
    fn handle_request(&self, iface: &Interface, request: Result<&LogicalFrame, FrameError>) -> bool {
        match request {
            Ok(frame) => match iface.queue_response(frame) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Failed to queue response: {}", e);
                    false
                }
            },
            Err(e) => {
                warn!("Discarding malformed request: {}", e);
                false
            }
        }
    }
}

fn load_config() -> Result<(String, InterfaceConfig)> {
    let port = env::var("MODBUS_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
    let config = match env::var("MODBUS_CONFIG") {
        Ok(path) => InterfaceConfig::from_file(&path)
            .with_context(|| format!("loading interface configuration from {}", path))?,
        Err(_) => {
            let encoding = match env::var("MODBUS_ENCODING").as_deref() {
                Ok("ascii") | Ok("ASCII") => Encoding::Ascii,
                _ => Encoding::Rtu,
            };
            let baud = env::var("MODBUS_BAUD").ok().and_then(|v| v.parse().ok()).unwrap_or(9600);
            let node = env::var("MODBUS_SLAVE_ID").ok().and_then(|v| v.parse().ok()).unwrap_or(1);
            InterfaceConfig::server(encoding, node, baud)
        }
    };
    if config.role != Role::Server {
        bail!("configuration describes a {} interface, expected server", config.role);
    }
    Ok((port, config))
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let (port, config) = load_config()?;
    println!("Voltage Modbus Serial Server");
    println!("============================");
    println!(
        "Port: {} ({} @ {} baud, node {})",
        port,
        config.encoding,
        config.baud_rate,
        config.node_address.unwrap_or_default()
    );

    let registry = Registry::new()?;
    let uart = Arc::new(SerialPortDevice::new(&port)?);
    let iface = registry
        .configure(0, &config, SerialLink::new(uart.clone()), Some(Arc::new(EchoHandler)))
        .with_context(|| format!("configuring {}", port))?;
    iface.set_logger(Some(CallbackLogger::console()));

    info!("Server listening, press Ctrl+C to stop");

    let mut ticker = interval(Duration::from_secs(30));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let stats = iface.stats();
                info!(
                    "rx={} tx={} checksum_errors={} frame_errors={} ignored={} fifo_overruns={}",
                    stats.frames_received,
                    stats.frames_sent,
                    stats.checksum_errors,
                    stats.frame_errors,
                    stats.frames_ignored,
                    uart.overruns()
                );
            }
            _ = signal::ctrl_c() => break,
        }
    }

    info!("Shutting down");
    registry.disable(0)?;
    Ok(())
}
