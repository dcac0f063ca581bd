//! # Hosted Serial Backend
//!
//! [`SerialPortDevice`] adapts an OS serial port, opened through
//! `tokio-serial`, to the interrupt-style [`SerialDevice`] contract. Three
//! Tokio tasks stand in for the hardware:
//!
//! - a reader that moves received bytes into a software RX FIFO,
//! - a writer that drains the software TX FIFO to the port,
//! - an interrupt task that invokes the registered callback whenever the
//!   reader, the writer or an interrupt unmask reports a pending condition.
//!
//! The callback therefore always runs on the interrupt task, never inside a
//! trait method.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use log::{debug, error, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_serial::SerialPortBuilderExt;

use crate::error::{ModbusError, ModbusResult};
use crate::hal::{IrqCallback, SerialDevice};
use crate::protocol::{DataBits, LineConfig, Parity, StopBits};

/// Depth of the software RX FIFO; older bytes are overwritten beyond it
pub const RX_FIFO_DEPTH: usize = 256;

/// Bytes the software TX FIFO accepts before the writer drains it
pub const TX_FIFO_DEPTH: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
struct Shared {
    rx_fifo: Mutex<VecDeque<u8>>,
    rx_enabled: AtomicBool,
    tx_enabled: AtomicBool,
    tx_inflight: AtomicUsize,
    tx_queue: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    callback: Mutex<Option<IrqCallback>>,
    irq: Notify,
    overruns: AtomicUsize,
}

impl Shared {
    fn rx_ready(&self) -> bool {
        self.rx_enabled.load(Ordering::Acquire) && !lock(&self.rx_fifo).is_empty()
    }

    fn tx_ready(&self) -> bool {
        self.tx_enabled.load(Ordering::Acquire)
            && self.tx_inflight.load(Ordering::Acquire) < TX_FIFO_DEPTH
    }

    fn fire(&self) {
        let callback = lock(&self.callback).clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

/// OS serial port driven as an interrupt-style UART
pub struct SerialPortDevice {
    path: String,
    shared: Arc<Shared>,
    runtime: Handle,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SerialPortDevice {
    /// Create a device for `path`; the port is opened by `configure`
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(path: &str) -> ModbusResult<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            ModbusError::configuration(format!("Serial device requires a Tokio runtime: {}", e))
        })?;
        Ok(Self {
            path: path.to_string(),
            shared: Arc::new(Shared::default()),
            runtime,
            tasks: Mutex::new(Vec::new()),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// RX bytes lost because the software FIFO was full
    pub fn overruns(&self) -> usize {
        self.shared.overruns.load(Ordering::Relaxed)
    }

    fn stop_tasks(&self) {
        for task in lock(&self.tasks).drain(..) {
            task.abort();
        }
        *lock(&self.shared.tx_queue) = None;
    }
}

impl SerialDevice for SerialPortDevice {
    fn is_ready(&self) -> bool {
        let listed = tokio_serial::available_ports()
            .map(|ports| ports.iter().any(|p| p.port_name == self.path))
            .unwrap_or(false);
        listed || Path::new(&self.path).exists()
    }

    fn configure(&self, line: &LineConfig) -> ModbusResult<()> {
        self.stop_tasks();

        let data_bits = match line.data_bits {
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        };
        let parity = match line.parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Even => tokio_serial::Parity::Even,
            Parity::Odd => tokio_serial::Parity::Odd,
        };
        let stop_bits = match line.stop_bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        };

        // open_native_async registers with the reactor of the current runtime
        let _guard = self.runtime.enter();
        let port = tokio_serial::new(&self.path, line.baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .open_native_async()?;
        let (mut reader, mut writer) = tokio::io::split(port);

        let (tx, mut rx) = mpsc::unbounded_channel::<Bytes>();
        *lock(&self.shared.tx_queue) = Some(tx);
        self.shared.tx_inflight.store(0, Ordering::Release);
        lock(&self.shared.rx_fifo).clear();

        let mut tasks = lock(&self.tasks);

        let shared = self.shared.clone();
        let path = self.path.clone();
        tasks.push(self.runtime.spawn(async move {
            let mut chunk = [0u8; 64];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => {
                        warn!("Serial port {} closed", path);
                        break;
                    }
                    Ok(n) => {
                        {
                            let mut fifo = lock(&shared.rx_fifo);
                            for &byte in &chunk[..n] {
                                if fifo.len() == RX_FIFO_DEPTH {
                                    fifo.pop_front();
                                    shared.overruns.fetch_add(1, Ordering::Relaxed);
                                }
                                fifo.push_back(byte);
                            }
                        }
                        shared.irq.notify_one();
                    }
                    Err(e) => {
                        error!("Serial port {} read failed: {}", path, e);
                        break;
                    }
                }
            }
        }));

        let shared = self.shared.clone();
        let path = self.path.clone();
        tasks.push(self.runtime.spawn(async move {
            while let Some(data) = rx.recv().await {
                let result = async {
                    writer.write_all(&data).await?;
                    writer.flush().await
                }
                .await;
                if let Err(e) = result {
                    error!("Serial port {} write failed: {}", path, e);
                }
                shared.tx_inflight.fetch_sub(data.len(), Ordering::AcqRel);
                shared.irq.notify_one();
            }
        }));

        let shared = self.shared.clone();
        tasks.push(self.runtime.spawn(async move {
            loop {
                shared.irq.notified().await;
                if shared.rx_ready() || shared.tx_ready() {
                    shared.fire();
                }
            }
        }));

        info!(
            "Opened serial port {} at {} baud ({:?}, {:?}, {:?})",
            self.path, line.baud_rate, line.data_bits, line.parity, line.stop_bits
        );
        Ok(())
    }

    fn set_irq_callback(&self, callback: Option<IrqCallback>) {
        *lock(&self.shared.callback) = callback;
    }

    fn enable_rx_interrupt(&self) {
        self.shared.rx_enabled.store(true, Ordering::Release);
        self.shared.irq.notify_one();
    }

    fn disable_rx_interrupt(&self) {
        self.shared.rx_enabled.store(false, Ordering::Release);
    }

    fn enable_tx_interrupt(&self) {
        self.shared.tx_enabled.store(true, Ordering::Release);
        self.shared.irq.notify_one();
    }

    fn disable_tx_interrupt(&self) {
        self.shared.tx_enabled.store(false, Ordering::Release);
    }

    fn rx_ready(&self) -> bool {
        self.shared.rx_ready()
    }

    fn tx_ready(&self) -> bool {
        self.shared.tx_ready()
    }

    fn tx_complete(&self) -> bool {
        self.shared.tx_inflight.load(Ordering::Acquire) == 0
    }

    fn fifo_read(&self, buf: &mut [u8]) -> usize {
        let mut fifo = lock(&self.shared.rx_fifo);
        let n = buf.len().min(fifo.len());
        for (slot, byte) in buf.iter_mut().zip(fifo.drain(..n)) {
            *slot = byte;
        }
        n
    }

    fn fifo_fill(&self, data: &[u8]) -> usize {
        let inflight = self.shared.tx_inflight.load(Ordering::Acquire);
        let n = data.len().min(TX_FIFO_DEPTH.saturating_sub(inflight));
        if n == 0 {
            return 0;
        }
        let queue = lock(&self.shared.tx_queue);
        match queue.as_ref() {
            Some(tx) => {
                self.shared.tx_inflight.fetch_add(n, Ordering::AcqRel);
                if tx.send(Bytes::copy_from_slice(&data[..n])).is_err() {
                    self.shared.tx_inflight.fetch_sub(n, Ordering::AcqRel);
                    debug!("Serial port {} writer is gone", self.path);
                    return 0;
                }
                n
            }
            None => 0,
        }
    }
}

impl Drop for SerialPortDevice {
    fn drop(&mut self) {
        self.stop_tasks();
    }
}

impl std::fmt::Debug for SerialPortDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortDevice")
            .field("path", &self.path)
            .field("rx_enabled", &self.shared.rx_enabled.load(Ordering::Relaxed))
            .field("tx_enabled", &self.shared.tx_enabled.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unopened_device() {
        let device = SerialPortDevice::new("/dev/does-not-exist-modbus").unwrap();
        assert!(!device.is_ready());
        assert!(!device.rx_ready());
        assert!(!device.tx_ready());
        assert!(device.tx_complete());

        // nothing queued without an open port
        device.enable_tx_interrupt();
        assert_eq!(device.fifo_fill(&[1, 2, 3]), 0);

        let mut buf = [0u8; 4];
        assert_eq!(device.fifo_read(&mut buf), 0);
        assert_eq!(device.overruns(), 0);
        assert_eq!(device.path(), "/dev/does-not-exist-modbus");
    }

    #[test]
    fn test_requires_runtime() {
        assert!(SerialPortDevice::new("/dev/ttyUSB0").is_err());
    }
}
