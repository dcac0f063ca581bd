//! Shared test doubles: an interrupt-style mock UART, mock direction lines
//! and a recording request handler.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::Notify;

use voltage_modbus_serial::utils::logging::init_test_logger;
use voltage_modbus_serial::{
    crc16, lrc8, FrameError, Interface, IrqCallback, LineConfig, LogicalFrame, ModbusResult,
    OutputLine, RequestHandler, SerialDevice, SerialLink,
};

/// Ordered record of interrupt masks and line levels
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Bytes the mock TX FIFO accepts per fill
pub const MOCK_TX_FIFO: usize = 16;

pub struct MockUart {
    ready: AtomicBool,
    line: Mutex<Option<LineConfig>>,
    rx_fifo: Mutex<VecDeque<u8>>,
    wire: Mutex<Vec<u8>>,
    rx_enabled: AtomicBool,
    tx_enabled: AtomicBool,
    callback: Mutex<Option<IrqCallback>>,
    tx_kick: Arc<Notify>,
    journal: Journal,
}

impl MockUart {
    /// Create a ready UART whose TX interrupt fires from a background task
    pub fn new(journal: Journal) -> Arc<Self> {
        let uart = Arc::new(Self {
            ready: AtomicBool::new(true),
            line: Mutex::new(None),
            rx_fifo: Mutex::new(VecDeque::new()),
            wire: Mutex::new(Vec::new()),
            rx_enabled: AtomicBool::new(false),
            tx_enabled: AtomicBool::new(false),
            callback: Mutex::new(None),
            tx_kick: Arc::new(Notify::new()),
            journal,
        });

        let weak: Weak<Self> = Arc::downgrade(&uart);
        let kick = uart.tx_kick.clone();
        tokio::spawn(async move {
            loop {
                kick.notified().await;
                loop {
                    let uart = match weak.upgrade() {
                        Some(uart) => uart,
                        None => return,
                    };
                    if !uart.tx_ready() {
                        break;
                    }
                    uart.fire();
                    drop(uart);
                    tokio::task::yield_now().await;
                }
            }
        });

        uart
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    fn fire(&self) {
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn note(&self, event: &str) {
        self.journal.lock().unwrap().push(event.to_string());
    }

    /// Bytes arriving from the bus
    pub fn inject(&self, bytes: &[u8]) {
        self.rx_fifo.lock().unwrap().extend(bytes.iter().copied());
        if self.rx_enabled.load(Ordering::SeqCst) {
            self.fire();
        }
    }

    /// Everything transmitted so far
    pub fn transmitted(&self) -> Vec<u8> {
        self.wire.lock().unwrap().clone()
    }

    pub fn take_transmitted(&self) -> Vec<u8> {
        std::mem::take(&mut *self.wire.lock().unwrap())
    }

    pub fn line_config(&self) -> Option<LineConfig> {
        *self.line.lock().unwrap()
    }

    pub fn rx_enabled(&self) -> bool {
        self.rx_enabled.load(Ordering::SeqCst)
    }

    pub fn tx_enabled(&self) -> bool {
        self.tx_enabled.load(Ordering::SeqCst)
    }

    pub fn has_callback(&self) -> bool {
        self.callback.lock().unwrap().is_some()
    }
}

impl SerialDevice for MockUart {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn configure(&self, line: &LineConfig) -> ModbusResult<()> {
        *self.line.lock().unwrap() = Some(*line);
        Ok(())
    }

    fn set_irq_callback(&self, callback: Option<IrqCallback>) {
        *self.callback.lock().unwrap() = callback;
    }

    fn enable_rx_interrupt(&self) {
        self.rx_enabled.store(true, Ordering::SeqCst);
        self.note("rx_on");
    }

    fn disable_rx_interrupt(&self) {
        self.rx_enabled.store(false, Ordering::SeqCst);
        self.note("rx_off");
    }

    fn enable_tx_interrupt(&self) {
        self.tx_enabled.store(true, Ordering::SeqCst);
        self.note("tx_on");
        self.tx_kick.notify_one();
    }

    fn disable_tx_interrupt(&self) {
        self.tx_enabled.store(false, Ordering::SeqCst);
        self.note("tx_off");
    }

    fn rx_ready(&self) -> bool {
        self.rx_enabled.load(Ordering::SeqCst) && !self.rx_fifo.lock().unwrap().is_empty()
    }

    fn tx_ready(&self) -> bool {
        self.tx_enabled.load(Ordering::SeqCst)
    }

    fn fifo_read(&self, buf: &mut [u8]) -> usize {
        let mut fifo = self.rx_fifo.lock().unwrap();
        let n = buf.len().min(fifo.len());
        for (slot, byte) in buf.iter_mut().zip(fifo.drain(..n)) {
            *slot = byte;
        }
        n
    }

    fn fifo_fill(&self, data: &[u8]) -> usize {
        let n = data.len().min(MOCK_TX_FIFO);
        self.wire.lock().unwrap().extend_from_slice(&data[..n]);
        n
    }
}

pub struct MockLine {
    name: &'static str,
    ready: AtomicBool,
    level: AtomicBool,
    configured: AtomicBool,
    journal: Journal,
}

impl MockLine {
    pub fn new(name: &'static str, journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            name,
            ready: AtomicBool::new(true),
            level: AtomicBool::new(false),
            configured: AtomicBool::new(false),
            journal,
        })
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn level(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }
}

impl OutputLine for MockLine {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn configure_as_output(&self, asserted: bool) -> ModbusResult<()> {
        self.configured.store(true, Ordering::SeqCst);
        self.set_level(asserted);
        Ok(())
    }

    fn set_level(&self, asserted: bool) {
        self.level.store(asserted, Ordering::SeqCst);
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}={}", self.name, asserted as u8));
    }
}

/// A mock UART with DE and RE lines sharing one journal
pub struct Bench {
    pub uart: Arc<MockUart>,
    pub de: Arc<MockLine>,
    pub re: Arc<MockLine>,
    pub journal: Journal,
}

impl Bench {
    pub fn new() -> Self {
        init_test_logger();
        let journal: Journal = Arc::default();
        Self {
            uart: MockUart::new(journal.clone()),
            de: MockLine::new("de", journal.clone()),
            re: MockLine::new("re", journal.clone()),
            journal,
        }
    }

    pub fn link(&self) -> SerialLink {
        SerialLink::new(self.uart.clone())
            .with_de(self.de.clone())
            .with_re(self.re.clone())
    }

    /// Take the journal entries recorded so far
    pub fn events(&self) -> Vec<String> {
        std::mem::take(&mut *self.journal.lock().unwrap())
    }
}

type Responder = Box<dyn Fn(&LogicalFrame) -> Option<LogicalFrame> + Send + Sync>;

/// Request handler that records every call and optionally answers
pub struct RecordingHandler {
    requests: Mutex<Vec<Result<LogicalFrame, FrameError>>>,
    responder: Option<Responder>,
}

impl RecordingHandler {
    /// Record requests, never answer
    pub fn silent() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responder: None,
        })
    }

    /// Record requests and answer with whatever `responder` returns
    pub fn responding<F>(responder: F) -> Arc<Self>
    where
        F: Fn(&LogicalFrame) -> Option<LogicalFrame> + Send + Sync + 'static,
    {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            responder: Some(Box::new(responder)),
        })
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Result<LogicalFrame, FrameError>> {
        self.requests.lock().unwrap().clone()
    }
}

impl RequestHandler for RecordingHandler {
    fn handle_request(&self, iface: &Interface, request: Result<&LogicalFrame, FrameError>) -> bool {
        self.requests.lock().unwrap().push(request.cloned());
        match (request, &self.responder) {
            (Ok(frame), Some(responder)) => match responder(frame) {
                Some(response) => iface.queue_response(&response).is_ok(),
                None => false,
            },
            _ => false,
        }
    }
}

/// Type-erase a handler for `Registry::configure`
pub fn handler(h: &Arc<RecordingHandler>) -> Option<Arc<dyn RequestHandler>> {
    let erased: Arc<dyn RequestHandler> = h.clone();
    Some(erased)
}

/// Body followed by its CRC16, low byte first
pub fn rtu_wire(body: &[u8]) -> Vec<u8> {
    let mut wire = body.to_vec();
    wire.extend_from_slice(&crc16(body).to_le_bytes());
    wire
}

/// `:` + hex body + hex LRC + CR LF
pub fn ascii_wire(body: &[u8]) -> Vec<u8> {
    let mut text = String::from(":");
    for byte in body.iter().chain(std::iter::once(&lrc8(body))) {
        text.push_str(&format!("{:02X}", byte));
    }
    text.push_str("\r\n");
    text.into_bytes()
}

/// Poll `condition` while letting virtual or real time advance
pub async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..2000 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_micros(100)).await;
    }
    condition()
}
