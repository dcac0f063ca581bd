//! # Interface Core
//!
//! One [`InterfaceContext`] exists per configured registry slot. It owns the
//! byte buffer, the phase of the receive/transmit state machine, the silence
//! timer (RTU only) and the client wait primitive.
//!
//! ## Execution contexts
//!
//! - **Interrupt path**: [`InterfaceContext::service_irq`] is the callback the
//!   UART invokes. It only moves bytes, flips the phase and arms the timer or
//!   submits deferred work. It never blocks on anything but the short buffer
//!   critical section and never allocates.
//! - **Timer task**: expiry of the RTU silence window marks the capture as a
//!   complete frame and submits deferred work.
//! - **Deferred worker**: [`InterfaceContext::dispatch`] decodes the frame and
//!   either wakes the waiting client or runs the server's request handler.
//!
//! ## Phase machine
//!
//! ```text
//!   Idle --first byte--> Capturing --silence / LF--> FrameComplete
//!    ^                      |                              |
//!    |                      +----transmit----+         dispatch
//!    |                                       v             v
//!    +----last byte sent----------------- Transmitting <- Decoding
//! ```
//!
//! Every phase change happens with the buffer lock held, so the phase and the
//! buffer contents always agree.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::time::timeout;

use crate::buffer::ByteBuffer;
use crate::config::InterfaceConfig;
use crate::error::{FrameError, ModbusError, ModbusResult};
use crate::hal::SerialLink;
use crate::logging::{CallbackLogger, Direction};
use crate::protocol::{Encoding, LogicalFrame, Role, SlaveId, ASCII_END, ASCII_START};
use crate::registry::WorkQueue;
use crate::timing::{silence_window, SilenceTimer};
use crate::transceiver::Transceiver;
use crate::utils::format::bytes_to_hex;
use crate::utils::{ExchangeMetrics, OperationTimer};

/// Bytes moved per FIFO read when draining into a scratch area
const DRAIN_CHUNK: usize = 16;

/// Receive/transmit phase of an interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum Phase {
    Idle = 0,
    Capturing = 1,
    FrameComplete = 2,
    Decoding = 3,
    Transmitting = 4,
}

impl Phase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Phase::Capturing,
            2 => Phase::FrameComplete,
            3 => Phase::Decoding,
            4 => Phase::Transmitting,
            _ => Phase::Idle,
        }
    }
}

/// Server-side request handler
///
/// Invoked on the deferred worker with the decoded request, or with the decode
/// error when the captured bytes did not form a valid frame. Requests for other
/// node addresses never reach the handler.
///
/// Return `true` after queuing a response with [`Interface::queue_response`];
/// return `false` to resume listening without answering.
pub trait RequestHandler: Send + Sync {
    fn handle_request(&self, iface: &Interface, request: Result<&LogicalFrame, FrameError>) -> bool;
}

impl<F> RequestHandler for F
where
    F: Fn(&Interface, Result<&LogicalFrame, FrameError>) -> bool + Send + Sync,
{
    fn handle_request(&self, iface: &Interface, request: Result<&LogicalFrame, FrameError>) -> bool {
        self(iface, request)
    }
}

/// Snapshot of the per-interface counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InterfaceStats {
    pub frames_received: u64,
    pub frames_sent: u64,
    pub checksum_errors: u64,
    pub frame_errors: u64,
    /// Valid frames addressed to another node, or lost to a full work queue
    pub frames_ignored: u64,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    /// Bytes drained while the interface was not capturing
    pub bytes_discarded: u64,
    pub timeouts: u64,
}

#[derive(Debug, Default)]
struct Counters {
    frames_received: AtomicU64,
    frames_sent: AtomicU64,
    checksum_errors: AtomicU64,
    frame_errors: AtomicU64,
    frames_ignored: AtomicU64,
    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_discarded: AtomicU64,
    timeouts: AtomicU64,
}

fn bump(counter: &AtomicU64, n: usize) {
    counter.fetch_add(n as u64, Ordering::Relaxed);
}

impl Counters {
    fn snapshot(&self) -> InterfaceStats {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        InterfaceStats {
            frames_received: get(&self.frames_received),
            frames_sent: get(&self.frames_sent),
            checksum_errors: get(&self.checksum_errors),
            frame_errors: get(&self.frame_errors),
            frames_ignored: get(&self.frames_ignored),
            bytes_received: get(&self.bytes_received),
            bytes_sent: get(&self.bytes_sent),
            bytes_discarded: get(&self.bytes_discarded),
            timeouts: get(&self.timeouts),
        }
    }
}

#[derive(Debug, Default)]
struct Records {
    rx_frame: LogicalFrame,
    tx_frame: LogicalFrame,
    last_rx_error: Option<FrameError>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Trace a frame at the byte level
fn log_packet(iface: usize, encoding: Encoding, direction: Direction, data: &[u8]) {
    let arrow = match direction {
        Direction::Sent => "send",
        Direction::Received => "recv",
    };
    tracing::debug!(
        "[MODBUS-{}] iface:{} {} {}",
        encoding,
        iface,
        arrow,
        bytes_to_hex(data)
    );
}

/// Per-slot runtime state
pub(crate) struct InterfaceContext {
    me: Weak<InterfaceContext>,
    id: usize,
    role: Role,
    encoding: Encoding,
    node_address: SlaveId,
    rx_timeout: Duration,
    silence_window: Duration,
    active: AtomicBool,
    phase: AtomicU8,
    buffer: Mutex<ByteBuffer>,
    records: Mutex<Records>,
    transceiver: Transceiver,
    timer: Option<SilenceTimer>,
    work: WorkQueue,
    client_wait: Semaphore,
    exchange: AsyncMutex<()>,
    handler: Option<Arc<dyn RequestHandler>>,
    broadcast_request: AtomicBool,
    logger: RwLock<Option<CallbackLogger>>,
    counters: Counters,
    metrics: Mutex<ExchangeMetrics>,
}

impl InterfaceContext {
    /// Bring up a configured interface and start listening
    ///
    /// The caller has already validated `config` and the role.
    pub(crate) fn start(
        id: usize,
        config: &InterfaceConfig,
        link: SerialLink,
        handler: Option<Arc<dyn RequestHandler>>,
        work: WorkQueue,
        runtime: &Handle,
    ) -> ModbusResult<Arc<Self>> {
        let transceiver = Transceiver::new(link, config.full_duplex);
        transceiver.init()?;
        transceiver.uart().configure(&config.line_config())?;

        let ctx = Arc::new_cyclic(|weak: &Weak<Self>| {
            let timer = match config.encoding {
                Encoding::Rtu => {
                    let weak = weak.clone();
                    Some(SilenceTimer::spawn(
                        runtime,
                        Arc::new(move || {
                            if let Some(ctx) = weak.upgrade() {
                                ctx.on_silence_expired();
                            }
                        }),
                    ))
                }
                Encoding::Ascii => None,
            };

            Self {
                me: weak.clone(),
                id,
                role: config.role,
                encoding: config.encoding,
                node_address: config.node_address.unwrap_or_default(),
                rx_timeout: config.rx_timeout(),
                silence_window: silence_window(config.baud_rate),
                active: AtomicBool::new(true),
                phase: AtomicU8::new(Phase::Idle as u8),
                buffer: Mutex::new(ByteBuffer::new()),
                records: Mutex::new(Records::default()),
                transceiver,
                timer,
                work,
                client_wait: Semaphore::new(0),
                exchange: AsyncMutex::new(()),
                handler,
                broadcast_request: AtomicBool::new(false),
                logger: RwLock::new(None),
                counters: Counters::default(),
                metrics: Mutex::new(ExchangeMetrics::new()),
            }
        });

        let weak = Arc::downgrade(&ctx);
        ctx.transceiver.uart().set_irq_callback(Some(Arc::new(move || {
            if let Some(ctx) = weak.upgrade() {
                ctx.service_irq();
            }
        })));

        {
            let _buf = lock(&ctx.buffer);
            ctx.transceiver.enable_receive();
        }

        info!(
            "Interface {} configured: {} {} at {} baud (silence window {:?})",
            id, config.role, config.encoding, config.baud_rate, ctx.silence_window
        );
        Ok(ctx)
    }

    /// Mask interrupts, release the bus and wake any waiting client
    pub(crate) fn shutdown(&self) {
        self.active.store(false, Ordering::Release);
        {
            let mut buf = lock(&self.buffer);
            self.transceiver.shutdown();
            self.transceiver.uart().set_irq_callback(None);
            if let Some(timer) = &self.timer {
                timer.stop();
            }
            buf.reset();
            self.set_phase(Phase::Idle);
        }
        self.client_wait.close();
        info!("Interface {} disabled", self.id);
    }

    pub(crate) fn phase(&self) -> Phase {
        Phase::from_u8(self.phase.load(Ordering::Acquire))
    }

    fn set_phase(&self, phase: Phase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    fn logger(&self) -> Option<CallbackLogger> {
        self.logger
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    // ----- interrupt path -----

    /// UART interrupt entry point
    pub(crate) fn service_irq(&self) {
        let uart = self.transceiver.uart();
        if uart.rx_ready() {
            match self.encoding {
                Encoding::Rtu => self.capture_rtu(),
                Encoding::Ascii => self.capture_ascii(),
            }
        }
        if uart.tx_ready() {
            self.feed_transmitter();
        }
    }

    fn capture_rtu(&self) {
        let uart = self.transceiver.uart();
        let mut buf = lock(&self.buffer);
        let phase = self.phase();
        if !matches!(phase, Phase::Idle | Phase::Capturing) {
            self.discard_rx();
            return;
        }
        if phase == Phase::Idle {
            buf.reset();
        }

        let mut scratch = [0u8; DRAIN_CHUNK];
        let mut received = 0;
        loop {
            let n = if buf.remaining() > 0 {
                let n = uart.fifo_read(buf.spare_mut());
                buf.commit(n);
                n
            } else {
                // full: keep draining so the overflow shows up at decode time
                let n = uart.fifo_read(&mut scratch);
                buf.record_dropped(n);
                n
            };
            if n == 0 {
                break;
            }
            received += n;
        }
        if received == 0 {
            return;
        }
        if phase == Phase::Idle {
            self.set_phase(Phase::Capturing);
        }
        drop(buf);

        bump(&self.counters.bytes_received, received);
        if let Some(timer) = &self.timer {
            timer.start(self.silence_window);
        }
    }

    fn capture_ascii(&self) {
        let uart = self.transceiver.uart();
        let mut complete = false;
        let mut received = 0;
        let mut discarded = 0;
        {
            let mut buf = lock(&self.buffer);
            let mut byte = [0u8; 1];
            while uart.fifo_read(&mut byte) > 0 {
                received += 1;
                let phase = self.phase();
                if !matches!(phase, Phase::Idle | Phase::Capturing) {
                    discarded += 1;
                    continue;
                }
                if phase == Phase::Idle || byte[0] == ASCII_START {
                    buf.reset();
                }
                if phase == Phase::Idle {
                    self.set_phase(Phase::Capturing);
                }
                // excess bytes are ignored; the frame then fails its marker check
                buf.push(byte[0]);
                if byte[0] == ASCII_END[1] {
                    self.set_phase(Phase::FrameComplete);
                    complete = true;
                }
            }
        }

        bump(&self.counters.bytes_received, received);
        bump(&self.counters.bytes_discarded, discarded);
        if complete {
            self.submit();
        }
    }

    /// Drain and drop whatever sits in the RX FIFO
    fn discard_rx(&self) {
        let uart = self.transceiver.uart();
        let mut scratch = [0u8; DRAIN_CHUNK];
        let mut total = 0;
        loop {
            let n = uart.fifo_read(&mut scratch);
            if n == 0 {
                break;
            }
            total += n;
        }
        bump(&self.counters.bytes_received, total);
        bump(&self.counters.bytes_discarded, total);
    }

    fn feed_transmitter(&self) {
        let uart = self.transceiver.uart();
        let mut buf = lock(&self.buffer);
        if self.phase() != Phase::Transmitting {
            uart.disable_tx_interrupt();
            return;
        }

        let sent = uart.fifo_fill(buf.pending());
        buf.consume(sent);
        let finished = buf.is_drained() && uart.tx_complete();
        if finished {
            buf.reset();
            self.set_phase(Phase::Idle);
            // echo of our own frame on links that hear themselves
            self.discard_rx();
            self.transceiver.enable_receive();
        }
        drop(buf);

        bump(&self.counters.bytes_sent, sent);
        if finished {
            bump(&self.counters.frames_sent, 1);
        }
    }

    // ----- timer path -----

    fn on_silence_expired(&self) {
        let complete = {
            let _buf = lock(&self.buffer);
            if self.phase() == Phase::Capturing {
                self.set_phase(Phase::FrameComplete);
                true
            } else {
                false
            }
        };
        if complete {
            self.submit();
        }
    }

    fn submit(&self) {
        if self.work.submit(self.me.clone()) {
            return;
        }
        let mut buf = lock(&self.buffer);
        if self.phase() == Phase::FrameComplete {
            buf.reset();
            self.set_phase(Phase::Idle);
            bump(&self.counters.frames_ignored, 1);
        }
    }

    // ----- deferred worker -----

    /// Decode the completed frame and hand it to the client or server side
    pub(crate) fn dispatch(self: &Arc<Self>) {
        let logger = self.logger();
        let (result, wire) = {
            let mut buf = lock(&self.buffer);
            if self.phase() != Phase::FrameComplete {
                return;
            }
            self.transceiver.disable_receive();
            self.set_phase(Phase::Decoding);

            let result = self.encoding.decode(&buf);
            log_packet(self.id, self.encoding, Direction::Received, buf.as_slice());
            let wire = match &logger {
                Some(logger) if logger.wants_raw() => buf.as_slice().to_vec(),
                _ => Vec::new(),
            };
            buf.reset();
            (result, wire)
        };

        self.record_rx(&result);
        if let Some(logger) = &logger {
            match &result {
                Ok(frame) => logger.log_frame(Direction::Received, self.encoding, frame, &wire),
                Err(e) => logger.log_frame_error(self.encoding, e, &wire),
            }
        }

        match self.role {
            Role::Client => self.complete_exchange(),
            Role::Server => self.serve(result),
        }
    }

    fn record_rx(&self, result: &Result<LogicalFrame, FrameError>) {
        let mut records = lock(&self.records);
        match result {
            Ok(frame) => {
                bump(&self.counters.frames_received, 1);
                records.rx_frame = frame.clone();
                records.last_rx_error = None;
            }
            Err(e) => {
                if e.is_checksum_error() {
                    bump(&self.counters.checksum_errors, 1);
                } else {
                    bump(&self.counters.frame_errors, 1);
                }
                debug!("Interface {}: frame rejected: {}", self.id, e);
                records.last_rx_error = Some(*e);
            }
        }
    }

    /// Release the waiting client, unless a newer request already took over
    ///
    /// A request issued while a late response was decoding moves the phase
    /// on; that response belongs to no one and must not wake the new request.
    fn complete_exchange(&self) {
        let current = {
            let _buf = lock(&self.buffer);
            let current = self.phase() == Phase::Decoding;
            if current {
                self.set_phase(Phase::Idle);
            }
            current
        };
        if current {
            self.client_wait.add_permits(1);
        } else {
            debug!("Interface {}: dropping response superseded by a new request", self.id);
            bump(&self.counters.frames_ignored, 1);
        }
    }

    fn serve(self: &Arc<Self>, result: Result<LogicalFrame, FrameError>) {
        if let Ok(frame) = &result {
            if frame.address != self.node_address && !frame.is_broadcast() {
                debug!(
                    "Interface {}: ignoring frame for node {} (own address {})",
                    self.id, frame.address, self.node_address
                );
                bump(&self.counters.frames_ignored, 1);
                self.resume_receive();
                return;
            }
        }

        let handler = match &self.handler {
            Some(handler) => handler.clone(),
            None => {
                self.resume_receive();
                return;
            }
        };

        let broadcast = matches!(&result, Ok(frame) if frame.is_broadcast());
        self.broadcast_request.store(broadcast, Ordering::Release);

        let iface = Interface { ctx: self.clone() };
        let responded = handler.handle_request(&iface, result.as_ref().map_err(|e| *e));
        self.broadcast_request.store(false, Ordering::Release);

        if !responded {
            self.resume_receive();
        } else if self.phase() == Phase::Decoding {
            warn!(
                "Interface {}: request handler reported a response but queued none",
                self.id
            );
            self.resume_receive();
        }
    }

    /// Return to listening after a request that gets no response
    fn resume_receive(&self) {
        let _buf = lock(&self.buffer);
        if self.phase() == Phase::Decoding {
            self.set_phase(Phase::Idle);
            self.transceiver.enable_receive();
        }
    }

    // ----- transmit path -----

    /// Encode `frame` into the buffer and start the transmitter
    ///
    /// Returns the frame with its checksum filled in.
    pub(crate) fn transmit(&self, frame: &LogicalFrame) -> ModbusResult<LogicalFrame> {
        let mut frame = frame.clone();
        let logger = self.logger();
        let wire = {
            let mut buf = lock(&self.buffer);
            if !self.active.load(Ordering::Acquire) {
                return Err(ModbusError::NotConfigured { iface: self.id });
            }
            match self.phase() {
                Phase::Idle | Phase::Capturing | Phase::Decoding => {}
                Phase::FrameComplete | Phase::Transmitting => {
                    return Err(ModbusError::Busy { iface: self.id });
                }
            }

            self.encoding.encode(&mut frame, &mut buf)?;
            if let Some(timer) = &self.timer {
                timer.stop();
            }
            self.set_phase(Phase::Transmitting);
            log_packet(self.id, self.encoding, Direction::Sent, buf.as_slice());
            let wire = match &logger {
                Some(logger) if logger.wants_raw() => buf.as_slice().to_vec(),
                _ => Vec::new(),
            };
            self.transceiver.enable_transmit();
            wire
        };

        lock(&self.records).tx_frame = frame.clone();
        if let Some(logger) = &logger {
            logger.log_frame(Direction::Sent, self.encoding, &frame, &wire);
        }
        Ok(frame)
    }

    /// Discard a stale response left by a previous exchange
    fn reset_client_wait(&self) {
        while let Ok(permit) = self.client_wait.try_acquire() {
            permit.forget();
        }
    }

    fn take_response(&self) -> ModbusResult<LogicalFrame> {
        let records = lock(&self.records);
        match records.last_rx_error {
            Some(e) => Err(e.into()),
            None => Ok(records.rx_frame.clone()),
        }
    }
}

/// Handle to a configured interface
///
/// Cheap to clone. A handle outlives [`Registry::disable`](crate::registry::Registry::disable);
/// operations on a disabled interface fail with [`ModbusError::NotConfigured`].
#[derive(Clone)]
pub struct Interface {
    ctx: Arc<InterfaceContext>,
}

impl Interface {
    pub(crate) fn new(ctx: Arc<InterfaceContext>) -> Self {
        Self { ctx }
    }

    pub fn id(&self) -> usize {
        self.ctx.id
    }

    pub fn role(&self) -> Role {
        self.ctx.role
    }

    pub fn encoding(&self) -> Encoding {
        self.ctx.encoding
    }

    /// Own node address; `None` for clients
    pub fn node_address(&self) -> Option<SlaveId> {
        match self.ctx.role {
            Role::Server => Some(self.ctx.node_address),
            Role::Client => None,
        }
    }

    pub fn silence_window(&self) -> Duration {
        self.ctx.silence_window
    }

    pub fn phase(&self) -> Phase {
        self.ctx.phase()
    }

    /// Whether a transmission is in progress
    pub fn is_busy(&self) -> bool {
        self.phase() == Phase::Transmitting
    }

    /// Whether the slot has not been disabled since this handle was issued
    pub fn is_active(&self) -> bool {
        self.ctx.active.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> InterfaceStats {
        self.ctx.counters.snapshot()
    }

    /// Client exchange timing
    pub fn metrics(&self) -> ExchangeMetrics {
        lock(&self.ctx.metrics).clone()
    }

    /// Attach a frame logger, or detach it with `None`
    pub fn set_logger(&self, logger: Option<CallbackLogger>) {
        *self
            .ctx
            .logger
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = logger;
    }

    /// Last successfully decoded frame
    pub fn rx_frame(&self) -> LogicalFrame {
        lock(&self.ctx.records).rx_frame.clone()
    }

    /// Last frame handed to the transmitter, checksum included
    pub fn tx_frame(&self) -> LogicalFrame {
        lock(&self.ctx.records).tx_frame.clone()
    }

    /// Error of the last received frame, cleared by the next good frame
    pub fn last_rx_error(&self) -> Option<FrameError> {
        lock(&self.ctx.records).last_rx_error
    }

    /// Send a frame without waiting for anything in return
    ///
    /// Fails with [`ModbusError::Busy`] while a transmission is in progress or
    /// a captured frame waits for decoding. Used by clients for broadcasts.
    pub fn transmit(&self, frame: &LogicalFrame) -> ModbusResult<()> {
        self.ctx.transmit(frame).map(|_| ())
    }

    /// Send a request and wait for the response (client role)
    ///
    /// Exchanges on one interface are serialised. A response that fails to
    /// decode is returned as [`ModbusError::Frame`]; no response within the
    /// configured timeout yields [`ModbusError::Timeout`].
    pub async fn request(&self, request: &LogicalFrame) -> ModbusResult<LogicalFrame> {
        let ctx = &self.ctx;
        if ctx.role != Role::Client {
            return Err(ModbusError::configuration(format!(
                "Interface {} is configured as {}, requests need the client role",
                ctx.id, ctx.role
            )));
        }
        if request.is_broadcast() {
            return Err(ModbusError::invalid_data(
                "Broadcast requests get no response; use transmit",
            ));
        }

        let _exchange = ctx.exchange.lock().await;
        ctx.reset_client_wait();

        let timer = OperationTimer::start("client exchange");
        ctx.transmit(request)?;

        let outcome = match timeout(ctx.rx_timeout, ctx.client_wait.acquire()).await {
            Ok(Ok(permit)) => {
                permit.forget();
                ctx.take_response()
            }
            Ok(Err(_closed)) => Err(ModbusError::NotConfigured { iface: ctx.id }),
            Err(_elapsed) => {
                bump(&ctx.counters.timeouts, 1);
                Err(ModbusError::timeout(
                    format!("response to node {} on interface {}", request.address, ctx.id),
                    ctx.rx_timeout.as_millis() as u64,
                ))
            }
        };

        let duration = timer.stop();
        {
            let mut metrics = lock(&ctx.metrics);
            match &outcome {
                Ok(_) => metrics.record_success(duration),
                Err(_) => metrics.record_failure(duration),
            }
        }
        if let Err(e) = &outcome {
            warn!("Interface {}: exchange with node {} failed: {}", ctx.id, request.address, e);
        }
        outcome
    }

    /// Queue the response to the request being handled (server role)
    ///
    /// Call from within [`RequestHandler::handle_request`]. Responses to
    /// broadcast requests are suppressed.
    pub fn queue_response(&self, response: &LogicalFrame) -> ModbusResult<()> {
        let ctx = &self.ctx;
        if ctx.role != Role::Server {
            return Err(ModbusError::configuration(format!(
                "Interface {} is configured as {}, responses need the server role",
                ctx.id, ctx.role
            )));
        }
        if ctx.broadcast_request.load(Ordering::Acquire) {
            debug!("Interface {}: suppressing response to broadcast", ctx.id);
            ctx.resume_receive();
            return Ok(());
        }
        ctx.transmit(response).map(|_| ())
    }
}

impl std::fmt::Debug for Interface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interface")
            .field("id", &self.ctx.id)
            .field("role", &self.ctx.role)
            .field("encoding", &self.ctx.encoding)
            .field("phase", &self.ctx.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_u8() {
        for phase in [
            Phase::Idle,
            Phase::Capturing,
            Phase::FrameComplete,
            Phase::Decoding,
            Phase::Transmitting,
        ] {
            assert_eq!(Phase::from_u8(phase as u8), phase);
        }
        assert_eq!(Phase::from_u8(200), Phase::Idle);
    }

    #[test]
    fn test_counters_snapshot() {
        let counters = Counters::default();
        bump(&counters.frames_received, 2);
        bump(&counters.bytes_received, 16);
        let stats = counters.snapshot();
        assert_eq!(stats.frames_received, 2);
        assert_eq!(stats.bytes_received, 16);
        assert_eq!(stats.timeouts, 0);
    }

    #[test]
    fn test_closure_handler() {
        fn boxed<F>(f: F) -> Arc<dyn RequestHandler>
        where
            F: Fn(&Interface, Result<&LogicalFrame, FrameError>) -> bool + Send + Sync + 'static,
        {
            Arc::new(f)
        }
        let _handler = boxed(|_iface, request| request.is_ok());
    }
}
