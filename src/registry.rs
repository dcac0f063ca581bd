//! # Interface Registry
//!
//! Fixed-size table of interface slots. A slot is configured at most once
//! between `disable` calls; the one-time check is an atomic test-and-set, so
//! two racing `configure` calls cannot both succeed.
//!
//! The registry also owns the deferred worker: a single Tokio task that
//! receives interface handles from the interrupt and timer paths and runs
//! frame dispatch outside of them.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use voltage_modbus_serial::{
//!     Encoding, InterfaceConfig, LogicalFrame, Registry, SerialLink, SerialPortDevice,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::new()?;
//!     let uart = Arc::new(SerialPortDevice::new("/dev/ttyUSB0")?);
//!     let config = InterfaceConfig::client(Encoding::Rtu, 19200, Duration::from_millis(500));
//!     let iface = registry.configure(0, &config, SerialLink::new(uart), None)?;
//!
//!     let request = LogicalFrame::new(0x11, 0x03, vec![0x00, 0x6B, 0x00, 0x03])?;
//!     let response = iface.request(&request).await?;
//!     println!("{}", response);
//!
//!     registry.disable(0)?;
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use log::{debug, warn};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::InterfaceConfig;
use crate::error::{ModbusError, ModbusResult};
use crate::hal::SerialLink;
use crate::interface::{Interface, InterfaceContext, RequestHandler};
use crate::protocol::Role;

/// Default number of slots
pub const MAX_INTERFACES: usize = 4;

/// Sender side of the deferred work queue
///
/// Each slot has at most one frame awaiting dispatch, plus possibly a stale
/// entry from before a reconfiguration, so a queue of twice the slot count
/// never fills.
#[derive(Clone)]
pub(crate) struct WorkQueue {
    tx: mpsc::Sender<Weak<InterfaceContext>>,
}

impl WorkQueue {
    /// Queue dispatch for `ctx`; never blocks
    pub(crate) fn submit(&self, ctx: Weak<InterfaceContext>) -> bool {
        self.tx.try_send(ctx).is_ok()
    }
}

#[derive(Default)]
struct Slot {
    configured: AtomicBool,
    state: RwLock<SlotState>,
}

/// Live context plus a counter bumped by every `disable`
///
/// A `configure` that was overtaken by `disable` sees a different epoch when
/// it tries to install its context.
#[derive(Default)]
struct SlotState {
    context: Option<Arc<InterfaceContext>>,
    epoch: u64,
}

impl Slot {
    fn read(&self) -> RwLockReadGuard<'_, SlotState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SlotState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn context(&self) -> Option<Arc<InterfaceContext>> {
        self.read().context.clone()
    }

    /// Test-and-set the configured flag; returns the epoch the claim belongs to
    fn claim(&self) -> Option<u64> {
        let state = self.write();
        if self.configured.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(state.epoch)
    }

    /// Install the context for a claim, unless the slot was disabled since
    fn install(&self, epoch: u64, ctx: Arc<InterfaceContext>) -> Result<(), Arc<InterfaceContext>> {
        let mut state = self.write();
        if state.epoch != epoch || state.context.is_some() {
            return Err(ctx);
        }
        state.context = Some(ctx);
        Ok(())
    }

    /// Give up a claim whose bring-up failed
    fn release(&self, epoch: u64) {
        let state = self.write();
        if state.epoch == epoch {
            self.configured.store(false, Ordering::Release);
        }
    }

    /// Clear the slot; `None` if it was not configured
    fn take(&self) -> Option<Option<Arc<InterfaceContext>>> {
        let mut state = self.write();
        if !self.configured.load(Ordering::Acquire) {
            return None;
        }
        state.epoch += 1;
        self.configured.store(false, Ordering::Release);
        Some(state.context.take())
    }
}

/// Table of serial interfaces
pub struct Registry {
    slots: Arc<[Slot]>,
    work: WorkQueue,
    runtime: Handle,
    worker: JoinHandle<()>,
}

impl Registry {
    /// Registry with [`MAX_INTERFACES`] slots
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new() -> ModbusResult<Self> {
        Self::with_capacity(MAX_INTERFACES)
    }

    /// Registry with `capacity` slots
    pub fn with_capacity(capacity: usize) -> ModbusResult<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            ModbusError::configuration(format!("Registry requires a Tokio runtime: {}", e))
        })?;

        let slots: Arc<[Slot]> = (0..capacity).map(|_| Slot::default()).collect();
        let (tx, mut rx) = mpsc::channel::<Weak<InterfaceContext>>(capacity.max(1) * 2);

        let worker = runtime.spawn(async move {
            while let Some(ctx) = rx.recv().await {
                match ctx.upgrade() {
                    Some(ctx) => ctx.dispatch(),
                    None => debug!("Dropping deferred work for a disabled interface"),
                }
            }
        });

        Ok(Self {
            slots,
            work: WorkQueue { tx },
            runtime,
            worker,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, iface: usize) -> ModbusResult<&Slot> {
        self.slots.get(iface).ok_or(ModbusError::InvalidInterface {
            iface,
            capacity: self.slots.len(),
        })
    }

    /// Configure slot `iface` and start listening
    ///
    /// Servers need a request handler; clients ignore it. On failure the slot
    /// stays unconfigured.
    pub fn configure(
        &self,
        iface: usize,
        config: &InterfaceConfig,
        link: SerialLink,
        handler: Option<Arc<dyn RequestHandler>>,
    ) -> ModbusResult<Interface> {
        let slot = self.slot(iface)?;
        let epoch = slot
            .claim()
            .ok_or(ModbusError::AlreadyConfigured { iface })?;

        match self.bring_up(iface, config, link, handler) {
            Ok(ctx) => match slot.install(epoch, ctx.clone()) {
                Ok(()) => Ok(Interface::new(ctx)),
                Err(overtaken) => {
                    warn!("Interface {} was disabled while being configured", iface);
                    overtaken.shutdown();
                    Err(ModbusError::NotConfigured { iface })
                }
            },
            Err(e) => {
                warn!("Interface {} configuration failed: {}", iface, e);
                slot.release(epoch);
                Err(e)
            }
        }
    }

    fn bring_up(
        &self,
        iface: usize,
        config: &InterfaceConfig,
        link: SerialLink,
        handler: Option<Arc<dyn RequestHandler>>,
    ) -> ModbusResult<Arc<InterfaceContext>> {
        if !config.role.is_supported() {
            return Err(ModbusError::RoleUnsupported {
                role: config.role.as_str(),
            });
        }
        config.validate()?;

        let handler = match config.role {
            Role::Server => Some(handler.ok_or_else(|| {
                ModbusError::configuration("Server role requires a request handler")
            })?),
            Role::Client => None,
        };

        InterfaceContext::start(iface, config, link, handler, self.work.clone(), &self.runtime)
    }

    /// Tear down slot `iface`
    ///
    /// Masks the UART interrupts, releases the DE/RE lines and wakes a client
    /// waiting on the interface. The slot can then be configured again.
    pub fn disable(&self, iface: usize) -> ModbusResult<()> {
        let slot = self.slot(iface)?;
        let ctx = slot.take().ok_or(ModbusError::NotConfigured { iface })?;
        if let Some(ctx) = ctx {
            ctx.shutdown();
        }
        Ok(())
    }

    /// Handle to a configured slot
    pub fn interface(&self, iface: usize) -> ModbusResult<Interface> {
        self.slot(iface)?
            .context()
            .map(Interface::new)
            .ok_or(ModbusError::NotConfigured { iface })
    }

    pub fn is_configured(&self, iface: usize) -> bool {
        self.slots
            .get(iface)
            .map(|slot| slot.configured.load(Ordering::Acquire))
            .unwrap_or(false)
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        for slot in self.slots.iter() {
            if let Some(Some(ctx)) = slot.take() {
                ctx.shutdown();
            }
        }
        self.worker.abort();
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let configured: Vec<usize> = (0..self.slots.len())
            .filter(|&i| self.is_configured(i))
            .collect();
        f.debug_struct("Registry")
            .field("capacity", &self.slots.len())
            .field("configured", &configured)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_runtime() {
        let err = Registry::new().unwrap_err();
        assert!(matches!(err, ModbusError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_slot_bounds() {
        let registry = Registry::with_capacity(2).unwrap();
        assert_eq!(registry.capacity(), 2);
        assert!(!registry.is_configured(5));
        assert!(matches!(
            registry.disable(2),
            Err(ModbusError::InvalidInterface { iface: 2, capacity: 2 })
        ));
        assert!(matches!(
            registry.disable(1),
            Err(ModbusError::NotConfigured { iface: 1 })
        ));
        assert!(matches!(
            registry.interface(0),
            Err(ModbusError::NotConfigured { iface: 0 })
        ));
    }

    #[tokio::test]
    async fn test_work_queue_is_bounded() {
        let registry = Registry::with_capacity(1).unwrap();
        // the worker is not polled before the first await
        assert!(registry.work.submit(Weak::new()));
        assert!(registry.work.submit(Weak::new()));
        assert!(!registry.work.submit(Weak::new()));
    }
}
