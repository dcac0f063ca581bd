//! RTU silence detection.
//!
//! RTU frames carry no length field: a frame ends when the line stays quiet for
//! 3.5 character times. [`silence_window`] derives that window from the baud
//! rate and [`SilenceTimer`] is the restartable one-shot timer the byte pump
//! re-arms on every received chunk.

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Baud rate above which the silence window stops shrinking
pub const SILENCE_REFERENCE_BAUD: u32 = 38_400;

/// Bits per character: start + 8 data + parity + stop
const BITS_PER_CHAR: u64 = 11;

/// 3.5 character times, scaled to microseconds
const INTER_FRAME_CHARS_US: u64 = 3_500_000;

/// Inter-frame silence window for `baud_rate`
///
/// Rates above 38400 baud use the 38400 value.
///
/// ```rust
/// use std::time::Duration;
/// use voltage_modbus_serial::timing::silence_window;
///
/// assert_eq!(silence_window(19_200), Duration::from_micros(2005));
/// assert_eq!(silence_window(115_200), silence_window(38_400));
/// ```
pub fn silence_window(baud_rate: u32) -> Duration {
    let baud = baud_rate.clamp(1, SILENCE_REFERENCE_BAUD) as u64;
    Duration::from_micros(BITS_PER_CHAR * INTER_FRAME_CHARS_US / baud)
}

/// Expiry callback run on the timer task
pub type ExpiryCallback = Arc<dyn Fn() + Send + Sync>;

/// Restartable one-shot timer backed by a Tokio task
///
/// `start` and `stop` only publish a new deadline through a watch channel, so
/// they never block and never allocate; they are safe to call from the byte
/// pump. The callback runs once per armed deadline.
pub struct SilenceTimer {
    deadline: watch::Sender<Option<Instant>>,
    task: JoinHandle<()>,
}

impl SilenceTimer {
    /// Spawn the timer task on `handle`
    pub fn spawn(handle: &Handle, on_expiry: ExpiryCallback) -> Self {
        let (deadline, mut rx) = watch::channel(None::<Instant>);

        let task = handle.spawn(async move {
            loop {
                let armed = *rx.borrow_and_update();
                match armed {
                    Some(at) => {
                        tokio::select! {
                            changed = rx.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                            }
                            _ = sleep_until(at) => {
                                // re-armed or stopped while the sleep completed
                                if rx.has_changed().unwrap_or(true) {
                                    continue;
                                }
                                on_expiry();
                                if rx.changed().await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    None => {
                        if rx.changed().await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        Self { deadline, task }
    }

    /// Arm (or re-arm) the timer to fire after `duration`
    pub fn start(&self, duration: Duration) {
        self.deadline.send_replace(Some(Instant::now() + duration));
    }

    /// Disarm the timer
    pub fn stop(&self) {
        self.deadline.send_replace(None);
    }
}

impl Drop for SilenceTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
