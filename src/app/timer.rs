use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;
use tokio::sync::{watch, Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use crate::error::{AppError, Result};
use crate::fetch::{FetchScheduler, Quote};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Scheduled,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Manual,
    Automatic,
}

/// Produces the symbols for the next cycle; called once per cycle before any fetch starts.
pub type SymbolSupplier = Arc<dyn Fn() -> Vec<String> + Send + Sync>;

/// Drives refresh cycles on a cadence or on demand, one cycle at a time.
#[derive(Clone)]
pub struct RefreshTimer {
    inner: Arc<TimerInner>,
}

struct TimerInner {
    scheduler: Arc<FetchScheduler>,
    symbols: SymbolSupplier,
    /// Held for the whole duration of a cycle.
    gate: Arc<AsyncMutex<()>>,
    running: AtomicBool,
    /// Generation of the automatic loop currently waiting for its next tick, 0 when none.
    sleeping: AtomicU64,
    generations: AtomicU64,
    auto: Mutex<Option<AutoLoop>>,
}

struct AutoLoop {
    cancel_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    interval: Duration,
    generation: u64,
}

/// Holds the gate for one cycle and marks the timer running from the moment the gate is taken
/// until the ticket is dropped, including when the cycle task is dropped before it is polled.
struct CycleTicket {
    inner: Arc<TimerInner>,
    _gate: OwnedMutexGuard<()>,
}

impl CycleTicket {
    fn new(inner: Arc<TimerInner>, gate: OwnedMutexGuard<()>) -> Self {
        inner.running.store(true, Ordering::SeqCst);
        Self { inner, _gate: gate }
    }

    fn try_take(inner: &Arc<TimerInner>) -> Result<Self> {
        let gate = Arc::clone(&inner.gate)
            .try_lock_owned()
            .map_err(|_| AppError::Busy)?;
        Ok(Self::new(Arc::clone(inner), gate))
    }

    /// Read the cycle's symbols once, then fetch them.
    async fn run(self, trigger: Trigger) -> Vec<Quote> {
        let symbols = (self.inner.symbols)();
        debug!("{:?} refresh of {} symbols", trigger, symbols.len());
        self.inner.scheduler.refresh_all(&symbols).await
    }
}

impl Drop for CycleTicket {
    fn drop(&mut self) {
        self.inner.running.store(false, Ordering::SeqCst);
    }
}

impl RefreshTimer {
    pub fn new(scheduler: Arc<FetchScheduler>, symbols: SymbolSupplier) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                scheduler,
                symbols,
                gate: Arc::new(AsyncMutex::new(())),
                running: AtomicBool::new(false),
                sleeping: AtomicU64::new(0),
                generations: AtomicU64::new(0),
                auto: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> TimerState {
        if self.inner.running.load(Ordering::SeqCst) {
            return TimerState::Running;
        }
        // Only the loop that is still enabled counts; a disabled one may not have woken yet.
        let armed = self.inner.auto.lock().as_ref().map(|auto| auto.generation);
        match armed {
            Some(generation) if self.inner.sleeping.load(Ordering::SeqCst) == generation => {
                TimerState::Scheduled
            }
            _ => TimerState::Idle,
        }
    }

    pub fn is_auto(&self) -> bool {
        self.inner.auto.lock().is_some()
    }

    pub fn interval(&self) -> Option<Duration> {
        self.inner.auto.lock().as_ref().map(|auto| auto.interval)
    }

    /// Switch to automatic mode: refresh now, then again `interval` after each cycle ends.
    ///
    /// Replaces a previously enabled loop. Must be called from within a Tokio runtime.
    pub fn enable(&self, interval: Duration) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(auto_loop(inner, interval, generation, cancel_rx));

        let previous = self.inner.auto.lock().replace(AutoLoop {
            cancel_tx,
            handle,
            interval,
            generation,
        });
        if let Some(previous) = previous {
            let _ = previous.cancel_tx.send(true);
        }
        info!("automatic refresh every {}s", interval.as_secs());
    }

    /// Stop arming automatic cycles. A cycle already running is left to finish.
    pub fn disable(&self) {
        if let Some(auto) = self.inner.auto.lock().take() {
            let _ = auto.cancel_tx.send(true);
            info!("automatic refresh disabled");
        }
    }

    /// Disable automatic mode and wait for its loop, including any in-flight cycle, to end.
    pub async fn shutdown(&self) {
        let auto = self.inner.auto.lock().take();
        if let Some(auto) = auto {
            let _ = auto.cancel_tx.send(true);
            let _ = auto.handle.await;
        }
        // Wait out a manual cycle as well.
        let _ = self.inner.gate.lock().await;
    }

    /// Start a cycle right away unless one is running, in which case `AppError::Busy` comes
    /// back without waiting. Must be called from within a Tokio runtime.
    ///
    /// The timer reports `Running` as soon as this returns `Ok`.
    pub fn trigger_manual(&self) -> Result<JoinHandle<Vec<Quote>>> {
        let ticket = CycleTicket::try_take(&self.inner)?;
        Ok(tokio::spawn(ticket.run(Trigger::Manual)))
    }

    /// Run a manual cycle and wait for its quotes.
    pub async fn refresh_now(&self) -> Result<Vec<Quote>> {
        let handle = self.trigger_manual()?;
        Ok(handle.await?)
    }

    /// Fetch an explicit symbol set under the same gate as regular cycles, so a one-off
    /// refresh never overlaps one. `AppError::Busy` when a cycle holds the gate.
    pub async fn refresh_symbols(&self, symbols: &[String]) -> Result<Vec<Quote>> {
        let ticket = CycleTicket::try_take(&self.inner)?;
        debug!("one-off refresh of {} symbols", symbols.len());
        let quotes = ticket.inner.scheduler.refresh_all(symbols).await;
        drop(ticket);
        Ok(quotes)
    }
}

async fn auto_loop(
    inner: Arc<TimerInner>,
    interval: Duration,
    generation: u64,
    mut cancel_rx: watch::Receiver<bool>,
) {
    loop {
        if *cancel_rx.borrow() {
            break;
        }

        // An automatic tick that lands on a manual cycle waits for it instead of overlapping.
        let gate = tokio::select! {
            gate = Arc::clone(&inner.gate).lock_owned() => gate,
            _ = cancel_rx.changed() => break,
        };
        if *cancel_rx.borrow() {
            break;
        }
        CycleTicket::new(Arc::clone(&inner), gate)
            .run(Trigger::Automatic)
            .await;
        if *cancel_rx.borrow() {
            break;
        }

        inner.sleeping.store(generation, Ordering::SeqCst);
        let cancelled = tokio::select! {
            _ = sleep(interval) => false,
            _ = cancel_rx.changed() => true,
        };
        let _ = inner
            .sleeping
            .compare_exchange(generation, 0, Ordering::SeqCst, Ordering::SeqCst);
        if cancelled {
            break;
        }
    }
    debug!("automatic refresh loop {generation} stopped");
}
