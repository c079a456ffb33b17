use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use mandelzoom_core::{Bounds, CoarsenessHint, Complex};

use crate::buffer::Generation;
use crate::engine::{Block, BlockOutcome, ComputeEngine, EngineParams, Slot};
use crate::error::RenderError;
use crate::region::Region;

/// Block edge of the first pass of every sweep.
pub const START_COARSENESS: u32 = 16;

/// How long `terminate` waits for each worker before giving up on it.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Notifications for the display layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewEvent {
    /// A pass landed and the front buffer was refreshed.
    FrameUpdated {
        slot: Slot,
        generation: Generation,
        coarseness: u32,
    },
    /// The view's complex-plane window, sent before each render launches.
    CoordinatesChanged { slot: Slot, bounds: Bounds },
    /// The complex point under the pointer, for seeding a Julia view.
    PointSelected { slot: Slot, point: Complex },
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Tracks the current session ticket for cancellation and progress.
///
/// Advancing the ticket tells every worker of older sessions to stop after
/// its current pass. The progress counters count finished passes.
#[derive(Debug)]
pub struct RenderCancel {
    ticket: AtomicU64,
    progress_done: AtomicUsize,
    progress_total: AtomicUsize,
}

impl RenderCancel {
    pub fn new() -> Self {
        Self {
            ticket: AtomicU64::new(0),
            progress_done: AtomicUsize::new(0),
            progress_total: AtomicUsize::new(0),
        }
    }

    /// Cancel the current session by advancing the ticket.
    pub fn cancel(&self) {
        self.ticket.fetch_add(1, Ordering::SeqCst);
    }

    pub fn ticket(&self) -> u64 {
        self.ticket.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self, ticket: u64) -> bool {
        self.ticket() != ticket
    }

    pub fn reset_progress(&self, total: usize) {
        self.progress_total.store(total, Ordering::Relaxed);
        self.progress_done.store(0, Ordering::Relaxed);
    }

    pub fn inc_progress(&self) {
        self.progress_done.fetch_add(1, Ordering::Relaxed);
    }

    /// `(done, total)` passes of the current session.
    pub fn progress(&self) -> (usize, usize) {
        (
            self.progress_done.load(Ordering::Relaxed),
            self.progress_total.load(Ordering::Relaxed),
        )
    }
}

impl Default for RenderCancel {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Coarseness
// ---------------------------------------------------------------------------

/// The start block size and the live end block size of a view's sweeps.
///
/// The end value is shared with running workers and read after every pass,
/// so lifting a finger mid-sweep lets the sweep continue down to full
/// detail.
#[derive(Debug, Clone)]
pub struct CoarsenessControl {
    start: u32,
    end: Arc<AtomicU32>,
}

impl CoarsenessControl {
    /// `start` is raised to at least 1; the end starts at 1.
    pub fn new(start: u32) -> Self {
        Self {
            start: start.max(1),
            end: Arc::new(AtomicU32::new(1)),
        }
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn end(&self) -> u32 {
        self.end.load(Ordering::SeqCst)
    }

    /// Clamped to `[1, start]`.
    pub fn set_end(&self, end: u32) {
        self.end.store(end.clamp(1, self.start), Ordering::SeqCst);
    }

    /// Coarse passes only while a gesture is active; full detail afterwards.
    pub fn apply_hint(&self, hint: CoarsenessHint) {
        match hint {
            CoarsenessHint::Coarse => self.set_end(self.start),
            CoarsenessHint::Fine => self.set_end(1),
        }
    }

    pub fn sweep(&self) -> CoarsenessSweep {
        CoarsenessSweep {
            next: Some(self.start),
            first: true,
            end: Arc::clone(&self.end),
        }
    }
}

impl Default for CoarsenessControl {
    fn default() -> Self {
        Self::new(START_COARSENESS)
    }
}

/// Yields `(coarseness, first_pass)`: the start level, then halvings until
/// a level at or below the end is reached.
#[derive(Debug)]
pub struct CoarsenessSweep {
    next: Option<u32>,
    first: bool,
    end: Arc<AtomicU32>,
}

impl Iterator for CoarsenessSweep {
    type Item = (u32, bool);

    fn next(&mut self) -> Option<Self::Item> {
        let level = self.next?;
        let first = std::mem::replace(&mut self.first, false);
        let end = self.end.load(Ordering::SeqCst).max(1);
        self.next = (level > end).then_some(level / 2);
        Some((level, first))
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// One worker thread plus the channel it signals on exit, for bounded joins.
struct RenderTask {
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

impl RenderTask {
    /// Wait up to `timeout`; on timeout the thread is detached.
    fn join_within(self, timeout: Duration) -> bool {
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                join_logged(self.handle);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
        }
    }

    fn join(self) {
        // An error just means the worker exited without signalling (panic).
        let _ = self.done.recv();
        join_logged(self.handle);
    }
}

fn join_logged(handle: JoinHandle<()>) {
    let name = handle.thread().name().unwrap_or("render worker").to_string();
    if handle.join().is_err() {
        error!(worker = %name, "render worker panicked");
    }
}

struct Worker<E: ComputeEngine> {
    engine: Arc<E>,
    slot: Slot,
    generation: Generation,
    region: Region,
    sweep: CoarsenessSweep,
    cancel: Arc<RenderCancel>,
    ticket: u64,
    events: Option<Sender<ViewEvent>>,
}

impl<E: ComputeEngine> Worker<E> {
    fn run(self) {
        let start = Instant::now();
        let mut passes = 0u32;
        for (coarseness, first_pass) in self.sweep {
            let block = Block {
                region: self.region,
                coarseness,
                first_pass,
            };
            let outcome = self.engine.draw_block(self.slot, self.generation, &block);
            if outcome != BlockOutcome::Committed {
                debug!(slot = ?self.slot, generation = self.generation, ?outcome, "Sweep stopped");
                return;
            }
            passes += 1;
            self.cancel.inc_progress();
            self.engine.refresh_surface(self.slot);
            if let Some(tx) = &self.events {
                // The display side may have gone away; rendering continues.
                let _ = tx.send(ViewEvent::FrameUpdated {
                    slot: self.slot,
                    generation: self.generation,
                    coarseness,
                });
            }
            if self.cancel.is_cancelled(self.ticket) {
                debug!(slot = ?self.slot, generation = self.generation, "Sweep cancelled");
                return;
            }
        }
        debug!(
            slot = ?self.slot,
            generation = self.generation,
            passes,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Sweep complete"
        );
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Runs progressive sweeps for one engine slot: at most one session at a
/// time, one thread per sub-region.
pub struct RenderScheduler<E: ComputeEngine + 'static> {
    engine: Arc<E>,
    slot: Slot,
    coarseness: CoarsenessControl,
    cancel: Arc<RenderCancel>,
    tasks: Vec<RenderTask>,
    generation: Option<Generation>,
    events: Option<Sender<ViewEvent>>,
    join_timeout: Duration,
}

impl<E: ComputeEngine + 'static> RenderScheduler<E> {
    pub fn new(engine: Arc<E>, slot: Slot) -> Self {
        Self {
            engine,
            slot,
            coarseness: CoarsenessControl::default(),
            cancel: Arc::new(RenderCancel::new()),
            tasks: Vec::new(),
            generation: None,
            events: None,
            join_timeout: JOIN_TIMEOUT,
        }
    }

    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn set_event_sender(&mut self, events: Option<Sender<ViewEvent>>) {
        self.events = events;
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub fn coarseness(&self) -> &CoarsenessControl {
        &self.coarseness
    }

    /// Generation of the most recent session, if any was launched.
    pub fn generation(&self) -> Option<Generation> {
        self.generation
    }

    /// `(done, total)` passes of the current session.
    pub fn progress(&self) -> (usize, usize) {
        self.cancel.progress()
    }

    /// Whether any worker of the current session is still running.
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|t| !t.handle.is_finished())
    }

    /// Cancel whatever is running, configure the engine with `params`, and
    /// start one worker per region.
    pub fn launch(&mut self, params: &EngineParams, regions: &[Region]) -> crate::Result<Generation> {
        self.terminate();
        let generation = self.engine.configure(self.slot, params);
        self.generation = Some(generation);
        let ticket = self.cancel.ticket();
        let passes = self.coarseness.sweep().count();
        self.cancel.reset_progress(passes * regions.len());

        for (i, &region) in regions.iter().enumerate() {
            let (done_tx, done_rx) = mpsc::channel();
            let worker = Worker {
                engine: Arc::clone(&self.engine),
                slot: self.slot,
                generation,
                region,
                sweep: self.coarseness.sweep(),
                cancel: Arc::clone(&self.cancel),
                ticket,
                events: self.events.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("render-{:?}-{i}", self.slot).to_lowercase())
                .spawn(move || {
                    worker.run();
                    let _ = done_tx.send(());
                })
                .map_err(RenderError::Spawn)?;
            self.tasks.push(RenderTask {
                handle,
                done: done_rx,
            });
        }
        debug!(
            slot = ?self.slot,
            generation,
            workers = regions.len(),
            start = self.coarseness.start(),
            end = self.coarseness.end(),
            "Render session launched"
        );
        Ok(generation)
    }

    /// Cancel the running session and join its workers, waiting at most the
    /// join timeout for each. Workers still alive afterwards are left to
    /// finish on their own; their output is rejected by generation. Returns
    /// whether every worker was joined.
    pub fn terminate(&mut self) -> bool {
        if self.tasks.is_empty() {
            return true;
        }
        self.cancel.cancel();
        self.engine.request_abort(self.slot);
        let mut all_joined = true;
        for task in self.tasks.drain(..) {
            if !task.join_within(self.join_timeout) {
                warn!(
                    slot = ?self.slot,
                    timeout_ms = self.join_timeout.as_millis() as u64,
                    "render worker still alive after join timeout"
                );
                all_joined = false;
            }
        }
        all_joined
    }

    /// Block until the current session's sweeps finish on their own.
    pub fn wait(&mut self) {
        for task in self.tasks.drain(..) {
            task.join();
        }
    }
}

impl<E: ComputeEngine + 'static> Drop for RenderScheduler<E> {
    fn drop(&mut self) {
        self.terminate();
    }
}
