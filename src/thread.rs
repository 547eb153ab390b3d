//! Background worker threads with a cooperative shutdown protocol.
//!
//! [`Thread`] is the thin ownership layer: at most one OS thread at a time,
//! joined on drop so no background execution outlives its owner. On top of it,
//! [`LoopThread`] drives a [`LoopWorker`] through the three-phase cycle these
//! applications use for capture threads, tracking threads, and the like:
//! `init` once, `step` repeatedly, `shutdown` once. The owner can block on the
//! result of `init` before proceeding, and can request termination at any
//! time; termination is cooperative, taking effect at the next iteration
//! boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// Owner of at most one background OS thread.
///
/// `run` spawns, `join` reaps. The handle is held until `join` (or drop), so
/// a `run` issued while a previous spawn is still unreaped is a no-op, even
/// if that thread has already returned.
pub struct Thread {
    handle: Option<JoinHandle<()>>,
}

impl Thread {
    pub fn new() -> Thread {
        Thread { handle: None }
    }

    /// Spawn a background thread running `entry`, if none is currently
    /// owned. Calling this while a thread is owned has no effect; it is not
    /// an error.
    pub fn run<F>(&mut self, entry: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.handle.is_none() {
            self.handle = Some(thread::spawn(entry));
        }
    }

    /// Whether a spawned thread is currently owned. Note this tracks
    /// ownership of the handle, not liveness: a thread that has returned
    /// still counts until `join` reaps it.
    pub fn active(&self) -> bool {
        self.handle.is_some()
    }

    /// Block until the owned thread (if any) returns, then release it.
    /// Immediate no-op when nothing is owned; safe to call repeatedly.
    ///
    /// A panic that escaped the entry point is swallowed here: containing
    /// failures is the entry point's job, and re-raising on the owner
    /// thread would abort when joining from a destructor.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("background thread panicked");
            }
        }
    }
}

impl Default for Thread {
    fn default() -> Thread {
        Thread::new()
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        self.join();
    }
}

/// The lifecycle hooks a background worker implements.
///
/// All hooks take `&self`: the worker is shared between the background
/// thread (which calls `init`, `step`, and `shutdown`) and the owner thread
/// (which calls `on_stop` from [`LoopThread::stop`]). Workers that mutate
/// state use interior mutability — atomics, a `Mutex`, a channel — with
/// whatever granularity suits them.
pub trait LoopWorker: Send + Sync + 'static {
    /// Called once per cycle, before any `step`. Returning `false` skips
    /// the loop entirely; `shutdown` still runs.
    fn init(&self) -> bool;

    /// One loop iteration. Return `true` to be called again, `false` to end
    /// the cycle. A running `step` is never interrupted; cancellation is
    /// checked only between calls.
    fn step(&self) -> bool;

    /// Called exactly once per cycle, after the loop ends — also when
    /// `init` failed.
    fn shutdown(&self);

    /// Pre-stop hook, called on the owner's thread by [`LoopThread::stop`]
    /// after the stop flag is set and before joining. Implement it when
    /// `step` blocks on an external resource that needs a nudge (post to a
    /// semaphore, drop a connection, send a sentinel). Default: nothing.
    fn on_stop(&self) {}
}

/// State shared between the owner and the spawned cycle: the cancellation
/// flag, and the init-completion record guarded by the handshake mutex.
struct LoopState {
    stop: AtomicBool,
    init: Mutex<Option<bool>>,
    init_done: Condvar,
}

/// A background thread running a [`LoopWorker`] cycle.
///
/// `run` spawns the cycle, `wait_for_init` blocks until the worker's `init`
/// has reported, `stop` requests cooperative termination and joins. The
/// worker may also end the cycle itself by returning `false` from `step`.
/// Dropping a `LoopThread` performs `stop`.
///
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use vrkit::thread::{LoopThread, LoopWorker};
///
/// struct Countdown {
///     left: AtomicUsize,
/// }
///
/// impl LoopWorker for Countdown {
///     fn init(&self) -> bool {
///         true
///     }
///     fn step(&self) -> bool {
///         self.left.fetch_sub(1, Ordering::Relaxed) > 1
///     }
///     fn shutdown(&self) {}
/// }
///
/// let mut worker = LoopThread::new(Countdown { left: AtomicUsize::new(3) });
/// worker.run();
/// assert!(worker.wait_for_init());
/// worker.join();
/// assert_eq!(worker.worker().left.load(Ordering::Relaxed), 0);
/// ```
pub struct LoopThread<W: LoopWorker> {
    worker: Arc<W>,
    state: Arc<LoopState>,
    thread: Thread,
}

impl<W: LoopWorker> LoopThread<W> {
    pub fn new(worker: W) -> LoopThread<W> {
        LoopThread {
            worker: Arc::new(worker),
            state: Arc::new(LoopState {
                stop: AtomicBool::new(false),
                init: Mutex::new(None),
                init_done: Condvar::new(),
            }),
            thread: Thread::new(),
        }
    }

    /// The worker driven by this thread.
    pub fn worker(&self) -> &W {
        &self.worker
    }

    /// Spawn the worker cycle, if one isn't already owned. Idempotent like
    /// [`Thread::run`]. Each spawn begins a fresh cycle: the init record is
    /// cleared here (no worker thread can be alive at this point) and the
    /// stop flag is cleared at the top of the spawned cycle.
    pub fn run(&mut self) {
        if self.thread.active() {
            return;
        }

        *lock(&self.state.init) = None;

        let worker = Arc::clone(&self.worker);
        let state = Arc::clone(&self.state);
        self.thread.run(move || run_cycle(&*worker, &state));
    }

    /// Request cooperative termination and block until the worker cycle has
    /// fully exited. Sets the stop flag, invokes the worker's
    /// [`on_stop`](LoopWorker::on_stop) hook, then joins.
    ///
    /// Idempotent, and safe in every state: before the first `run`, after
    /// the cycle exited on its own, or repeatedly. `shutdown` runs at most
    /// once per cycle regardless; `on_stop` is invoked on every call, so
    /// hooks must tolerate re-invocation.
    pub fn stop(&mut self) {
        self.state.stop.store(true, Ordering::Release);
        self.worker.on_stop();
        self.thread.join();
    }

    /// Whether termination has been requested for the current cycle.
    pub fn stopping(&self) -> bool {
        self.state.stop.load(Ordering::Acquire)
    }

    /// Block until the current cycle's `init` has reported, and return its
    /// result. Once the record is set, further calls return immediately
    /// with the same value until the next `run`.
    ///
    /// Precondition: `run` has been called for this cycle. Waiting before
    /// any `run` blocks until some later cycle completes its init.
    pub fn wait_for_init(&self) -> bool {
        let mut record = lock(&self.state.init);
        loop {
            match *record {
                Some(succeeded) => return succeeded,
                None => record = wait(&self.state.init_done, record),
            }
        }
    }

    /// Block until the cycle exits on its own, without requesting
    /// termination. No-op if nothing is running.
    pub fn join(&mut self) {
        self.thread.join();
    }
}

impl<W: LoopWorker> Drop for LoopThread<W> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One full worker cycle, run on the spawned thread.
fn run_cycle<W: LoopWorker>(worker: &W, state: &LoopState) {
    state.stop.store(false, Ordering::Release);

    let succeeded = worker.init();

    // Publish under the lock, then signal: a waiter woken by the notify can
    // never observe the record still unset.
    *lock(&state.init) = Some(succeeded);
    state.init_done.notify_all();

    if succeeded {
        while !state.stop.load(Ordering::Acquire) && worker.step() {}
    } else {
        log::debug!("worker init failed; skipping loop");
    }

    worker.shutdown();
}

// Poisoning means a worker hook panicked with the handshake lock held; the
// record it protects is a plain Option<bool>, still meaningful, so keep
// going rather than compounding one panic with another.
fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn wait<'a, T>(
    condvar: &Condvar,
    guard: std::sync::MutexGuard<'a, T>,
) -> std::sync::MutexGuard<'a, T> {
    condvar.wait(guard).unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::{channel, Receiver, Sender};
    use std::time::Duration;

    /// Worker with counted hooks. `step` consults a script function; an
    /// optional gate channel makes `step` block until released.
    struct Probe {
        init_result: bool,
        init_calls: AtomicUsize,
        step_calls: AtomicUsize,
        shutdown_calls: AtomicUsize,
        on_stop_calls: AtomicUsize,
        step_fn: fn(usize) -> bool,
        gate: Option<Mutex<Receiver<()>>>,
        gate_tx: Option<Sender<()>>,
    }

    impl Probe {
        fn new(init_result: bool, step_fn: fn(usize) -> bool) -> Probe {
            Probe {
                init_result,
                init_calls: AtomicUsize::new(0),
                step_calls: AtomicUsize::new(0),
                shutdown_calls: AtomicUsize::new(0),
                on_stop_calls: AtomicUsize::new(0),
                step_fn,
                gate: None,
                gate_tx: None,
            }
        }

        /// Make each `step` wait for one token; `on_stop` posts a token.
        fn gated(mut self) -> Probe {
            let (tx, rx) = channel();
            self.gate = Some(Mutex::new(rx));
            self.gate_tx = Some(tx);
            self
        }
    }

    impl LoopWorker for Probe {
        fn init(&self) -> bool {
            self.init_calls.fetch_add(1, Ordering::SeqCst);
            self.init_result
        }

        fn step(&self) -> bool {
            if let Some(gate) = &self.gate {
                let _ = gate.lock().unwrap().recv();
            }
            let n = self.step_calls.fetch_add(1, Ordering::SeqCst);
            (self.step_fn)(n + 1)
        }

        fn shutdown(&self) {
            self.shutdown_calls.fetch_add(1, Ordering::SeqCst);
        }

        fn on_stop(&self) {
            self.on_stop_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(tx) = &self.gate_tx {
                let _ = tx.send(());
            }
        }
    }

    #[test]
    fn thread_run_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = channel();

        let mut thread = Thread::new();

        let c1 = Arc::clone(&calls);
        thread.run(move || {
            c1.fetch_add(1, Ordering::SeqCst);
            rx.recv().unwrap();
        });
        assert!(thread.active());

        let c2 = Arc::clone(&calls);
        thread.run(move || {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        tx.send(()).unwrap();
        thread.join();
        assert!(!thread.active());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn thread_join_without_run_returns() {
        let mut thread = Thread::new();
        thread.join();
        thread.join();
        assert!(!thread.active());
    }

    #[test]
    fn thread_drop_joins() {
        let done = Arc::new(AtomicUsize::new(0));
        {
            let done = Arc::clone(&done);
            let mut thread = Thread::new();
            thread.run(move || {
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
        // drop returned, so the thread must have been joined
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn run_twice_spawns_one_worker() {
        let mut lt = LoopThread::new(Probe::new(true, |_| false).gated());
        lt.run();
        lt.run();
        lt.stop();
        assert_eq!(lt.worker().init_calls.load(Ordering::SeqCst), 1);
        assert_eq!(lt.worker().shutdown_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_before_run_returns_promptly() {
        let mut lt = LoopThread::new(Probe::new(true, |_| true));
        lt.stop();
        assert_eq!(lt.worker().on_stop_calls.load(Ordering::SeqCst), 1);
        assert_eq!(lt.worker().shutdown_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_init_skips_loop_but_shuts_down() {
        let mut lt = LoopThread::new(Probe::new(false, |_| true));
        lt.run();
        assert!(!lt.wait_for_init());
        lt.join();
        assert_eq!(lt.worker().step_calls.load(Ordering::SeqCst), 0);
        assert_eq!(lt.worker().shutdown_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_terminates_endless_loop() {
        let mut lt = LoopThread::new(Probe::new(true, |_| true));
        lt.run();
        assert!(lt.wait_for_init());
        lt.stop();

        assert_eq!(lt.worker().shutdown_calls.load(Ordering::SeqCst), 1);

        // no further iterations after stop returned
        let settled = lt.worker().step_calls.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(lt.worker().step_calls.load(Ordering::SeqCst), settled);
    }

    #[test]
    fn worker_self_terminates_when_step_returns_false() {
        let mut lt = LoopThread::new(Probe::new(true, |n| n < 4));
        lt.run();
        lt.join();
        assert_eq!(lt.worker().step_calls.load(Ordering::SeqCst), 4);
        assert_eq!(lt.worker().shutdown_calls.load(Ordering::SeqCst), 1);

        // the cycle is over; stop must return immediately and change nothing
        lt.stop();
        assert_eq!(lt.worker().shutdown_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn double_stop_shuts_down_once() {
        let mut lt = LoopThread::new(Probe::new(true, |_| true));
        lt.run();
        assert!(lt.wait_for_init());
        lt.stop();
        lt.stop();
        assert_eq!(lt.worker().shutdown_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn on_stop_unblocks_a_waiting_step() {
        let mut lt = LoopThread::new(Probe::new(true, |_| true).gated());
        lt.run();
        assert!(lt.wait_for_init());
        // step is parked on the gate; stop's hook must release it
        lt.stop();
        assert_eq!(lt.worker().shutdown_calls.load(Ordering::SeqCst), 1);
        assert!(lt.worker().on_stop_calls.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn ten_step_scenario() {
        let mut lt = LoopThread::new(Probe::new(true, |n| n < 10));
        lt.run();
        lt.join();
        assert_eq!(lt.worker().step_calls.load(Ordering::SeqCst), 10);
        assert_eq!(lt.worker().shutdown_calls.load(Ordering::SeqCst), 1);
        assert!(lt.wait_for_init());
    }

    #[test]
    fn wait_for_init_repeats_within_a_cycle() {
        let mut lt = LoopThread::new(Probe::new(true, |_| false));
        lt.run();
        assert!(lt.wait_for_init());
        assert!(lt.wait_for_init());
        lt.join();
        assert!(lt.wait_for_init());
    }

    #[test]
    fn rerun_after_join_starts_a_fresh_cycle() {
        let mut lt = LoopThread::new(Probe::new(true, |n| n % 3 != 0));
        lt.run();
        lt.join();
        lt.run();
        assert!(lt.wait_for_init());
        lt.join();
        assert_eq!(lt.worker().init_calls.load(Ordering::SeqCst), 2);
        assert_eq!(lt.worker().shutdown_calls.load(Ordering::SeqCst), 2);
        assert_eq!(lt.worker().step_calls.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn stop_flag_resets_on_rerun() {
        let mut lt = LoopThread::new(Probe::new(true, |n| n < 2));
        lt.run();
        lt.stop();

        lt.run();
        assert!(lt.wait_for_init());
        lt.join();
        // second cycle ran to natural completion despite the earlier stop
        assert_eq!(lt.worker().shutdown_calls.load(Ordering::SeqCst), 2);
        assert!(!lt.stopping());
    }

    /// Worker whose counters outlive the `LoopThread`.
    struct SharedCounter {
        shutdowns: Arc<AtomicUsize>,
    }

    impl LoopWorker for SharedCounter {
        fn init(&self) -> bool {
            true
        }
        fn step(&self) -> bool {
            true
        }
        fn shutdown(&self) {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn drop_stops_the_worker() {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        {
            let mut lt = LoopThread::new(SharedCounter {
                shutdowns: Arc::clone(&shutdowns),
            });
            lt.run();
            assert!(lt.wait_for_init());
        }
        // drop returned, so the cycle was stopped and joined
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }
}
