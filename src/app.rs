//! Foreground application lifecycle.
//!
//! The main-thread mirror of the background worker cycle in
//! [`thread`](crate::thread): an application initializes once, updates until
//! it decides to quit, then shuts down. Unlike a
//! [`LoopWorker`](crate::thread::LoopWorker), an `App` is owner-driven and
//! single-threaded, so its hooks take `&mut self`.

use crate::VrKitError;

/// The lifecycle hooks an application implements.
pub trait App {
    /// Called once before the first `update`. Returning `false` aborts the
    /// run; `shutdown` still runs.
    fn init(&mut self) -> bool;

    /// One frame of work. Return `true` to keep running, `false` to quit.
    fn update(&mut self) -> bool;

    /// Called exactly once, after the last `update` — also when `init`
    /// failed.
    fn shutdown(&mut self);
}

/// Drive an [`App`] through its full lifecycle: `init` once, `update` until
/// it returns `false`, `shutdown` once.
///
/// Returns [`VrKitError::AppInit`] when `init` reports failure; `shutdown`
/// has already run by then.
///
/// ```
/// use vrkit::app::{self, App};
///
/// struct Countdown(u32);
///
/// impl App for Countdown {
///     fn init(&mut self) -> bool {
///         true
///     }
///     fn update(&mut self) -> bool {
///         self.0 -= 1;
///         self.0 > 0
///     }
///     fn shutdown(&mut self) {}
/// }
///
/// let mut app = Countdown(3);
/// app::run(&mut app).unwrap();
/// assert_eq!(app.0, 0);
/// ```
pub fn run<A: App>(app: &mut A) -> Result<(), VrKitError> {
    if !app.init() {
        log::debug!("app init failed");
        app.shutdown();
        return Err(VrKitError::AppInit);
    }

    while app.update() {}

    app.shutdown();
    Ok(())
}
