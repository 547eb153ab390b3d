//! Scaffolding for OpenVR-style applications. Provides the background worker
//! thread, shader-program registry, pose-matrix conversions, frame buffer
//! container, and logging setup that such programs keep rewriting, without
//! binding to any particular VR runtime or GL loader.
//!
//! The pieces are independent; most programs use a subset:
//!
//! - [`LoopThread`] runs a [`LoopWorker`] on a background thread through an
//!   init/step/shutdown cycle with cooperative cancellation.
//! - [`App`] and [`app::run`] drive the same cycle for the foreground
//!   (main-thread) side of an application.
//! - [`ShaderCollection`] holds named shader programs and compiles them
//!   through an injected [`ShaderCompiler`].
//! - [`PoseMatrix`] and [`RawProjection`] mirror the row-major matrix layout
//!   VR runtimes hand out and convert it to column-major OpenGL form.
//! - [`FrameBuffer`] owns an interleaved pixel rectangle.
//! - [`Logger`] installs a `log`-facade sink with level filtering and
//!   optional file output.

use thiserror::Error;

pub mod app;
pub mod buffer;
pub mod logging;
pub mod math;
pub mod shader;
pub mod thread;

pub use app::App;
pub use buffer::FrameBuffer;
pub use logging::{LogConfig, LogHandle, LogTargets, Logger};
pub use math::{Matrix4, PoseMatrix, RawProjection, Vector3};
pub use shader::{ProgramHandle, ShaderCollection, ShaderCompiler, ShaderProgram};
pub use thread::{LoopThread, LoopWorker, Thread};

/// Error produced by the scaffolding layers.
#[derive(Debug, Error)]
pub enum VrKitError {
    /// A shader program failed to compile or link. The reason string comes
    /// from the [`ShaderCompiler`] implementation, typically the driver's
    /// info log.
    #[error("shader program `{name}` failed to compile: {reason}")]
    ShaderCompile { name: String, reason: String },

    /// The shader registry rejected an operation, e.g. registering a second
    /// program under an already-taken name.
    #[error("shader registry: {0}")]
    ShaderRegistry(String),

    /// The application's `init` hook reported failure. `shutdown` has
    /// already run by the time this is returned.
    #[error("application init failed")]
    AppInit,

    /// A logger was already installed for this process.
    #[error("logger install failed: {0}")]
    LoggerInstall(#[from] log::SetLoggerError),

    /// I/O failure, e.g. while opening a log file.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
