//! Shared tokio runtime for callers without one.

use std::sync::LazyLock;

/// Single-threaded runtime: page fetches are cooperative tasks on one thread,
/// suspending only at network I/O, session acquisition and backoff sleeps.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Drive a future to completion on [`SHARED_RUNTIME`].
///
/// Must not be called from inside an async context.
pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
    SHARED_RUNTIME.block_on(future)
}
