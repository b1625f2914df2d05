//! Process-wide logging setup.

/// Tracing subscriber configuration.
pub mod tracing;

/// Initialize process-wide logging.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init();
}
