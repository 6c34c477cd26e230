// Typebeat Engine Core - real-time pattern recognition for a rhythm/typing game
// Observes a live stream of timestamped keystrokes and maintains a scored,
// time-decayed registry of repeated patterns plus a learned user-style model.

// Module declarations
pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod persistence;

// Re-exports for convenience
pub use analysis::AnalysisSnapshot;
pub use config::EngineConfig;
pub use engine::PatternEngine;

use std::sync::Once;

static LOG_INIT: Once = Once::new();

/// Initialize logging for host binaries and tests.
///
/// Safe to call more than once; only the first call installs the subscriber.
pub fn init_logging() {
    LOG_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().try_init();
    });
}
