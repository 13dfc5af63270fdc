//! Test utilities for the cluster catalog
//!
//! Shared by unit tests and the integration suite (through the `test-utils`
//! feature).
//!
//! - [`init_test_logging`] - one-time tracing setup honoring `RUST_LOG`
//! - [`FailingCache`] / [`FlakyStore`] - fault-injecting backends
//! - [`fixtures`] - sample catalogs and pre-wired services
//!
//! # Example
//!
//! ```rust,no_run
//! use cluster_catalog::test_utils::{FailingCache, init_test_logging};
//!
//! init_test_logging(None);
//! let cache = FailingCache::new();
//! ```

mod fakes;
pub mod fixtures;

pub use fakes::{FailingCache, FlakyStore};
pub use fixtures::{PlantFixture, SAMPLE_CATALOG};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Runs once per process. Uses `level` if given, otherwise `RUST_LOG`; with
/// neither, tests stay silent.
///
/// ```bash
/// RUST_LOG=cluster_catalog=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
