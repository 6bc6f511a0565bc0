//! Sampling sources for the tally agent.
//!
//! Each [`Collector`] produces one pass of [`Sample`]s. The agent runs
//! [`runtime::RuntimeCollector`] and [`host::HostCollector`] on independent
//! timers and feeds both into the same queue.

pub mod host;
pub mod runtime;

use anyhow::Result;
use tally_common::Sample;

pub use host::{DiskUsage, HostCollector, HostStatsProvider, MemoryUsage, SysinfoProvider};
pub use runtime::RuntimeCollector;

/// A sampling source that runs on the agent host.
///
/// Implementations are driven by the agent's sampler at every poll interval.
/// The trait requires `Send + Sync` so a collector can be moved into its own
/// task.
pub trait Collector: Send + Sync {
    /// Returns the collector name (e.g. `"runtime"`, `"host"`), used for
    /// logging.
    fn name(&self) -> &str;

    /// Takes one sample pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying system API call fails.
    fn collect(&mut self) -> Result<Vec<Sample>>;
}
