//! Process and allocator introspection.
//!
//! # Responsibilities
//! - Snapshot scheduler and allocator statistics for the admin runtime view
//! - Purge allocator dirty pages for the `gc` task
//!
//! # Design Decisions
//! - jemalloc is the allocator of record; on targets without it the memory
//!   block reports as unavailable
//! - Statistics are read on demand, nothing is sampled in the background

use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[cfg(not(target_env = "msvc"))]
pub use tikv_jemallocator::Jemalloc;

/// Install jemalloc as the global allocator of the calling crate.
///
/// ```ignore
/// gantry::use_jemalloc!();
/// ```
#[macro_export]
macro_rules! use_jemalloc {
    () => {
        #[cfg(not(target_env = "msvc"))]
        #[global_allocator]
        static GLOBAL: $crate::observability::runtime::Jemalloc =
            $crate::observability::runtime::Jemalloc;
    };
}

static PURGES: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("allocator statistics unavailable: {0}")]
pub struct AllocatorError(String);

/// jemalloc counters, in bytes.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AllocatorStats {
    pub allocated: usize,
    pub active: usize,
    pub metadata: usize,
    pub resident: usize,
    pub mapped: usize,
    pub retained: usize,
    pub purges: u64,
}

impl AllocatorStats {
    /// Refresh the allocator epoch and read its counters.
    #[cfg(not(target_env = "msvc"))]
    pub fn read() -> Result<Self, AllocatorError> {
        use tikv_jemalloc_ctl::{epoch, stats};

        let err = |e: tikv_jemalloc_ctl::Error| AllocatorError(e.to_string());
        epoch::advance().map_err(err)?;
        Ok(Self {
            allocated: stats::allocated::read().map_err(err)?,
            active: stats::active::read().map_err(err)?,
            metadata: stats::metadata::read().map_err(err)?,
            resident: stats::resident::read().map_err(err)?,
            mapped: stats::mapped::read().map_err(err)?,
            retained: stats::retained::read().map_err(err)?,
            purges: PURGES.load(Ordering::Relaxed),
        })
    }

    #[cfg(target_env = "msvc")]
    pub fn read() -> Result<Self, AllocatorError> {
        Err(AllocatorError("jemalloc not available on this target".into()))
    }
}

/// jemalloc version string, if linked.
pub fn allocator_version() -> Option<&'static str> {
    #[cfg(not(target_env = "msvc"))]
    {
        tikv_jemalloc_ctl::version::read().ok()
    }
    #[cfg(target_env = "msvc")]
    {
        None
    }
}

/// Return unused dirty pages of every arena to the operating system.
#[cfg(not(target_env = "msvc"))]
pub fn purge() -> Result<(), AllocatorError> {
    let code = purge_all_arenas();
    if code != 0 {
        return Err(AllocatorError(format!("purge failed with code {code}")));
    }
    PURGES.fetch_add(1, Ordering::Relaxed);
    Ok(())
}

/// `arena.<MALLCTL_ARENAS_ALL>.purge`, returning the raw mallctl status.
///
/// `tikv_jemalloc_ctl::raw` only covers controls that read or write a value,
/// so this void control goes through the sys binding.
#[cfg(not(target_env = "msvc"))]
fn purge_all_arenas() -> i32 {
    // MALLCTL_ARENAS_ALL is 4096 in jemalloc 5.
    const NAME: &[u8] = b"arena.4096.purge\0";

    // SAFETY: the name is NUL-terminated and this control takes no input or
    // output, so every pointer argument is null and the length is zero.
    unsafe {
        tikv_jemalloc_sys::mallctl(
            NAME.as_ptr().cast(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            0,
        )
    }
}

#[cfg(target_env = "msvc")]
pub fn purge() -> Result<(), AllocatorError> {
    Err(AllocatorError("jemalloc not available on this target".into()))
}

/// Scheduler metrics of the current Tokio runtime.
#[derive(Debug, Clone, Copy)]
struct SchedulerStats {
    workers: usize,
    alive_tasks: usize,
    global_queue_depth: usize,
}

impl SchedulerStats {
    fn current() -> Option<Self> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let metrics = handle.metrics();
        Some(Self {
            workers: metrics.num_workers(),
            alive_tasks: metrics.num_alive_tasks(),
            global_queue_depth: metrics.global_queue_depth(),
        })
    }
}

/// Snapshot rendered by the admin `/runtime` handler.
#[derive(Debug, Clone)]
pub struct RuntimeStats {
    cpus: usize,
    scheduler: Option<SchedulerStats>,
    allocator: Result<AllocatorStats, AllocatorError>,
}

impl RuntimeStats {
    pub fn collect() -> Self {
        Self {
            cpus: num_cpus::get(),
            scheduler: SchedulerStats::current(),
            allocator: AllocatorStats::read(),
        }
    }
}

impl fmt::Display for RuntimeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheduler = self.scheduler.unwrap_or(SchedulerStats {
            workers: 0,
            alive_tasks: 0,
            global_queue_depth: 0,
        });
        write!(
            f,
            "NumCPU: {}\nNumWorkers: {}\nNumAliveTasks: {}\nGlobalQueueDepth: {}\n",
            self.cpus, scheduler.workers, scheduler.alive_tasks, scheduler.global_queue_depth
        )?;

        match &self.allocator {
            Ok(m) => write!(
                f,
                "MemStats:\n\tAllocated: {}\n\tActive: {}\n\tMetadata: {}\n\tResident: {}\n\tMapped: {}\n\tRetained: {}\n\tPurges: {}\n",
                m.allocated, m.active, m.metadata, m.resident, m.mapped, m.retained, m.purges
            )?,
            Err(e) => writeln!(f, "MemStats:\n\tUnavailable: {}", e)?,
        }

        let mut version = format!("gantry {}", env!("CARGO_PKG_VERSION"));
        if let Some(jemalloc) = allocator_version() {
            let _ = write!(version, " (jemalloc {})", jemalloc);
        }
        writeln!(f, "Version: {}", version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runtime_dump_fields() {
        let dump = RuntimeStats::collect().to_string();
        let fields: Vec<&str> = dump
            .lines()
            .map(|line| line.trim_start().split(':').next().unwrap())
            .collect();

        assert_eq!(&fields[..5], ["NumCPU", "NumWorkers", "NumAliveTasks", "GlobalQueueDepth", "MemStats"]);
        assert_eq!(fields.last(), Some(&"Version"));
        assert!(dump.contains(&format!("NumCPU: {}\n", num_cpus::get())));
    }

    #[cfg(not(target_env = "msvc"))]
    #[test]
    fn test_purge_all_arenas_succeeds() {
        assert_eq!(purge_all_arenas(), 0);
    }

    #[cfg(not(target_env = "msvc"))]
    #[test]
    fn test_purge_counts() {
        let before = PURGES.load(Ordering::Relaxed);
        purge().unwrap();
        assert!(PURGES.load(Ordering::Relaxed) > before);
        assert!(AllocatorStats::read().unwrap().purges > before);
    }
}
