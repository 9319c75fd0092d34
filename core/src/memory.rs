//! Process memory accounting.
//!
//! [`TrackingAllocator`] wraps the system allocator and keeps running
//! counters. A binary opts in with:
//!
//! ```ignore
//! #[global_allocator]
//! static GLOBAL: docbench_core::memory::TrackingAllocator = docbench_core::memory::TrackingAllocator;
//! ```
//!
//! Without it, [`snapshot`] still works but reports zero heap counters.

use serde::Serialize;
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicU64, Ordering};

static ALLOCATED: AtomicU64 = AtomicU64::new(0);
static TOTAL_ALLOCATED: AtomicU64 = AtomicU64::new(0);
static ALLOCATION_COUNT: AtomicU64 = AtomicU64::new(0);

pub struct TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: same layout is forwarded to the system allocator.
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: same layout is forwarded to the system allocator.
        let ptr = unsafe { System.alloc_zeroed(layout) };
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        ALLOCATED.fetch_sub(layout.size() as u64, Ordering::Relaxed);
        // SAFETY: ptr was returned by this allocator with the same layout.
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: ptr/layout come from this allocator; new_size is caller-checked.
        let new_ptr = unsafe { System.realloc(ptr, layout, new_size) };
        if !new_ptr.is_null() {
            ALLOCATED.fetch_sub(layout.size() as u64, Ordering::Relaxed);
            record_alloc(new_size);
        }
        new_ptr
    }
}

fn record_alloc(size: usize) {
    ALLOCATED.fetch_add(size as u64, Ordering::Relaxed);
    TOTAL_ALLOCATED.fetch_add(size as u64, Ordering::Relaxed);
    ALLOCATION_COUNT.fetch_add(1, Ordering::Relaxed);
}

/// Point-in-time view of the process memory counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    /// Heap bytes currently live.
    pub allocated: u64,
    /// Heap bytes ever allocated.
    pub total_allocated: u64,
    /// Number of allocations performed.
    pub allocations: u64,
    /// Resident memory obtained from the OS, when the platform exposes it.
    pub reserved: Option<u64>,
    /// Collector cycles. Rust has no collector, so this is only filled in
    /// by readers for managed runtimes.
    pub reclamation_cycles: Option<u64>,
}

impl MemorySnapshot {
    /// Heap counters are only non-zero once the tracking allocator is installed.
    pub fn is_tracking(&self) -> bool {
        self.allocations > 0
    }
}

/// Read the current counters.
pub fn snapshot() -> MemorySnapshot {
    MemorySnapshot {
        allocated: ALLOCATED.load(Ordering::Relaxed),
        total_allocated: TOTAL_ALLOCATED.load(Ordering::Relaxed),
        allocations: ALLOCATION_COUNT.load(Ordering::Relaxed),
        reserved: resident_bytes(),
        reclamation_cycles: None,
    }
}

#[cfg(target_os = "linux")]
fn resident_bytes() -> Option<u64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

#[cfg(not(target_os = "linux"))]
fn resident_bytes() -> Option<u64> {
    None
}

/// Extract `VmRSS` (reported in kB) from a `/proc/<pid>/status` listing.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_vm_rss(status: &str) -> Option<u64> {
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: u64 = line
        .trim_start_matches("VmRSS:")
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(kb * 1024)
}

/// Bytes to whole mebibytes, rounding down.
pub fn to_mib(bytes: u64) -> u64 {
    bytes / 1024 / 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_vm_rss_line() {
        let status = "Name:\tdocbench\nVmPeak:\t  20000 kB\nVmRSS:\t   1536 kB\nThreads:\t1\n";
        assert_eq!(parse_vm_rss(status), Some(1536 * 1024));
    }

    #[test]
    fn missing_vm_rss_is_none() {
        assert_eq!(parse_vm_rss("Name:\tdocbench\n"), None);
        assert_eq!(parse_vm_rss("VmRSS:\tgarbage kB\n"), None);
    }

    #[test]
    fn to_mib_rounds_down() {
        assert_eq!(to_mib(0), 0);
        assert_eq!(to_mib(1024 * 1024 - 1), 0);
        assert_eq!(to_mib(3 * 1024 * 1024 + 5), 3);
    }

    #[test]
    fn snapshot_has_no_reclamation_cycles() {
        assert_eq!(snapshot().reclamation_cycles, None);
    }
}
