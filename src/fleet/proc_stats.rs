// src/fleet/proc_stats.rs
//! Process introspection via /proc
//!
//! CPU usage is derived from two utime+stime samples taken 100ms apart,
//! scaled by the clock tick rate. Memory is resident set size from
//! statm scaled by the page size. Any read or parse failure yields
//! `None`; the caller maps that to an Unknown status rather than
//! treating the process as dead.

use std::time::Duration;
use tokio::fs;

/// Interval between the two CPU time samples
const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// One resource usage snapshot of a live process
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcStats {
    pub cpu_percent: f64,
    pub memory_mb: f64,
}

/// Sample CPU and memory usage for a PID. `None` when the process is
/// gone or /proc cannot be read.
pub async fn sample(pid: u32) -> Option<ProcStats> {
    let ticks_per_sec = clock_ticks()?;

    let first = cpu_ticks(pid).await?;
    tokio::time::sleep(SAMPLE_INTERVAL).await;
    let second = cpu_ticks(pid).await?;

    let delta_ticks = second.saturating_sub(first) as f64;
    let cpu_percent = (delta_ticks / ticks_per_sec) / SAMPLE_INTERVAL.as_secs_f64() * 100.0;

    let memory_mb = resident_mb(pid).await?;

    Some(ProcStats {
        cpu_percent,
        memory_mb,
    })
}

fn clock_ticks() -> Option<f64> {
    // SAFETY: sysconf has no preconditions
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks <= 0 {
        return None;
    }
    Some(ticks as f64)
}

fn page_size() -> Option<f64> {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        return None;
    }
    Some(size as f64)
}

/// Combined utime+stime in clock ticks from /proc/<pid>/stat.
async fn cpu_ticks(pid: u32) -> Option<u64> {
    let stat = fs::read_to_string(format!("/proc/{pid}/stat")).await.ok()?;

    // The comm field is parenthesized and may contain spaces; fields
    // are only well-defined after the closing paren.
    let after_comm = stat.rsplit_once(')').map(|(_, rest)| rest)?;
    let fields: Vec<&str> = after_comm.split_whitespace().collect();

    // utime and stime are stat fields 14 and 15, i.e. indexes 11 and 12
    // relative to the field after comm.
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}

/// Resident set size in MB from /proc/<pid>/statm.
async fn resident_mb(pid: u32) -> Option<f64> {
    let statm = fs::read_to_string(format!("/proc/{pid}/statm")).await.ok()?;
    let resident_pages: f64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(resident_pages * page_size()? / (1024.0 * 1024.0))
}
