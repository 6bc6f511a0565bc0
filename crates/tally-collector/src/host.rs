use crate::Collector;
use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use sysinfo::{Disks, System};
use tally_common::Sample;

/// Capacity of the filesystem holding a path, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskUsage {
    pub total: u64,
    pub free: u64,
}

/// Physical memory of the host, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub total: u64,
    pub free: u64,
}

/// Source of host statistics. Swapped for a fake in tests.
pub trait HostStatsProvider: Send + Sync {
    fn memory_usage(&mut self) -> Result<MemoryUsage>;

    /// Utilization of each logical core, in percent.
    fn cpu_percents(&mut self) -> Result<Vec<f64>>;

    /// Usage of the filesystem mounted at or above `path`.
    fn disk_usage(&mut self, path: &Path) -> Result<DiskUsage>;
}

/// [`HostStatsProvider`] backed by `sysinfo`.
pub struct SysinfoProvider {
    system: System,
    disks: Disks,
}

impl SysinfoProvider {
    pub fn new() -> Self {
        let mut system = System::new();
        // Usage is computed between refreshes; prime the first one.
        system.refresh_cpu_all();
        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
        }
    }
}

impl Default for SysinfoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl HostStatsProvider for SysinfoProvider {
    fn memory_usage(&mut self) -> Result<MemoryUsage> {
        self.system.refresh_memory();
        Ok(MemoryUsage {
            total: self.system.total_memory(),
            free: self.system.free_memory(),
        })
    }

    fn cpu_percents(&mut self) -> Result<Vec<f64>> {
        self.system.refresh_cpu_all();
        Ok(self
            .system
            .cpus()
            .iter()
            .map(|cpu| cpu.cpu_usage() as f64)
            .collect())
    }

    fn disk_usage(&mut self, path: &Path) -> Result<DiskUsage> {
        self.disks.refresh();
        // Longest mount point that contains the path.
        self.disks
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| DiskUsage {
                total: disk.total_space(),
                free: disk.available_space(),
            })
            .ok_or_else(|| anyhow!("no mounted filesystem contains {}", path.display()))
    }
}

/// Host memory (`TotalMemory`, `FreeMemory`), per-core CPU utilization
/// (`CPUutilization<N>`, 0-based) and disk capacity (`TotalDiskSpace`,
/// `FreeDiskSpace`) for one path.
pub struct HostCollector<P = SysinfoProvider> {
    provider: P,
    disk_path: PathBuf,
}

impl HostCollector<SysinfoProvider> {
    pub fn new(disk_path: impl Into<PathBuf>) -> Self {
        Self::with_provider(SysinfoProvider::new(), disk_path)
    }
}

impl<P: HostStatsProvider> HostCollector<P> {
    pub fn with_provider(provider: P, disk_path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            disk_path: disk_path.into(),
        }
    }
}

impl<P: HostStatsProvider> Collector for HostCollector<P> {
    fn name(&self) -> &str {
        "host"
    }

    fn collect(&mut self) -> Result<Vec<Sample>> {
        let memory = self.provider.memory_usage()?;
        let usage = self.provider.disk_usage(&self.disk_path)?;
        let cpus = self.provider.cpu_percents()?;

        let mut samples = Vec::with_capacity(cpus.len() + 4);
        samples.push(Sample::new("TotalMemory", memory.total as f64));
        samples.push(Sample::new("FreeMemory", memory.free as f64));
        samples.push(Sample::new("TotalDiskSpace", usage.total as f64));
        samples.push(Sample::new("FreeDiskSpace", usage.free as f64));
        samples.extend(
            cpus.into_iter()
                .enumerate()
                .map(|(i, pct)| Sample::new(format!("CPUutilization{i}"), pct)),
        );
        Ok(samples)
    }
}
