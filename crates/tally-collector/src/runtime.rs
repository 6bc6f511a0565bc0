use crate::Collector;
use anyhow::{anyhow, Result};
use rand::Rng;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tally_common::types::{POLL_COUNT, RANDOM_VALUE};
use tally_common::Sample;

/// Names of the gauges describing the agent process itself, in emission
/// order.
pub const RUNTIME_GAUGES: [&str; 6] = [
    "ResidentMemory",
    "VirtualMemory",
    "ProcessCpuUsage",
    "ProcessRunTime",
    "TotalDiskRead",
    "TotalDiskWritten",
];

/// Memory, CPU and I/O of the agent's own process, plus `RandomValue` and a
/// `PollCount` delta of one per pass.
pub struct RuntimeCollector {
    system: System,
    pid: Pid,
}

impl RuntimeCollector {
    pub fn new() -> Result<Self> {
        let pid = sysinfo::get_current_pid().map_err(|e| anyhow!("current pid: {e}"))?;
        let mut system = System::new();
        // CPU usage is measured between refreshes; prime the first one.
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        Ok(Self { system, pid })
    }
}

impl Collector for RuntimeCollector {
    fn name(&self) -> &str {
        "runtime"
    }

    fn collect(&mut self) -> Result<Vec<Sample>> {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let process = self
            .system
            .process(self.pid)
            .ok_or_else(|| anyhow!("process {} is not visible", self.pid))?;
        let io = process.disk_usage();

        let values = [
            process.memory() as f64,
            process.virtual_memory() as f64,
            process.cpu_usage() as f64,
            process.run_time() as f64,
            io.total_read_bytes as f64,
            io.total_written_bytes as f64,
        ];

        let mut samples: Vec<Sample> = RUNTIME_GAUGES
            .iter()
            .zip(values)
            .map(|(name, value)| Sample::new(*name, value))
            .collect();
        samples.push(Sample::new(RANDOM_VALUE, rand::thread_rng().gen::<f64>()));
        samples.push(Sample::new(POLL_COUNT, 1.0));

        Ok(samples)
    }
}
