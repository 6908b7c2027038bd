use rand::Rng;
use sysinfo::System;
use telemon_common::model::MetricUpdate;

/// Produces the gauge readings enqueued on every report tick.
pub trait Sampler: Send {
    fn sample(&mut self) -> Vec<MetricUpdate>;
}

/// Samples host memory, swap, load, and per-core CPU utilization via
/// `sysinfo`. CPU usage is computed against the previous refresh, so the
/// first sample after startup reads as zero.
pub struct SystemSampler {
    system: System,
}

impl SystemSampler {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SystemSampler {
    fn sample(&mut self) -> Vec<MetricUpdate> {
        self.system.refresh_memory();
        self.system.refresh_cpu_all();

        let mut updates = vec![
            MetricUpdate::gauge("TotalMemory", self.system.total_memory() as f64),
            MetricUpdate::gauge("FreeMemory", self.system.free_memory() as f64),
            MetricUpdate::gauge("UsedMemory", self.system.used_memory() as f64),
            MetricUpdate::gauge("AvailableMemory", self.system.available_memory() as f64),
            MetricUpdate::gauge("TotalSwap", self.system.total_swap() as f64),
            MetricUpdate::gauge("UsedSwap", self.system.used_swap() as f64),
        ];

        // Core indices are 1-based in the metric names.
        for (i, cpu) in self.system.cpus().iter().enumerate() {
            updates.push(MetricUpdate::gauge(
                format!("CPUutilization{}", i + 1),
                cpu.cpu_usage() as f64,
            ));
        }

        let load = System::load_average();
        updates.push(MetricUpdate::gauge("Load1", load.one));
        updates.push(MetricUpdate::gauge("Load5", load.five));
        updates.push(MetricUpdate::gauge("Load15", load.fifteen));

        updates.push(MetricUpdate::gauge(
            "RandomValue",
            rand::thread_rng().gen::<f64>(),
        ));

        updates
    }
}
