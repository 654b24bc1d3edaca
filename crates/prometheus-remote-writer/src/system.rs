use crate::error::Result;
use crate::metrics::{Counter, Gauge, Timeseries};
use std::collections::BTreeMap;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Samples kept per resource gauge. Older ones are dropped on refresh.
const MAX_SAMPLES: usize = 256;

/// Point-in-time host and process resource gauges plus descriptive series
/// about the environment the run executes in.
#[derive(Debug)]
pub struct HostStats {
    system: System,
    pid: Option<Pid>,
    cpu_usage: Gauge,
    memory_free: Gauge,
    memory_total: Gauge,
    memory_used: Gauge,
    process_memory_rss: Gauge,
    process_memory_virtual: Gauge,
    os: Counter,
    versions: Counter,
    argv: Counter,
    env: Counter,
}

impl HostStats {
    /// `env` holds the environment variables the operator chose to expose.
    pub fn new(env: &BTreeMap<String, String>) -> Result<Self> {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(err) => {
                log::warn!("process stats unavailable: {err}");
                None
            }
        };

        let args: Vec<String> = std::env::args().collect();
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        let mut stats = Self {
            system: System::new(),
            pid,
            cpu_usage: Gauge::named("cpu_usage")?,
            memory_free: Gauge::named("memory_free")?,
            memory_total: Gauge::named("memory_total")?,
            memory_used: Gauge::named("memory_used")?,
            process_memory_rss: Gauge::named("process_memory_rss")?,
            process_memory_virtual: Gauge::named("process_memory_virtual")?,
            os: Counter::with_value(
                "os",
                [
                    ("name", System::name().unwrap_or_default()),
                    ("kernel", System::kernel_version().unwrap_or_default()),
                    ("version", System::os_version().unwrap_or_default()),
                    ("hostname", System::host_name().unwrap_or_default()),
                    ("arch", std::env::consts::ARCH.to_string()),
                    ("cpus", cpus.to_string()),
                ],
                1.0,
            )?,
            versions: Counter::with_value(
                "versions",
                [
                    ("reporter", env!("CARGO_PKG_VERSION")),
                    ("os", std::env::consts::OS),
                    ("family", std::env::consts::FAMILY),
                ],
                1.0,
            )?,
            argv: Counter::with_value(
                "argv",
                [
                    ("count", args.len().to_string()),
                    ("argv", args.join(" ")),
                ],
                1.0,
            )?,
            env: Counter::with_value("env", env.clone(), 1.0)?,
        };
        stats.refresh();
        Ok(stats)
    }

    /// Re-read memory and process usage and record one sample per gauge.
    pub fn refresh(&mut self) {
        self.sample();
        for gauge in self.gauges_mut() {
            gauge.retain_latest(MAX_SAMPLES);
        }
    }

    fn gauges_mut(&mut self) -> [&mut Gauge; 6] {
        [
            &mut self.cpu_usage,
            &mut self.memory_free,
            &mut self.memory_total,
            &mut self.memory_used,
            &mut self.process_memory_rss,
            &mut self.process_memory_virtual,
        ]
    }

    fn sample(&mut self) {
        self.system.refresh_memory();
        self.memory_free.set(self.system.free_memory() as f64);
        self.memory_total.set(self.system.total_memory() as f64);
        self.memory_used.set(self.system.used_memory() as f64);

        let Some(pid) = self.pid else {
            return;
        };
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        if let Some(process) = self.system.process(pid) {
            // usage since the previous refresh
            self.cpu_usage.set(process.cpu_usage() as f64);
            self.process_memory_rss.set(process.memory() as f64);
            self.process_memory_virtual
                .set(process.virtual_memory() as f64);
        }
    }

    pub fn snapshot(&self) -> Vec<Timeseries> {
        vec![
            self.cpu_usage.to_timeseries(),
            self.memory_free.to_timeseries(),
            self.memory_total.to_timeseries(),
            self.memory_used.to_timeseries(),
            self.process_memory_rss.to_timeseries(),
            self.process_memory_virtual.to_timeseries(),
            self.os.to_timeseries(),
            self.versions.to_timeseries(),
            self.argv.to_timeseries(),
            self.env.to_timeseries(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_stats_snapshot() {
        let env: BTreeMap<String, String> = [("CI".to_string(), "true".to_string())].into();
        let mut stats = HostStats::new(&env).unwrap();
        stats.refresh();

        let snapshot = stats.snapshot();
        let memory_total = snapshot
            .iter()
            .find(|s| s.name() == Some("memory_total"))
            .expect("memory_total series");
        // initial sample plus one per refresh
        assert_eq!(memory_total.samples.len(), 3);
        assert!(memory_total.samples[1].value > 0.0);

        let env_series = snapshot
            .iter()
            .find(|s| s.name() == Some("env"))
            .expect("env series");
        assert_eq!(env_series.labels["CI"], "true");
        assert_eq!(env_series.samples[0].value, 1.0);
    }

    #[test]
    fn test_env_defaults_to_empty() {
        let stats = HostStats::new(&BTreeMap::new()).unwrap();
        let snapshot = stats.snapshot();
        let env_series = snapshot
            .iter()
            .find(|s| s.name() == Some("env"))
            .expect("env series");
        assert_eq!(env_series.labels.len(), 1);
    }

    #[test]
    fn test_refresh_bounds_gauge_history() {
        let mut stats = HostStats::new(&BTreeMap::new()).unwrap();
        for _ in 0..MAX_SAMPLES + 10 {
            stats.refresh();
        }

        for gauge in stats.gauges_mut() {
            assert!(gauge.samples().len() <= MAX_SAMPLES, "{}", gauge.name());
        }
        assert_eq!(stats.memory_total.samples().len(), MAX_SAMPLES);
    }
}
