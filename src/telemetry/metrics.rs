//! Scheduling metrics: CPU utilization and per-process turnaround figures.

#[cfg(feature = "telemetry")]
use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accumulates tick and completion statistics over a run.
#[derive(Debug, Clone)]
pub struct Metrics {
    busy_ticks: u64,
    idle_ticks: u64,
    rejected: u64,
    total_waiting: u64,
    total_turnaround: u64,
    wtas: Vec<f64>,

    #[cfg(feature = "telemetry")]
    turnaround_histogram: Option<Histogram<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            busy_ticks: 0,
            idle_ticks: 0,
            rejected: 0,
            total_waiting: 0,
            total_turnaround: 0,
            wtas: Vec::new(),
            // auto-resizing, 3 significant figures
            #[cfg(feature = "telemetry")]
            turnaround_histogram: Histogram::new(3).ok(),
        }
    }

    /// Count one scheduler tick.
    pub fn record_tick(&mut self, busy: bool) {
        if busy {
            self.busy_ticks += 1;
        } else {
            self.idle_ticks += 1;
        }
    }

    pub fn record_completion(&mut self, turnaround: u64, weighted_turnaround: f64, waiting: u64) {
        self.total_turnaround += turnaround;
        self.total_waiting += waiting;
        self.wtas.push(weighted_turnaround);

        #[cfg(feature = "telemetry")]
        if let Some(hist) = self.turnaround_histogram.as_mut() {
            let _ = hist.record(turnaround);
        }
    }

    pub fn record_rejection(&mut self) {
        self.rejected += 1;
    }

    pub fn finished(&self) -> u64 {
        self.wtas.len() as u64
    }

    pub fn summary(&self) -> PerformanceSummary {
        let finished = self.wtas.len();
        let n = finished.max(1) as f64;

        let mean_wta = self.wtas.iter().sum::<f64>() / n;
        // population standard deviation
        let variance = self
            .wtas
            .iter()
            .map(|w| (w - mean_wta).powi(2))
            .sum::<f64>()
            / n;

        let total_ticks = self.busy_ticks + self.idle_ticks;
        let cpu_utilization = if total_ticks == 0 {
            0.0
        } else {
            self.busy_ticks as f64 / total_ticks as f64 * 100.0
        };

        #[cfg(feature = "telemetry")]
        let (p50_turnaround, p99_turnaround) = match &self.turnaround_histogram {
            Some(hist) if hist.len() > 0 => (
                Some(hist.value_at_quantile(0.50)),
                Some(hist.value_at_quantile(0.99)),
            ),
            _ => (None, None),
        };
        #[cfg(not(feature = "telemetry"))]
        let (p50_turnaround, p99_turnaround) = (None, None);

        PerformanceSummary {
            total_ticks,
            busy_ticks: self.busy_ticks,
            idle_ticks: self.idle_ticks,
            finished: finished as u64,
            rejected: self.rejected,
            cpu_utilization,
            mean_wta,
            mean_waiting: self.total_waiting as f64 / n,
            mean_turnaround: self.total_turnaround as f64 / n,
            std_wta: variance.sqrt(),
            p50_turnaround,
            p99_turnaround,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// End-of-run figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_ticks: u64,
    pub busy_ticks: u64,
    pub idle_ticks: u64,
    pub finished: u64,
    pub rejected: u64,
    /// Percentage of ticks with a process running.
    pub cpu_utilization: f64,
    pub mean_wta: f64,
    pub mean_waiting: f64,
    pub mean_turnaround: f64,
    pub std_wta: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p50_turnaround: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p99_turnaround: Option<u64>,
}

impl PerformanceSummary {
    /// Utilization as a fraction (0.0 to 1.0).
    pub fn utilization(&self) -> f64 {
        self.cpu_utilization / 100.0
    }

    /// `scheduler.perf` contents.
    pub fn render_perf(&self) -> String {
        format!(
            "CPU utilization = {:.2}%\nAvg WTA = {:.2}\nAvg Waiting = {:.2}\nStd WTA = {:.2}\n",
            self.cpu_utilization, self.mean_wta, self.mean_waiting, self.std_wta
        )
    }
}

impl fmt::Display for PerformanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_perf())
    }
}
