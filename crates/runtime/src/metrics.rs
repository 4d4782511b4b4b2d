use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::logging::{JobKind, JobLogEvent, JobLogEventKind, JobLogWriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationPercentiles {
    pub count: usize,
    pub p50_micros: u64,
    pub p90_micros: u64,
    pub p95_micros: u64,
    pub p99_micros: u64,
    pub max_micros: u64,
}

/// Number of most recent run durations kept per job.
pub const DURATION_WINDOW: usize = 1024;

/// Sliding window over the latest run durations; older samples are evicted.
#[derive(Debug, Default, Clone)]
pub struct RunDurationMetrics {
    durations_micros: VecDeque<u64>,
}

impl RunDurationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_micros(&mut self, micros: u64) {
        if self.durations_micros.len() == DURATION_WINDOW {
            self.durations_micros.pop_front();
        }
        self.durations_micros.push_back(micros);
    }

    pub fn len(&self) -> usize {
        self.durations_micros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations_micros.is_empty()
    }

    pub fn percentiles(&self) -> Option<DurationPercentiles> {
        if self.is_empty() {
            return None;
        }

        let mut sorted: Vec<u64> = self.durations_micros.iter().copied().collect();
        sorted.sort_unstable();
        let count = sorted.len();

        Some(DurationPercentiles {
            count,
            p50_micros: percentile_nearest_rank(&sorted, 50),
            p90_micros: percentile_nearest_rank(&sorted, 90),
            p95_micros: percentile_nearest_rank(&sorted, 95),
            p99_micros: percentile_nearest_rank(&sorted, 99),
            max_micros: sorted[count - 1],
        })
    }
}

fn percentile_nearest_rank(sorted: &[u64], percentile: usize) -> u64 {
    let count = sorted.len();
    let rank = (percentile * count).div_ceil(100);
    sorted[rank.saturating_sub(1)]
}

#[derive(Debug, Default, Clone)]
pub struct JobCounters {
    pub runs: u64,
    pub skipped_runs: u64,
    pub executed: u64,
    pub rejected: u64,
    pub skipped: u64,
    pub errors: u64,
    pub prices_updated: u64,
    pub status_changes: u64,
    pub durations: RunDurationMetrics,
}

/// Per-job counters fed by the job log stream.
#[derive(Debug, Default)]
pub struct JobMetrics {
    jobs: Mutex<HashMap<JobKind, JobCounters>>,
}

impl JobMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, job: JobKind) -> JobCounters {
        self.jobs.lock().get(&job).cloned().unwrap_or_default()
    }
}

impl JobLogWriter for JobMetrics {
    fn write(&self, event: JobLogEvent) {
        let mut jobs = self.jobs.lock();
        let counters = jobs.entry(event.job).or_default();
        match event.kind {
            JobLogEventKind::RunStarted => {}
            JobLogEventKind::RunSkipped => counters.skipped_runs += 1,
            JobLogEventKind::OrderExecuted => counters.executed += 1,
            JobLogEventKind::OrderRejected => counters.rejected += 1,
            JobLogEventKind::OrderSkipped => counters.skipped += 1,
            JobLogEventKind::OrderErrored | JobLogEventKind::PriceErrored => counters.errors += 1,
            JobLogEventKind::PriceUpdated => counters.prices_updated += 1,
            JobLogEventKind::MarketStatusChanged => counters.status_changes += 1,
            JobLogEventKind::RunFinished => {
                counters.runs += 1;
                if let Some(micros) = event.run_duration_micros {
                    counters.durations.record_micros(micros);
                }
            }
        }
    }
}
