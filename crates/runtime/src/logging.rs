use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "info,trading_server=debug";

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// A second call is a no-op.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Settlement,
    PriceSimulation,
    MarketCalendar,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Settlement => "settlement",
            Self::PriceSimulation => "price_simulation",
            Self::MarketCalendar => "market_calendar",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobLogEventKind {
    RunStarted,
    RunSkipped,
    OrderExecuted,
    OrderRejected,
    OrderSkipped,
    OrderErrored,
    PriceUpdated,
    PriceErrored,
    MarketStatusChanged,
    RunFinished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLogEvent {
    pub run: u64,
    pub job: JobKind,
    pub kind: JobLogEventKind,
    /// Order or instrument the event is about.
    pub subject_id: Option<i64>,
    pub run_duration_micros: Option<u64>,
}

impl JobLogEvent {
    pub fn new(run: u64, job: JobKind, kind: JobLogEventKind) -> Self {
        Self {
            run,
            job,
            kind,
            subject_id: None,
            run_duration_micros: None,
        }
    }

    pub fn about(mut self, subject_id: i64) -> Self {
        self.subject_id = Some(subject_id);
        self
    }

    pub fn finished_after(mut self, micros: u64) -> Self {
        self.run_duration_micros = Some(micros);
        self
    }
}

pub trait JobLogWriter: Send + Sync {
    fn write(&self, event: JobLogEvent);
}

#[derive(Debug, Default)]
pub struct InMemoryJobLogWriter {
    events: Mutex<Vec<JobLogEvent>>,
}

impl InMemoryJobLogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<JobLogEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<JobLogEventKind> {
        self.events.lock().iter().map(|event| event.kind).collect()
    }
}

impl JobLogWriter for InMemoryJobLogWriter {
    fn write(&self, event: JobLogEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_writer_keeps_order() {
        let writer = InMemoryJobLogWriter::new();

        writer.write(JobLogEvent::new(1, JobKind::Settlement, JobLogEventKind::RunStarted));
        writer.write(
            JobLogEvent::new(1, JobKind::Settlement, JobLogEventKind::OrderExecuted).about(4),
        );

        let events = writer.events();
        assert_eq!(
            writer.kinds(),
            vec![JobLogEventKind::RunStarted, JobLogEventKind::OrderExecuted]
        );
        assert_eq!(events[1].subject_id, Some(4));
    }

    #[test]
    fn init_tracing_twice_is_harmless() {
        init_tracing(DEFAULT_LOG_FILTER);
        init_tracing("debug");
    }
}
