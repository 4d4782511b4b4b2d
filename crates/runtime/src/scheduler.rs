use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, error, info};

use crate::{clock::Clock, logging::JobKind};

/// A periodic unit of background work. Runs are never concurrent for one job.
pub trait Job: Send + 'static {
    fn kind(&self) -> JobKind;
    fn run(&mut self, now: DateTime<Utc>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskLifecycle {
    Starting,
    Running,
    Stopped,
    /// The job panicked and its loop is gone.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub job: JobKind,
    pub every: Duration,
    pub state: TaskLifecycle,
}

type TaskTable = Arc<Mutex<HashMap<TaskId, ScheduledTask>>>;

/// Owns one tokio task per job, each ticking on its own interval.
pub struct JobScheduler {
    clock: Arc<dyn Clock>,
    tasks: TaskTable,
    handles: Vec<(TaskId, JoinHandle<()>)>,
    shutdown_tx: watch::Sender<bool>,
    next_id: u64,
}

impl JobScheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            clock,
            tasks: Arc::default(),
            handles: Vec::new(),
            shutdown_tx,
            next_id: 0,
        }
    }

    /// Spawns `job` on the current runtime. The first run happens
    /// immediately, then once per `every`.
    pub fn spawn<J: Job>(&mut self, mut job: J, every: Duration) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        let kind = job.kind();
        self.tasks.lock().insert(
            id,
            ScheduledTask {
                id,
                job: kind,
                every,
                state: TaskLifecycle::Starting,
            },
        );

        let clock = Arc::clone(&self.clock);
        let tasks = Arc::clone(&self.tasks);
        let mut shutdown = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            set_state(&tasks, id, TaskLifecycle::Running);
            debug!(job = kind.as_str(), every_secs = every.as_secs_f64(), "job loop started");

            let mut ticker = time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => job.run(clock.now()),
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            set_state(&tasks, id, TaskLifecycle::Stopped);
            debug!(job = kind.as_str(), "job loop stopped");
        });
        self.handles.push((id, handle));

        info!(job = kind.as_str(), task = id.0, "job scheduled");
        id
    }

    pub fn task(&self, id: TaskId) -> Option<ScheduledTask> {
        self.tasks.lock().get(&id).copied()
    }

    pub fn tasks(&self) -> Vec<ScheduledTask> {
        let mut tasks: Vec<_> = self.tasks.lock().values().copied().collect();
        tasks.sort_by_key(|task| task.id.0);
        tasks
    }

    /// Signals every loop to stop and waits for them to finish. A loop that
    /// panicked is reported as `Failed`.
    pub async fn shutdown(mut self) -> Vec<ScheduledTask> {
        let _ = self.shutdown_tx.send(true);
        for (id, handle) in self.handles.drain(..) {
            if let Err(err) = handle.await {
                error!(task = id.0, error = %err, "job loop ended abnormally");
                set_state(&self.tasks, id, TaskLifecycle::Failed);
            }
        }
        self.tasks()
    }
}

fn set_state(tasks: &TaskTable, id: TaskId, state: TaskLifecycle) {
    if let Some(task) = tasks.lock().get_mut(&id) {
        task.state = state;
    }
}
