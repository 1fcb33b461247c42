use std::{fmt::Display, future::Future, sync::Arc, time::Duration};

use log::*;
use tokio::{
    sync::{mpsc, oneshot, Mutex},
    task::{JoinHandle, JoinSet},
};

use super::Throttle;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Delay between the end of one cycle and the start of the next.
    pub period: Duration,
    /// Delay before the next cycle when the remote side rate limited us without saying for how long.
    pub cooldown: Duration,
    /// Maximum number of jobs fetched per cycle.
    pub pack_limit: i64,
    /// Number of concurrent workers per cycle.
    pub pool_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { period: Duration::from_secs(3), cooldown: Duration::from_secs(10), pack_limit: 25, pool_size: 3 }
    }
}

/// What happened to a single job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// The store was updated.
    Applied,
    /// There was nothing new to record.
    Unchanged,
    /// The job was skipped and stays pending for a later cycle.
    Deferred,
    /// The remote side asked us to back off. The job stays pending.
    RateLimited,
    /// Something went wrong. The job stays pending for a later cycle.
    Failed,
}

/// The work that a [`ReconciliationEngine`] performs each cycle.
pub trait PackHandler: Clone + Send + Sync + 'static {
    type Job: Send + 'static;
    type Error: Display + Send;

    /// A short name for log messages.
    fn name(&self) -> &'static str;

    /// Fetches the next pack of at most `limit` jobs.
    fn fetch_pack(&self, limit: i64) -> impl Future<Output = Result<Vec<Self::Job>, Self::Error>> + Send;

    /// Processes one job. Errors are reported through the outcome; they never abort the rest of the pack.
    fn handle_job(&self, job: Self::Job, throttle: &Throttle) -> impl Future<Output = JobOutcome> + Send;
}

/// Tallies for a single cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub dispatched: usize,
    pub applied: usize,
    pub unchanged: usize,
    pub deferred: usize,
    pub rate_limited: usize,
    pub failed: usize,
    pub throttled: bool,
}

impl CycleReport {
    fn record(&mut self, outcome: JobOutcome) {
        match outcome {
            JobOutcome::Applied => self.applied += 1,
            JobOutcome::Unchanged => self.unchanged += 1,
            JobOutcome::Deferred => self.deferred += 1,
            JobOutcome::RateLimited => self.rate_limited += 1,
            JobOutcome::Failed => self.failed += 1,
        }
    }

    fn merge(&mut self, other: CycleReport) {
        self.applied += other.applied;
        self.unchanged += other.unchanged;
        self.deferred += other.deferred;
        self.rate_limited += other.rate_limited;
        self.failed += other.failed;
    }

    pub fn handled(&self) -> usize {
        self.applied + self.unchanged + self.deferred + self.rate_limited + self.failed
    }
}

impl Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fetched {}, dispatched {}, applied {}, unchanged {}, deferred {}, rate limited {}, failed {}",
            self.fetched, self.dispatched, self.applied, self.unchanged, self.deferred, self.rate_limited, self.failed
        )
    }
}

/// A dispatcher plus a fixed-size worker pool, driven by a period timer.
pub struct ReconciliationEngine<H> {
    handler: H,
    config: EngineConfig,
    throttle: Arc<Throttle>,
}

impl<H: PackHandler> ReconciliationEngine<H> {
    pub fn new(handler: H, config: EngineConfig) -> Self {
        Self { handler, config, throttle: Arc::new(Throttle::new()) }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn throttle(&self) -> Arc<Throttle> {
        Arc::clone(&self.throttle)
    }

    /// Runs a single dispatch cycle and waits for every worker to finish.
    pub async fn run_cycle(&self) -> CycleReport {
        let name = self.handler.name();
        self.throttle.clear();
        let pack = match self.handler.fetch_pack(self.config.pack_limit).await {
            Ok(pack) => pack,
            Err(e) => {
                warn!("🔁️ [{name}] Could not fetch the next pack. Will try again next cycle. {e}");
                return CycleReport::default();
            },
        };
        let mut report = CycleReport { fetched: pack.len(), ..Default::default() };
        if pack.is_empty() {
            trace!("🔁️ [{name}] Nothing to do");
            return report;
        }
        let (sender, receiver) = mpsc::channel(pack.len());
        let receiver = Arc::new(Mutex::new(receiver));
        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.pool_size.max(1) {
            let handler = self.handler.clone();
            let jobs = Arc::clone(&receiver);
            let throttle = Arc::clone(&self.throttle);
            workers.spawn(run_worker(worker_id, handler, jobs, throttle));
        }
        for job in pack {
            if self.throttle.is_engaged() {
                info!("🔁️ [{name}] Throttled. The rest of the pack is left for a later cycle.");
                break;
            }
            if sender.send(job).await.is_err() {
                error!("🔁️ [{name}] Every worker has exited. Abandoning the rest of the pack.");
                break;
            }
            report.dispatched += 1;
        }
        // Closing the channel lets the workers exit once it is drained
        drop(sender);
        while let Some(result) = workers.join_next().await {
            match result {
                Ok(worker_report) => report.merge(worker_report),
                Err(e) => error!("🔁️ [{name}] A worker panicked: {e}"),
            }
        }
        report.throttled = self.throttle.is_engaged();
        report
    }

    /// How long to wait before the next cycle, given the state the last cycle left behind.
    ///
    /// After a rate limit the wait is always longer than the normal period. The remote side's requested cooldown is used
    /// when it is longer than the period; otherwise the configured cooldown applies.
    pub fn next_delay(&self) -> Duration {
        let period = self.config.period;
        if !self.throttle.is_engaged() {
            return period;
        }
        match self.throttle.requested_cooldown() {
            Some(requested) if requested > period => requested,
            _ => self.config.cooldown.max(period),
        }
    }

    /// Spawns the period loop. The loop runs until [`EngineHandle::stop`] is called or the handle is dropped.
    pub fn start(self) -> EngineHandle {
        let (shutdown, mut shutdown_signal) = oneshot::channel::<()>();
        let join = tokio::spawn(async move {
            let name = self.handler.name();
            info!(
                "🔁️ [{name}] Reconciliation engine started. Period {:?}, pack limit {}, {} workers",
                self.config.period, self.config.pack_limit, self.config.pool_size
            );
            let mut delay = self.config.period;
            loop {
                tokio::select! {
                    _ = &mut shutdown_signal => break,
                    _ = tokio::time::sleep(delay) => {},
                }
                let report = self.run_cycle().await;
                if report.fetched > 0 {
                    info!("🔁️ [{name}] Cycle complete: {report}");
                }
                delay = self.next_delay();
                if report.throttled {
                    warn!("🔁️ [{name}] Rate limited. Cooling down for {delay:?}");
                }
            }
            info!("🔁️ [{name}] Reconciliation engine stopped");
        });
        EngineHandle { shutdown: Some(shutdown), join }
    }
}

async fn run_worker<H: PackHandler>(
    worker_id: usize,
    handler: H,
    jobs: Arc<Mutex<mpsc::Receiver<H::Job>>>,
    throttle: Arc<Throttle>,
) -> CycleReport {
    let mut report = CycleReport::default();
    loop {
        let job = {
            let mut receiver = jobs.lock().await;
            receiver.recv().await
        };
        let Some(job) = job else {
            break;
        };
        if throttle.is_engaged() {
            report.record(JobOutcome::Deferred);
            continue;
        }
        let outcome = handler.handle_job(job, &throttle).await;
        report.record(outcome);
    }
    trace!("🔁️ [{}] Worker {worker_id} done: {report}", handler.name());
    report
}

/// Controls a running engine.
#[derive(Debug)]
pub struct EngineHandle {
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<()>,
}

impl EngineHandle {
    /// Stops the timer and waits for the current cycle, if any, to finish.
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.join).await {
            error!("🔁️ Reconciliation engine task failed: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
