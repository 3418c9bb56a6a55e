//! Bounded execution runtime for InsightGrid.
//!
//! Projections are cheap, but the provider fetch behind them may block on
//! an external warehouse. This module runs both on a fixed pool of named
//! worker threads fed by a bounded queue, so a slow provider can never pile
//! unbounded work onto the async executor. Submitting to a full queue fails
//! immediately; callers wait for replies with a bounded timeout.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, warn};

use crate::dashboard::{DashboardQuery, DashboardReport};
use crate::error::{ExecutionError, InsightError, InsightResult};
use crate::projection::{ProjectionEngine, ProjectionResult};
use crate::provider::AggregateProvider;
use crate::scenario::ScenarioRequest;

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of worker threads.
    pub workers: usize,
    /// Maximum queued jobs.
    pub queue_capacity: usize,
    /// How long a caller waits for its reply.
    pub request_timeout: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get),
            queue_capacity: 256,
            request_timeout: Duration::from_secs(5),
        }
    }
}

enum Job {
    Simulate {
        request: ScenarioRequest,
        reply: Sender<InsightResult<ProjectionResult>>,
    },
    Dashboard {
        query: DashboardQuery,
        reply: Sender<InsightResult<DashboardReport>>,
    },

    #[cfg(test)]
    Sleep {
        duration: Duration,
        started: Sender<()>,
        reply: Sender<()>,
    },
}

/// What each worker needs to serve a job.
struct WorkerContext {
    engine: ProjectionEngine,
    provider: Arc<dyn AggregateProvider>,
}

impl WorkerContext {
    fn run(&self, worker: usize, job: Job) {
        match job {
            Job::Simulate { request, reply } => {
                let started = Instant::now();
                let result = self.engine.run(&request, self.provider.as_ref());
                match &result {
                    Ok(_) => debug!(
                        worker,
                        scenario = request.scenario_type.as_deref().unwrap_or(""),
                        elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
                        "simulation completed"
                    ),
                    Err(err) if err.is_execution() => {
                        warn!(worker, error = %err, "simulation failed");
                    }
                    Err(_) => {}
                }
                // The caller may have timed out and dropped its receiver.
                let _ = reply.send(result);
            }
            Job::Dashboard { query, reply } => {
                let result = self.provider.dashboard(&query).map_err(InsightError::from);
                if let Err(err) = &result {
                    warn!(worker, kind = %query.kind, error = %err, "dashboard query failed");
                }
                let _ = reply.send(result);
            }

            #[cfg(test)]
            Job::Sleep {
                duration,
                started,
                reply,
            } => {
                let _ = started.send(());
                thread::sleep(duration);
                let _ = reply.send(());
            }
        }
    }
}

struct WorkerPool {
    tx: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl WorkerPool {
    fn start(workers: usize, queue_capacity: usize, ctx: Arc<WorkerContext>) -> InsightResult<Self> {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (tx, rx) = bounded::<Job>(queue_capacity);

        let mut handles = Vec::with_capacity(workers);
        for idx in 0..workers {
            let rx: Receiver<Job> = rx.clone();
            let ctx = Arc::clone(&ctx);
            let handle = thread::Builder::new()
                .name(format!("insightgrid-worker-{idx}"))
                .spawn(move || {
                    while let Ok(job) = rx.recv() {
                        ctx.run(idx, job);
                    }
                })
                .map_err(|e| InsightError::internal(format!("failed to spawn worker {idx}: {e}")))?;
            handles.push(handle);
        }

        Ok(Self {
            tx,
            workers: handles,
            queue_capacity,
        })
    }

    fn try_submit(&self, job: Job) -> InsightResult<()> {
        match self.tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ExecutionError::QueueFull {
                capacity: self.queue_capacity,
            }
            .into()),
            Err(TrySendError::Disconnected(_)) => Err(ExecutionError::Disconnected.into()),
        }
    }

    fn shutdown(self) {
        // Closing the channel lets workers drain queued jobs, then exit.
        drop(self.tx);
        for handle in self.workers {
            let _ = handle.join();
        }
    }
}

/// Pending reply for a submitted job.
#[derive(Debug)]
pub struct ExecutionHandle<T> {
    rx: Receiver<InsightResult<T>>,
}

impl<T> ExecutionHandle<T> {
    /// Waits for the job to complete.
    ///
    /// # Errors
    ///
    /// Returns the job's own error, or `Disconnected` if the worker went away.
    pub fn join(self) -> InsightResult<T> {
        self.rx
            .recv()
            .map_err(|_| InsightError::from(ExecutionError::Disconnected))?
    }

    /// Waits for the job to complete, up to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if no reply arrives in time, `Disconnected` if the
    /// worker went away, or the job's own error.
    pub fn join_timeout(self, timeout: Duration) -> InsightResult<T> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => InsightError::from(ExecutionError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            RecvTimeoutError::Disconnected => ExecutionError::Disconnected.into(),
        })?
    }
}

/// Worker-pool runtime serving simulations and dashboard reports.
pub struct SimulationRuntime {
    config: RuntimeConfig,
    pool: Option<WorkerPool>,
}

impl SimulationRuntime {
    /// Starts the worker pool.
    ///
    /// # Errors
    ///
    /// Returns an internal error if a worker thread cannot be spawned.
    pub fn new(
        engine: ProjectionEngine,
        provider: Arc<dyn AggregateProvider>,
        config: RuntimeConfig,
    ) -> InsightResult<Self> {
        let ctx = Arc::new(WorkerContext { engine, provider });
        let pool = WorkerPool::start(config.workers, config.queue_capacity, ctx)?;
        Ok(Self {
            config,
            pool: Some(pool),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Jobs waiting for a worker.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.pool.as_ref().map_or(0, |p| p.tx.len())
    }

    fn submit(&self, job: Job) -> InsightResult<()> {
        self.pool
            .as_ref()
            .ok_or_else(|| InsightError::from(ExecutionError::Disconnected))?
            .try_submit(job)
    }

    /// Queues a simulation without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns `QueueFull` when the queue is at capacity.
    pub fn submit_simulation(
        &self,
        request: ScenarioRequest,
    ) -> InsightResult<ExecutionHandle<ProjectionResult>> {
        let (reply, rx) = bounded(1);
        self.submit(Job::Simulate { request, reply })?;
        Ok(ExecutionHandle { rx })
    }

    /// Queues a dashboard report without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns `QueueFull` when the queue is at capacity.
    pub fn submit_dashboard(
        &self,
        query: DashboardQuery,
    ) -> InsightResult<ExecutionHandle<DashboardReport>> {
        let (reply, rx) = bounded(1);
        self.submit(Job::Dashboard { query, reply })?;
        Ok(ExecutionHandle { rx })
    }

    /// Runs a simulation and waits up to the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns validation errors from the request, provider failures,
    /// `QueueFull` or `Timeout`.
    pub fn simulate(&self, request: ScenarioRequest) -> InsightResult<ProjectionResult> {
        self.submit_simulation(request)?
            .join_timeout(self.config.request_timeout)
    }

    /// Computes a dashboard report and waits up to the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns provider failures, `QueueFull` or `Timeout`.
    pub fn dashboard(&self, query: DashboardQuery) -> InsightResult<DashboardReport> {
        self.submit_dashboard(query)?
            .join_timeout(self.config.request_timeout)
    }

    #[cfg(test)]
    fn submit_sleep(&self, duration: Duration) -> InsightResult<(Receiver<()>, Receiver<()>)> {
        let (started_tx, started_rx) = bounded::<()>(1);
        let (tx, rx) = bounded::<()>(1);
        self.submit(Job::Sleep {
            duration,
            started: started_tx,
            reply: tx,
        })?;
        Ok((started_rx, rx))
    }
}

impl Drop for SimulationRuntime {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.shutdown();
        }
    }
}
