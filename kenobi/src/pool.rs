//! A bounded pool of worker threads for running blocking database calls off the caller's thread.
//!
//! Tasks are closures submitted with [`WorkerPool::submit`]. At most `capacity` of them run at once; the rest wait in
//! FIFO order. Each submission returns a [`TaskHandle`] that delivers the closure's return value (or the reason it
//! never produced one).

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::config::{PoolConfig, ShutdownPolicy};
use crate::error::{KenobiError, Result};

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const CANCELLED: u8 = 2;

/// Upper bound on how long `close` waits for worker threads to exit once every task has returned
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    // id of the pool owning the current thread, 0 for threads no pool started
    static CURRENT_POOL: Cell<u64> = const { Cell::new(0) };
}

pub struct WorkerPool {
    id: u64,
    config: PoolConfig,
    // None once closed
    runtime: Mutex<Option<Runtime>>,
    in_flight: Arc<watch::Sender<usize>>,
    cancel_pending: Arc<AtomicBool>,
}

/// Counts a submitted task until its closure is dropped, whether it ran, was cancelled or panicked
struct InFlight(Arc<watch::Sender<usize>>);

impl InFlight {
    fn new(counter: Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self(counter)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) { self.0.send_modify(|n| *n -= 1) }
}

impl WorkerPool {
    pub fn new(config: PoolConfig) -> Result<Self> {
        if config.capacity == 0 {
            return Err(KenobiError::Validation("worker pool capacity must be at least 1".to_string()));
        }

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.capacity)
            .thread_name("kenobi-worker")
            .on_thread_start(move || CURRENT_POOL.with(|pool| pool.set(id)))
            .enable_time()
            .build()
            .map_err(KenobiError::Runtime)?;

        info!("Started worker pool {} with capacity {}", id, config.capacity);
        Ok(Self {
            id,
            config,
            runtime: Mutex::new(Some(runtime)),
            in_flight: Arc::new(watch::channel(0).0),
            cancel_pending: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &PoolConfig { &self.config }

    pub fn is_closed(&self) -> bool { self.runtime.lock().is_none() }

    /// Number of submitted tasks that have not finished yet, queued ones included
    pub fn in_flight(&self) -> usize { *self.in_flight.borrow() }

    /// Queue `task` for execution. Fails with [`KenobiError::PoolClosed`] after [`close`](Self::close).
    pub fn submit<F, R>(&self, task: F) -> Result<TaskHandle<R>>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let runtime = self.runtime.lock();
        let runtime = runtime.as_ref().ok_or(KenobiError::PoolClosed)?;

        let state = Arc::new(AtomicU8::new(PENDING));
        let ticket = InFlight::new(self.in_flight.clone());
        let cancel_pending = self.cancel_pending.clone();
        let task_state = state.clone();

        let join = runtime.spawn_blocking(move || {
            let _ticket = ticket;
            if cancel_pending.load(Ordering::Acquire) {
                let _ = task_state.compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire);
                return Err(KenobiError::TaskCancelled);
            }
            if task_state.compare_exchange(PENDING, RUNNING, Ordering::AcqRel, Ordering::Acquire).is_err() {
                return Err(KenobiError::TaskCancelled);
            }
            Ok(task())
        });

        Ok(TaskHandle { join: Some(join), state, runtime: runtime.handle().clone() })
    }

    /// Stop accepting tasks and wait for the submitted ones to finish. Queued tasks still run under
    /// [`ShutdownPolicy::Wait`] and resolve to [`KenobiError::TaskCancelled`] under
    /// [`ShutdownPolicy::CancelPending`].
    ///
    /// Closing twice is a no-op. Called from one of the pool's own tasks, the pool stops accepting work but cannot
    /// wait for the task that is calling.
    pub fn close(&self) {
        let Some(runtime) = self.runtime.lock().take() else {
            return;
        };

        if self.config.shutdown == ShutdownPolicy::CancelPending {
            self.cancel_pending.store(true, Ordering::Release);
        }

        if CURRENT_POOL.with(Cell::get) == self.id {
            warn!("Worker pool {} closed from one of its own tasks, not waiting for in-flight tasks", self.id);
            runtime.shutdown_background();
            return;
        }

        debug!("Waiting for {} in-flight tasks on worker pool {}", self.in_flight(), self.id);
        let mut in_flight = self.in_flight.subscribe();
        let _ = futures::executor::block_on(in_flight.wait_for(|n| *n == 0));

        // every closure has returned, only thread teardown is left
        if Handle::try_current().is_ok() {
            runtime.shutdown_background();
        } else {
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
        }
        info!("Closed worker pool {}", self.id);
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool").field("id", &self.id).field("config", &self.config).field("closed", &self.is_closed()).finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) { self.close() }
}

/// The eventual result of a task submitted to a [`WorkerPool`].
///
/// Waiting blocks the calling thread, so don't wait from inside async code. Dropping the handle detaches the task;
/// it still runs.
pub struct TaskHandle<R> {
    // None once the result has been taken
    join: Option<JoinHandle<Result<R>>>,
    state: Arc<AtomicU8>,
    runtime: Handle,
}

impl<R> TaskHandle<R> {
    /// Block until the task finishes and take its result
    pub fn wait(mut self) -> Result<R> {
        let join = self.join.take().ok_or(KenobiError::TaskConsumed)?;
        resolve(futures::executor::block_on(join))
    }

    /// Block for at most `timeout`. On [`KenobiError::Timeout`] the task keeps running and the call can be retried;
    /// once a result has been returned, later calls fail with [`KenobiError::TaskConsumed`].
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<R> {
        let join = self.join.as_mut().ok_or(KenobiError::TaskConsumed)?;

        let outcome = if join.is_finished() {
            futures::executor::block_on(join)
        } else {
            // the timer has to be created inside the runtime
            match self.runtime.block_on(async { tokio::time::timeout(timeout, join).await }) {
                Ok(outcome) => outcome,
                Err(_) => return Err(KenobiError::Timeout(timeout)),
            }
        };

        self.join = None;
        resolve(outcome)
    }

    /// Cancel the task if it has not started. Returns false when it is already running or finished; a running task
    /// is never interrupted.
    pub fn cancel(&self) -> bool {
        let cancelled = self.state.compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire).is_ok();
        if cancelled {
            if let Some(join) = &self.join {
                join.abort();
            }
        }
        cancelled
    }

    pub fn is_cancelled(&self) -> bool { self.state.load(Ordering::Acquire) == CANCELLED }

    /// True once a result is available without blocking, or has already been taken
    pub fn is_finished(&self) -> bool { self.join.as_ref().map_or(true, JoinHandle::is_finished) }
}

impl<R> std::fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state.load(Ordering::Acquire) {
            PENDING => "pending",
            RUNNING => "running",
            _ => "cancelled",
        };
        f.debug_struct("TaskHandle").field("state", &state).field("finished", &self.is_finished()).finish()
    }
}

fn resolve<R>(outcome: std::result::Result<Result<R>, JoinError>) -> Result<R> {
    match outcome {
        Ok(result) => result,
        Err(err) if err.is_cancelled() => Err(KenobiError::TaskCancelled),
        Err(err) => Err(KenobiError::TaskPanicked(panic_message(err))),
    }
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => match payload.downcast::<String>() {
            Ok(message) => *message,
            Err(payload) => payload.downcast_ref::<&str>().map_or_else(|| "non-string panic payload".to_string(), |s| s.to_string()),
        },
        Err(err) => err.to_string(),
    }
}
