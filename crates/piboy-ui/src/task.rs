//! Background work that must not stall the UI tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears a running flag when the job thread ends, panics included.
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Re-runnable list-producing job, at most one run in flight.
///
/// `result()` is empty from `start()` until the run completes, then holds
/// the complete list. The list is swapped in under the lock in one step,
/// so a reader never sees a partial result.
pub struct ScanTask<T> {
    name: String,
    job: Arc<dyn Fn() -> Vec<T> + Send + Sync>,
    running: Arc<AtomicBool>,
    result: Arc<Mutex<Vec<T>>>,
}

impl<T: Clone + Send + 'static> ScanTask<T> {
    pub fn new<F>(name: impl Into<String>, job: F) -> Self
    where
        F: Fn() -> Vec<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            job: Arc::new(job),
            running: Arc::new(AtomicBool::new(false)),
            result: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns false without doing anything if a run is already in flight.
    pub fn start(&self) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        lock(&self.result).clear();

        let job = Arc::clone(&self.job);
        let running = Arc::clone(&self.running);
        let result = Arc::clone(&self.result);
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let _running = RunningGuard(running);
                let items = job();
                *lock(&result) = items;
            });

        if let Err(err) = spawned {
            tracing::warn!("Failed to start {}: {}", self.name, err);
            self.running.store(false, Ordering::Release);
            return false;
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn result(&self) -> Vec<T> {
        lock(&self.result).clone()
    }
}

/// One-shot background job whose value is collected with `take()`.
pub struct Worker<T> {
    name: String,
    running: Arc<AtomicBool>,
    slot: Arc<Mutex<Option<T>>>,
}

impl<T: Send + 'static> Worker<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            running: Arc::new(AtomicBool::new(false)),
            slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Runs `job` on a new thread. Refused while a previous job is running.
    pub fn start<F>(&self, job: F) -> bool
    where
        F: FnOnce() -> T + Send + 'static,
    {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        lock(&self.slot).take();

        let running = Arc::clone(&self.running);
        let slot = Arc::clone(&self.slot);
        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let _running = RunningGuard(running);
                let value = job();
                *lock(&slot) = Some(value);
            });

        if let Err(err) = spawned {
            tracing::warn!("Failed to start {}: {}", self.name, err);
            self.running.store(false, Ordering::Release);
            return false;
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn take(&self) -> Option<T> {
        lock(&self.slot).take()
    }
}

/// Re-samples a value on a fixed period until dropped.
pub struct Sampler<T> {
    data: Arc<Mutex<T>>,
    stop: Arc<AtomicBool>,
}

const STOP_POLL: Duration = Duration::from_millis(100);

impl<T: Clone + Default + Send + 'static> Sampler<T> {
    pub fn spawn<F>(name: &str, period: Duration, mut sample: F) -> Self
    where
        F: FnMut() -> T + Send + 'static,
    {
        let data = Arc::new(Mutex::new(T::default()));
        let stop = Arc::new(AtomicBool::new(false));

        let data_clone = Arc::clone(&data);
        let stop_clone = Arc::clone(&stop);
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            while !stop_clone.load(Ordering::Relaxed) {
                let value = sample();
                *lock(&data_clone) = value;
                let next = Instant::now() + period;
                while Instant::now() < next && !stop_clone.load(Ordering::Relaxed) {
                    thread::sleep(STOP_POLL.min(next.saturating_duration_since(Instant::now())));
                }
            }
        });
        if let Err(err) = spawned {
            tracing::warn!("Failed to start sampler {}: {}", name, err);
        }

        Self { data, stop }
    }

    pub fn snapshot(&self) -> T {
        lock(&self.data).clone()
    }
}

impl<T> Drop for Sampler<T> {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
