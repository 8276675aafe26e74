//! Fixed-size worker pool with a bounded fan-in task queue.
//!
//! Submission is non-blocking while the queue has capacity (2x the worker
//! count) and blocks thereafter. A closed pool refuses further submissions.
//! `close()` drains the queue and joins every worker, so it returns only
//! after all accepted tasks have run to completion.

use crate::error::{ConvertError, Result};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Pool of worker threads executing submitted jobs.
pub struct WorkerPool {
    sender: Mutex<Option<SyncSender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    workers: usize,
}

impl WorkerPool {
    /// Create a pool with `workers` threads (minimum 1).
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let (tx, rx) = sync_channel::<Job>(workers * 2);
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let rx = Arc::clone(&rx);
            let handle = std::thread::Builder::new()
                .name(format!("convert-worker-{id}"))
                .spawn(move || worker_loop(id, rx))
                .map_err(|e| {
                    ConvertError::Internal(format!("failed to spawn worker thread: {e}"))
                })?;
            handles.push(handle);
        }

        debug!("worker pool started with {} threads", workers);
        Ok(Self {
            sender: Mutex::new(Some(tx)),
            handles: Mutex::new(handles),
            workers,
        })
    }

    /// Create a pool sized to hardware concurrency.
    pub fn with_default_size() -> Result<Self> {
        Self::new(num_cpus::get())
    }

    /// Number of worker threads.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether the pool has been closed.
    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .map(|guard| guard.is_none())
            .unwrap_or(true)
    }

    /// Submit a job. Blocks when the queue is full; fails when the pool has
    /// been closed.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        let sender = {
            let guard = self
                .sender
                .lock()
                .map_err(|_| ConvertError::Internal("worker pool lock poisoned".to_string()))?;
            guard.as_ref().cloned()
        };
        match sender {
            // The send blocks while the queue is at capacity.
            Some(tx) => tx
                .send(Box::new(job))
                .map_err(|_| ConvertError::Internal("worker pool is closed".to_string())),
            None => Err(ConvertError::Internal(
                "worker pool is closed".to_string(),
            )),
        }
    }

    /// Signal drain and wait for all in-flight and queued jobs to finish.
    /// Idempotent.
    pub fn close(&self) {
        let sender = self.sender.lock().ok().and_then(|mut guard| guard.take());
        drop(sender);

        if let Ok(mut handles) = self.handles.lock() {
            for handle in handles.drain(..) {
                if handle.join().is_err() {
                    warn!("worker thread panicked during drain");
                }
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

fn worker_loop(id: usize, rx: Arc<Mutex<Receiver<Job>>>) {
    loop {
        // Take the next job while holding the lock, run it after releasing.
        let job = match rx.lock() {
            Ok(guard) => guard.recv(),
            Err(_) => break,
        };
        match job {
            Ok(job) => job(),
            Err(_) => break,
        }
    }
    debug!("worker {} exiting", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;

    #[test]
    fn test_pool_runs_submitted_jobs() {
        let pool = WorkerPool::new(2).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..16 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.close();
        assert_eq!(counter.load(Ordering::SeqCst), 16);
    }

    #[test]
    fn test_close_waits_for_queued_jobs() {
        let pool = WorkerPool::new(1).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..8 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                std::thread::sleep(std::time::Duration::from_millis(5));
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }

        pool.close();
        // Every accepted job must have finished before close returned.
        assert_eq!(counter.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_closed_pool_refuses_submission() {
        let pool = WorkerPool::new(1).unwrap();
        pool.close();
        assert!(pool.is_closed());
        assert!(pool.submit(|| {}).is_err());
    }

    #[test]
    fn test_close_is_idempotent() {
        let pool = WorkerPool::new(2).unwrap();
        pool.close();
        pool.close();
        assert!(pool.is_closed());
    }

    #[test]
    fn test_zero_workers_clamped_to_one() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.workers(), 1);

        let (tx, rx) = mpsc::channel();
        pool.submit(move || {
            tx.send(7).unwrap();
        })
        .unwrap();
        assert_eq!(rx.recv().unwrap(), 7);
        pool.close();
    }

    #[test]
    fn test_jobs_run_concurrently() {
        let pool = WorkerPool::new(4).unwrap();
        let (tx, rx) = mpsc::channel();

        for i in 0..4 {
            let tx = tx.clone();
            pool.submit(move || {
                std::thread::sleep(std::time::Duration::from_millis(20));
                tx.send(i).unwrap();
            })
            .unwrap();
        }
        drop(tx);

        let start = std::time::Instant::now();
        let received: Vec<i32> = rx.iter().collect();
        assert_eq!(received.len(), 4);
        // Four 20ms jobs on four workers should take well under 80ms.
        assert!(start.elapsed() < std::time::Duration::from_millis(75));
        pool.close();
    }
}
