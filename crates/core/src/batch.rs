//! Batch fan-out over a worker pool with index-aligned result assembly.
//!
//! Execution order is unspecified; result order is fixed by the index each
//! task carries. If the pool refuses a submission (closed), the remaining
//! tasks run sequentially on the calling thread.

use crate::converter::ConversionResult;
use crate::error::ErrorKind;
use crate::pool::WorkerPool;
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use tracing::warn;

/// One unit of batch work.
#[derive(Debug, Clone)]
pub struct Task {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub index: usize,
}

/// Run every task through the pool and return results aligned with the
/// tasks' indices.
pub fn run_batch(
    pool: &WorkerPool,
    tasks: Vec<Task>,
    convert: Arc<dyn Fn(Task) -> ConversionResult + Send + Sync>,
) -> Vec<ConversionResult> {
    let total = tasks.len();
    if total == 0 {
        return Vec::new();
    }

    let (tx, rx) = mpsc::channel::<(usize, ConversionResult)>();

    for task in tasks {
        let index = task.index;
        let job_task = task.clone();
        let job_convert = Arc::clone(&convert);
        let job_tx = tx.clone();

        let submitted = pool.submit(move || {
            let result = job_convert(job_task);
            let _ = job_tx.send((index, result));
        });

        if submitted.is_err() {
            warn!("worker pool closed, running task {} inline", index);
            let result = convert(task);
            let _ = tx.send((index, result));
        }
    }
    drop(tx);

    let mut slots: Vec<Option<ConversionResult>> = vec![None; total];
    for (index, result) in rx {
        if index < total {
            slots[index] = Some(result);
        }
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| ConversionResult::Failure {
                kind: ErrorKind::Internal,
                message: "worker finished without reporting a result".to_string(),
            })
        })
        .collect()
}
