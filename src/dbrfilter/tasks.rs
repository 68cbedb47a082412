use anyhow::{Context, Result};
use log::error;
use rayon::prelude::*;

/// Results of running one task per input on a worker pool.
#[derive(Debug)]
pub struct TaskOutcome<R> {
    pub succeeded: Vec<R>,
    pub failed: usize,
}

/// Runs `task` on every item using a pool of `threads` workers, or one
/// per CPU when `threads` is 0. Tasks are independent: a failing task
/// is logged under `name(item)` and counted, and the rest still run.
/// Results of successful tasks are returned in input order.
pub fn run_tasks<T, R, N, F>(threads: usize, items: &[T], name: N, task: F) -> Result<TaskOutcome<R>>
where
    T: Sync,
    R: Send,
    N: Fn(&T) -> String + Sync,
    F: Fn(&T) -> Result<R> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("building worker pool")?;

    let results: Vec<Result<R>> = pool.install(|| items.par_iter().map(&task).collect());

    let mut outcome = TaskOutcome {
        succeeded: Vec::with_capacity(results.len()),
        failed: 0,
    };

    for (item, res) in items.iter().zip(results) {
        match res {
            Ok(r) => outcome.succeeded.push(r),
            Err(e) => {
                error!("{}: {:#}", name(item), e);
                outcome.failed += 1;
            }
        }
    }

    Ok(outcome)
}
