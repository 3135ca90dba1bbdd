//! Fan-out / join for independent storage operations.
//!
//! Runs every task on its own scoped thread, waits for all of them to
//! settle, and reduces to one result: the first error in task order if any
//! task failed, otherwise every task's output in task order. A failing
//! task never stops its siblings.

use crate::error::{HyperError, Result};

/// A unit of work handed to [`settle_all`]
pub type Task<'a, T> = Box<dyn FnOnce() -> Result<T> + Send + 'a>;

/// Run `tasks` concurrently and wait for all of them.
pub fn settle_all<'a, T: Send>(tasks: Vec<Task<'a, T>>) -> Result<Vec<T>> {
    match tasks.len() {
        0 => return Ok(Vec::new()),
        1 => {
            let task = tasks.into_iter().next().ok_or_else(|| {
                HyperError::JoinFailed("task list emptied while joining".into())
            })?;
            return task().map(|out| vec![out]);
        }
        _ => {}
    }

    let outcomes = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| scope.spawn(move |_| task()))
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(HyperError::JoinFailed("task panicked".into())))
            })
            .collect::<Vec<Result<T>>>()
    })
    .map_err(|_| HyperError::JoinFailed("scope panicked".into()))?;

    reduce(outcomes)
}

/// First error wins; otherwise all outputs in order.
fn reduce<T>(outcomes: Vec<Result<T>>) -> Result<Vec<T>> {
    let mut outputs = Vec::with_capacity(outcomes.len());
    let mut first_error = None;

    for outcome in outcomes {
        match outcome {
            Ok(out) => outputs.push(out),
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(outputs),
    }
}
