//! Fixed-size worker pool draining a pre-filled queue.
//!
//! The queue is filled before the pool starts and nothing is added later,
//! so workers never block on it: each pops until the queue reports empty
//! and then exits. [`WorkerPool::drain`] returns once every worker has
//! exited.
//!
//! Every worker builds its own state (typically a hub sub-session) through
//! the `start` closure and hands each item to `handle`. Failures of a single
//! item are the handler's business and show up in its output; they never
//! stop a worker. A handler that panics is logged and its item produces no
//! output; the worker moves on to the next item.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};

use log::{debug, error, warn};

use crate::defaults;
use crate::error::{Error, Result};

/// Thread-safe FIFO with non-blocking removal.
#[derive(Debug, Default)]
pub struct TaskQueue<T> {
    items: Mutex<VecDeque<T>>,
}

impl<T> TaskQueue<T> {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
        }
    }

    fn guard(&self) -> Result<MutexGuard<'_, VecDeque<T>>> {
        self.items.lock().map_err(|_| Error::LockPoisoned {
            context: "task queue".to_string(),
        })
    }

    /// Removes the next item, or returns `None` once the queue is empty.
    pub fn try_pop(&self) -> Result<Option<T>> {
        Ok(self.guard()?.pop_front())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.guard()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.guard()?.is_empty())
    }
}

impl<T> FromIterator<T> for TaskQueue<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: Mutex::new(iter.into_iter().collect()),
        }
    }
}

/// A pool of `workers` threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self {
            workers: defaults::WORKERS,
        }
    }
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::Config {
                message: "the worker count must be at least 1".to_string(),
                hint: Some(format!("the default is {}", defaults::WORKERS)),
            });
        }
        Ok(Self { workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Drains `queue` on the pool and returns the handler outputs in
    /// completion order.
    ///
    /// A worker whose `start` fails exits without taking any item. The
    /// call fails only if items are left behind once all workers are done.
    pub fn drain<T, S, O, F, H>(&self, queue: &TaskQueue<T>, start: F, handle: H) -> Result<Vec<O>>
    where
        T: Send,
        O: Send,
        F: Fn(usize) -> Result<S> + Sync,
        H: Fn(&S, T) -> O + Sync,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("replicator {}", i))
            .build()
            .map_err(|e| Error::WorkerPool {
                message: e.to_string(),
            })?;

        let outputs: Mutex<Vec<O>> = Mutex::new(Vec::new());
        let failures: Mutex<Vec<Error>> = Mutex::new(Vec::new());

        pool.scope(|scope| {
            for worker in 0..self.workers {
                let (start, handle, outputs, failures) = (&start, &handle, &outputs, &failures);
                scope.spawn(move |_| {
                    let record = |e: Error| {
                        if let Ok(mut failures) = failures.lock() {
                            failures.push(e);
                        }
                    };
                    let state = match start(worker) {
                        Ok(state) => state,
                        Err(e) => {
                            warn!("Worker {} could not start: {}", worker, e);
                            return record(e);
                        }
                    };
                    let mut handled = 0usize;
                    loop {
                        match queue.try_pop() {
                            Ok(Some(item)) => {
                                let outcome =
                                    panic::catch_unwind(AssertUnwindSafe(|| handle(&state, item)));
                                let output = match outcome {
                                    Ok(output) => output,
                                    Err(payload) => {
                                        let message = panic_message(payload.as_ref());
                                        error!("Worker {} panicked on an item: {}", worker, message);
                                        record(Error::WorkerPool {
                                            message: format!("handler panicked: {}", message),
                                        });
                                        continue;
                                    }
                                };
                                handled += 1;
                                match outputs.lock() {
                                    Ok(mut outputs) => outputs.push(output),
                                    Err(_) => {
                                        return record(Error::LockPoisoned {
                                            context: "worker outputs".to_string(),
                                        })
                                    }
                                }
                            }
                            Ok(None) => break,
                            Err(e) => return record(e),
                        }
                    }
                    debug!("Worker {} done after {} items", worker, handled);
                });
            }
        });

        let remaining = queue.len()?;
        if remaining > 0 {
            let reason = failures
                .into_inner()
                .ok()
                .and_then(|failures| failures.into_iter().next())
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no worker could take them".to_string());
            return Err(Error::WorkerPool {
                message: format!("{} items left in the queue: {}", remaining, reason),
            });
        }

        outputs.into_inner().map_err(|_| Error::LockPoisoned {
            context: "worker outputs".to_string(),
        })
    }
}

/// Text of a panic payload, for the two payload types `panic!` produces.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
