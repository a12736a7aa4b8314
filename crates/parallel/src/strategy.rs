//! Parallel processing strategies

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Processing mode for the per-segment pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global pool
    #[default]
    Parallel,
    /// Parallel on a dedicated pool with the given number of threads
    ParallelWith(usize),
}

/// Run-level cancellation flag shared between the host and the workers
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; in-flight items still complete
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Strategy for mapping a function over items
pub trait ParallelStrategy {
    /// Map `f` over `items`, preserving input order in the result.
    ///
    /// Returns `None` if the token was cancelled before every item was
    /// dispatched. Partial results are never returned.
    fn par_map_cancellable<I, T, F>(&self, items: &[I], cancel: &CancelToken, f: F) -> Option<Vec<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn par_map_cancellable<I, T, F>(&self, items: &[I], cancel: &CancelToken, f: F) -> Option<Vec<T>>
    where
        I: Sync,
        T: Send,
        F: Fn(&I) -> T + Sync + Send,
    {
        let guarded = |item: &I| -> Option<T> {
            if cancel.is_cancelled() {
                None
            } else {
                Some(f(item))
            }
        };

        match self {
            ProcessingMode::Sequential => items.iter().map(guarded).collect(),
            #[cfg(feature = "parallel")]
            ProcessingMode::Parallel => items.par_iter().map(guarded).collect(),
            #[cfg(feature = "parallel")]
            ProcessingMode::ParallelWith(threads) => {
                match rayon::ThreadPoolBuilder::new().num_threads(*threads).build() {
                    Ok(pool) => pool.install(|| items.par_iter().map(guarded).collect()),
                    // Fall back to the global pool rather than failing the run
                    Err(_) => items.par_iter().map(guarded).collect(),
                }
            }
            #[cfg(not(feature = "parallel"))]
            _ => items.iter().map(guarded).collect(),
        }
    }
}

/// Number of worker threads the parallel modes will use
pub fn num_threads() -> usize {
    #[cfg(feature = "parallel")]
    {
        rayon::current_num_threads()
    }
    #[cfg(not(feature = "parallel"))]
    {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_keep_input_order() {
        let items: Vec<u32> = (0..500).collect();
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(3),
        ] {
            let out = mode
                .par_map_cancellable(&items, &CancelToken::new(), |&i| i * 2)
                .unwrap();
            assert_eq!(out.len(), 500);
            assert!(out.iter().enumerate().all(|(i, &v)| v == i as u32 * 2));
        }
    }

    #[test]
    fn test_cancelled_run_returns_nothing() {
        let items: Vec<u32> = (0..100).collect();
        let cancel = CancelToken::new();
        let out = ProcessingMode::Sequential.par_map_cancellable(&items, &cancel, |&i| {
            if i == 10 {
                cancel.cancel();
            }
            i
        });
        assert!(out.is_none());
        assert!(cancel.is_cancelled());
    }
}
