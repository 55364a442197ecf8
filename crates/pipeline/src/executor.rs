//! Scheduling of the pipeline's parallel work.
//!
//! Every stage parallelises internally over scenes, dates, indices or rows.
//! The processing mode decides which thread pool that work runs on.

#[cfg(feature = "parallel")]
use crate::error::PipelineError;
use crate::error::Result;

/// Processing mode for a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Run `f` under this mode.
    ///
    /// `Sequential` and `ParallelWith` build a dedicated pool; a pool that
    /// cannot be built is an error.
    #[cfg(feature = "parallel")]
    pub fn install<T, F>(&self, f: F) -> Result<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        let threads = match self {
            ProcessingMode::Parallel => return Ok(f()),
            ProcessingMode::Sequential => 1,
            ProcessingMode::ParallelWith(threads) => *threads,
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;
        Ok(pool.install(f))
    }

    /// Without the `parallel` feature every mode runs on the calling thread.
    #[cfg(not(feature = "parallel"))]
    pub fn install<T, F>(&self, f: F) -> Result<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        Ok(f())
    }

    /// Worker threads this mode uses
    pub fn threads(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(threads) => *threads,
        }
    }
}

/// Get the number of available CPU cores
#[cfg(feature = "parallel")]
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}

#[cfg(not(feature = "parallel"))]
pub fn num_cpus() -> usize {
    1
}
