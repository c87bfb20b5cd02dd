//! Bounded pool of worker threads.
use anyhow::Result;
use crossbeam_channel::unbounded;
use log::{error, trace};
use std::sync::Mutex;
use tsc_core::TscError;

/// Runs independent jobs on a fixed number of threads.
///
/// Jobs are fed through a channel and each worker takes the next job when it is done
/// with the previous one. Results are merged only after all workers have joined, in
/// job order, so the output does not depend on the number of workers.
///
/// The first failing job stops the dispatch of the remaining jobs.
pub struct WorkerPool {
    n_workers: usize,
}

impl WorkerPool {
    /// Creates a pool with `n_workers` threads (at least one).
    pub fn new(n_workers: usize) -> Self {
        Self {
            n_workers: n_workers.max(1),
        }
    }

    /// Number of worker threads.
    pub fn n_workers(&self) -> usize {
        self.n_workers
    }

    /// Runs `f` on every job and returns the results in job order.
    ///
    /// If a job fails, the error of the failed job with the lowest index is returned.
    pub fn run<J, T, F>(&self, jobs: Vec<J>, f: F) -> Result<Vec<T>>
    where
        J: Send,
        T: Send,
        F: Fn(J) -> Result<T> + Sync,
    {
        let n_jobs = jobs.len();
        let (job_sender, job_receiver) = unbounded();
        for job in jobs.into_iter().enumerate() {
            job_sender
                .send(job)
                .map_err(|_| anyhow::anyhow!("job queue closed"))?;
        }
        drop(job_sender);

        let (result_sender, result_receiver) = unbounded();
        let stop = Mutex::new(false);

        std::thread::scope(|s| {
            for id in 0..self.n_workers.min(n_jobs) {
                let job_receiver = job_receiver.clone();
                let result_sender = result_sender.clone();
                let (f, stop) = (&f, &stop);
                s.spawn(move || {
                    for (ix, job) in job_receiver.iter() {
                        match stop.lock() {
                            Ok(stop) if !*stop => {}
                            _ => break,
                        }
                        trace!("Worker {} takes job {}", id, ix);
                        let result = f(job);
                        if let Err(e) = &result {
                            error!("Job {} failed, stopping the pool: {}", ix, e);
                            if let Ok(mut stop) = stop.lock() {
                                *stop = true;
                            }
                        }
                        if result_sender.send((ix, result)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_sender);

        let mut results: Vec<(usize, Result<T>)> = result_receiver.iter().collect();
        results.sort_by_key(|(ix, _)| *ix);
        let results = results
            .into_iter()
            .map(|(_, r)| r)
            .collect::<Result<Vec<T>>>()?;
        if results.len() != n_jobs {
            return Err(TscError::LockPoisoned(format!(
                "{} of {} jobs finished",
                results.len(),
                n_jobs
            ))
            .into());
        }
        Ok(results)
    }
}
