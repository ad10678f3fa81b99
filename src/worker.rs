//! Background classification.
//!
//! The model runs on its own thread so the window keeps drawing while a
//! prediction is pending. There is a single in-flight slot: submitting while
//! a request is outstanding is rejected with [`Error::Busy`].

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::model::Classifier;
use crate::preprocess::Tensor;

/// A tensor waiting to be scored.
struct Job {
    id: u64,
    tensor: Tensor,
}

/// Scores (or the failure) for one job.
struct Outcome {
    id: u64,
    scores: Result<Vec<f32>>,
}

/// Handle to the worker thread.
pub struct ClassificationWorker {
    jobs: Option<Sender<Job>>,
    outcomes: Receiver<Outcome>,
    handle: Option<JoinHandle<()>>,
    pending: Option<u64>,
    next_id: u64,
}

impl ClassificationWorker {
    /// Spawn the worker thread around `model`.
    pub fn spawn(model: Arc<dyn Classifier>) -> Self {
        let (job_tx, job_rx) = channel();
        let (out_tx, out_rx) = channel();
        let handle = thread::Builder::new()
            .name("classifier".into())
            .spawn(move || run_classification_worker(job_rx, out_tx, model))
            .ok();
        if handle.is_none() {
            error!("failed to spawn classifier thread");
        }
        Self { jobs: Some(job_tx), outcomes: out_rx, handle, pending: None, next_id: 0 }
    }

    /// True while a request is in flight (drives the busy indicator).
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Hand a tensor to the worker. Rejected while another one is pending.
    pub fn submit(&mut self, tensor: Tensor) -> Result<()> {
        if self.pending.is_some() {
            return Err(Error::Busy);
        }
        let id = self.next_id;
        self.next_id += 1;
        let sender = self
            .jobs
            .as_ref()
            .ok_or_else(|| Error::Classification("classifier worker stopped".into()))?;
        sender
            .send(Job { id, tensor })
            .map_err(|_| Error::Classification("classifier worker stopped".into()))?;
        self.pending = Some(id);
        debug!(id, "classification submitted");
        Ok(())
    }

    /// Non-blocking check for the pending result.
    pub fn poll(&mut self) -> Option<Result<Vec<f32>>> {
        self.pending?;
        match self.outcomes.try_recv() {
            Ok(outcome) => self.finish(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.lost(),
        }
    }

    /// Block up to `timeout` for the pending result.
    pub fn wait(&mut self, timeout: Duration) -> Option<Result<Vec<f32>>> {
        self.pending?;
        match self.outcomes.recv_timeout(timeout) {
            Ok(outcome) => self.finish(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => self.lost(),
        }
    }

    fn finish(&mut self, outcome: Outcome) -> Option<Result<Vec<f32>>> {
        if self.pending != Some(outcome.id) {
            // Stale; can't happen with one slot but don't report it as ours
            return None;
        }
        self.pending = None;
        Some(outcome.scores)
    }

    fn lost(&mut self) -> Option<Result<Vec<f32>>> {
        self.pending = None;
        Some(Err(Error::Classification("classifier worker exited".into())))
    }
}

impl Drop for ClassificationWorker {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Worker loop: score jobs until the job channel closes.
///
/// A panicking model is reported as a classification error for that job; the
/// worker keeps serving.
fn run_classification_worker(jobs: Receiver<Job>, outcomes: Sender<Outcome>, model: Arc<dyn Classifier>) {
    info!("classifier worker started");

    while let Ok(job) = jobs.recv() {
        let scores = panic::catch_unwind(AssertUnwindSafe(|| model.predict(&job.tensor)))
            .unwrap_or_else(|_| Err(Error::Classification("model panicked".into())));

        match &scores {
            Ok(s) => debug!(id = job.id, scores = ?s, "classification finished"),
            Err(e) => error!(id = job.id, "classification failed: {e}"),
        }

        if outcomes.send(Outcome { id: job.id, scores }).is_err() {
            // Handle dropped while we were working
            break;
        }
    }

    info!("classifier worker finished");
}
