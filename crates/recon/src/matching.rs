//! Background match computation.
//!
//! The matcher runs on its own thread and reports back through a channel.
//! Nothing it produces becomes visible until the owner thread polls the job
//! and installs the result, so a cancelled or failed run never leaves a
//! half-built Match Set behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;

use conflation_core::{FeatureId, Match};

use crate::config::MatchingConfig;
use crate::error::ReconError;
use crate::match_set::MatchSet;

/// Set to true to ask the matcher to stop.
pub type CancelToken = Arc<AtomicBool>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    pub total: usize,
    pub message: String,
}

/// Input handed to the matcher.
#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub reference: Vec<FeatureId>,
    pub subject: Vec<FeatureId>,
    pub config: MatchingConfig,
}

/// Proposes candidate matches between two feature collections.
///
/// Implementations should check `progress.is_cancelled()` regularly and
/// return early once it is set; whatever they return afterwards is discarded.
pub trait Matcher: Send + Sync {
    fn generate(&self, request: &MatchRequest, progress: &ProgressMonitor) -> Result<Vec<Match>, String>;
}

/// Progress and cancellation handle given to a running matcher.
pub struct ProgressMonitor {
    cancel: CancelToken,
    tx: Sender<JobMessage>,
}

impl ProgressMonitor {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn report(&self, done: usize, total: usize, message: impl Into<String>) {
        let _ = self.tx.send(JobMessage::Progress(Progress {
            done,
            total,
            message: message.into(),
        }));
    }
}

/// A finished run: the candidate set plus the leftovers on each side.
#[derive(Debug)]
pub struct ComputedMatches {
    pub matches: MatchSet,
    pub reference_only: Vec<FeatureId>,
    pub subject_only: Vec<FeatureId>,
}

impl ComputedMatches {
    fn build(request: &MatchRequest, matches: Vec<Match>) -> Self {
        let matches = MatchSet::from_matches(matches);
        let reference_only = request
            .reference
            .iter()
            .copied()
            .filter(|f| !matches.has_match_for_reference(*f))
            .collect();
        let subject_only = request
            .subject
            .iter()
            .copied()
            .filter(|f| !matches.has_match_for_subject(*f))
            .collect();
        Self {
            matches,
            reference_only,
            subject_only,
        }
    }
}

enum JobMessage {
    Progress(Progress),
    Finished(Result<ComputedMatches, String>),
}

#[derive(Debug)]
pub enum JobPoll {
    Pending,
    Cancelled,
    Failed(String),
    Done(ComputedMatches),
}

pub struct MatchingJob {
    cancel: CancelToken,
    rx: Receiver<JobMessage>,
    handle: Option<JoinHandle<()>>,
    progress: Option<Progress>,
}

impl MatchingJob {
    pub fn spawn(matcher: Arc<dyn Matcher>, request: MatchRequest) -> Result<Self, ReconError> {
        let cancel: CancelToken = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let monitor = ProgressMonitor {
            cancel: cancel.clone(),
            tx: tx.clone(),
        };

        let handle = std::thread::Builder::new()
            .name("conflation-matching".into())
            .spawn(move || {
                let outcome = matcher.generate(&request, &monitor);
                let outcome = if monitor.is_cancelled() {
                    Err("cancelled".to_string())
                } else {
                    outcome.map(|matches| ComputedMatches::build(&request, matches))
                };
                let _ = tx.send(JobMessage::Finished(outcome));
            })
            .map_err(|e| ReconError::Worker(e.to_string()))?;

        Ok(Self {
            cancel,
            rx,
            handle: Some(handle),
            progress: None,
        })
    }

    /// Ask the matcher to stop. Safe to call any number of times.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Latest progress report, if any.
    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    /// Non-blocking check for completion.
    pub fn poll(&mut self) -> JobPoll {
        loop {
            match self.rx.try_recv() {
                Ok(JobMessage::Progress(p)) => self.progress = Some(p),
                Ok(JobMessage::Finished(outcome)) => return self.finish(outcome),
                Err(TryRecvError::Empty) => {
                    return if self.is_cancelled() {
                        JobPoll::Cancelled
                    } else {
                        JobPoll::Pending
                    };
                }
                Err(TryRecvError::Disconnected) => return self.lost(),
            }
        }
    }

    /// Block until the worker reports back.
    pub fn wait(&mut self) -> JobPoll {
        loop {
            match self.rx.recv() {
                Ok(JobMessage::Progress(p)) => self.progress = Some(p),
                Ok(JobMessage::Finished(outcome)) => return self.finish(outcome),
                Err(_) => return self.lost(),
            }
        }
    }

    fn finish(&mut self, outcome: Result<ComputedMatches, String>) -> JobPoll {
        self.join();
        if self.is_cancelled() {
            return JobPoll::Cancelled;
        }
        match outcome {
            Ok(computed) => JobPoll::Done(computed),
            Err(msg) => JobPoll::Failed(msg),
        }
    }

    fn lost(&mut self) -> JobPoll {
        self.join();
        if self.is_cancelled() {
            JobPoll::Cancelled
        } else {
            JobPoll::Failed("matching worker exited without a result".into())
        }
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("matching worker panicked");
            }
        }
    }
}

impl Drop for MatchingJob {
    fn drop(&mut self) {
        // The worker is left to finish on its own; its result goes nowhere.
        self.cancel();
    }
}
