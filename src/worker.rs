//! Background execution for scans and deletes.
//!
//! All jobs run in submission order on one thread, so a delete never overlaps
//! a scan of the same root. Submitting a scan cancels the one before it, and
//! any scan result older than the newest submission is dropped on receipt.

use crate::cancel::CancelToken;
use crate::deleter::{self, DeleteReport};
use crate::error::Result;
use crate::scanner::{self, ExclusionPolicy, Scan};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

enum Job {
    Scan {
        generation: u64,
        root: PathBuf,
        exclusions: ExclusionPolicy,
        cancel: CancelToken,
    },
    Delete {
        root: PathBuf,
        names: Vec<String>,
    },
}

#[derive(Debug)]
pub enum Outcome {
    Scanned { generation: u64, result: Result<Scan> },
    Deleted(DeleteReport),
}

pub struct Worker {
    jobs: Option<Sender<Job>>,
    outcomes: Receiver<Outcome>,
    latest_scan: u64,
    scan_cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn() -> Self {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        let (outcome_tx, outcome_rx) = mpsc::channel::<Outcome>();
        let handle = thread::spawn(move || run(job_rx, outcome_tx));
        Self {
            jobs: Some(job_tx),
            outcomes: outcome_rx,
            latest_scan: 0,
            scan_cancel: CancelToken::new(),
            handle: Some(handle),
        }
    }

    /// Queues a scan and returns its generation.
    pub fn submit_scan(&mut self, root: impl Into<PathBuf>, exclusions: ExclusionPolicy) -> u64 {
        self.scan_cancel.cancel();
        self.scan_cancel = CancelToken::new();
        self.latest_scan += 1;
        self.send(Job::Scan {
            generation: self.latest_scan,
            root: root.into(),
            exclusions,
            cancel: self.scan_cancel.clone(),
        });
        self.latest_scan
    }

    pub fn submit_delete(&mut self, root: impl Into<PathBuf>, names: Vec<String>) {
        self.send(Job::Delete {
            root: root.into(),
            names,
        });
    }

    fn send(&self, job: Job) {
        if let Some(jobs) = &self.jobs {
            if jobs.send(job).is_err() {
                tracing::error!("worker thread is gone, job dropped");
            }
        }
    }

    pub fn latest_scan(&self) -> u64 {
        self.latest_scan
    }

    /// False once the worker thread has exited, e.g. after a panic in a job.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    fn is_current(&self, outcome: &Outcome) -> bool {
        match outcome {
            Outcome::Scanned { generation, .. } if *generation < self.latest_scan => {
                tracing::debug!(generation, latest = self.latest_scan, "dropping stale scan");
                false
            }
            _ => true,
        }
    }

    /// Blocks for the next current outcome. `None` once the worker is gone.
    pub fn recv(&self) -> Option<Outcome> {
        loop {
            let outcome = self.outcomes.recv().ok()?;
            if self.is_current(&outcome) {
                return Some(outcome);
            }
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Outcome> {
        loop {
            match self.outcomes.recv_timeout(timeout) {
                Ok(outcome) if self.is_current(&outcome) => return Some(outcome),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    pub fn try_recv(&self) -> Option<Outcome> {
        loop {
            match self.outcomes.try_recv() {
                Ok(outcome) if self.is_current(&outcome) => return Some(outcome),
                Ok(_) => continue,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.scan_cancel.cancel();
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(jobs: Receiver<Job>, outcomes: Sender<Outcome>) {
    for job in jobs {
        let outcome = match job {
            Job::Scan {
                generation,
                root,
                exclusions,
                cancel,
            } => Outcome::Scanned {
                generation,
                result: scanner::scan_with_cancel(&root, &exclusions, &cancel),
            },
            Job::Delete { root, names } => Outcome::Deleted(deleter::delete(&root, &names)),
        };
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}
