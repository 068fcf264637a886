//! Single-lane queue for reorder operations.
//!
//! Moves are issued faster than the native player acknowledges them, so they
//! run one at a time on a worker thread, strictly in submission order. A move
//! that fails (or panics) is logged and reported on its own ticket only; the
//! lane keeps draining.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use super::QueueError;

type MoveOp = Box<dyn FnOnce() -> Result<(), QueueError> + Send + 'static>;
type Outcome = Result<(), QueueError>;

struct Job {
    op: MoveOp,
    reply: Sender<Outcome>,
}

/// Completion handle for one queued operation.
#[derive(Debug)]
pub struct MoveTicket {
    rx: Receiver<Outcome>,
}

impl MoveTicket {
    /// Block until the operation has run.
    pub fn wait(self) -> Outcome {
        self.rx.recv().unwrap_or(Err(QueueError::Dropped))
    }

    /// The outcome if the operation has finished, without blocking.
    pub fn try_result(&self) -> Option<Outcome> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(QueueError::Dropped)),
        }
    }
}

pub struct MoveQueue {
    tx: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
    pending: Arc<AtomicUsize>,
}

impl MoveQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let pending = Arc::new(AtomicUsize::new(0));
        let pending_for_worker = pending.clone();

        // The worker parks on `recv` while the lane is empty.
        let worker = thread::Builder::new()
            .name("move-queue".into())
            .spawn(move || {
                for job in rx {
                    let outcome = run_isolated(job.op);
                    if let Err(e) = &outcome {
                        log::error!("queued move failed: {e}");
                    }
                    pending_for_worker.fetch_sub(1, Ordering::SeqCst);
                    let _ = job.reply.send(outcome);
                }
            });

        let (tx, worker) = match worker {
            Ok(handle) => (Some(tx), Some(handle)),
            Err(e) => {
                log::error!("failed to spawn move queue worker: {e}");
                (None, None)
            }
        };

        Self {
            tx,
            worker,
            pending,
        }
    }

    /// Queue `op` behind every operation added before it.
    pub fn add<F>(&self, op: F) -> MoveTicket
    where
        F: FnOnce() -> Result<(), QueueError> + Send + 'static,
    {
        let (reply, rx) = mpsc::channel();
        let job = Job {
            op: Box::new(op),
            reply,
        };

        self.pending.fetch_add(1, Ordering::SeqCst);
        let sent = match &self.tx {
            Some(tx) => tx.send(job).map_err(|e| e.0),
            None => Err(job),
        };
        if let Err(job) = sent {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            let _ = job.reply.send(Err(QueueError::Dropped));
        }

        MoveTicket { rx }
    }

    /// Operations queued or running.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl Default for MoveQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MoveQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker finish what is queued, then exit.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_isolated(op: MoveOp) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(op)) {
        Ok(outcome) => outcome,
        Err(payload) => Err(QueueError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
