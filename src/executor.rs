//! Single-lane task executor
//!
//! One worker thread owns the lane state `S` and runs submitted tasks one
//! at a time, in submission order. Callers get a [`Pending`] for each task
//! and only ever see their own task's result: an error or panic in one
//! task is reported to that caller and the lane keeps going.
//!
//! ```text
//! submit ─┐
//! submit ─┼─► bounded channel ─► worker thread (owns S) ─► reply per task
//! submit ─┘
//! ```
//!
//! Shutdown cancels everything still queued (those callers get
//! `SessionDisposed`), lets the running task finish, runs a finalizer on
//! the state and joins the worker.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SendError, SyncSender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crate::error::{HighlightError, Result};

/// Default number of tasks that may wait on the lane before submitters block
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Handle to the result of a submitted task
#[must_use = "a task's result is only observable through its Pending handle"]
pub struct Pending<T> {
    rx: Receiver<Result<T>>,
}

impl<T> Pending<T> {
    fn ready(result: Result<T>) -> Self {
        let (tx, rx) = mpsc::sync_channel(1);
        let _ = tx.send(result);
        Self { rx }
    }

    /// Block until the task has run (or was cancelled)
    pub fn wait(self) -> Result<T> {
        self.rx
            .recv()
            .unwrap_or(Err(HighlightError::SessionDisposed))
    }

    /// Wait up to `timeout`. Returns `None` if the task has not finished.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(HighlightError::SessionDisposed)),
        }
    }

    /// Non-blocking poll
    pub fn try_wait(&self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(HighlightError::SessionDisposed)),
        }
    }
}

trait Job<S>: Send {
    fn run(self: Box<Self>, state: &mut S);
    fn cancel(self: Box<Self>);
}

struct Task<F, T> {
    label: &'static str,
    func: F,
    reply: SyncSender<Result<T>>,
}

impl<S, F, T> Job<S> for Task<F, T>
where
    F: FnOnce(&mut S) -> Result<T> + Send,
    T: Send,
{
    fn run(self: Box<Self>, state: &mut S) {
        let Task { label, func, reply } = *self;
        let result = panic::catch_unwind(AssertUnwindSafe(|| func(state))).unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            tracing::error!("Task '{}' panicked: {}", label, message);
            Err(HighlightError::EngineFailure(format!(
                "task '{}' panicked: {}",
                label, message
            )))
        });
        // Caller may have dropped its Pending; nothing to do then
        let _ = reply.send(result);
    }

    fn cancel(self: Box<Self>) {
        tracing::debug!("Cancelling queued task '{}'", self.label);
        let _ = self.reply.send(Err(HighlightError::SessionDisposed));
    }
}

type Finalizer<S> = Box<dyn FnOnce(&mut S) + Send>;

enum Message<S> {
    Run(Box<dyn Job<S>>),
    Shutdown(Finalizer<S>),
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A FIFO lane of execution over state `S`
pub struct SerializedExecutor<S: Send + 'static> {
    name: String,
    sender: Mutex<Option<SyncSender<Message<S>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    cancelled: Arc<AtomicBool>,
    started: Arc<AtomicU64>,
}

impl<S: Send + 'static> SerializedExecutor<S> {
    /// Start the worker thread; `state` moves onto it
    pub fn spawn(name: &str, state: S, capacity: usize) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        let cancelled = Arc::new(AtomicBool::new(false));
        let started = Arc::new(AtomicU64::new(0));

        let worker = {
            let cancelled = Arc::clone(&cancelled);
            let started = Arc::clone(&started);
            thread::Builder::new()
                .name(name.to_string())
                .spawn(move || worker_loop(state, rx, cancelled, started))?
        };
        tracing::debug!("Started executor lane '{}'", name);

        Ok(Self {
            name: name.to_string(),
            sender: Mutex::new(Some(tx)),
            worker_id: worker.thread().id(),
            worker: Mutex::new(Some(worker)),
            cancelled,
            started,
        })
    }

    /// Queue `func` behind every task already submitted.
    ///
    /// Blocks only while the queue is full. After shutdown the returned
    /// handle resolves immediately to `SessionDisposed`.
    pub fn submit<T, F>(&self, label: &'static str, func: F) -> Pending<T>
    where
        F: FnOnce(&mut S) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(sender) = sender else {
            return Pending::ready(Err(HighlightError::SessionDisposed));
        };

        let (reply, rx) = mpsc::sync_channel(1);
        let task: Box<dyn Job<S>> = Box::new(Task { label, func, reply });
        if let Err(SendError(Message::Run(task))) = sender.send(Message::Run(task)) {
            task.cancel();
        }
        Pending { rx }
    }

    /// Cancel queued tasks, run `finalizer` on the state and stop the lane.
    ///
    /// A task already running finishes first. Calling this again is a
    /// no-op. When called from a task on this lane the worker is not
    /// joined (it would be joining itself).
    pub fn shutdown<F>(&self, finalizer: F)
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        let Some(sender) = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        self.cancelled.store(true, Ordering::Release);
        if sender.send(Message::Shutdown(Box::new(finalizer))).is_err() {
            tracing::warn!("Executor lane '{}' already stopped", self.name);
        }
        drop(sender);

        if thread::current().id() == self.worker_id {
            return;
        }
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                tracing::error!("Executor lane '{}' worker panicked", self.name);
            }
        }
        tracing::debug!("Stopped executor lane '{}'", self.name);
    }

    /// Whether the lane still accepts tasks
    pub fn is_running(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of tasks the lane has started (cancelled ones excluded)
    pub fn started_tasks(&self) -> u64 {
        self.started.load(Ordering::Acquire)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S: Send + 'static> Drop for SerializedExecutor<S> {
    fn drop(&mut self) {
        self.shutdown(|_| {});
    }
}

fn worker_loop<S>(
    mut state: S,
    rx: Receiver<Message<S>>,
    cancelled: Arc<AtomicBool>,
    started: Arc<AtomicU64>,
) {
    for message in rx.iter() {
        match message {
            Message::Run(job) => {
                if cancelled.load(Ordering::Acquire) {
                    job.cancel();
                } else {
                    started.fetch_add(1, Ordering::AcqRel);
                    job.run(&mut state);
                }
            }
            Message::Shutdown(finalizer) => {
                if panic::catch_unwind(AssertUnwindSafe(|| finalizer(&mut state))).is_err() {
                    tracing::error!("Executor finalizer panicked");
                }
                break;
            }
        }
    }

    // Anything that raced in behind the shutdown message
    for message in rx.try_iter() {
        if let Message::Run(job) = message {
            job.cancel();
        }
    }
}
