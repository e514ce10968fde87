//! A fixed-or-scalable worker pool draining a single FIFO task queue.
//!
//! Grounded on this codebase's dedicated-writer-thread idiom (a
//! `crossbeam_channel` feeding a spawned thread), generalized from one
//! writer to N workers pulling from the same multi-consumer channel.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use rewrite_core::EngineError;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// A pool of worker threads draining a shared FIFO queue. Workers are
/// added via [`WorkerPool::scale`]; the pool does not shrink.
pub struct WorkerPool {
    sender: Mutex<Option<Sender<Task>>>,
    receiver: Receiver<Task>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    idle: Arc<AtomicUsize>,
    shut_down: AtomicBool,
}

impl WorkerPool {
    /// Creates a pool with `initial_workers` threads (at least 1).
    pub fn new(initial_workers: usize) -> Self {
        let (sender, receiver) = unbounded();
        let pool = Self {
            sender: Mutex::new(Some(sender)),
            receiver,
            workers: Mutex::new(Vec::new()),
            idle: Arc::new(AtomicUsize::new(0)),
            shut_down: AtomicBool::new(false),
        };
        pool.scale(initial_workers.max(1));
        pool
    }

    /// Grows the worker set to `n` threads. A no-op if the pool already has
    /// `n` or more workers — shrinking is not supported.
    pub fn scale(&self, n: usize) {
        let mut workers = self.workers.lock().unwrap();
        while workers.len() < n {
            let receiver = self.receiver.clone();
            let idle = Arc::clone(&self.idle);
            idle.fetch_add(1, Ordering::SeqCst);
            let name = format!("rewrite-worker-{}", workers.len());
            let handle = thread::Builder::new()
                .name(name)
                .spawn(move || worker_loop(receiver, idle))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }
    }

    /// Enqueues a parameterless unit of work. Fails with
    /// [`EngineError::PoolSubmitError`] if the pool has shut down.
    pub fn submit<F>(&self, task: F) -> Result<(), EngineError>
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = self.sender.lock().unwrap();
        match guard.as_ref() {
            Some(sender) => sender.send(Box::new(task)).map_err(|_| EngineError::PoolSubmitError),
            None => Err(EngineError::PoolSubmitError),
        }
    }

    /// Enqueues a producer task whose return value is handed to
    /// `continuation`, which also runs on a worker thread.
    pub fn submit_with_callback<T, F, C>(&self, producer: F, continuation: C) -> Result<(), EngineError>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
        C: FnOnce(T) + Send + 'static,
    {
        self.submit(move || continuation(producer()))
    }

    /// Approximate count of workers currently waiting for a task.
    pub fn idle_count(&self) -> usize {
        self.idle.load(Ordering::SeqCst)
    }

    pub fn has_idle(&self) -> bool {
        self.idle_count() > 0
    }

    /// Signals stop, wakes all workers by disconnecting the channel, and
    /// joins them. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        // Dropping the sender disconnects the channel once every clone is
        // gone; each worker's `recv` then returns `Err` and the loop exits.
        self.sender.lock().unwrap().take();
        let mut workers = self.workers.lock().unwrap();
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(receiver: Receiver<Task>, idle: Arc<AtomicUsize>) {
    while let Ok(task) = receiver.recv() {
        idle.fetch_sub(1, Ordering::SeqCst);
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(task)) {
            tracing::warn!(panic = %panic_message(&payload), "worker task panicked, discarding");
        }
        idle.fetch_add(1, Ordering::SeqCst);
    }
}

fn panic_message(payload: &Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
