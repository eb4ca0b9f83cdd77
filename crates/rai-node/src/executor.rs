// Worker-thread pool (spec §5): a small, fixed-size set of OS threads
// draining a shared task queue. Used for observer dispatch and bootstrap
// session scheduling — anything the orchestrator wants off the caller's
// thread. Deliberately plain std (no tokio): the core's suspension points
// are explicit task boundaries, never `async` await points (spec §5,
// Design Note on the teacher's tokio-based RPC façade being out of scope).

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A small pool of cooperative worker threads. Jobs run in submission
/// order per worker but no ordering is guaranteed across workers (spec §5:
/// "across accounts, no ordering is guaranteed").
pub struct Executor {
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl Executor {
    pub fn new(threads: usize) -> Self {
        let threads = threads.max(1);
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..threads)
            .map(|_| {
                let receiver = receiver.clone();
                std::thread::spawn(move || loop {
                    let job = { receiver.lock().unwrap().recv() };
                    match job {
                        Ok(job) => job(),
                        Err(_) => break,
                    }
                })
            })
            .collect();

        Executor {
            sender: Some(sender),
            workers,
        }
    }

    /// Submit a job. Silently dropped if the executor has already been
    /// shut down (spec §4.I: shutdown must be safe to race with in-flight
    /// dispatch attempts).
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(Box::new(job));
        }
    }

    /// Drop the sending half (so workers observe channel closure at their
    /// next recv) and block until every worker drains its remaining queue
    /// and exits. Matches `Node::shutdown`'s "flushes queued observer
    /// dispatches" contract (spec §4.I).
    pub fn shutdown(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
