//! The authoritative game-state thread.
//!
//! World reads are only safe on one thread. [`MainThread`] owns that thread
//! and runs submitted jobs one at a time in submission order. Async code
//! hands work over with [`MainThread::call`] and awaits the result without
//! blocking either side.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::ThreadId;

use archtalk_core::error::DialogueError;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to the authoritative thread. Cheap to clone; the thread exits
/// once every handle is dropped.
#[derive(Clone)]
pub struct MainThread {
    jobs: mpsc::UnboundedSender<Job>,
    thread_id: ThreadId,
}

impl MainThread {
    /// Start the thread.
    pub fn spawn(name: &str) -> std::io::Result<Self> {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while let Some(job) = queue.blocking_recv() {
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        error!("Job panicked on the main thread");
                    }
                }
                debug!("Main thread stopped");
            })?;

        Ok(Self {
            jobs,
            thread_id: handle.thread().id(),
        })
    }

    /// Whether the caller is running on the main thread.
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    /// Queue a job. Returns `false` if the thread has stopped.
    pub fn execute(&self, job: impl FnOnce() + Send + 'static) -> bool {
        self.jobs.send(Box::new(job)).is_ok()
    }

    /// Run `f` on the main thread and await its result.
    pub async fn call<R, F>(&self, f: F) -> Result<R, DialogueError>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let queued = self.execute(move || {
            let _ = tx.send(f());
        });
        if !queued {
            return Err(DialogueError::Interrupted("main thread has stopped".into()));
        }
        rx.await
            .map_err(|_| DialogueError::Interrupted("main thread dropped the task".into()))
    }
}

impl std::fmt::Debug for MainThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainThread")
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn call_runs_on_main_thread() {
        let main = MainThread::spawn("test-main").unwrap();
        let probe = main.clone();
        let on_main = main.call(move || probe.is_current()).await.unwrap();
        assert!(on_main);
        assert!(!main.is_current());
    }

    #[tokio::test]
    async fn jobs_run_in_submission_order() {
        let main = MainThread::spawn("test-main").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..20 {
            let seen = seen.clone();
            main.execute(move || seen.lock().unwrap().push(i));
        }
        main.call(|| ()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), (0..20).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn panicking_job_is_interrupted_and_thread_survives() {
        let main = MainThread::spawn("test-main").unwrap();
        let result: Result<(), _> = main.call(|| panic!("boom")).await;
        assert!(matches!(result, Err(DialogueError::Interrupted(_))));
        assert_eq!(main.call(|| 7).await.unwrap(), 7);
    }
}
