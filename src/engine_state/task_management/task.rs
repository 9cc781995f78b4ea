//! # Task System Core Traits
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread (or inline
//!    when the manager has no workers)
//! 3. The task returns a boxed `TaskResult`
//! 4. The result's `handle_result()` is called on the thread that owns the
//!    `TaskManager`
//! 5. The result can spawn follow-up tasks
//!
//! ## Thread Safety
//! - `Task` must be `Send` to be transferred between threads
//! - `TaskResult` must be `Send` to be transferred back to the owning thread
//! - All shared state must be properly synchronized (see [`MtResource`](crate::core::MtResource))

/// A unit of work that can be executed on a background worker.
///
/// Tasks should own everything they need. Anything shared with the owning
/// thread goes through a synchronised handle.
pub trait Task: Send {
    /// Performs the work and returns a result for the owning thread.
    ///
    /// Runs on a worker thread; it must not touch GPU state.
    fn process(&self) -> Box<dyn TaskResult + Send>;

    /// Called on the worker after `process` panicked. Tasks whose owner
    /// waits for them report the failure here; the returned result is
    /// handled like any other.
    fn recover(&self) -> Option<Box<dyn TaskResult + Send>> {
        None
    }
}

/// The result of processing a [`Task`], handled on the thread that owns the
/// [`TaskManager`](super::TaskManager).
pub trait TaskResult: Send {
    /// Handles the result and returns follow-up tasks to schedule (usually none).
    ///
    /// Keep it cheap: it runs inside the frame.
    fn handle_result(self: Box<Self>) -> Vec<Box<dyn Task + Send>>;
}
