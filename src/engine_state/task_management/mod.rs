//! # Task Management System
//!
//! A small worker pool for CPU-heavy background work such as chunk
//! generation.
//!
//! ## Architecture Overview
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed asynchronously
//! - `TaskResult`: The result of a completed task, which can spawn additional tasks
//! - `TaskChannel`: Communication channel between the owning thread and one worker
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers process tasks and send back results
//! 4. Results are handled on the owning thread in `process_completed_tasks()`
//! 5. Results can spawn new tasks
//!
//! ## Inline mode
//! A manager created with zero workers never spawns threads. Published tasks
//! wait in the queue and run on the calling thread during
//! `process_queued_tasks()`, which makes scheduling fully deterministic.
//!
//! ## Example Usage
//! ```no_run
//! use voxel_streamer::engine_state::task_management::TaskManager;
//!
//! let mut task_manager = TaskManager::new(4);
//!
//! // In the frame loop:
//! task_manager.process_completed_tasks();
//! task_manager.process_queued_tasks();
//! ```

pub mod task;

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use log::{error, info};
use task::{Task, TaskResult};

/// A communication channel between the owning thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks from the owning thread to the worker
/// - `result_receiver`: Receives task results from the worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `worker`: Handle to the worker thread, joined when the manager drops
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Sender<Box<dyn Task + Send>>,
    result_receiver: Receiver<Box<dyn TaskResult + Send>>,
    num_tasks_in_flight: usize,
    worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// The `TaskManager` is responsible for:
/// - Creating and managing worker threads
/// - Distributing tasks across available workers
/// - Collecting and processing task results
/// - Handling task queuing when all workers are busy
///
/// A task that panics on a worker is reported through [`Task::recover`] and
/// counted as completed; the worker keeps running.
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task + Send>>,
    current_channel: usize,
    completed_tasks: u64,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// Anything beyond this waits in the manager's FIFO queue, so tasks published
/// later can still be picked up by whichever worker frees up first.
pub const MAX_TASKS_IN_FLIGHT: usize = 2;

/// Stand-in result for a task that panicked on a worker.
struct PanickedTask;

impl TaskResult for PanickedTask {
    fn handle_result(self: Box<Self>) -> Vec<Box<dyn Task + Send>> {
        Vec::new()
    }
}

fn run_task(task: &dyn Task) -> Box<dyn TaskResult + Send> {
    match panic::catch_unwind(AssertUnwindSafe(|| task.process())) {
        Ok(result) => result,
        Err(_) => {
            error!("Task panicked on {:?}", thread::current().name());
            task.recover().unwrap_or_else(|| Box::new(PanickedTask))
        }
    }
}

impl TaskManager {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create. Zero selects
    ///   inline mode. Workers that fail to spawn are logged and skipped.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        for index in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task + Send>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult + Send>>();

            let task_closure = move || {
                while let Ok(task) = task_rx.recv() {
                    let result = run_task(task.as_ref());
                    if result_tx.send(result).is_err() {
                        break;
                    }
                }
            };

            match thread::Builder::new()
                .name(format!("chunk-worker-{index}"))
                .spawn(task_closure)
            {
                Ok(worker) => channels.push(TaskChannel {
                    task_sender: task_tx,
                    result_receiver: result_rx,
                    num_tasks_in_flight: 0,
                    worker,
                }),
                Err(err) => error!("Failed to spawn worker {index}: {err}"),
            }
        }

        if channels.is_empty() {
            info!("Task manager running inline");
        } else {
            info!(
                "Task manager started {} workers (available parallelism: {:?})",
                channels.len(),
                thread::available_parallelism()
            );
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
            completed_tasks: 0,
        }
    }

    /// Number of worker threads; zero in inline mode.
    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Tasks sent to workers whose results have not been handled yet.
    pub fn tasks_in_flight(&self) -> usize {
        self.channels
            .iter()
            .map(|channel| channel.num_tasks_in_flight)
            .sum()
    }

    /// Tasks waiting for a worker (or, inline, for the next queue pass).
    pub fn queued_task_count(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Total number of results handled so far.
    pub fn completed_task_count(&self) -> u64 {
        self.completed_tasks
    }

    /// True when nothing is queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.tasks_in_flight() == 0
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the task was successfully sent to the worker
    /// - `Err(task)` if the send failed (the worker has exited)
    fn try_send_task(
        &mut self,
        task: Box<dyn Task + Send>,
        channel_idx: usize,
    ) -> Result<(), Box<dyn Task + Send>> {
        match self.channels[channel_idx].task_sender.send(task) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => Err(task.0),
        }
    }

    /// Finds an available worker channel, round-robin from the last used one.
    ///
    /// Channels that have reached `MAX_TASKS_IN_FLIGHT` are skipped.
    fn find_available_channel(&self) -> Option<usize> {
        let count = self.channels.len();
        (0..count)
            .map(|offset| (self.current_channel + offset) % count)
            .find(|&idx| self.channels[idx].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT)
    }

    /// Publishes a new task for execution.
    ///
    /// # Returns
    /// - `true` if the task was immediately handed to a worker
    /// - `false` if the task was queued (all workers busy, or inline mode)
    pub fn publish_task(&mut self, task: Box<dyn Task + Send>) -> bool {
        let Some(channel_idx) = self.find_available_channel() else {
            self.queued_tasks.push_back(task);
            return false;
        };

        match self.try_send_task(task, channel_idx) {
            Ok(_) => {
                self.current_channel = (channel_idx + 1) % self.channels.len();
                true
            }
            Err(task) => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Moves queued tasks to workers as capacity allows, in FIFO order.
    ///
    /// In inline mode every queued task (and any follow-up it spawns) is run
    /// to completion here, on the calling thread.
    pub fn process_queued_tasks(&mut self) {
        if self.channels.is_empty() {
            while let Some(task) = self.queued_tasks.pop_front() {
                let follow_ups = run_task(task.as_ref()).handle_result();
                self.completed_tasks += 1;
                self.queued_tasks.extend(follow_ups);
            }
            return;
        }

        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => {
                    // Worker is gone; put the task back and stop for this frame.
                    self.queued_tasks.push_front(task);
                    break;
                }
            }
        }
    }

    /// Handles every result the workers have sent back so far.
    ///
    /// Must be called on the thread that owns the manager. Follow-up tasks
    /// are published after all results are drained.
    pub fn process_completed_tasks(&mut self) {
        let mut tasks_to_queue = Vec::new();
        for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight -= 1;
                self.completed_tasks += 1;
                tasks_to_queue.extend(result.handle_result());
            }
        }

        for task in tasks_to_queue {
            self.publish_task(task);
        }
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        // Closing the task channel ends the worker loop.
        for channel in self.channels.drain(..) {
            let TaskChannel {
                task_sender,
                worker,
                ..
            } = channel;
            drop(task_sender);
            if worker.join().is_err() {
                error!("Worker thread exited with a panic");
            }
        }
    }
}
