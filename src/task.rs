//! Run-to-completion task queue.
//!
//! All keyboard state is touched only from queued tasks, drained one at
//! a time by [`Keyboard::run_pending`](crate::keyboard::Keyboard).  The
//! translate and report-generation tasks are coalesced: while one is
//! queued, further requests are absorbed.  A full queue is fatal.

use heapless::Deque;

use crate::error::{Error, StorageError};
use crate::relay::RelayPayload;

/// Unit of deferred work.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Task {
    /// Periodic matrix scan.
    Scan,
    /// Resolve untranslated registry slots.
    Translate,
    /// Build reports and hand them to the report channel.
    GenerateReport,
    /// Edits relayed by the other half.
    RelayPayload(RelayPayload),
    /// The link to the other half dropped.
    LinkDisconnected,
    /// The host transport can take reports again.
    TransportReady,
    /// A profile write finished.
    ProfileWritten(Result<(), StorageError>),
    /// A row edge fired while in low power.
    Wake,
}

pub struct TaskQueue<const N: usize> {
    queue: Deque<Task, N>,
    translate_queued: bool,
    report_queued: bool,
}

impl<const N: usize> TaskQueue<N> {
    pub const fn new() -> Self {
        Self {
            queue: Deque::new(),
            translate_queued: false,
            report_queued: false,
        }
    }

    /// Append `task`.  Coalesced tasks already pending are not queued
    /// again.
    pub fn push(&mut self, task: Task) -> Result<(), Error> {
        let translate = matches!(task, Task::Translate);
        let report = matches!(task, Task::GenerateReport);
        if (translate && self.translate_queued) || (report && self.report_queued) {
            return Ok(());
        }

        if self.queue.push_back(task).is_err() {
            error!("task queue full");
            return Err(Error::TaskQueueFull);
        }

        self.translate_queued |= translate;
        self.report_queued |= report;
        Ok(())
    }

    /// Take the oldest task.  Its coalescing flag is cleared so the task
    /// may request itself again while running.
    pub fn pop(&mut self) -> Option<Task> {
        let task = self.queue.pop_front()?;
        match task {
            Task::Translate => self.translate_queued = false,
            Task::GenerateReport => self.report_queued = false,
            _ => {}
        }
        Some(task)
    }

    pub fn translate_queued(&self) -> bool {
        self.translate_queued
    }

    pub fn report_queued(&self) -> bool {
        self.report_queued
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<const N: usize> Default for TaskQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_and_report_are_coalesced() {
        let mut queue = TaskQueue::<8>::new();
        queue.push(Task::Translate).unwrap();
        queue.push(Task::GenerateReport).unwrap();
        queue.push(Task::Translate).unwrap();
        queue.push(Task::GenerateReport).unwrap();
        assert_eq!(queue.len(), 2);
        assert!(queue.translate_queued());
        assert!(queue.report_queued());
    }

    #[test]
    fn scans_are_never_coalesced() {
        let mut queue = TaskQueue::<8>::new();
        queue.push(Task::Scan).unwrap();
        queue.push(Task::Scan).unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn pop_clears_flag_and_keeps_order() {
        let mut queue = TaskQueue::<8>::new();
        queue.push(Task::Scan).unwrap();
        queue.push(Task::Translate).unwrap();
        queue.push(Task::GenerateReport).unwrap();

        assert_eq!(queue.pop(), Some(Task::Scan));
        assert_eq!(queue.pop(), Some(Task::Translate));
        assert!(!queue.translate_queued());
        assert!(queue.report_queued());

        queue.push(Task::Translate).unwrap();
        assert_eq!(queue.pop(), Some(Task::GenerateReport));
        assert_eq!(queue.pop(), Some(Task::Translate));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn exhausted_queue_is_fatal() {
        let mut queue = TaskQueue::<2>::new();
        queue.push(Task::Scan).unwrap();
        queue.push(Task::Scan).unwrap();
        assert_eq!(queue.push(Task::Scan), Err(Error::TaskQueueFull));
    }

    #[test]
    fn rejected_coalesced_task_leaves_flag_clear() {
        let mut queue = TaskQueue::<1>::new();
        queue.push(Task::Scan).unwrap();
        assert_eq!(queue.push(Task::Translate), Err(Error::TaskQueueFull));
        assert!(!queue.translate_queued());
    }
}
