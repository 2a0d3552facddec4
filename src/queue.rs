//! Shared FIFO of transfer tasks.
//!
//! Population happens through `&mut self` before the queue is shared; draining
//! happens through `&self` from any number of workers. `try_dequeue` never
//! blocks: once the queue is sealed and empty it is the "no more work" signal.
use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use thiserror::Error;

use crate::manifest::TransferTask;

/// Returned by [`WorkQueue::enqueue`] after [`WorkQueue::seal`]; hands the task back.
#[derive(Debug, Error)]
#[error("work queue is sealed, cannot enqueue {}", .0.source_key())]
pub struct QueueSealed(pub TransferTask);

pub struct WorkQueue {
    tx: Option<Sender<TransferTask>>,
    rx: Receiver<TransferTask>,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx: Some(tx), rx }
    }

    /// Build a queue holding `tasks` in order, already sealed.
    pub fn from_tasks(tasks: impl IntoIterator<Item = TransferTask>) -> Self {
        let mut q = Self::new();
        for t in tasks {
            // the sender is still held, send cannot fail
            let _ = q.enqueue(t);
        }
        q.seal();
        q
    }

    pub fn enqueue(&mut self, task: TransferTask) -> Result<(), QueueSealed> {
        match &self.tx {
            Some(tx) => tx.send(task).map_err(|e| QueueSealed(e.into_inner())),
            None => Err(QueueSealed(task)),
        }
    }

    /// Close the insertion phase.
    pub fn seal(&mut self) {
        self.tx = None;
    }

    pub fn is_sealed(&self) -> bool {
        self.tx.is_none()
    }

    /// Remove and return the head, or `None` when nothing is queued.
    /// Each task is handed to exactly one caller.
    pub fn try_dequeue(&self) -> Option<TransferTask> {
        match self.rx.try_recv() {
            Ok(task) => Some(task),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(i: usize) -> TransferTask {
        TransferTask::new(format!("key-{i}"), &format!("out/{i}.jpg")).unwrap()
    }

    #[test]
    fn fifo_order() {
        let q = WorkQueue::from_tasks((0..3).map(task));
        assert_eq!(q.len(), 3);
        assert_eq!(q.try_dequeue().unwrap().source_key(), "key-0");
        assert_eq!(q.try_dequeue().unwrap().source_key(), "key-1");
        assert_eq!(q.try_dequeue().unwrap().source_key(), "key-2");
        assert!(q.try_dequeue().is_none());
        assert!(q.try_dequeue().is_none());
    }

    #[test]
    fn enqueue_after_seal_returns_task() {
        let mut q = WorkQueue::new();
        q.enqueue(task(0)).unwrap();
        q.seal();
        assert!(q.is_sealed());
        let err = q.enqueue(task(1)).unwrap_err();
        assert_eq!(err.0.source_key(), "key-1");
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn empty_sealed_queue_does_not_block() {
        let q = WorkQueue::from_tasks(Vec::new());
        assert!(q.is_empty());
        assert!(q.try_dequeue().is_none());
    }
}
