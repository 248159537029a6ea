//! Deferred re-entry queue on a virtual millisecond clock
//!
//! Hooks may not touch state the host has not finished committing, so they
//! schedule follow-up work here instead of running it inline. Every task is
//! fire-and-forget: the host skips tasks whose node has been removed.

use super::node::NodeId;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Work a node behavior asks to run later
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeferredTask {
    /// Recompute the port set
    ManagePorts,
    /// Reconcile widgets against live connection targets
    RefreshWidgets,
    /// Port pass followed by a widget pass
    Reconcile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    due: u64,
    seq: u64,
    node: NodeId,
    task: DeferredTask,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: u64,
    seq: u64,
    queue: BinaryHeap<Reverse<Entry>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queue `task` for `node` to run `delay_ms` after the current time
    pub fn schedule(&mut self, node: NodeId, task: DeferredTask, delay_ms: u64) {
        let entry = Entry {
            due: self.now + delay_ms,
            seq: self.seq,
            node,
            task,
        };
        self.seq += 1;
        self.queue.push(Reverse(entry));
    }

    /// Pop the earliest task due at or before `until`, moving the clock to it
    pub fn pop_due(&mut self, until: u64) -> Option<(NodeId, DeferredTask)> {
        let Reverse(next) = self.queue.peek()?;
        if next.due > until {
            return None;
        }
        let Reverse(entry) = self.queue.pop()?;
        self.now = self.now.max(entry.due);
        Some((entry.node, entry.task))
    }

    /// Pop the earliest task regardless of when it is due
    pub fn pop_next(&mut self) -> Option<(NodeId, DeferredTask)> {
        self.pop_due(u64::MAX)
    }

    /// Move the clock forward without running anything
    pub fn advance_to(&mut self, time: u64) {
        self.now = self.now.max(time);
    }
}
