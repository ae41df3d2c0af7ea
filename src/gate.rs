//! Causal admission control for remote operations
//!
//! The gate decides whether an incoming remote operation's prerequisite
//! history has already been observed locally. Operations that arrive ahead of
//! their prerequisites are parked in a bounded backlog and retried after every
//! later apply, so in-order-capable histories are delivered instead of lost.

use std::collections::VecDeque;

use crate::clock::VectorClock;
use crate::op::{OpId, Operation};

/// How many not-yet-admissible operations a document will hold. Overflow
/// evicts the oldest; the transport layer owns reliability beyond that.
pub const BACKLOG_CAPACITY: usize = 64;

/// Outcome of offering a remote operation to the gate
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Prerequisites were satisfied and the operation was applied
    Applied,

    /// Prerequisite history is missing; the operation is parked for retry
    Buffered,

    /// Duplicate delivery; the operation was dropped
    Rejected,
}

/// Admissibility check: for every participant entry in the operation's clock
/// other than its own origin, the claimed count must not exceed the locally
/// known count plus 1.
pub fn admissible(local: &VectorClock, op: &Operation) -> bool {
    op.clock
        .iter()
        .filter(|(participant, _)| participant.as_str() != op.origin)
        .all(|(participant, count)| count <= local.get(participant) + 1)
}

/// Per-document holding area for operations awaiting causal prerequisites
#[derive(Debug, Default)]
pub struct CausalGate {
    backlog: VecDeque<Operation>,
}

impl CausalGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an operation with this id is currently parked
    pub fn holds(&self, op_id: &OpId) -> bool {
        self.backlog.iter().any(|op| op.id == *op_id)
    }

    /// Park an operation until its prerequisites arrive. A full backlog
    /// evicts the oldest parked operation.
    pub fn park(&mut self, op: Operation) {
        if self.backlog.len() >= BACKLOG_CAPACITY {
            if let Some(evicted) = self.backlog.pop_front() {
                log::warn!(
                    "backlog full for origin {}: evicting parked operation {}",
                    op.origin,
                    evicted.id
                );
            }
        }
        self.backlog.push_back(op);
    }

    /// Remove and return the first parked operation that is now admissible
    /// against `local`. Callers loop this to a fixpoint after each apply.
    pub fn take_admissible(&mut self, local: &VectorClock) -> Option<Operation> {
        let idx = self.backlog.iter().position(|op| admissible(local, op))?;
        self.backlog.remove(idx)
    }

    pub fn len(&self) -> usize {
        self.backlog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backlog.is_empty()
    }
}
