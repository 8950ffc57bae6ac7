use std::collections::VecDeque;
use std::fmt;

use crate::protocol::RowSet;

/// Row sets produced by the server but not yet handed to the caller, in
/// server order.
#[derive(Default)]
pub struct PendingResults {
    queue: VecDeque<Box<dyn RowSet>>,
}

impl fmt::Debug for PendingResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingResults")
            .field("len", &self.queue.len())
            .finish()
    }
}

impl PendingResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row_set: Box<dyn RowSet>) {
        self.queue.push_back(row_set);
    }

    /// Removes the oldest row set and hands over its ownership.
    pub fn pop(&mut self) -> Option<Box<dyn RowSet>> {
        self.queue.pop_front()
    }

    pub fn front_mut(&mut self) -> Option<&mut (dyn RowSet + 'static)> {
        self.queue.front_mut().map(|row_set| row_set.as_mut())
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
