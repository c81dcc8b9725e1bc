use std::{cmp::Reverse, collections::BinaryHeap};

/// Queue of delayed continuations on a game clock measured in milliseconds.
///
/// Tasks due at the same instant fire in the order they were scheduled.
#[derive(Debug)]
pub struct Scheduler<T> {
    now_ms: u64,
    next_seq: u64,
    queue: BinaryHeap<Reverse<Entry<T>>>,
}

#[derive(Debug)]
struct Entry<T> {
    due_ms: u64,
    seq: u64,
    task: T,
}

impl<T> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        (self.due_ms, self.seq) == (other.due_ms, other.seq)
    }
}

impl<T> Eq for Entry<T> {}

impl<T> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.due_ms, self.seq).cmp(&(other.due_ms, other.seq))
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            next_seq: 0,
            queue: BinaryHeap::new(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Due time of the earliest queued task
    pub fn next_due(&self) -> Option<u64> {
        self.queue.peek().map(|Reverse(e)| e.due_ms)
    }

    pub fn schedule(&mut self, delay_ms: u64, task: T) {
        let entry = Entry {
            due_ms: self.now_ms + delay_ms,
            seq: self.next_seq,
            task,
        };
        self.next_seq += 1;
        self.queue.push(Reverse(entry));
    }

    /// Pop the earliest task due at or before `until_ms`, moving the clock to
    /// its due time. Tasks scheduled while draining are picked up by later
    /// calls when they fall inside the same window.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<T> {
        let due = self.next_due()?;
        if due > until_ms {
            return None;
        }
        let Reverse(entry) = self.queue.pop()?;
        self.now_ms = self.now_ms.max(entry.due_ms);
        Some(entry.task)
    }

    /// Move the clock forward without firing anything
    pub fn advance_to(&mut self, until_ms: u64) {
        self.now_ms = self.now_ms.max(until_ms);
    }

    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
