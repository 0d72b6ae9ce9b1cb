//! The queue of decoded instructions between the decode and execute
//! stages of the pipeline.
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueError {
    Full,
    Empty,
}

impl Display for QueueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        f.write_str(match self {
            QueueError::Full => "queue is full",
            QueueError::Empty => "queue is empty",
        })
    }
}

impl Error for QueueError {}

/// A bounded FIFO of decoded instructions.
#[derive(Debug)]
pub struct DecodedQueue<T> {
    items: VecDeque<T>,
    depth: usize,
}

impl<T> DecodedQueue<T> {
    pub fn new(depth: usize) -> DecodedQueue<T> {
        DecodedQueue {
            items: VecDeque::with_capacity(depth),
            depth,
        }
    }

    pub fn push(&mut self, item: T) -> Result<(), QueueError> {
        if self.items.len() >= self.depth {
            Err(QueueError::Full)
        } else {
            self.items.push_back(item);
            Ok(())
        }
    }

    pub fn pop(&mut self) -> Result<T, QueueError> {
        self.items.pop_front().ok_or(QueueError::Empty)
    }

    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
