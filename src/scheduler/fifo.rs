use crate::error::{Error, Result};

/// Fixed-capacity circular FIFO.
#[derive(Debug, Clone)]
pub struct FifoQueue<T> {
    slots: Vec<Option<T>>,
    front: usize,
    len: usize,
}

impl<T> FifoQueue<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            front: 0,
            len: 0,
        }
    }

    /// Append at the rear.
    pub fn enqueue(&mut self, item: T) -> Result<()> {
        if self.is_full() {
            return Err(Error::Capacity {
                capacity: self.capacity(),
            });
        }

        let rear = (self.front + self.len) % self.capacity();
        self.slots[rear] = Some(item);
        self.len += 1;
        Ok(())
    }

    /// Remove from the front.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }

        let item = self.slots[self.front].take();
        self.front = (self.front + 1) % self.capacity();
        self.len -= 1;
        item
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let cap = self.capacity();
        (0..self.len).filter_map(move |i| self.slots[(self.front + i) % cap].as_ref())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
