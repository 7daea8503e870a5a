use super::fifo::FifoQueue;
use super::priority::PriorityHeap;
use crate::config::SchedulingPolicy;
use crate::error::Result;
use crate::process::PcbRef;

/// The active ready structure: a priority heap for HPF/SRTN, a FIFO for RR.
#[derive(Debug, Clone)]
pub enum ReadyQueue {
    Heap(PriorityHeap<PcbRef>),
    Fifo(FifoQueue<PcbRef>),
}

impl ReadyQueue {
    pub fn for_policy(policy: SchedulingPolicy, capacity: usize) -> Self {
        if policy.uses_heap() {
            ReadyQueue::Heap(PriorityHeap::with_capacity(capacity))
        } else {
            ReadyQueue::Fifo(FifoQueue::with_capacity(capacity))
        }
    }

    /// Insert a PCB. `key` orders the heap and is ignored by the FIFO.
    pub fn insert(&mut self, key: u64, pcb: PcbRef) -> Result<()> {
        match self {
            ReadyQueue::Heap(heap) => heap.push(key, pcb),
            ReadyQueue::Fifo(fifo) => fifo.enqueue(pcb),
        }
    }

    pub fn take_next(&mut self) -> Option<PcbRef> {
        match self {
            ReadyQueue::Heap(heap) => heap.pop().map(|(_, pcb)| pcb),
            ReadyQueue::Fifo(fifo) => fifo.dequeue(),
        }
    }

    /// Smallest heap key. Always `None` for the FIFO.
    pub fn peek_key(&self) -> Option<u64> {
        match self {
            ReadyQueue::Heap(heap) => heap.peek().map(|(key, _)| key),
            ReadyQueue::Fifo(_) => None,
        }
    }

    pub fn contains(&self, pcb: PcbRef) -> bool {
        match self {
            ReadyQueue::Heap(heap) => heap.iter().any(|r| *r == pcb),
            ReadyQueue::Fifo(fifo) => fifo.iter().any(|r| *r == pcb),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReadyQueue::Heap(heap) => heap.len(),
            ReadyQueue::Fifo(fifo) => fifo.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
