/*!
 * Timer Heap
 * Binary min-heap keyed by fire time, writing slots back into timers
 */

use super::timer::{Slot, Timer};
use std::sync::Arc;

/// Min-heap of active timers ordered by `fire_time`.
///
/// Every move writes the node's heap slot back into the timer, so the set
/// can locate and remove an arbitrary timer without scanning. Ties on fire
/// time resolve in unspecified order.
#[derive(Default)]
pub(crate) struct TimerHeap {
    nodes: Vec<Arc<Timer>>,
}

impl TimerHeap {
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn peek_min(&self) -> Option<&Arc<Timer>> {
        self.nodes.first()
    }

    pub(crate) fn insert(&mut self, timer: Arc<Timer>) {
        let index = self.nodes.len();
        timer.set_slot(Slot::Heap(index));
        self.nodes.push(timer);
        self.sift_up(index);
    }

    /// Pop the root. The popped timer's slot is left stale; the caller marks
    /// it unscheduled.
    pub(crate) fn pop_min(&mut self) -> Option<Arc<Timer>> {
        self.remove_at(0)
    }

    /// Remove the timer at `index`, restoring heap order around the hole.
    pub(crate) fn remove_at(&mut self, index: usize) -> Option<Arc<Timer>> {
        if index >= self.nodes.len() {
            return None;
        }
        let removed = self.nodes.swap_remove(index);
        if index < self.nodes.len() {
            self.nodes[index].set_slot(Slot::Heap(index));
            let index = self.sift_down(index);
            self.sift_up(index);
        }
        Some(removed)
    }

    /// Empty the heap, handing back the nodes in arbitrary order.
    pub(crate) fn drain(&mut self) -> Vec<Arc<Timer>> {
        std::mem::take(&mut self.nodes)
    }

    fn sift_up(&mut self, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.nodes[index].fire_time() >= self.nodes[parent].fire_time() {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
        index
    }

    fn sift_down(&mut self, mut index: usize) -> usize {
        loop {
            let mut smallest = index;
            for child in [2 * index + 1, 2 * index + 2] {
                if child < self.nodes.len()
                    && self.nodes[child].fire_time() < self.nodes[smallest].fire_time()
                {
                    smallest = child;
                }
            }
            if smallest == index {
                return index;
            }
            self.swap(index, smallest);
            index = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.nodes.swap(a, b);
        self.nodes[a].set_slot(Slot::Heap(a));
        self.nodes[b].set_slot(Slot::Heap(b));
    }

    /// Check slot write-back and heap order. Test support.
    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.nodes.iter().enumerate().all(|(i, node)| {
            let slot_ok = node.slot() == Slot::Heap(i);
            let order_ok = i == 0 || self.nodes[(i - 1) / 2].fire_time() <= node.fire_time();
            slot_ok && order_ok
        })
    }
}
