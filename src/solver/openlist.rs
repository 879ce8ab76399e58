use crate::common::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct OpenEntry {
    cost: usize,
    sequence: u64, // insertion order breaks cost ties
    node: NodeId,
}

/// Binary min-heap over constraint tree nodes keyed by cost. Every queued node
/// knows its slot in the heap, so it can be updated or removed in place.
#[derive(Debug, Default)]
pub(crate) struct OpenList {
    heap: Vec<OpenEntry>,
    slots: Vec<Option<usize>>,
    sequence: u64,
}

impl OpenList {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub(crate) fn contains(&self, node: NodeId) -> bool {
        self.slot(node).is_some()
    }

    /// Queues `node`, or reprioritizes it if it is already queued.
    pub(crate) fn push(&mut self, node: NodeId, cost: usize) {
        if self.update(node, cost) {
            return;
        }

        if self.slots.len() <= node {
            self.slots.resize(node + 1, None);
        }
        self.sequence += 1;
        self.heap.push(OpenEntry {
            cost,
            sequence: self.sequence,
            node,
        });
        let index = self.heap.len() - 1;
        self.slots[node] = Some(index);
        self.sift_up(index);
    }

    pub(crate) fn peek(&self) -> Option<(NodeId, usize)> {
        self.heap.first().map(|entry| (entry.node, entry.cost))
    }

    pub(crate) fn pop(&mut self) -> Option<NodeId> {
        let node = self.heap.first()?.node;
        self.remove(node);
        Some(node)
    }

    pub(crate) fn remove(&mut self, node: NodeId) -> bool {
        let Some(index) = self.slot(node) else {
            return false;
        };

        let last = self.heap.len() - 1;
        self.swap(index, last);
        self.heap.pop();
        self.slots[node] = None;

        if index < self.heap.len() {
            self.sift_down(index);
            self.sift_up(index);
        }
        true
    }

    /// Changes the cost of a queued node. Returns false if it is not queued.
    pub(crate) fn update(&mut self, node: NodeId, cost: usize) -> bool {
        let Some(index) = self.slot(node) else {
            return false;
        };

        self.heap[index].cost = cost;
        self.sift_down(index);
        self.sift_up(index);
        true
    }

    pub(crate) fn clear(&mut self) {
        self.heap.clear();
        self.slots.clear();
    }

    fn slot(&self, node: NodeId) -> Option<usize> {
        self.slots.get(node).copied().flatten()
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.slots[self.heap[a].node] = Some(a);
        self.slots[self.heap[b].node] = Some(b);
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.heap[index] >= self.heap[parent] {
                break;
            }
            self.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        loop {
            let left = 2 * index + 1;
            let right = left + 1;
            let mut smallest = index;

            if left < self.heap.len() && self.heap[left] < self.heap[smallest] {
                smallest = left;
            }
            if right < self.heap.len() && self.heap[right] < self.heap[smallest] {
                smallest = right;
            }
            if smallest == index {
                break;
            }
            self.swap(index, smallest);
            index = smallest;
        }
    }
}
