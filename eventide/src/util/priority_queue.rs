//! Associative priority queue.

use slab::Slab;

/// An associative container optimized for extraction of the value with the
/// lowest key and removal of arbitrary key-value pairs.
///
/// This implementation has the same theoretical complexity for insert and pull
/// operations as a conventional array-based binary heap but differs from the
/// latter in some important aspects:
///
/// - elements can be removed in *O*(log(*N*)) time rather than *O*(*N*) time
///   using a unique index returned at insertion time,
/// - elements can be looked up in *O*(1) time with the same index,
/// - same-key elements are guaranteed to be pulled in FIFO order.
///
/// Under the hood, the priority queue relies on a binary heap cross-indexed
/// with values stored in a slab allocator. Each item of the binary heap
/// contains an index pointing to the associated slab entry, as well as the
/// user-provided key. Each slab entry contains the value associated to the key
/// and a back-pointing index to the binary heap. The heap items also contain a
/// unique epoch which allows same-key entries to be sorted by insertion order.
/// The epoch is used as well to build unique indices so that a stale index
/// never designates a slab entry that was recycled for another insertion.
///
/// Note that the `Copy` bound on the keys could be lifted but this would make
/// the implementation slightly less efficient.
pub(crate) struct PriorityQueue<K, V>
where
    K: Copy + Ord,
{
    heap: Vec<Item<K>>,
    slab: Slab<HeapNode<V>>,
    next_epoch: u64,
}

impl<K: Copy + Ord, V> PriorityQueue<K, V> {
    /// Creates an empty `PriorityQueue`.
    pub(crate) fn new() -> Self {
        Self {
            heap: Vec::new(),
            slab: Slab::new(),
            next_epoch: 0,
        }
    }

    /// Returns the number of key-value pairs in the priority queue.
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if the priority queue holds no key-value pair.
    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Inserts a new key-value pair and returns a unique insertion key.
    ///
    /// This operation has *O*(log(*N*)) amortized worse-case theoretical
    /// complexity and *O*(1) amortized theoretical complexity for a
    /// sufficiently random heap.
    pub(crate) fn insert(&mut self, key: K, value: V) -> InsertKey {
        // Build a unique key from the user-provided key and a unique epoch.
        let epoch = self.next_epoch;
        assert_ne!(epoch, u64::MAX);
        self.next_epoch += 1;
        let unique_key = UniqueKey { key, epoch };

        let slab_idx = self.slab.insert(HeapNode {
            value,
            heap_idx: 0, // temporary value overridden in `sift_up`
        });

        // Add a new item at the bottom of the heap.
        let heap_idx = self.heap.len();
        let item = Item {
            key: unique_key,
            slab_idx,
        };
        self.heap.push(item);

        // Sift up the new item.
        self.sift_up(item, heap_idx);

        InsertKey { slab_idx, epoch }
    }

    /// Pulls the value with the lowest key.
    ///
    /// If there are several equal lowest keys, the value which was inserted
    /// first is returned.
    ///
    /// This operation has *O*(log(N)) non-amortized theoretical complexity.
    pub(crate) fn pull(&mut self) -> Option<(K, V)> {
        let item = *self.heap.first()?;
        let node = self.slab.remove(item.slab_idx);

        // Sift the last item at the bottom of the heap from the top of the heap.
        let last_item = self.heap.pop()?;
        if last_item.slab_idx != item.slab_idx {
            self.sift_down(last_item, 0);
        }

        Some((item.key.key, node.value))
    }

    /// Peeks a reference to the lowest key, leaving it in the queue.
    ///
    /// If there are several equal lowest keys, a reference to the key which was
    /// inserted first is returned.
    ///
    /// This operation has *O*(1) non-amortized theoretical complexity.
    pub(crate) fn peek_key(&self) -> Option<&K> {
        let item = self.heap.first()?;

        Some(&item.key.key)
    }

    /// Returns a reference to the key-value pair associated to the provided
    /// insertion key if it is still in the queue.
    ///
    /// This operation has *O*(1) theoretical complexity.
    pub(crate) fn get(&self, insert_key: InsertKey) -> Option<(&K, &V)> {
        let heap_idx = self.heap_index(insert_key)?;
        let node = self.slab.get(insert_key.slab_idx)?;

        Some((&self.heap[heap_idx].key.key, &node.value))
    }

    /// Removes the key-value pair associated to the provided insertion key if
    /// it is still in the queue and returns it.
    ///
    /// Using an insertion key returned from another `PriorityQueue` is a logic
    /// error and could result in the removal of an arbitrary key-value pair.
    ///
    /// This operation has guaranteed *O*(log(*N*)) theoretical complexity.
    pub(crate) fn remove(&mut self, insert_key: InsertKey) -> Option<(K, V)> {
        let heap_idx = self.heap_index(insert_key)?;
        let key = self.heap[heap_idx].key.key;

        // If the last item of the heap is not the one to be removed, sift it up
        // or down as appropriate starting from the vacant spot.
        let last_item = self.heap.pop()?;
        if let Some(item) = self.heap.get(heap_idx) {
            if last_item.key < item.key {
                self.sift_up(last_item, heap_idx);
            } else {
                self.sift_down(last_item, heap_idx);
            }
        }

        let node = self.slab.remove(insert_key.slab_idx);

        Some((key, node.value))
    }

    /// Removes all key-value pairs.
    ///
    /// Insertion keys issued before the call remain invalid afterwards.
    pub(crate) fn clear(&mut self) {
        self.heap.clear();
        self.slab.clear();
    }

    /// Returns the heap position of the item associated to the insertion key,
    /// checking that (i) there is a slab entry at this index, and (ii) the heap
    /// item it points to carries the epoch of the insertion key.
    fn heap_index(&self, insert_key: InsertKey) -> Option<usize> {
        let heap_idx = self.slab.get(insert_key.slab_idx)?.heap_idx;
        if self.heap.get(heap_idx)?.key.epoch != insert_key.epoch {
            return None;
        }

        Some(heap_idx)
    }

    /// Take a heap item and, starting at `heap_idx`, move it up the heap while
    /// a parent has a larger key.
    #[inline]
    fn sift_up(&mut self, item: Item<K>, heap_idx: usize) {
        let mut child_heap_idx = heap_idx;
        let key = &item.key;

        while child_heap_idx != 0 {
            let parent_heap_idx = (child_heap_idx - 1) / 2;

            // Stop when the key is larger or equal to the parent's.
            if key >= &self.heap[parent_heap_idx].key {
                break;
            }

            // Move the parent down one level.
            self.heap[child_heap_idx] = self.heap[parent_heap_idx];
            let parent_slab_idx = self.heap[parent_heap_idx].slab_idx;
            self.slab[parent_slab_idx].heap_idx = child_heap_idx;

            // Make the former parent the new child.
            child_heap_idx = parent_heap_idx;
        }

        // Move the original item to the current child.
        self.heap[child_heap_idx] = item;
        self.slab[item.slab_idx].heap_idx = child_heap_idx;
    }

    /// Take a heap item and, starting at `heap_idx`, move it down the heap
    /// while a child has a smaller key.
    #[inline]
    fn sift_down(&mut self, item: Item<K>, heap_idx: usize) {
        let mut parent_heap_idx = heap_idx;
        let mut child_heap_idx = 2 * parent_heap_idx + 1;
        let key = &item.key;

        while child_heap_idx < self.heap.len() {
            // If the sibling exists and has a smaller key, make it the
            // candidate for swapping.
            if let Some(other_child) = self.heap.get(child_heap_idx + 1) {
                child_heap_idx += (self.heap[child_heap_idx].key > other_child.key) as usize;
            }

            // Stop when the key is smaller or equal to the child with the smallest key.
            if key <= &self.heap[child_heap_idx].key {
                break;
            }

            // Move the child up one level.
            self.heap[parent_heap_idx] = self.heap[child_heap_idx];
            let child_slab_idx = self.heap[child_heap_idx].slab_idx;
            self.slab[child_slab_idx].heap_idx = parent_heap_idx;

            // Make the child the new parent.
            parent_heap_idx = child_heap_idx;
            child_heap_idx = 2 * parent_heap_idx + 1;
        }

        // Move the original item to the current parent.
        self.heap[parent_heap_idx] = item;
        self.slab[item.slab_idx].heap_idx = parent_heap_idx;
    }
}

/// Data related to a single key-value pair stored in the heap.
#[derive(Copy, Clone)]
struct Item<K: Copy> {
    // A unique key by which the heap is sorted.
    key: UniqueKey<K>,
    // An index pointing to the corresponding entry in the slab.
    slab_idx: usize,
}

/// A slab entry for a key-value pair currently in the binary heap.
struct HeapNode<V> {
    // The value associated to this node.
    value: V,
    // Index of the node in the heap.
    heap_idx: usize,
}

/// A unique insertion key that can be used for key-value pair lookup and
/// removal.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq)]
pub(crate) struct InsertKey {
    // An index pointing to an entry in the slab.
    slab_idx: usize,
    // The epoch when the entry was inserted.
    epoch: u64,
}

/// A unique key made of the user-provided key complemented by a unique epoch.
///
/// Implementation note: `UniqueKey` automatically derives `PartialOrd`, which
/// implies that lexicographic order between `key` and `epoch` must be preserved
/// to make sure that `key` has a higher sorting priority than `epoch`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct UniqueKey<K: Copy> {
    /// The user-provided key.
    key: K,
    /// A unique epoch that indicates the insertion date.
    epoch: u64,
}
