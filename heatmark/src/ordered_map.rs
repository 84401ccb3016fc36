//! Generic sorted key/value map backed by a B-Tree.

use std::cmp::Ordering;

use smallvec::{smallvec, SmallVec};

/// Default minimum degree: nodes hold between 3 and 7 entries.
const DEFAULT_MIN_DEGREE: usize = 4;

/// Inline capacity of node arrays, sized for the default degree; larger
/// degrees spill to the heap.
const ENTRY_CAPACITY: usize = 2 * DEFAULT_MIN_DEGREE - 1;
const CHILD_CAPACITY: usize = 2 * DEFAULT_MIN_DEGREE;

/// Node address within the arena.
type NodeId = usize;

#[derive(Debug)]
struct Entry<K, V> {
    key: K,
    value: V,
}

#[derive(Debug)]
struct Node<K, V> {
    entries: SmallVec<[Entry<K, V>; ENTRY_CAPACITY]>,
    /// Empty for leaves, `entries.len() + 1` ids otherwise.
    children: SmallVec<[NodeId; CHILD_CAPACITY]>,
}

impl<K, V> Node<K, V> {
    fn leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A sorted key/value map backed by a B-Tree of minimum degree `t`.
///
/// Keys are unique and kept in ascending order. Every node except the root
/// holds between `t - 1` and `2t - 1` entries, internal nodes have one more
/// child than entry, and all leaves sit at the same depth. Insertion splits
/// full nodes proactively on the way down; deletion repairs by sibling
/// borrow or merge along a single descent, so neither ever walks back up.
/// The root grows or shrinks the tree by exactly one level at a time.
///
/// Nodes live in an arena addressed by node id with a free list, and every
/// operation descends iteratively over ids: stack depth never grows with
/// the tree.
///
/// Lookups and removals of absent keys are not errors; they return `None`.
///
/// # Examples
///
/// ```rust
/// use heatmark::OrderedMap;
///
/// let mut map = OrderedMap::new();
/// map.put("b", 2);
/// map.put("a", 1);
/// assert_eq!(map.put("a", 10), Some(1));
///
/// let mut keys = Vec::new();
/// map.for_each(|k, _| keys.push(*k));
/// assert_eq!(keys, vec!["a", "b"]);
/// ```
#[derive(Debug)]
pub struct OrderedMap<K, V> {
    nodes: Vec<Node<K, V>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    len: usize,
    min_degree: usize,
}

impl<K: Ord, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> OrderedMap<K, V> {
    /// Creates an empty map with the default minimum degree of 4.
    pub fn new() -> Self {
        Self::with_min_degree(DEFAULT_MIN_DEGREE)
    }

    /// Creates an empty map with minimum degree `t` (clamped to at least 2):
    /// nodes hold between `t - 1` and `2t - 1` entries.
    pub fn with_min_degree(t: usize) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
            min_degree: t.max(2),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The configured minimum degree.
    pub fn min_degree(&self) -> usize {
        self.min_degree
    }

    /// Tree height in levels; 0 when empty.
    pub fn height(&self) -> usize {
        let Some(mut node) = self.root else {
            return 0;
        };
        let mut height = 1;
        while !self.nodes[node].leaf() {
            node = self.nodes[node].children[0];
            height += 1;
        }
        height
    }

    /// Removes every entry and releases all nodes.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.root = None;
        self.len = 0;
    }

    /// Looks a key up; `None` when absent.
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut node = self.root?;
        loop {
            let n = &self.nodes[node];
            match n.entries.binary_search_by(|e| e.key.cmp(key)) {
                Ok(i) => return Some(&n.entries[i].value),
                Err(i) => {
                    if n.leaf() {
                        return None;
                    }
                    node = n.children[i];
                }
            }
        }
    }

    /// Inserts or overwrites; returns the value previously stored under the
    /// key, if any.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let Some(root) = self.root else {
            let id = self.alloc(Node {
                entries: smallvec![Entry { key, value }],
                children: SmallVec::new(),
            });
            self.root = Some(id);
            self.len = 1;
            return None;
        };
        self.grow_root_if_full(root);

        let mut node = self.root.expect("root present after grow");
        loop {
            match self.nodes[node].entries.binary_search_by(|e| e.key.cmp(&key)) {
                Ok(i) => {
                    return Some(std::mem::replace(
                        &mut self.nodes[node].entries[i].value,
                        value,
                    ));
                }
                Err(i) => {
                    if self.nodes[node].leaf() {
                        self.nodes[node].entries.insert(i, Entry { key, value });
                        self.len += 1;
                        return None;
                    }
                    node = match self.descend_for_insert(node, i, &key) {
                        // a pushed-up median matched the key
                        DescendFor::Found(at) => {
                            return Some(std::mem::replace(
                                &mut self.nodes[node].entries[at].value,
                                value,
                            ));
                        }
                        DescendFor::Child(child) => child,
                    };
                }
            }
        }
    }

    /// Inserts `value` when the key is absent; otherwise replaces the
    /// stored value with `remap(stored, value)`. Returns a reference to the
    /// value left in the map.
    pub fn merge<F>(&mut self, key: K, value: V, remap: F) -> &V
    where
        F: FnOnce(&V, V) -> V,
    {
        let Some(root) = self.root else {
            let id = self.alloc(Node {
                entries: smallvec![Entry { key, value }],
                children: SmallVec::new(),
            });
            self.root = Some(id);
            self.len = 1;
            return &self.nodes[id].entries[0].value;
        };
        self.grow_root_if_full(root);

        let mut node = self.root.expect("root present after grow");
        loop {
            match self.nodes[node].entries.binary_search_by(|e| e.key.cmp(&key)) {
                Ok(i) => {
                    let combined = remap(&self.nodes[node].entries[i].value, value);
                    self.nodes[node].entries[i].value = combined;
                    return &self.nodes[node].entries[i].value;
                }
                Err(i) => {
                    if self.nodes[node].leaf() {
                        self.nodes[node].entries.insert(i, Entry { key, value });
                        self.len += 1;
                        return &self.nodes[node].entries[i].value;
                    }
                    node = match self.descend_for_insert(node, i, &key) {
                        DescendFor::Found(at) => {
                            let combined = remap(&self.nodes[node].entries[at].value, value);
                            self.nodes[node].entries[at].value = combined;
                            return &self.nodes[node].entries[at].value;
                        }
                        DescendFor::Child(child) => child,
                    };
                }
            }
        }
    }

    /// Removes a key, rebalancing by sibling borrow or merge on the way
    /// down; returns the removed value, or `None` when the key is absent.
    /// The root shrinks (and the tree height drops by one) when it empties.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut node = self.root?;
        let t = self.min_degree;
        loop {
            match self.nodes[node].entries.binary_search_by(|e| e.key.cmp(key)) {
                Ok(i) => {
                    if self.nodes[node].leaf() {
                        // descent guaranteed this leaf can afford the loss
                        let entry = self.nodes[node].entries.remove(i);
                        self.len -= 1;
                        self.shrink_root();
                        return Some(entry.value);
                    }

                    let left = self.nodes[node].children[i];
                    let right = self.nodes[node].children[i + 1];
                    if self.nodes[left].entries.len() >= t {
                        // replace with the predecessor pulled from the left
                        // subtree
                        let pred = self.remove_max(left);
                        let old = std::mem::replace(&mut self.nodes[node].entries[i], pred);
                        self.len -= 1;
                        return Some(old.value);
                    }
                    if self.nodes[right].entries.len() >= t {
                        let succ = self.remove_min(right);
                        let old = std::mem::replace(&mut self.nodes[node].entries[i], succ);
                        self.len -= 1;
                        return Some(old.value);
                    }

                    // both neighbors minimal: merge them around the target
                    // entry and continue inside the merged child
                    let merged = self.merge_children(node, i);
                    if Some(node) == self.root && self.nodes[node].entries.is_empty() {
                        self.shrink_root();
                    }
                    node = merged;
                }
                Err(i) => {
                    if self.nodes[node].leaf() {
                        return None;
                    }
                    let child = self.nodes[node].children[i];
                    if self.nodes[child].entries.len() < t {
                        node = self.fill_child(node, i);
                    } else {
                        node = child;
                    }
                }
            }
        }
    }

    /// Visits every entry in strictly ascending key order: a read-only,
    /// single, finite pass.
    pub fn for_each<F: FnMut(&K, &V)>(&self, mut visitor: F) {
        let Some(root) = self.root else {
            return;
        };
        // (node, position): entries before `position` and their subtrees
        // were already visited
        let mut stack: Vec<(NodeId, usize)> = vec![(root, 0)];
        while let Some((node, pos)) = stack.pop() {
            let n = &self.nodes[node];
            if n.leaf() {
                for entry in &n.entries {
                    visitor(&entry.key, &entry.value);
                }
                continue;
            }
            if pos > 0 {
                let entry = &n.entries[pos - 1];
                visitor(&entry.key, &entry.value);
            }
            if pos < n.entries.len() {
                stack.push((node, pos + 1));
            }
            stack.push((n.children[pos], 0));
        }
    }

    /// Panics when a structural invariant is broken: out-of-range node
    /// sizes, a child-count mismatch, unequal leaf depths, or keys out of
    /// order. Test-facing; corruption is a programmer error.
    pub fn assert_invariants(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty map with nonzero len");
            return;
        };
        let t = self.min_degree;
        let mut total = 0;
        let mut leaf_depth: Option<usize> = None;
        let mut stack: Vec<(NodeId, usize)> = vec![(root, 1)];
        while let Some((node, depth)) = stack.pop() {
            let n = &self.nodes[node];
            assert!(
                n.entries.len() <= 2 * t - 1,
                "node {} over capacity",
                node
            );
            if node == root {
                assert!(!n.entries.is_empty(), "non-empty map with empty root");
            } else {
                assert!(
                    n.entries.len() >= t - 1,
                    "non-root node {} under minimum fill",
                    node
                );
            }
            for pair in n.entries.windows(2) {
                assert!(pair[0].key < pair[1].key, "keys out of order in node {}", node);
            }
            total += n.entries.len();
            if n.leaf() {
                match leaf_depth {
                    None => leaf_depth = Some(depth),
                    Some(d) => assert_eq!(d, depth, "leaves at unequal depth"),
                }
            } else {
                assert_eq!(
                    n.children.len(),
                    n.entries.len() + 1,
                    "child count mismatch in node {}",
                    node
                );
                for &child in &n.children {
                    stack.push((child, depth + 1));
                }
            }
        }
        assert_eq!(total, self.len, "entry count does not match len");
    }

    fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id] = node;
            id
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn free_node(&mut self, id: NodeId) {
        // drop the payload now; the slot is reused by the next alloc
        self.nodes[id] = Node {
            entries: SmallVec::new(),
            children: SmallVec::new(),
        };
        self.free.push(id);
    }

    fn max_entries(&self) -> usize {
        2 * self.min_degree - 1
    }

    /// Splits a full root under a fresh empty one before an insert descends.
    fn grow_root_if_full(&mut self, root: NodeId) {
        if self.nodes[root].entries.len() == self.max_entries() {
            let new_root = self.alloc(Node {
                entries: SmallVec::new(),
                children: smallvec![root],
            });
            self.root = Some(new_root);
            self.split_child(new_root, 0);
        }
    }

    /// Splits the full child at `idx`, pushing its median entry into the
    /// parent; both halves end up with `t - 1` entries.
    fn split_child(&mut self, parent: NodeId, idx: usize) {
        let t = self.min_degree;
        let child = self.nodes[parent].children[idx];
        let (median, right_node) = {
            let node = &mut self.nodes[child];
            let right_entries: SmallVec<[Entry<K, V>; ENTRY_CAPACITY]> =
                node.entries.drain(t..).collect();
            let median = node.entries.pop().expect("full node has a median");
            let right_children: SmallVec<[NodeId; CHILD_CAPACITY]> = if node.children.is_empty() {
                SmallVec::new()
            } else {
                node.children.drain(t..).collect()
            };
            (
                median,
                Node {
                    entries: right_entries,
                    children: right_children,
                },
            )
        };
        let right = self.alloc(right_node);
        let parent_node = &mut self.nodes[parent];
        parent_node.entries.insert(idx, median);
        parent_node.children.insert(idx + 1, right);
    }

    /// Pre-splits the full child at `idx` before an insert descends into
    /// it. The pushed-up median may equal the key or shift the descent one
    /// slot to the right.
    fn descend_for_insert(&mut self, node: NodeId, idx: usize, key: &K) -> DescendFor {
        let mut idx = idx;
        let child = self.nodes[node].children[idx];
        if self.nodes[child].entries.len() == self.max_entries() {
            self.split_child(node, idx);
            match key.cmp(&self.nodes[node].entries[idx].key) {
                Ordering::Equal => return DescendFor::Found(idx),
                Ordering::Greater => idx += 1,
                Ordering::Less => {}
            }
        }
        DescendFor::Child(self.nodes[node].children[idx])
    }

    /// Removes and returns the largest entry of the subtree, repairing on
    /// the way down so the rightmost leaf can afford the loss.
    fn remove_max(&mut self, mut node: NodeId) -> Entry<K, V> {
        let t = self.min_degree;
        loop {
            if self.nodes[node].leaf() {
                return self.nodes[node]
                    .entries
                    .pop()
                    .expect("subtree entries never run dry");
            }
            let idx = self.nodes[node].children.len() - 1;
            let child = self.nodes[node].children[idx];
            if self.nodes[child].entries.len() < t {
                node = self.fill_child(node, idx);
            } else {
                node = child;
            }
        }
    }

    /// Removes and returns the smallest entry of the subtree; mirror of
    /// [`Self::remove_max`].
    fn remove_min(&mut self, mut node: NodeId) -> Entry<K, V> {
        let t = self.min_degree;
        loop {
            if self.nodes[node].leaf() {
                return self.nodes[node].entries.remove(0);
            }
            let child = self.nodes[node].children[0];
            if self.nodes[child].entries.len() < t {
                node = self.fill_child(node, 0);
            } else {
                node = child;
            }
        }
    }

    /// Makes sure the child at `idx` can lose an entry before the descent
    /// enters it: borrow from a richer sibling, else merge with one.
    /// Returns the node to descend into.
    fn fill_child(&mut self, parent: NodeId, idx: usize) -> NodeId {
        let t = self.min_degree;
        if idx > 0 {
            let left_sibling = self.nodes[parent].children[idx - 1];
            if self.nodes[left_sibling].entries.len() >= t {
                self.rotate_right(parent, idx);
                return self.nodes[parent].children[idx];
            }
        }
        let child_count = self.nodes[parent].children.len();
        if idx + 1 < child_count {
            let right_sibling = self.nodes[parent].children[idx + 1];
            if self.nodes[right_sibling].entries.len() >= t {
                self.rotate_left(parent, idx);
                return self.nodes[parent].children[idx];
            }
        }

        let merge_at = if idx + 1 < child_count { idx } else { idx - 1 };
        let merged = self.merge_children(parent, merge_at);
        if Some(parent) == self.root && self.nodes[parent].entries.is_empty() {
            self.shrink_root();
        }
        merged
    }

    /// Moves the last entry of the left sibling up to the parent and the
    /// parent separator down to the front of the child at `idx`.
    fn rotate_right(&mut self, parent: NodeId, idx: usize) {
        let left = self.nodes[parent].children[idx - 1];
        let child = self.nodes[parent].children[idx];

        let from_left = self.nodes[left]
            .entries
            .pop()
            .expect("donor sibling has entries");
        let sep = std::mem::replace(&mut self.nodes[parent].entries[idx - 1], from_left);
        self.nodes[child].entries.insert(0, sep);
        if !self.nodes[left].leaf() {
            let moved = self.nodes[left]
                .children
                .pop()
                .expect("internal donor has children");
            self.nodes[child].children.insert(0, moved);
        }
    }

    /// Mirror of [`Self::rotate_right`]: borrows the right sibling's first
    /// entry through the parent separator.
    fn rotate_left(&mut self, parent: NodeId, idx: usize) {
        let right = self.nodes[parent].children[idx + 1];
        let child = self.nodes[parent].children[idx];

        let from_right = self.nodes[right].entries.remove(0);
        let sep = std::mem::replace(&mut self.nodes[parent].entries[idx], from_right);
        self.nodes[child].entries.push(sep);
        if !self.nodes[right].leaf() {
            let moved = self.nodes[right].children.remove(0);
            self.nodes[child].children.push(moved);
        }
    }

    /// Merges `children[idx]` and `children[idx + 1]` around the separator
    /// `entries[idx]`; returns the id of the merged (left) child.
    fn merge_children(&mut self, parent: NodeId, idx: usize) -> NodeId {
        let left = self.nodes[parent].children[idx];
        let right = self.nodes[parent].children[idx + 1];
        let sep = self.nodes[parent].entries.remove(idx);
        self.nodes[parent].children.remove(idx + 1);

        let (right_entries, right_children) = {
            let r = &mut self.nodes[right];
            (std::mem::take(&mut r.entries), std::mem::take(&mut r.children))
        };
        let l = &mut self.nodes[left];
        l.entries.push(sep);
        l.entries.extend(right_entries);
        l.children.extend(right_children);
        self.free_node(right);
        left
    }

    /// Collapses an emptied internal root onto its only child; drops an
    /// emptied leaf root entirely.
    fn shrink_root(&mut self) {
        let Some(root) = self.root else {
            return;
        };
        if !self.nodes[root].entries.is_empty() {
            return;
        }
        if self.nodes[root].leaf() {
            self.free_node(root);
            self.root = None;
        } else {
            let only = self.nodes[root].children[0];
            self.free_node(root);
            self.root = Some(only);
        }
    }
}

/// Outcome of pre-splitting on the way down: either the pushed-up median
/// matched the key, or the descent continues into a child.
enum DescendFor {
    Found(usize),
    Child(NodeId),
}
