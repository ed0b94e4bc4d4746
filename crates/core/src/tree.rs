//! Prefix tree construction.
//!
//! The tree is an owned recursive structure: every internal node owns its
//! children, there is no sharing and there are no back-pointers. Weights are
//! only needed while building, so they live in the builder's queue rather
//! than in the nodes.
//!
//! # Tie-breaking
//!
//! Nodes of equal weight leave the queue in insertion order. Leaves are
//! inserted in ascending symbol order; each merged node takes the next
//! insertion number. The first node removed becomes the left child. This
//! makes the tree, and so the encoded output, reproducible byte-for-byte.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::frequency::ByteFrequencyTable;

/// A node of the prefix tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixTreeNode {
    Leaf {
        symbol: u8,
    },
    /// `right` is only absent for the synthetic root of a one-symbol tree.
    Internal {
        left: Box<PrefixTreeNode>,
        right: Option<Box<PrefixTreeNode>>,
    },
}

impl PrefixTreeNode {
    pub fn internal(left: PrefixTreeNode, right: Option<PrefixTreeNode>) -> Self {
        PrefixTreeNode::Internal {
            left: Box::new(left),
            right: right.map(Box::new),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, PrefixTreeNode::Leaf { .. })
    }

    /// Follow one edge: `false` goes left, `true` goes right.
    ///
    /// Returns `None` from a leaf or when the branch is absent.
    #[inline]
    pub fn child(&self, bit: bool) -> Option<&PrefixTreeNode> {
        match self {
            PrefixTreeNode::Leaf { .. } => None,
            PrefixTreeNode::Internal { left, right } => {
                if bit {
                    right.as_deref()
                } else {
                    Some(left)
                }
            }
        }
    }

    fn leaf_count(&self) -> usize {
        match self {
            PrefixTreeNode::Leaf { .. } => 1,
            PrefixTreeNode::Internal { left, right } => {
                left.leaf_count() + right.as_ref().map_or(0, |r| r.leaf_count())
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            PrefixTreeNode::Leaf { .. } => 0,
            PrefixTreeNode::Internal { left, right } => {
                1 + left.depth().max(right.as_ref().map_or(0, |r| r.depth()))
            }
        }
    }
}

/// A prefix tree whose root is always an internal node.
///
/// Keeping the root internal guarantees every symbol has a code of at least
/// one bit, even when only one symbol is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixTree {
    root: PrefixTreeNode,
}

impl PrefixTree {
    /// Build the optimal prefix tree for `frequencies`.
    ///
    /// Returns `None` when no symbol has a non-zero count.
    pub fn from_frequencies(frequencies: &ByteFrequencyTable) -> Option<Self> {
        // Nodes are parked in `slots` by insertion number; the heap only
        // orders (weight, insertion number) keys.
        let mut slots: Vec<Option<PrefixTreeNode>> = Vec::with_capacity(511);
        let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::with_capacity(256);

        for (symbol, count) in frequencies.iter() {
            heap.push(Reverse((count, slots.len())));
            slots.push(Some(PrefixTreeNode::Leaf { symbol }));
        }

        while heap.len() > 1 {
            let (Some(Reverse(first)), Some(Reverse(second))) = (heap.pop(), heap.pop()) else {
                break;
            };
            let (left_weight, left_slot) = first;
            let (right_weight, right_slot) = second;
            let left = slots[left_slot].take()?;
            let right = slots[right_slot].take()?;

            heap.push(Reverse((left_weight + right_weight, slots.len())));
            slots.push(Some(PrefixTreeNode::internal(left, Some(right))));
        }

        let Reverse((_, root_slot)) = heap.pop()?;
        let root = slots[root_slot].take()?;

        let root = if root.is_leaf() {
            PrefixTreeNode::internal(root, None)
        } else {
            root
        };

        log::debug!(
            "built prefix tree: {} leaves, depth {}",
            root.leaf_count(),
            root.depth()
        );

        Some(Self { root })
    }

    /// Wrap an already-built root. Returns `None` if `root` is a leaf.
    pub fn from_root(root: PrefixTreeNode) -> Option<Self> {
        if root.is_leaf() {
            None
        } else {
            Some(Self { root })
        }
    }

    pub fn root(&self) -> &PrefixTreeNode {
        &self.root
    }

    /// Number of leaves (distinct symbols).
    pub fn leaf_count(&self) -> usize {
        self.root.leaf_count()
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(symbol: u8) -> PrefixTreeNode {
        PrefixTreeNode::Leaf { symbol }
    }

    #[test]
    fn test_empty_frequencies() {
        assert!(PrefixTree::from_frequencies(&ByteFrequencyTable::new()).is_none());
    }

    #[test]
    fn test_single_symbol_wrapped() {
        let tree = PrefixTree::from_frequencies(&ByteFrequencyTable::from_bytes(b"zzzz")).unwrap();
        assert_eq!(tree.root(), &PrefixTreeNode::internal(leaf(b'z'), None));
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_two_symbols_lighter_goes_left() {
        let tree = PrefixTree::from_frequencies(&ByteFrequencyTable::from_bytes(b"AAAB")).unwrap();
        assert_eq!(
            tree.root(),
            &PrefixTreeNode::internal(leaf(b'B'), Some(leaf(b'A')))
        );
    }

    #[test]
    fn test_ties_break_by_insertion_order() {
        // All weights equal: lower symbols are inserted first and merge first.
        let tree = PrefixTree::from_frequencies(&ByteFrequencyTable::from_bytes(b"abcd")).unwrap();
        let expected = PrefixTreeNode::internal(
            PrefixTreeNode::internal(leaf(b'a'), Some(leaf(b'b'))),
            Some(PrefixTreeNode::internal(leaf(b'c'), Some(leaf(b'd')))),
        );
        assert_eq!(tree.root(), &expected);
    }

    #[test]
    fn test_skewed_frequencies() {
        let mut counts = [0u64; 256];
        counts[0] = 1;
        counts[1] = 2;
        counts[2] = 4;
        counts[3] = 8;
        let tree = PrefixTree::from_frequencies(&ByteFrequencyTable::from_counts(counts)).unwrap();
        assert_eq!(tree.leaf_count(), 4);
        assert_eq!(tree.depth(), 3);
    }

    #[test]
    fn test_full_alphabet() {
        let data: Vec<u8> = (0..=255).collect();
        let tree = PrefixTree::from_frequencies(&ByteFrequencyTable::from_bytes(&data)).unwrap();
        assert_eq!(tree.leaf_count(), 256);
        assert_eq!(tree.depth(), 8);
    }

    #[test]
    fn test_deterministic() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let freqs = ByteFrequencyTable::from_bytes(data);
        assert_eq!(
            PrefixTree::from_frequencies(&freqs),
            PrefixTree::from_frequencies(&freqs)
        );
    }

    #[test]
    fn test_child_navigation() {
        let tree = PrefixTree::from_frequencies(&ByteFrequencyTable::from_bytes(b"q")).unwrap();
        assert_eq!(tree.root().child(false), Some(&leaf(b'q')));
        assert_eq!(tree.root().child(true), None);
        assert_eq!(leaf(1).child(false), None);
        assert!(PrefixTree::from_root(leaf(1)).is_none());
    }
}
