//! Arena-allocated search tree.
//!
//! Nodes live in one `Vec` and refer to each other by index, so a whole tree
//! is dropped at once when it is replaced.

use crate::node::Visited;

/// Index into the node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Arena of nodes with a movable root.
///
/// Re-rooting leaves the abandoned nodes in the arena; they are freed when
/// the tree is replaced.
#[derive(Debug)]
pub struct Tree<N> {
    nodes: Vec<N>,
    root: NodeId,
}

impl<N> Tree<N> {
    /// Create a tree holding a single root node.
    pub fn new(root: N) -> Self {
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    /// # Panics
    /// Panics if the NodeId does not belong to this tree.
    pub fn get(&self, id: NodeId) -> &N {
        &self.nodes[id.0]
    }

    /// # Panics
    /// Panics if the NodeId does not belong to this tree.
    pub fn get_mut(&mut self, id: NodeId) -> &mut N {
        &mut self.nodes[id.0]
    }

    /// Add a new node to the tree, returning its ID.
    pub fn add(&mut self, node: N) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Make `id` the root. Nodes above it become unreachable.
    pub fn set_root(&mut self, id: NodeId) {
        debug_assert!(id.0 < self.nodes.len());
        self.root = id;
    }

    /// Number of nodes allocated, reachable or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<N: Visited> Tree<N> {
    /// Visits recorded at the current root.
    pub fn root_visits(&self) -> u32 {
        self.get(self.root).visits()
    }
}
