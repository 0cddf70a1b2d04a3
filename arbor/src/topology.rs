use crate::{ChartError, DispatchError};

/// Identifier of a state within one topology.
///
/// Identifiers are handed out by a builder in declaration order and index an
/// arena; comparing two states is integer equality. An identifier is only
/// meaningful to the topology whose builder produced it.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StateId(u32);

impl StateId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Node {
    name: String,
    parent: Option<StateId>,
    /// Declaration order; no semantic effect, kept for diagnostics.
    children: Vec<StateId>,
}

/// The immutable parent/child tree of states.
///
/// Built once by a [`TopologyBuilder`], then shared freely. All runtime
/// structure (ancestor chains, transition paths) is derived from it.
#[derive(Debug)]
pub struct Topology {
    nodes: Vec<Node>,
}

impl Topology {
    /// Number of states in the topology.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `state` was allocated by this topology's builder.
    pub fn contains(&self, state: StateId) -> bool {
        state.index() < self.nodes.len()
    }

    /// Diagnostic name given at declaration.
    pub fn name(&self, state: StateId) -> &str {
        &self.nodes[state.index()].name
    }

    /// The immediately enclosing state, if any.
    pub fn parent(&self, state: StateId) -> Option<StateId> {
        self.nodes[state.index()].parent
    }

    /// Immediate substates in declaration order.
    pub fn children(&self, state: StateId) -> &[StateId] {
        &self.nodes[state.index()].children
    }

    /// Number of states on the path from `state` to its root, inclusive.
    pub fn depth(&self, state: StateId) -> usize {
        self.path_to_root(state).len()
    }

    /// The sequence `⟨state, parent(state), …, root⟩`.
    pub fn path_to_root(&self, state: StateId) -> Vec<StateId> {
        let mut path = vec![state];
        let mut node = state;
        while let Some(parent) = self.parent(node) {
            path.push(parent);
            node = parent;
        }
        path
    }

    /// Least common ancestor of two root-ward paths: the first node of
    /// `path1` that also appears in `path2`.
    ///
    /// Walking `path1` leaf-first yields the deepest common node, because an
    /// ancestor of any shared node is itself shared and appears later. Fails
    /// when the paths belong to disconnected trees, which is only reachable
    /// through a misdeclared chart or a foreign transition target.
    pub fn lca(&self, path1: &[StateId], path2: &[StateId]) -> Result<StateId, DispatchError> {
        path1
            .iter()
            .copied()
            .find(|node| path2.contains(node))
            .ok_or_else(|| {
                let source = path2.first().copied().unwrap_or_else(|| StateId::new(0));
                let target = path1.first().copied().unwrap_or_else(|| StateId::new(0));
                DispatchError::no_common_ancestor(self, source, target)
            })
    }

    /// Whether `ancestor` strictly encloses `descendant`.
    pub fn is_proper_ancestor(&self, ancestor: StateId, descendant: StateId) -> bool {
        if !self.contains(ancestor) || !self.contains(descendant) {
            return false;
        }
        let mut node = descendant;
        while let Some(parent) = self.parent(node) {
            if parent == ancestor {
                return true;
            }
            node = parent;
        }
        false
    }
}

/// Records state declarations and parent/child relationships, then produces
/// an immutable [`Topology`].
///
/// The builder accepts inconsistent input and defers validation to
/// [`finish`](Self::finish): nesting the same child twice is
/// [`ChartError::MultipleParents`], a parent loop is [`ChartError::Cycle`].
/// Nothing prevents declaring several roots; the result is then a forest and
/// transitions across its trees fault at dispatch.
#[derive(Default)]
pub struct TopologyBuilder {
    names: Vec<String>,
    links: Vec<(StateId, StateId)>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a state, returning its identifier.
    pub fn state(&mut self, name: impl Into<String>) -> StateId {
        let id = StateId::new(self.names.len());
        self.names.push(name.into());
        id
    }

    /// Record `child` as an immediate substate of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either identifier was not allocated by this builder.
    pub fn nest(&mut self, parent: StateId, child: StateId) {
        assert!(
            parent.index() < self.names.len() && child.index() < self.names.len(),
            "nest() requires identifiers allocated by this builder"
        );
        self.links.push((parent, child));
    }

    /// Validate the recorded declarations and produce the topology.
    pub fn finish(self) -> Result<Topology, ChartError> {
        let mut parents: Vec<Option<StateId>> = vec![None; self.names.len()];
        let mut children: Vec<Vec<StateId>> = vec![Vec::new(); self.names.len()];

        for (parent, child) in self.links {
            if let Some(first) = parents[child.index()] {
                return Err(ChartError::MultipleParents {
                    child: self.names[child.index()].clone(),
                    first: self.names[first.index()].clone(),
                    second: self.names[parent.index()].clone(),
                });
            }
            parents[child.index()] = Some(parent);
            children[parent.index()].push(child);
        }

        // A parent chain longer than the state count must revisit a node.
        for start in 0..self.names.len() {
            let mut node = StateId::new(start);
            let mut steps = 0;
            while let Some(parent) = parents[node.index()] {
                steps += 1;
                if steps > self.names.len() {
                    return Err(ChartError::Cycle {
                        state: self.names[start].clone(),
                    });
                }
                node = parent;
            }
        }

        let nodes = self
            .names
            .into_iter()
            .zip(parents)
            .zip(children)
            .map(|((name, parent), children)| Node {
                name,
                parent,
                children,
            })
            .collect();

        Ok(Topology { nodes })
    }
}
