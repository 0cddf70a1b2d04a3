use thiserror::Error;

use crate::{StateId, Topology};

/// Declaration-time errors. A chart that fails to build cannot be used; no
/// partially constructed topology escapes the builder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChartError {
    /// The same child was nested under two parents.
    #[error("state '{child}' is nested under both '{first}' and '{second}'")]
    MultipleParents {
        child: String,
        first: String,
        second: String,
    },

    /// The recorded parent links contain a cycle.
    #[error("parent links of state '{state}' form a cycle")]
    Cycle { state: String },

    /// A handler was bound to an event tag outside the declared alphabet.
    #[error("state '{state}' binds a handler for '{tag}', which is not in the declared event set")]
    UnknownEvent { state: String, tag: String },

    /// A scoped state was declared without an entry action. Only the entry
    /// action can produce the state's context, so scoped charts require one
    /// on every state.
    #[error("scoped state '{state}' was declared without an entry action")]
    MissingEntry { state: String },
}

/// Fatal faults raised while dispatching an event.
///
/// Sentinel outcomes (event unhandled, no transition, self-transition) are
/// not errors; these variants indicate a misconfigured chart. Callbacks that
/// already ran when the fault surfaced stay run; the dispatcher makes no
/// attempt to rewind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The handler returned a target that shares no ancestor with the
    /// handling state, i.e. it lives in a different tree.
    #[error("no common ancestor between '{from}' and transition target '{target}'")]
    NoCommonAncestor { from: String, target: String },

    /// An entry action designated a state that disagrees with the planned
    /// entry path, or one outside its own subtree.
    #[error("entry action of '{state}' designated '{designated}', which disagrees with the entry path")]
    EntryDisagreesWithPath { state: String, designated: String },
}

impl DispatchError {
    pub(crate) fn no_common_ancestor(topology: &Topology, source: StateId, target: StateId) -> Self {
        let target = if topology.contains(target) {
            topology.name(target).to_owned()
        } else {
            format!("state #{}", target.index())
        };
        Self::NoCommonAncestor {
            from: topology.name(source).to_owned(),
            target,
        }
    }

    pub(crate) fn entry_disagrees(topology: &Topology, state: StateId, designated: StateId) -> Self {
        let designated = if topology.contains(designated) {
            topology.name(designated).to_owned()
        } else {
            format!("state #{}", designated.index())
        };
        Self::EntryDisagreesWithPath {
            state: topology.name(state).to_owned(),
            designated,
        }
    }
}
