use tracing::{debug, warn};

use crate::{ChartError, DispatchError, Event, Response, StateId, Topology, TopologyBuilder};

/// Entry action: may designate an initial child, or return the invoked
/// state's own identifier to stop the entry chase.
pub type EntryFn<S> = Box<dyn Fn(&mut S) -> StateId>;

/// Exit action.
pub type ExitFn<S> = Box<dyn Fn(&mut S)>;

/// Event handler bound to one event-variant tag.
pub type HandlerFn<E, S> = Box<dyn Fn(&E, &mut S) -> Response>;

struct Actions<E: Event, S> {
    entry: Option<EntryFn<S>>,
    exit: Option<ExitFn<S>>,
    /// Flat table in declaration order; first matching tag wins.
    handlers: Vec<(E::Tag, HandlerFn<E, S>)>,
}

impl<E: Event, S> Default for Actions<E, S> {
    fn default() -> Self {
        Self {
            entry: None,
            exit: None,
            handlers: Vec::new(),
        }
    }
}

/// Declares a blocking statechart: states, nesting, actions, and handler
/// bindings, validated against a closed event alphabet.
///
/// Identifiers are allocated before actions are attached, so a handler or
/// entry closure can capture any state of the chart as its target, including
/// states declared after it.
pub struct ChartBuilder<E: Event, S> {
    topology: TopologyBuilder,
    alphabet: Vec<E::Tag>,
    actions: Vec<Actions<E, S>>,
}

impl<E: Event, S> ChartBuilder<E, S> {
    /// Start a chart over the given closed set of event-variant tags.
    pub fn new(alphabet: impl IntoIterator<Item = E::Tag>) -> Self {
        Self {
            topology: TopologyBuilder::new(),
            alphabet: alphabet.into_iter().collect(),
            actions: Vec::new(),
        }
    }

    /// Declare a state, returning its identifier.
    pub fn state(&mut self, name: impl Into<String>) -> StateId {
        self.actions.push(Actions::default());
        self.topology.state(name)
    }

    /// Record `child` as an immediate substate of `parent`.
    pub fn nest(&mut self, parent: StateId, child: StateId) {
        self.topology.nest(parent, child);
    }

    /// Attach the entry action of `state`.
    pub fn entry(&mut self, state: StateId, action: impl Fn(&mut S) -> StateId + 'static) {
        self.actions[state.index()].entry = Some(Box::new(action));
    }

    /// Attach the exit action of `state`.
    pub fn exit(&mut self, state: StateId, action: impl Fn(&mut S) + 'static) {
        self.actions[state.index()].exit = Some(Box::new(action));
    }

    /// Bind a handler for the event variant identified by `tag`.
    pub fn on(
        &mut self,
        state: StateId,
        tag: E::Tag,
        handler: impl Fn(&E, &mut S) -> Response + 'static,
    ) {
        self.actions[state.index()].handlers.push((tag, Box::new(handler)));
    }

    /// Validate the declarations and produce the immutable chart.
    pub fn finish(self) -> Result<Chart<E, S>, ChartError> {
        let topology = self.topology.finish()?;
        for (index, actions) in self.actions.iter().enumerate() {
            for (tag, _) in &actions.handlers {
                if !self.alphabet.contains(tag) {
                    return Err(ChartError::UnknownEvent {
                        state: topology.name(StateId::new(index)).to_owned(),
                        tag: format!("{tag:?}"),
                    });
                }
            }
        }
        Ok(Chart {
            topology,
            actions: self.actions,
        })
    }
}

/// An immutable statechart for the blocking flavor.
///
/// The chart owns the topology and every action closure; it holds no runtime
/// state of its own. Dispatch threads an external state value of type `S`
/// through handlers, entries, and exits.
pub struct Chart<E: Event, S> {
    topology: Topology,
    actions: Vec<Actions<E, S>>,
}

impl<E: Event, S> std::fmt::Debug for Chart<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chart").field("topology", &self.topology).finish()
    }
}

impl<E: Event, S> Chart<E, S> {
    /// The underlying state tree.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Run the entry chase from `root` down to the initial leaf.
    pub fn initial_entries(&self, root: StateId, external: &mut S) -> Result<StateId, DispatchError> {
        self.chase(root, external)
    }

    /// Handle one event, returning the new leaf.
    ///
    /// Walks upward from `leaf` until a state claims the event, interprets
    /// the handler's response, and sequences exits and entries around the
    /// least common ancestor. Sentinel outcomes leave the leaf unchanged;
    /// configuration faults surface as errors with no recovery of callbacks
    /// already run.
    pub fn dispatch(&self, leaf: StateId, event: &E, external: &mut S) -> Result<StateId, DispatchError> {
        let mut handling_path = Vec::new();
        let mut current = leaf;
        loop {
            handling_path.push(current);
            let response = match self.handler_for(current, event.tag()) {
                Some(handler) => handler(event, external),
                None => Response::Unhandled,
            };
            match response {
                Response::Unhandled => match self.topology.parent(current) {
                    Some(parent) => current = parent,
                    None => {
                        debug!(tag = ?event.tag(), state = self.topology.name(current), "event unhandled, reached root");
                        return Ok(leaf);
                    }
                },
                Response::NoTransition => {
                    debug!(state = self.topology.name(current), "no transition");
                    return Ok(leaf);
                }
                Response::SelfTransition => {
                    debug!(state = self.topology.name(current), "self-transition");
                    for &node in &handling_path {
                        self.run_exit(node, external);
                    }
                    return self.chase(current, external);
                }
                Response::Transition(target) => {
                    return self.transition(leaf, current, target, external);
                }
            }
        }
    }

    fn transition(
        &self,
        leaf: StateId,
        handling: StateId,
        target: StateId,
        external: &mut S,
    ) -> Result<StateId, DispatchError> {
        if !self.topology.contains(target) {
            return Err(DispatchError::no_common_ancestor(&self.topology, handling, target));
        }

        // A leaf handler naming its own state as the target re-enters it
        // through the parent rather than doing nothing.
        if target == leaf && handling == leaf {
            debug!(state = self.topology.name(leaf), "external transition to self");
            self.run_exit(leaf, external);
            return self.chase(leaf, external);
        }

        let source_path = self.topology.path_to_root(handling);
        let target_path = self.topology.path_to_root(target);
        let lca = self.topology.lca(&target_path, &source_path)?;
        debug!(
            source = self.topology.name(handling),
            target = self.topology.name(target),
            lca = self.topology.name(lca),
            "transition"
        );

        // Exits from the original leaf up to, but excluding, the ancestor.
        let mut node = leaf;
        while node != lca {
            self.run_exit(node, external);
            match self.topology.parent(node) {
                Some(parent) => node = parent,
                None => break,
            }
        }

        // Entry path strictly below the ancestor, down to the target.
        let entry_path: Vec<StateId> = target_path
            .iter()
            .rev()
            .skip_while(|&&n| n != lca)
            .skip(1)
            .copied()
            .collect();
        let Some(&last_planned) = entry_path.last() else {
            // Exited to an ancestor; no entries to run.
            return Ok(node);
        };

        let mut produced = entry_path[0];
        for (index, &planned) in entry_path.iter().enumerate() {
            if planned != produced {
                let culprit = entry_path[index - 1];
                warn!(
                    state = self.topology.name(culprit),
                    designated = self.topology.name(produced),
                    "entry disagrees with the planned path"
                );
                return Err(DispatchError::entry_disagrees(&self.topology, culprit, produced));
            }
            produced = self.run_entry(planned, external);
        }

        if produced == last_planned {
            Ok(produced)
        } else if self.topology.is_proper_ancestor(last_planned, produced) {
            self.chase(produced, external)
        } else {
            Err(DispatchError::entry_disagrees(&self.topology, last_planned, produced))
        }
    }

    /// Repeatedly invoke entry actions until one returns the state it was
    /// invoked on, descending into initial children. Never exits a state.
    fn chase(&self, from: StateId, external: &mut S) -> Result<StateId, DispatchError> {
        let mut current = from;
        loop {
            let next = self.run_entry(current, external);
            if next == current {
                return Ok(current);
            }
            if !self.topology.is_proper_ancestor(current, next) {
                warn!(
                    state = self.topology.name(current),
                    "entry designated a state outside its own subtree"
                );
                return Err(DispatchError::entry_disagrees(&self.topology, current, next));
            }
            current = next;
        }
    }

    /// A missing entry action is a fixed point.
    fn run_entry(&self, state: StateId, external: &mut S) -> StateId {
        match &self.actions[state.index()].entry {
            Some(entry) => entry(external),
            None => state,
        }
    }

    fn run_exit(&self, state: StateId, external: &mut S) {
        if let Some(exit) = &self.actions[state.index()].exit {
            exit(external);
        }
    }

    fn handler_for(&self, state: StateId, tag: E::Tag) -> Option<&HandlerFn<E, S>> {
        self.actions[state.index()]
            .handlers
            .iter()
            .find(|(bound, _)| *bound == tag)
            .map(|(_, handler)| handler)
    }
}
