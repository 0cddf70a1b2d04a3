use core::future::Future;
use core::pin::Pin;

use tracing::{debug, warn};

use crate::{ChartError, DispatchError, Event, Response, StateId, Topology, TopologyBuilder};

/// Future type produced by awaitable actions.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T>>>;

/// Entry action: may designate an initial child, or resolve to the invoked
/// state's own identifier to stop the entry chase.
pub type EntryFn<S> = Box<dyn Fn(S) -> BoxFuture<StateId>>;

/// Exit action.
pub type ExitFn<S> = Box<dyn Fn(S) -> BoxFuture<()>>;

/// Event handler bound to one event-variant tag.
pub type HandlerFn<E, S> = Box<dyn Fn(E, S) -> BoxFuture<Response>>;

struct Actions<E: Event, S> {
    entry: Option<EntryFn<S>>,
    exit: Option<ExitFn<S>>,
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

/// Declares an awaitable statechart.
///
/// Actions receive clones of the external state handle and of the event, so
/// their futures are free of borrows; `S` is expected to be a cheap handle
/// such as `Rc<RefCell<_>>`.
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
    pub fn entry(&mut self, state: StateId, action: impl Fn(S) -> BoxFuture<StateId> + 'static) {
        self.actions[state.index()].entry = Some(Box::new(action));
    }

    /// Attach the exit action of `state`.
    pub fn exit(&mut self, state: StateId, action: impl Fn(S) -> BoxFuture<()> + 'static) {
        self.actions[state.index()].exit = Some(Box::new(action));
    }

    /// Bind a handler for the event variant identified by `tag`.
    pub fn on(
        &mut self,
        state: StateId,
        tag: E::Tag,
        handler: impl Fn(E, S) -> BoxFuture<Response> + 'static,
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

/// An immutable statechart for the awaitable flavor.
///
/// The dispatcher awaits entry, exit, and handler futures one at a time, in
/// the exact order the blocking flavor would call them; those awaits are its
/// only suspension points. Path computation and handler search never
/// suspend, and no two callbacks of one dispatch are reordered, whatever the
/// surrounding scheduler interleaves between them.
pub struct Chart<E: Event, S> {
    topology: Topology,
    actions: Vec<Actions<E, S>>,
}

impl<E: Event, S> std::fmt::Debug for Chart<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chart").field("topology", &self.topology).finish()
    }
}

impl<E, S> Chart<E, S>
where
    E: Event + Clone,
    S: Clone,
{
    /// The underlying state tree.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Run the entry chase from `root` down to the initial leaf.
    pub async fn initial_entries(&self, root: StateId, external: &S) -> Result<StateId, DispatchError> {
        self.chase(root, external).await
    }

    /// Handle one event, returning the new leaf.
    ///
    /// If the returned future is dropped mid-dispatch the machine is left in
    /// the observable intermediate state; no compensation is attempted.
    pub async fn dispatch(&self, leaf: StateId, event: &E, external: &S) -> Result<StateId, DispatchError> {
        let mut handling_path = Vec::new();
        let mut current = leaf;
        loop {
            handling_path.push(current);
            let response = match self.handler_for(current, event.tag()) {
                Some(handler) => handler(event.clone(), external.clone()).await,
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
                        self.run_exit(node, external).await;
                    }
                    return self.chase(current, external).await;
                }
                Response::Transition(target) => {
                    return self.transition(leaf, current, target, external).await;
                }
            }
        }
    }

    async fn transition(
        &self,
        leaf: StateId,
        handling: StateId,
        target: StateId,
        external: &S,
    ) -> Result<StateId, DispatchError> {
        if !self.topology.contains(target) {
            return Err(DispatchError::no_common_ancestor(&self.topology, handling, target));
        }

        // A leaf handler naming its own state as the target re-enters it
        // through the parent rather than doing nothing.
        if target == leaf && handling == leaf {
            debug!(state = self.topology.name(leaf), "external transition to self");
            self.run_exit(leaf, external).await;
            return self.chase(leaf, external).await;
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
            self.run_exit(node, external).await;
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
            produced = self.run_entry(planned, external).await;
        }

        if produced == last_planned {
            Ok(produced)
        } else if self.topology.is_proper_ancestor(last_planned, produced) {
            self.chase(produced, external).await
        } else {
            Err(DispatchError::entry_disagrees(&self.topology, last_planned, produced))
        }
    }

    async fn chase(&self, from: StateId, external: &S) -> Result<StateId, DispatchError> {
        let mut current = from;
        loop {
            let next = self.run_entry(current, external).await;
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

    async fn run_entry(&self, state: StateId, external: &S) -> StateId {
        match &self.actions[state.index()].entry {
            Some(entry) => entry(external.clone()).await,
            None => state,
        }
    }

    async fn run_exit(&self, state: StateId, external: &S) {
        if let Some(exit) = &self.actions[state.index()].exit {
            exit(external.clone()).await;
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
