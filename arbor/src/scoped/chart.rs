use crate::{ChartError, Event, Response, StateId, Topology, TopologyBuilder};

/// Entry action: receives the enclosing context and produces the designated
/// initial child (or the state's own identifier) together with the entered
/// state's context.
pub type EntryFn<C> = Box<dyn Fn(&C) -> (StateId, C)>;

/// Exit action; consumes the state's stored context.
pub type ExitFn<C> = Box<dyn Fn(C)>;

/// Event handler; receives the handling state's stored context.
pub type HandlerFn<E, C> = Box<dyn Fn(&E, &mut C) -> Response>;

pub(crate) struct Actions<E: Event, C> {
    pub(crate) entry: EntryFn<C>,
    pub(crate) exit: Option<ExitFn<C>>,
    pub(crate) handlers: Vec<(E::Tag, HandlerFn<E, C>)>,
}

struct ActionsDecl<E: Event, C> {
    entry: Option<EntryFn<C>>,
    exit: Option<ExitFn<C>>,
    handlers: Vec<(E::Tag, HandlerFn<E, C>)>,
}

impl<E: Event, C> Default for ActionsDecl<E, C> {
    fn default() -> Self {
        Self {
            entry: None,
            exit: None,
            handlers: Vec::new(),
        }
    }
}

/// Declares a scoped statechart.
///
/// Unlike the other flavors, every scoped state must be given an entry
/// action: the entry is the only producer of the state's context.
pub struct ChartBuilder<E: Event, C> {
    topology: TopologyBuilder,
    alphabet: Vec<E::Tag>,
    actions: Vec<ActionsDecl<E, C>>,
}

impl<E: Event, C> ChartBuilder<E, C> {
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
        self.actions.push(ActionsDecl::default());
        self.topology.state(name)
    }

    /// Record `child` as an immediate substate of `parent`.
    pub fn nest(&mut self, parent: StateId, child: StateId) {
        self.topology.nest(parent, child);
    }

    /// Attach the entry action of `state`. Required for every scoped state.
    pub fn entry(&mut self, state: StateId, action: impl Fn(&C) -> (StateId, C) + 'static) {
        self.actions[state.index()].entry = Some(Box::new(action));
    }

    /// Attach the exit action of `state`.
    pub fn exit(&mut self, state: StateId, action: impl Fn(C) + 'static) {
        self.actions[state.index()].exit = Some(Box::new(action));
    }

    /// Bind a handler for the event variant identified by `tag`.
    pub fn on(
        &mut self,
        state: StateId,
        tag: E::Tag,
        handler: impl Fn(&E, &mut C) -> Response + 'static,
    ) {
        self.actions[state.index()].handlers.push((tag, Box::new(handler)));
    }

    /// Validate the declarations and produce the immutable chart.
    pub fn finish(self) -> Result<Chart<E, C>, ChartError> {
        let topology = self.topology.finish()?;
        let mut actions = Vec::with_capacity(self.actions.len());
        for (index, decl) in self.actions.into_iter().enumerate() {
            for (tag, _) in &decl.handlers {
                if !self.alphabet.contains(tag) {
                    return Err(ChartError::UnknownEvent {
                        state: topology.name(StateId::new(index)).to_owned(),
                        tag: format!("{tag:?}"),
                    });
                }
            }
            let entry = decl.entry.ok_or_else(|| ChartError::MissingEntry {
                state: topology.name(StateId::new(index)).to_owned(),
            })?;
            actions.push(Actions {
                entry,
                exit: decl.exit,
                handlers: decl.handlers,
            });
        }
        Ok(Chart { topology, actions })
    }
}

/// An immutable statechart for the scoped flavor.
pub struct Chart<E: Event, C> {
    topology: Topology,
    actions: Vec<Actions<E, C>>,
}

impl<E: Event, C> std::fmt::Debug for Chart<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chart").field("topology", &self.topology).finish()
    }
}

impl<E: Event, C> Chart<E, C> {
    /// The underlying state tree.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub(crate) fn entry_of(&self, state: StateId) -> &EntryFn<C> {
        &self.actions[state.index()].entry
    }

    pub(crate) fn exit_of(&self, state: StateId) -> Option<&ExitFn<C>> {
        self.actions[state.index()].exit.as_ref()
    }

    pub(crate) fn handler_for(&self, state: StateId, tag: E::Tag) -> Option<&HandlerFn<E, C>> {
        self.actions[state.index()]
            .handlers
            .iter()
            .find(|(bound, _)| *bound == tag)
            .map(|(_, handler)| handler)
    }
}
