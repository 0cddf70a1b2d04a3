use tracing::{debug, warn};

use crate::{DispatchError, Event, Response, StateId};

use super::Chart;

/// A running scoped statechart instance.
///
/// Besides the current leaf, the machine stores the context most recently
/// produced by each active state's entry, keyed by state identity. A context
/// is dropped when its state exits; contexts of states that a transition
/// does not touch are left in place, so any shared components (`Rc` and the
/// like) keep their object identity for as long as the state stays active.
pub struct Machine<'c, E: Event, C> {
    chart: &'c Chart<E, C>,
    root: StateId,
    /// Fed to a root's entry in place of a parent context.
    seed: C,
    leaf: Option<StateId>,
    contexts: Vec<Option<C>>,
}

impl<'c, E: Event, C> Machine<'c, E, C> {
    /// Create a machine that will start from `root` when first used. `seed`
    /// is the externally supplied context handed to the root's entry.
    pub fn new(chart: &'c Chart<E, C>, root: StateId, seed: C) -> Self {
        let contexts = (0..chart.topology().len()).map(|_| None).collect();
        Self {
            chart,
            root,
            seed,
            leaf: None,
            contexts,
        }
    }

    /// Explicitly run the initial entry chase. A no-op when already
    /// initialized.
    pub fn init(&mut self) -> Result<StateId, DispatchError> {
        match self.leaf {
            Some(leaf) => Ok(leaf),
            None => {
                let leaf = self.chase(self.root, None)?;
                self.leaf = Some(leaf);
                Ok(leaf)
            }
        }
    }

    /// Handle an event, initializing the machine first if needed.
    ///
    /// The handler receives the handling state's stored context, which it
    /// may mutate in place before any exit action runs.
    pub fn dispatch(&mut self, event: &E) -> Result<StateId, DispatchError> {
        let leaf = self.init()?;
        let topology = self.chart.topology();

        let mut handling_path = Vec::new();
        let mut current = leaf;
        loop {
            handling_path.push(current);
            let response = match self.chart.handler_for(current, event.tag()) {
                Some(handler) => {
                    let context = self.contexts[current.index()]
                        .as_mut()
                        .expect("active state holds a context");
                    handler(event, context)
                }
                None => Response::Unhandled,
            };
            match response {
                Response::Unhandled => match topology.parent(current) {
                    Some(parent) => current = parent,
                    None => {
                        debug!(tag = ?event.tag(), state = topology.name(current), "event unhandled, reached root");
                        return Ok(leaf);
                    }
                },
                Response::NoTransition => {
                    debug!(state = topology.name(current), "no transition");
                    return Ok(leaf);
                }
                Response::SelfTransition => {
                    debug!(state = topology.name(current), "self-transition");
                    for &node in &handling_path {
                        self.run_exit(node);
                    }
                    let leaf = self.chase(current, None)?;
                    self.leaf = Some(leaf);
                    return Ok(leaf);
                }
                Response::Transition(target) => {
                    let leaf = self.transition(leaf, current, target)?;
                    self.leaf = Some(leaf);
                    return Ok(leaf);
                }
            }
        }
    }

    /// The current leaf, or `None` before initialization.
    pub fn current(&self) -> Option<StateId> {
        self.leaf
    }

    /// The context most recently produced by `state`'s entry, while the
    /// state is active.
    pub fn context(&self, state: StateId) -> Option<&C> {
        self.contexts[state.index()].as_ref()
    }

    /// The chart this machine runs.
    pub fn chart(&self) -> &'c Chart<E, C> {
        self.chart
    }

    fn transition(
        &mut self,
        leaf: StateId,
        handling: StateId,
        target: StateId,
    ) -> Result<StateId, DispatchError> {
        let topology = self.chart.topology();
        if !topology.contains(target) {
            return Err(DispatchError::no_common_ancestor(topology, handling, target));
        }

        // A leaf handler naming its own state as the target re-enters it
        // through the parent rather than doing nothing.
        if target == leaf && handling == leaf {
            debug!(state = topology.name(leaf), "external transition to self");
            self.run_exit(leaf);
            return self.chase(leaf, None);
        }

        let source_path = topology.path_to_root(handling);
        let target_path = topology.path_to_root(target);
        let lca = topology.lca(&target_path, &source_path)?;
        debug!(
            source = topology.name(handling),
            target = topology.name(target),
            lca = topology.name(lca),
            "transition"
        );

        // Exits from the original leaf up to, but excluding, the ancestor.
        let mut node = leaf;
        while node != lca {
            self.run_exit(node);
            match topology.parent(node) {
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
                    state = topology.name(culprit),
                    designated = topology.name(produced),
                    "entry disagrees with the planned path"
                );
                return Err(DispatchError::entry_disagrees(topology, culprit, produced));
            }
            produced = self.run_entry(planned, None);
        }

        if produced == last_planned {
            Ok(produced)
        } else if topology.is_proper_ancestor(last_planned, produced) {
            self.chase(produced, Some(last_planned))
        } else {
            Err(DispatchError::entry_disagrees(topology, last_planned, produced))
        }
    }

    /// Repeatedly invoke entry actions until one returns the state it was
    /// invoked on. `entered` names the state whose freshly produced context
    /// feeds the first entry; `None` falls back to the starting state's
    /// parent (or the machine seed for a root).
    fn chase(&mut self, from: StateId, entered: Option<StateId>) -> Result<StateId, DispatchError> {
        let topology = self.chart.topology();
        let mut current = from;
        let mut entered = entered;
        loop {
            let next = self.run_entry(current, entered);
            if next == current {
                return Ok(current);
            }
            if !topology.is_proper_ancestor(current, next) {
                warn!(
                    state = topology.name(current),
                    "entry designated a state outside its own subtree"
                );
                return Err(DispatchError::entry_disagrees(topology, current, next));
            }
            entered = Some(current);
            current = next;
        }
    }

    /// Invoke `state`'s entry with the enclosing context and store the
    /// produced context on `state`. Returns the designated next state.
    fn run_entry(&mut self, state: StateId, entered: Option<StateId>) -> StateId {
        let (next, produced) = {
            let input = match entered.or_else(|| self.chart.topology().parent(state)) {
                Some(ancestor) => self.contexts[ancestor.index()]
                    .as_ref()
                    .expect("ancestor context is present while its subtree is active"),
                None => &self.seed,
            };
            (self.chart.entry_of(state))(input)
        };
        self.contexts[state.index()] = Some(produced);
        next
    }

    /// Drop `state`'s stored context, handing it to the exit action first.
    fn run_exit(&mut self, state: StateId) {
        if let Some(context) = self.contexts[state.index()].take() {
            if let Some(exit) = self.chart.exit_of(state) {
                exit(context);
            }
        }
    }
}
