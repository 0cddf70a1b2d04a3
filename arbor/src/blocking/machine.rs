use crate::{DispatchError, Event, StateId};

use super::Chart;

/// A running statechart instance: a chart reference plus the current leaf.
///
/// The machine initializes lazily; the first call to
/// [`handle`](Machine::handle) runs the initial entry chase before
/// dispatching. All runtime state beyond the current leaf is derived from
/// the chart's topology.
pub struct Machine<'c, E: Event, S> {
    chart: &'c Chart<E, S>,
    root: StateId,
    leaf: Option<StateId>,
}

impl<'c, E: Event, S> Machine<'c, E, S> {
    /// Create a machine that will start from `root` when first used.
    pub fn new(chart: &'c Chart<E, S>, root: StateId) -> Self {
        Self {
            chart,
            root,
            leaf: None,
        }
    }

    /// Explicitly run the initial entry chase. A no-op when already
    /// initialized.
    pub fn init(&mut self, external: &mut S) -> Result<StateId, DispatchError> {
        match self.leaf {
            Some(leaf) => Ok(leaf),
            None => {
                let leaf = self.chart.initial_entries(self.root, external)?;
                self.leaf = Some(leaf);
                Ok(leaf)
            }
        }
    }

    /// Handle an event, initializing the machine first if needed.
    ///
    /// On a fault the stored leaf is left at its previous value; callbacks
    /// that already ran stay run.
    pub fn handle(&mut self, event: &E, external: &mut S) -> Result<StateId, DispatchError> {
        let leaf = self.init(external)?;
        let leaf = self.chart.dispatch(leaf, event, external)?;
        self.leaf = Some(leaf);
        Ok(leaf)
    }

    /// The current leaf, or `None` before initialization.
    pub fn current(&self) -> Option<StateId> {
        self.leaf
    }

    /// The chart this machine runs.
    pub fn chart(&self) -> &'c Chart<E, S> {
        self.chart
    }
}
