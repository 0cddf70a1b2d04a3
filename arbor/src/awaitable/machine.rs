use crate::{DispatchError, Event, StateId};

use super::Chart;

/// A running awaitable statechart instance.
///
/// The machine initializes lazily; the first call to
/// [`handle`](Machine::handle) runs the initial entry chase before
/// dispatching. A machine is logically single-threaded: callers serialize
/// their own dispatches, and a dispatch future dropped mid-flight leaves the
/// stored leaf at its previous value while the world keeps any callbacks
/// that already ran.
pub struct Machine<'c, E: Event, S> {
    chart: &'c Chart<E, S>,
    root: StateId,
    leaf: Option<StateId>,
}

impl<'c, E, S> Machine<'c, E, S>
where
    E: Event + Clone,
    S: Clone,
{
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
    pub async fn init(&mut self, external: &S) -> Result<StateId, DispatchError> {
        match self.leaf {
            Some(leaf) => Ok(leaf),
            None => {
                let leaf = self.chart.initial_entries(self.root, external).await?;
                self.leaf = Some(leaf);
                Ok(leaf)
            }
        }
    }

    /// Handle an event, initializing the machine first if needed.
    pub async fn handle(&mut self, event: &E, external: &S) -> Result<StateId, DispatchError> {
        let leaf = self.init(external).await?;
        let leaf = self.chart.dispatch(leaf, event, external).await?;
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
