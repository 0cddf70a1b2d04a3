use core::fmt::Debug;

use crate::StateId;

/// Response returned by event handlers in a state machine.
///
/// The dispatcher also produces [`Unhandled`](Response::Unhandled) itself
/// when a state's handler table has no binding for the event's tag; a handler
/// may return it explicitly to defer an event it matched on to its
/// superstate.
#[derive(Copy, Clone, PartialEq, Eq)]
pub enum Response {
    /// Transition to the given state.
    Transition(StateId),
    /// Exit the handling path and re-enter the handling state.
    SelfTransition,
    /// Consider the event consumed; no state change.
    NoTransition,
    /// Defer the event to the superstate.
    Unhandled,
}

impl Debug for Response {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transition(state) => f.debug_tuple("Transition").field(state).finish(),
            Self::SelfTransition => f.debug_tuple("SelfTransition").finish(),
            Self::NoTransition => f.debug_tuple("NoTransition").finish(),
            Self::Unhandled => f.debug_tuple("Unhandled").finish(),
        }
    }
}
