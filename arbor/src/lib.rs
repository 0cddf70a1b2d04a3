#![cfg_attr(not(doctest), doc = include_str!(concat!("../", core::env!("CARGO_PKG_README"))))]

mod error;
mod event;
mod response;
mod topology;

pub mod blocking;
pub mod scoped;

#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub mod awaitable;

pub use error::*;
pub use event::*;
pub use response::*;
pub use topology::*;

/// Prelude containing the imports shared by every flavor.
pub mod prelude {
    #![allow(unused_imports)]

    pub use crate::Response::{self, *};
    pub use crate::{ChartError, DispatchError, Event, StateId, Topology, TopologyBuilder};
}
