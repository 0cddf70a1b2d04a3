//! Module for blocking (sync) mode.

mod chart;
mod machine;

pub use crate::Response::{self, *};
pub use crate::*;

pub use chart::*;
pub use machine::*;
