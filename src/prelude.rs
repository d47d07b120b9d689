//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

pub use crate::{
  effect::{Effect, Track},
  error::InvalidValue,
  state::{create_state, StateRef},
  stream::ValueStream,
  subscriber::Subscriber,
  topic::{DynTopic, Topic, Vacant},
  value::{Callable, Kind, Value},
};
// construction macros live at the crate root
pub use crate::{array, record};
