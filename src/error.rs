//! The crate's single error channel.
//!
//! Only invalid input is an error: a value tree that fails the coarse shape
//! check is rejected before any mutation happens. Navigating through a path
//! that does not exist is a normal outcome and reads as
//! [`Value::Empty`](crate::value::Value::Empty).

use thiserror::Error;

/// Rejection raised by the upfront validation pass of
/// [`update`](crate::state::StateRef::update) and
/// [`create_state`](crate::state::create_state).
///
/// Validation is all-or-nothing: when any part of the value tree is
/// rejected, the state tree is left exactly as it was.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum InvalidValue {
  /// NaN and the infinities are refused because change detection compares
  /// stored values for equality, and `NaN != NaN` would make every write
  /// look like a change.
  #[error("non-finite number `{0}` cannot be stored in a state tree")]
  NonFiniteNumber(f64),

  /// A record carried the same key twice; the key set of a branch is a set.
  #[error("duplicate key `{0}` in record value")]
  DuplicateKey(String),
}
