//! The value model of the tree.
//!
//! A state tree stores [`Value`]s: atomic cells (booleans, numbers, text,
//! callables), arrays, and insertion-ordered records, nested arbitrarily.
//! [`Kind`] is the coarse classification the tree reports for any position,
//! and [`validate`] is the single upfront shape check every write runs
//! before touching the tree.

use std::{fmt, rc::Rc};

use crate::{error::InvalidValue, topic::Vacant};

// ============================================================================
// Value
// ============================================================================

/// A structural value accepted by the tree.
///
/// Records preserve insertion order; their key list is what a branch exposes
/// through `read_keys`. Arrays address their elements by decimal string keys
/// (`"0"`, `"1"`, …) once stored, which is why `at(index)` on the façade is
/// plain sugar over `get`.
///
/// Construction usually goes through the `From` conversions or the
/// [`record!`](crate::record) / [`array!`](crate::array) macros:
///
/// ```rust
/// use rxtree::prelude::*;
///
/// let v = record! {
///   "title" => "groceries",
///   "done" => false,
///   "items" => array![1, 2, 3],
/// };
/// assert_eq!(v.kind(), Kind::Object);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
  /// The absence of a value; what a navigation miss reads as.
  Empty,
  Bool(bool),
  Number(f64),
  Text(String),
  /// A callable-wrapped value, compared by identity.
  Callable(Callable),
  Array(Vec<Value>),
  Record(Vec<(String, Value)>),
}

impl Value {
  /// Coarse classification of this value.
  pub fn kind(&self) -> Kind {
    match self {
      Value::Empty => Kind::Empty,
      Value::Array(_) => Kind::Array,
      Value::Record(_) => Kind::Object,
      _ => Kind::Atomic,
    }
  }

  /// True for values a leaf cell can hold (everything but array/record).
  pub fn is_atomic(&self) -> bool { !matches!(self, Value::Array(_) | Value::Record(_)) }
}

impl Vacant for Value {
  #[inline]
  fn is_vacant(&self) -> bool { matches!(self, Value::Empty) }
}

// ============================================================================
// Kind
// ============================================================================

/// What a tree position currently holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
  Empty,
  Atomic,
  Array,
  Object,
}

impl Vacant for Kind {
  #[inline]
  fn is_vacant(&self) -> bool { matches!(self, Kind::Empty) }
}

// ============================================================================
// Callable
// ============================================================================

/// A value wrapped in a thunk, stored in the tree as an atomic cell.
///
/// Two callables compare equal only when they are the same allocation, so
/// writing a freshly built callable over an old one always notifies, while
/// re-writing a cloned handle never does.
#[derive(Clone)]
pub struct Callable(Rc<dyn Fn() -> Value>);

impl Callable {
  pub fn new(f: impl Fn() -> Value + 'static) -> Self { Self(Rc::new(f)) }

  pub fn call(&self) -> Value { (self.0)() }
}

impl PartialEq for Callable {
  fn eq(&self, other: &Self) -> bool {
    std::ptr::eq(
      Rc::as_ptr(&self.0) as *const (),
      Rc::as_ptr(&other.0) as *const (),
    )
  }
}

impl fmt::Debug for Callable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Callable({:p})", Rc::as_ptr(&self.0))
  }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<()> for Value {
  fn from(_: ()) -> Self { Value::Empty }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self { Value::Bool(v) }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self { Value::Number(v) }
}

impl From<f32> for Value {
  fn from(v: f32) -> Self { Value::Number(v as f64) }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self { Value::Number(v as f64) }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self { Value::Number(v as f64) }
}

impl From<u32> for Value {
  fn from(v: u32) -> Self { Value::Number(v as f64) }
}

impl From<usize> for Value {
  fn from(v: usize) -> Self { Value::Number(v as f64) }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self { Value::Text(v.to_owned()) }
}

impl From<String> for Value {
  fn from(v: String) -> Self { Value::Text(v) }
}

impl From<Callable> for Value {
  fn from(v: Callable) -> Self { Value::Callable(v) }
}

impl From<Vec<Value>> for Value {
  fn from(v: Vec<Value>) -> Self { Value::Array(v) }
}

impl From<Vec<(String, Value)>> for Value {
  fn from(v: Vec<(String, Value)>) -> Self { Value::Record(v) }
}

/// Build a [`Value::Record`], preserving the written order of keys.
#[macro_export]
macro_rules! record {
  ($($key:expr => $value:expr),* $(,)?) => {
    $crate::value::Value::Record(::std::vec![
      $((::std::string::String::from($key), $crate::value::Value::from($value))),*
    ])
  };
}

/// Build a [`Value::Array`] from anything convertible into [`Value`].
#[macro_export]
macro_rules! array {
  ($($value:expr),* $(,)?) => {
    $crate::value::Value::Array(::std::vec![
      $($crate::value::Value::from($value)),*
    ])
  };
}

// ============================================================================
// Validation
// ============================================================================

/// The coarse shape check, run once over the whole value before any
/// mutation. All-or-nothing: the first offending part aborts the write.
pub fn validate(value: &Value) -> Result<(), InvalidValue> {
  match value {
    Value::Number(n) if !n.is_finite() => Err(InvalidValue::NonFiniteNumber(*n)),
    Value::Array(items) => items.iter().try_for_each(validate),
    Value::Record(pairs) => {
      for (i, (key, sub)) in pairs.iter().enumerate() {
        if pairs[..i].iter().any(|(prior, _)| prior == key) {
          return Err(InvalidValue::DuplicateKey(key.clone()));
        }
        validate(sub)?;
      }
      Ok(())
    }
    _ => Ok(()),
  }
}
