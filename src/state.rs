//! The path-navigation façade over the tree.
//!
//! A [`StateRef`] is a cheap handle: a deep reference (root + path) plus the
//! tree's flush hub. Navigation builds new handles without touching the
//! tree; reads resolve the path on the spot; writes validate, mutate, and
//! flush before returning.

use tracing::trace;

use crate::{
  effect::Track,
  error::InvalidValue,
  flush::{Changes, Hub},
  node::{self, Node},
  path::DeepRef,
  value::{validate, Kind, Value},
};

/// Build a state tree holding `initial` and return a façade over its root.
///
/// ```rust
/// use rxtree::prelude::*;
///
/// let todos = create_state(record! {
///   "title" => "groceries",
///   "items" => array!["milk", "eggs"],
/// })
/// .unwrap();
///
/// assert_eq!(todos.get("title").read(), Value::from("groceries"));
/// assert_eq!(todos.get("items").read_size(), 2);
/// ```
pub fn create_state(initial: impl Into<Value>) -> Result<StateRef, InvalidValue> {
  let value = initial.into();
  validate(&value)?;
  let state = StateRef { target: DeepRef::new(Node::root()), hub: Hub::new() };
  state.apply(value);
  Ok(state)
}

/// A lazy address into a state tree and every operation on it.
///
/// Key lookup is always the explicit [`get`](StateRef::get) (or
/// [`at`](StateRef::at)) call, and operations are methods, so data keys may
/// freely share names with operations: `state.get("update")` addresses the
/// `"update"` key, never the method.
///
/// Reads come in untracked (`read*`) and tracked (`watch*`) pairs. The
/// tracked variants deposit every topic they depend on into the supplied
/// [`Track`], which is how an [`Effect`](crate::effect::Effect) learns what
/// to re-run on.
#[derive(Clone)]
pub struct StateRef {
  target: DeepRef,
  hub: Hub,
}

impl StateRef {
  /// A reference one key deeper. Purely an address; nothing is created.
  pub fn get(&self, key: impl Into<String>) -> StateRef {
    StateRef { target: self.target.child(key.into()), hub: self.hub.clone() }
  }

  /// Array-position sugar: `at(2)` is `get("2")`.
  pub fn at(&self, index: usize) -> StateRef { self.get(index.to_string()) }

  // ==================== untracked reads ====================

  /// The plain value at this position; a navigation miss reads as
  /// [`Value::Empty`].
  pub fn read(&self) -> Value {
    match node::resolve(&self.target.root, &self.target.path) {
      Some(node) => node::extract(&node),
      None => Value::Empty,
    }
  }

  /// The ordered key list of the branch here; empty for non-branches.
  pub fn read_keys(&self) -> Vec<String> {
    node::resolve(&self.target.root, &self.target.path)
      .map(|node| node.read_keys())
      .unwrap_or_default()
  }

  /// Number of keys of the branch here.
  pub fn read_size(&self) -> usize { self.read_keys().len() }

  /// What this position currently holds.
  pub fn read_kind(&self) -> Kind {
    node::resolve(&self.target.root, &self.target.path)
      .map(|node| node.kind())
      .unwrap_or(Kind::Empty)
  }

  // ==================== tracked reads ====================

  /// [`read`](StateRef::read), and register everything it depended on: the
  /// topics along the walk plus every topic in the resolved subtree.
  pub fn watch(&self, cx: &Track) -> Value {
    let mut topics = Vec::new();
    let resolved = node::resolve_tracked(&self.target.root, &self.target.path, &mut topics);
    let value = match &resolved {
      Some(node) => {
        node::collect_topics(node, &mut topics);
        node::extract(node)
      }
      None => Value::Empty,
    };
    cx.collect(topics);
    value
  }

  /// Tracked key list: depends on the walk and the branch's key-set topic,
  /// not on any child value.
  pub fn watch_keys(&self, cx: &Track) -> Vec<String> {
    let mut topics = Vec::new();
    let resolved = node::resolve_tracked(&self.target.root, &self.target.path, &mut topics);
    let keys = resolved
      .and_then(|node| node.keys_topic())
      .map(|keys_topic| {
        topics.push(keys_topic.erased());
        keys_topic.get()
      })
      .unwrap_or_default();
    cx.collect(topics);
    keys
  }

  /// Tracked key count. Same dependencies as [`watch_keys`](Self::watch_keys):
  /// a child changing value without changing the key set wakes nobody here.
  pub fn watch_size(&self, cx: &Track) -> usize { self.watch_keys(cx).len() }

  /// Tracked kind: depends on the walk only (every node's kind topic along
  /// the path is already part of it).
  pub fn watch_kind(&self, cx: &Track) -> Kind {
    let mut topics = Vec::new();
    let resolved = node::resolve_tracked(&self.target.root, &self.target.path, &mut topics);
    let kind = resolved.map(|node| node.kind()).unwrap_or(Kind::Empty);
    cx.collect(topics);
    kind
  }

  // ==================== writes ====================

  /// Validate `value`, land it at this position, and flush.
  ///
  /// Rejection happens before any mutation: on `Err` the tree is exactly as
  /// it was. Sub-positions whose sub-value is unchanged are written with an
  /// equal value and stay silent, so replacing a whole subtree only wakes
  /// the dependents of what actually differs.
  pub fn update(&self, value: impl Into<Value>) -> Result<(), InvalidValue> {
    let value = value.into();
    validate(&value)?;
    self.apply(value);
    Ok(())
  }

  fn apply(&self, value: Value) {
    trace!(depth = self.target.path.len(), kind = ?value.kind(), "update");
    let mut changes = Changes::new();
    let target = node::resolve_or_create(&self.target.root, &self.target.path, &mut changes);
    node::update(&target, value, &mut changes);
    self.hub.deliver(changes);
  }

  /// Drop one key from the branch here, then flush. A miss (no branch, or
  /// no such key) is a silent no-op, like any navigation miss.
  pub fn remove_key(&self, key: &str) {
    trace!(key, "remove key");
    let mut changes = Changes::new();
    if let Some(target) = node::resolve(&self.target.root, &self.target.path) {
      node::remove_child(&target, key, &mut changes);
    }
    self.hub.deliver(changes);
  }
}
