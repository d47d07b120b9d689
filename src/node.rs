//! The recursive tree: nodes, branches, structural update and the walks.
//!
//! A [`Node`] is a tree position holding exactly one of nothing, an atomic
//! cell, or a [`Branch`]. The node is itself observable: its kind topic
//! carries the public [`Kind`] of its content, so replacing a leaf with a
//! branch (or an array with an object) notifies like any value change.
//!
//! The structural update in [`update`] is the system's core correctness
//! property: a child position whose sub-value is unchanged is written with
//! an equal value, its topics never fire, and its dependents stay asleep
//! even though the whole tree was logically replaced.

use std::collections::HashMap;

use tracing::trace;

use crate::{
  flush::Changes,
  path::Key,
  rc::{MutRc, RcDeref, RcDerefMut, WeakRc},
  topic::{DynTopic, Topic},
  value::{Kind, Value},
};

type ChildMap = HashMap<Key, Node>;

// ============================================================================
// Node / Branch
// ============================================================================

pub(crate) struct Node {
  inner: MutRc<NodeInner>,
}

impl Clone for Node {
  #[inline]
  fn clone(&self) -> Self { Self { inner: self.inner.clone() } }
}

struct NodeInner {
  kind: Topic<Kind>,
  content: Content,
  link: Option<Link>,
}

enum Content {
  Empty,
  Leaf(Topic<Value>),
  Branch(Branch),
}

/// Where a child sits in its owner, for removal and key bookkeeping. The
/// parent pointer is weak: the branch is the sole owner, the child only
/// looks its position up.
#[derive(Clone)]
struct Link {
  parent: WeakRc<NodeInner>,
  key: Key,
}

/// The structural content of a node: an observable ordered key set plus the
/// exclusively owned children.
struct Branch {
  is_array: bool,
  keys: Topic<Vec<Key>>,
  children: MutRc<ChildMap>,
}

impl Branch {
  fn new(is_array: bool) -> Self {
    Branch {
      is_array,
      keys: Topic::new(Vec::new()),
      children: MutRc::own(ChildMap::new()),
    }
  }
}

impl Node {
  pub fn root() -> Self {
    Node {
      inner: MutRc::own(NodeInner {
        kind: Topic::new(Kind::Empty),
        content: Content::Empty,
        link: None,
      }),
    }
  }

  /// The node-level topic; its value is the public kind of the content.
  pub fn kind_topic(&self) -> Topic<Kind> { self.inner.rc_deref().kind.clone() }

  pub fn kind(&self) -> Kind { self.kind_topic().get() }

  pub fn keys_topic(&self) -> Option<Topic<Vec<Key>>> {
    self.branch_parts().map(|(keys, ..)| keys)
  }

  pub fn read_keys(&self) -> Vec<Key> {
    self
      .branch_parts()
      .map(|(keys, ..)| keys.get())
      .unwrap_or_default()
  }

  fn branch_parts(&self) -> Option<(Topic<Vec<Key>>, MutRc<ChildMap>, bool)> {
    let inner = self.inner.rc_deref();
    match &inner.content {
      Content::Branch(branch) => {
        Some((branch.keys.clone(), branch.children.clone(), branch.is_array))
      }
      _ => None,
    }
  }

  /// A fresh empty child wired into `children`: back-link for removal, and
  /// a detach callback so the slot is reclaimed once the child is vacant
  /// and unobserved.
  fn child_of(parent: &Node, children: &MutRc<ChildMap>, key: Key) -> Node {
    let node = Node {
      inner: MutRc::own(NodeInner {
        kind: Topic::new(Kind::Empty),
        content: Content::Empty,
        link: Some(Link { parent: parent.inner.downgrade(), key: key.clone() }),
      }),
    };
    let slot = children.downgrade();
    node.kind_topic().set_detach(move || {
      if let Some(map) = slot.upgrade() {
        map.rc_deref_mut().remove(&key);
        trace!(key = %key, "reclaimed vacant node");
      }
    });
    node
  }
}

fn child_or_create(parent: &Node, children: &MutRc<ChildMap>, key: Key) -> Node {
  let existing = children.rc_deref().get(&key).cloned();
  match existing {
    Some(child) => child,
    None => {
      let child = Node::child_of(parent, children, key.clone());
      children.rc_deref_mut().insert(key, child.clone());
      child
    }
  }
}

// ============================================================================
// Key bookkeeping
// ============================================================================

// A branch's key set always equals its children with defined content at the
// end of a public operation. Content transitions keep it that way: a node
// registers its key when it gains content and deregisters when it empties.

fn register_key(node: &Node, changes: &mut Changes) {
  let Some(link) = node.inner.rc_deref().link.clone() else { return };
  let Some(parent) = link.parent.upgrade() else { return };
  let keys_topic = match &parent.rc_deref().content {
    Content::Branch(branch) => Some(branch.keys.clone()),
    _ => None,
  };
  let Some(keys_topic) = keys_topic else { return };
  let mut keys = keys_topic.get();
  if !keys.contains(&link.key) {
    keys.push(link.key);
    keys_topic.set(keys, changes);
  }
}

fn deregister_key(node: &Node, changes: &mut Changes) {
  let Some(link) = node.inner.rc_deref().link.clone() else { return };
  let Some(parent) = link.parent.upgrade() else { return };
  let keys_topic = match &parent.rc_deref().content {
    Content::Branch(branch) => Some(branch.keys.clone()),
    _ => None,
  };
  let Some(keys_topic) = keys_topic else { return };
  let mut keys = keys_topic.get();
  if let Some(position) = keys.iter().position(|k| *k == link.key) {
    keys.remove(position);
    keys_topic.set(keys, changes);
  }
}

// ============================================================================
// Structural update
// ============================================================================

/// Apply `value` at `node`. Dispatches on the value shape; every arm leaves
/// the key-set invariant intact and accumulates notifications in `changes`.
pub(crate) fn update(node: &Node, value: Value, changes: &mut Changes) {
  match value {
    Value::Empty => clear_node(node, changes),
    Value::Array(items) => {
      let entries = items
        .into_iter()
        .enumerate()
        .map(|(index, sub)| (index.to_string(), sub))
        .collect();
      update_branch(node, true, entries, changes);
    }
    Value::Record(pairs) => update_branch(node, false, pairs, changes),
    atom => update_leaf(node, atom, changes),
  }
}

fn update_leaf(node: &Node, atom: Value, changes: &mut Changes) {
  let existing = {
    let inner = node.inner.rc_deref();
    match &inner.content {
      Content::Leaf(topic) => Some(topic.clone()),
      _ => None,
    }
  };
  match existing {
    Some(topic) => topic.set(atom, changes),
    None => {
      let displaced = {
        let mut inner = node.inner.rc_deref_mut();
        std::mem::replace(&mut inner.content, Content::Leaf(Topic::new(atom)))
      };
      if let Content::Branch(branch) = displaced {
        clear_branch(&branch, changes);
      }
      register_key(node, changes);
    }
  }
  node.kind_topic().set(Kind::Atomic, changes);
}

fn update_branch(node: &Node, is_array: bool, entries: Vec<(Key, Value)>, changes: &mut Changes) {
  // ensure the node holds a branch with the requested arrayness
  let (keys_topic, children, displaced_leaf, was_defined) = {
    let mut inner = node.inner.rc_deref_mut();
    match &mut inner.content {
      Content::Branch(branch) => {
        branch.is_array = is_array;
        (branch.keys.clone(), branch.children.clone(), None, true)
      }
      other => {
        let branch = Branch::new(is_array);
        let parts = (branch.keys.clone(), branch.children.clone());
        match std::mem::replace(other, Content::Branch(branch)) {
          Content::Leaf(topic) => (parts.0, parts.1, Some(topic), true),
          _ => (parts.0, parts.1, None, false),
        }
      }
    }
  };
  if let Some(leaf) = displaced_leaf {
    leaf.set(Value::Empty, changes);
  }
  if !was_defined {
    register_key(node, changes);
  }
  let kind = if is_array { Kind::Array } else { Kind::Object };
  node.kind_topic().set(kind, changes);

  // clear children that fell out of the key set
  let new_keys: Vec<Key> = entries.iter().map(|(key, _)| key.clone()).collect();
  for key in keys_topic.get() {
    if !new_keys.contains(&key) {
      let child = children.rc_deref().get(&key).cloned();
      if let Some(child) = child {
        clear_node(&child, changes);
      }
    }
  }

  // replace the key set wholesale; equal sets stay silent
  keys_topic.set(new_keys, changes);

  // land every sub-value in its (possibly fresh) child
  for (key, sub) in entries {
    let child = child_or_create(node, &children, key);
    update(&child, sub, changes);
  }
}

/// Empty a node: notify everything beneath it, take its key out of the
/// owning branch, and leave it detach-eligible.
pub(crate) fn clear_node(node: &Node, changes: &mut Changes) {
  let displaced = std::mem::replace(&mut node.inner.rc_deref_mut().content, Content::Empty);
  match displaced {
    Content::Empty => {}
    Content::Leaf(topic) => topic.set(Value::Empty, changes),
    Content::Branch(branch) => clear_branch(&branch, changes),
  }
  deregister_key(node, changes);
  node.kind_topic().set(Kind::Empty, changes);
}

fn clear_branch(branch: &Branch, changes: &mut Changes) {
  for key in branch.keys.get() {
    let child = branch.children.rc_deref().get(&key).cloned();
    if let Some(child) = child {
      clear_node(&child, changes);
    }
  }
  branch.keys.set(Vec::new(), changes);
}

/// Remove one key from the branch at `node`; a miss is a silent no-op.
pub(crate) fn remove_child(node: &Node, key: &str, changes: &mut Changes) {
  let Some((keys_topic, children, _)) = node.branch_parts() else { return };
  if !keys_topic.get().iter().any(|k| k == key) {
    return;
  }
  let child = children.rc_deref().get(key).cloned();
  match child {
    // clearing the child deregisters the key and notifies beneath it
    Some(child) => clear_node(&child, changes),
    None => {
      let mut keys = keys_topic.get();
      keys.retain(|k| k != key);
      keys_topic.set(keys, changes);
    }
  }
}

// ============================================================================
// Read-back
// ============================================================================

/// Reconstruct the plain value last written under `node`, in key order.
pub(crate) fn extract(node: &Node) -> Value {
  let (keys, children, is_array) = {
    let inner = node.inner.rc_deref();
    match &inner.content {
      Content::Empty => return Value::Empty,
      Content::Leaf(topic) => return topic.get(),
      Content::Branch(branch) => (branch.keys.get(), branch.children.clone(), branch.is_array),
    }
  };
  let child_value = |key: &Key| {
    children
      .rc_deref()
      .get(key)
      .map(extract)
      .unwrap_or(Value::Empty)
  };
  if is_array {
    Value::Array(keys.iter().map(child_value).collect())
  } else {
    Value::Record(keys.iter().map(|key| (key.clone(), child_value(key))).collect())
  }
}

// ============================================================================
// Walks
// ============================================================================

/// Read-only navigation: never creates anything; a miss is `None`.
pub(crate) fn resolve(root: &Node, path: &[Key]) -> Option<Node> {
  let mut current = root.clone();
  for key in path {
    let next = match &current.inner.rc_deref().content {
      Content::Branch(branch) => branch.children.rc_deref().get(key).cloned(),
      _ => None,
    };
    current = next?;
  }
  Some(current)
}

/// Creating navigation for writes: a write can always land somewhere.
/// Turning an intermediate leaf or empty node into a branch is itself an
/// observable kind change.
pub(crate) fn resolve_or_create(root: &Node, path: &[Key], changes: &mut Changes) -> Node {
  let mut current = root.clone();
  for key in path {
    let children = walk_branch(&current, changes);
    current = child_or_create(&current, &children, key.clone());
  }
  current
}

fn walk_branch(node: &Node, changes: &mut Changes) -> MutRc<ChildMap> {
  if let Some((_, children, _)) = node.branch_parts() {
    return children;
  }
  let (children, displaced_leaf) = {
    let mut inner = node.inner.rc_deref_mut();
    let branch = Branch::new(false);
    let children = branch.children.clone();
    let displaced = std::mem::replace(&mut inner.content, Content::Branch(branch));
    let leaf = match displaced {
      Content::Leaf(topic) => Some(topic),
      _ => None,
    };
    (children, leaf)
  };
  let was_defined = displaced_leaf.is_some();
  if let Some(leaf) = displaced_leaf {
    leaf.set(Value::Empty, changes);
  }
  if !was_defined {
    register_key(node, changes);
  }
  node.kind_topic().set(Kind::Object, changes);
  children
}

/// Tracked navigation for reads: collects the kind topic of every node the
/// walk touches, creating **volatile** children under branches for missing
/// keys so the read can subscribe to that key's future appearance. Volatile
/// children live in the map but not in the key set, and carry no observable
/// effect. Below a non-branch position the walk stops; the topics gathered
/// so far are what will wake the read when the shape changes.
pub(crate) fn resolve_tracked(root: &Node, path: &[Key], topics: &mut Vec<DynTopic>) -> Option<Node> {
  let mut current = root.clone();
  topics.push(current.kind_topic().erased());
  for key in path {
    let children = match &current.inner.rc_deref().content {
      Content::Branch(branch) => Some(branch.children.clone()),
      _ => None,
    };
    let children = children?;
    let existing = children.rc_deref().get(key).cloned();
    let child = match existing {
      Some(child) => child,
      None => {
        let child = Node::child_of(&current, &children, key.clone());
        children.rc_deref_mut().insert(key.clone(), child.clone());
        child
      }
    };
    topics.push(child.kind_topic().erased());
    current = child;
  }
  Some(current)
}

/// Every topic reachable under `node`: kind topics, leaf cells, and branch
/// key sets, recursing through defined children only.
pub(crate) fn collect_topics(node: &Node, topics: &mut Vec<DynTopic>) {
  let branch = {
    let inner = node.inner.rc_deref();
    topics.push(inner.kind.erased());
    match &inner.content {
      Content::Empty => None,
      Content::Leaf(topic) => {
        topics.push(topic.erased());
        None
      }
      Content::Branch(branch) => {
        topics.push(branch.keys.erased());
        Some((branch.keys.get(), branch.children.clone()))
      }
    }
  };
  if let Some((keys, children)) = branch {
    for key in &keys {
      let child = children.rc_deref().get(key).cloned();
      if let Some(child) = child {
        collect_topics(&child, topics);
      }
    }
  }
}
