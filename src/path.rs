//! Deep references: lazy addresses into the tree.

use smallvec::SmallVec;

use crate::node::Node;

/// Keys are strings everywhere; array positions address by their decimal
/// rendering (`"0"`, `"1"`, …).
pub(crate) type Key = String;

/// An immutable `(root, path)` pair. Purely an address: resolution happens
/// at read/write time, so a reference taken before a key exists is still
/// good once the key appears.
#[derive(Clone)]
pub(crate) struct DeepRef {
  pub root: Node,
  pub path: SmallVec<[Key; 4]>,
}

impl DeepRef {
  pub fn new(root: Node) -> Self { DeepRef { root, path: SmallVec::new() } }

  /// A new reference one key deeper; `self` is untouched.
  pub fn child(&self, key: Key) -> Self {
    let mut path = self.path.clone();
    path.push(key);
    DeepRef { root: self.root.clone(), path }
  }
}
