//! CoW B+ Tree implementation / CoW B+ 树实现
//!
//! Every touched node is rewritten into a new page and the old page is handed
//! back to the pager. The tree itself only owns the root page id.
//! 每个被修改的节点都写入新页，旧页交还给 pager，树只持有根页 ID。

use log::trace;

use crate::{
  Pager,
  algo::{
    append_kv, can_merge, leaf_delete, leaf_insert, leaf_update, lookup_le, merge, remove_kid,
    replace_2kid, replace_kid_n, split3, underflow,
  },
  consts::{MAX_KEY, MAX_VAL, NODE_INTERNAL, NODE_LEAF},
  node::{Node, NodeRef, PageId},
};

/// CoW B+ Tree / CoW B+ 树
pub struct BTree<P> {
  pager: P,
  root: PageId,
}

/// Sibling chosen for a merge / 选中的合并兄弟
enum Merge<'a> {
  None,
  Left(NodeRef<'a>),
  Right(NodeRef<'a>),
}

fn check_key(key: &[u8]) {
  assert!(!key.is_empty(), "empty key");
  assert!(key.len() <= MAX_KEY, "key {} > {MAX_KEY}", key.len());
}

impl<P: Pager> BTree<P> {
  /// Empty tree / 空树
  pub fn new(pager: P) -> Self {
    Self { pager, root: 0 }
  }

  /// Tree rooted at a persisted page / 以已持久化的页为根
  pub fn open(pager: P, root: PageId) -> Self {
    Self { pager, root }
  }

  #[inline]
  pub fn root(&self) -> PageId {
    self.root
  }

  /// Reset the root, e.g. back to the last durable one / 重置根
  #[inline]
  pub fn set_root(&mut self, root: PageId) {
    self.root = root;
  }

  #[inline]
  pub fn pager(&self) -> &P {
    &self.pager
  }

  #[inline]
  pub fn pager_mut(&mut self) -> &mut P {
    &mut self.pager
  }

  pub fn into_pager(self) -> P {
    self.pager
  }

  /// Levels from root to leaf, 0 for an empty tree / 树高
  pub fn height(&self) -> usize {
    if self.root == 0 {
      return 0;
    }
    let mut height = 1;
    let mut node = self.pager.page(self.root);
    while node.btype() == NODE_INTERNAL {
      node = self.pager.page(node.ptr(0));
      height += 1;
    }
    height
  }

  /// Get value for key / 获取 key 对应的值
  pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
    // The empty key is the bootstrap sentinel, never a user key
    if self.root == 0 || key.is_empty() {
      return None;
    }

    let mut node = self.pager.page(self.root);
    loop {
      let idx = lookup_le(&node, key);
      match node.btype() {
        NODE_LEAF => {
          return (node.key(idx) == key).then(|| node.val_of(idx));
        }
        NODE_INTERNAL => node = self.pager.page(node.ptr(idx)),
        t => panic!("bad node type {t}"),
      }
    }
  }

  /// Insert or replace / 插入或替换
  pub fn insert(&mut self, key: &[u8], val: &[u8]) {
    check_key(key);
    assert!(val.len() <= MAX_VAL, "val {} > {MAX_VAL}", val.len());

    if self.root == 0 {
      // The sentinel covers the whole key space, so lookups never fall
      // below the first key.
      let mut root = Node::with_pages(1);
      root.set_header(NODE_LEAF, 2);
      append_kv(&mut root, 0, 0, &[], &[]);
      append_kv(&mut root, 1, 0, key, val);
      self.root = self.pager.alloc(root);
      trace!("bootstrap root {}", self.root);
      return;
    }

    let old = self.root;
    let node = tree_insert(&self.pager, self.pager.page(old), key, val);
    self.pager.dealloc(old);
    self.root = grow_root(&self.pager, node);
  }

  /// Delete key, return whether it existed / 删除 key，返回是否存在
  pub fn delete(&mut self, key: &[u8]) -> bool {
    check_key(key);
    if self.root == 0 {
      return false;
    }

    let old = self.root;
    let Some(updated) = tree_delete(&self.pager, self.pager.page(old), key) else {
      return false;
    };
    self.pager.dealloc(old);

    assert!(updated.nkeys() > 0, "root emptied");
    self.root = if updated.btype() == NODE_INTERNAL && updated.nkeys() == 1 {
      // Shrink by one level / 降低一层
      trace!("shrink root to {}", updated.ptr(0));
      updated.ptr(0)
    } else {
      grow_root(&self.pager, updated)
    };
    true
  }
}

/// Allocate every node, pairing its id with its first key
/// 分配节点，返回 (页 ID, 首键)
fn alloc_kids<P: Pager>(pager: &P, nodes: Vec<Node>) -> Vec<(PageId, Vec<u8>)> {
  nodes
    .into_iter()
    .map(|node| {
      let key = node.key(0).to_vec();
      (pager.alloc(node), key)
    })
    .collect()
}

/// Split the top node and add a level when it no longer fits one page
/// 分裂顶层节点，放不下时增加一层
fn grow_root<P: Pager>(pager: &P, node: Node) -> PageId {
  let mut nodes = split3(node);
  if nodes.len() == 1 {
    return pager.alloc(nodes.swap_remove(0));
  }

  let kids = alloc_kids(pager, nodes);
  let mut root = Node::with_pages(1);
  root.set_header(NODE_INTERNAL, kids.len() as u16);
  for (i, (ptr, key)) in kids.iter().enumerate() {
    append_kv(&mut root, i as u16, *ptr, key, &[]);
  }
  trace!("grow root over {} kids", kids.len());
  pager.alloc(root)
}

/// Insert into the subtree at `node`; the result may be up to two pages
/// 插入子树，结果最多两页，由调用方分裂
fn tree_insert<P: Pager>(pager: &P, node: NodeRef<'_>, key: &[u8], val: &[u8]) -> Node {
  let mut new = Node::with_pages(2);
  let idx = lookup_le(&node, key);
  match node.btype() {
    NODE_LEAF => {
      if node.key(idx) == key {
        leaf_update(&mut new, &node, idx, key, val);
      } else {
        leaf_insert(&mut new, &node, idx + 1, key, val);
      }
    }
    NODE_INTERNAL => {
      let kptr = node.ptr(idx);
      let kid = tree_insert(pager, pager.page(kptr), key, val);
      pager.dealloc(kptr);
      let kids = alloc_kids(pager, split3(kid));
      replace_kid_n(&mut new, &node, idx, &kids);
    }
    t => panic!("bad node type {t}"),
  }
  new
}

/// Delete from the subtree at `node`, `None` if the key is absent
/// 从子树删除，key 不存在返回 None
fn tree_delete<P: Pager>(pager: &P, node: NodeRef<'_>, key: &[u8]) -> Option<Node> {
  let idx = lookup_le(&node, key);
  match node.btype() {
    NODE_LEAF => {
      if node.key(idx) != key {
        return None;
      }
      let mut new = Node::with_pages(1);
      leaf_delete(&mut new, &node, idx);
      Some(new)
    }
    NODE_INTERNAL => node_delete(pager, &node, idx, key),
    t => panic!("bad node type {t}"),
  }
}

fn node_delete<P: Pager>(pager: &P, node: &NodeRef<'_>, idx: u16, key: &[u8]) -> Option<Node> {
  let kptr = node.ptr(idx);
  let updated = tree_delete(pager, pager.page(kptr), key)?;
  pager.dealloc(kptr);

  // A separator may be replaced by a longer key, so leave room to split
  let mut new = Node::with_pages(2);
  match should_merge(pager, node, idx, &updated) {
    Merge::Left(sibling) => {
      let mut merged = Node::with_pages(1);
      merge(&mut merged, &sibling, &updated);
      pager.dealloc(node.ptr(idx - 1));
      let first = merged.key(0).to_vec();
      replace_2kid(&mut new, node, idx - 1, pager.alloc(merged), &first);
    }
    Merge::Right(sibling) => {
      let mut merged = Node::with_pages(1);
      merge(&mut merged, &updated, &sibling);
      pager.dealloc(node.ptr(idx + 1));
      let first = merged.key(0).to_vec();
      replace_2kid(&mut new, node, idx, pager.alloc(merged), &first);
    }
    // An only child emptied out: unlink it, the parent bubbles up as empty
    // and is merged or unlinked one level higher.
    Merge::None if updated.nkeys() == 0 => remove_kid(&mut new, node, idx),
    Merge::None => {
      let kids = alloc_kids(pager, split3(updated));
      replace_kid_n(&mut new, node, idx, &kids);
    }
  }
  Some(new)
}

/// Pick a sibling to merge `updated` with, left first / 选择合并兄弟，左侧优先
fn should_merge<'a, P: Pager>(
  pager: &'a P,
  node: &NodeRef<'_>,
  idx: u16,
  updated: &Node,
) -> Merge<'a> {
  if !underflow(updated) {
    return Merge::None;
  }
  if idx > 0 {
    let sibling = pager.page(node.ptr(idx - 1));
    if can_merge(&sibling, updated) {
      return Merge::Left(sibling);
    }
  }
  if idx + 1 < node.nkeys() {
    let sibling = pager.page(node.ptr(idx + 1));
    if can_merge(&sibling, updated) {
      return Merge::Right(sibling);
    }
  }
  Merge::None
}
