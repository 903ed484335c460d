//! Node algorithms / 节点算法
//!
//! Every rewrite is "copy prefix, splice, copy suffix" on top of
//! [`append_range`] and [`append_kv`].
//! 所有改写都是"复制前缀、拼接、复制后缀"。

use crate::{
  consts::{HEADER, MERGE_MAX, NODE_INTERNAL, NODE_LEAF, PAGE_SIZE},
  node::{Node, PageId},
};

/// Copy `n` entries of `old` starting at `src` into `new` at `dst`
/// 从 old 的 src 处复制 n 项到 new 的 dst 处
pub fn append_range<B: AsRef<[u8]>>(new: &mut Node, old: &Node<B>, dst: u16, src: u16, n: u16) {
  assert!(
    src + n <= old.nkeys(),
    "src {src}+{n} > {}",
    old.nkeys()
  );
  assert!(
    dst + n <= new.nkeys(),
    "dst {dst}+{n} > {}",
    new.nkeys()
  );
  if n == 0 {
    return;
  }

  for i in 0..n {
    new.set_ptr(dst + i, old.ptr(src + i));
  }

  // Offsets are rebased on the destination's running offset
  let dst_begin = new.offset(dst);
  let src_begin = old.offset(src);
  for i in 1..=n {
    new.set_offset(dst + i, dst_begin + old.offset(src + i) - src_begin);
  }

  let begin = old.kv_pos(src);
  let end = old.kv_pos(src + n);
  let at = new.kv_pos(dst);
  new.bytes_mut()[at..at + end - begin].copy_from_slice(&old.as_bytes()[begin..end]);
}

/// Append one KV at `idx` / 在 idx 处追加一项
pub fn append_kv(new: &mut Node, idx: u16, ptr: PageId, key: &[u8], val: &[u8]) {
  new.set_ptr(idx, ptr);

  let pos = new.kv_pos(idx);
  let klen = key.len() as u16;
  let vlen = val.len() as u16;
  new.put_u16(pos, klen);
  new.put_u16(pos + 2, vlen);
  let buf = new.bytes_mut();
  buf[pos + 4..pos + 4 + key.len()].copy_from_slice(key);
  buf[pos + 4 + key.len()..pos + 4 + key.len() + val.len()].copy_from_slice(val);

  let end = new.offset(idx) + 4 + klen + vlen;
  new.set_offset(idx + 1, end);
}

/// Index of the rightmost key <= `key` / 最右侧 <= key 的下标
///
/// The first key of a node is a copy of its parent separator, so it is <= any
/// key routed here. A smaller key means the tree is broken.
pub fn lookup_le<B: AsRef<[u8]>>(node: &Node<B>, key: &[u8]) -> u16 {
  let (mut lo, mut hi) = (0u16, node.nkeys());
  while lo < hi {
    let mid = lo + (hi - lo) / 2;
    if node.key(mid) <= key {
      lo = mid + 1;
    } else {
      hi = mid;
    }
  }
  assert!(lo > 0, "key {key:?} below first key of node");
  lo - 1
}

/// Insert a new KV at `idx` / 在 idx 处插入新项
pub fn leaf_insert<B: AsRef<[u8]>>(new: &mut Node, old: &Node<B>, idx: u16, key: &[u8], val: &[u8]) {
  let n = old.nkeys();
  new.set_header(NODE_LEAF, n + 1);
  append_range(new, old, 0, 0, idx);
  append_kv(new, idx, 0, key, val);
  append_range(new, old, idx + 1, idx, n - idx);
}

/// Replace the value at `idx` / 替换 idx 处的值
pub fn leaf_update<B: AsRef<[u8]>>(new: &mut Node, old: &Node<B>, idx: u16, key: &[u8], val: &[u8]) {
  let n = old.nkeys();
  new.set_header(NODE_LEAF, n);
  append_range(new, old, 0, 0, idx);
  append_kv(new, idx, 0, key, val);
  append_range(new, old, idx + 1, idx + 1, n - idx - 1);
}

/// Remove the KV at `idx` / 删除 idx 处的项
pub fn leaf_delete<B: AsRef<[u8]>>(new: &mut Node, old: &Node<B>, idx: u16) {
  let n = old.nkeys();
  new.set_header(old.btype(), n - 1);
  append_range(new, old, 0, 0, idx);
  append_range(new, old, idx, idx + 1, n - idx - 1);
}

/// Encoded size of a node holding entries `begin..end`
/// 仅含 begin..end 项时的编码大小
fn span<B: AsRef<[u8]>>(node: &Node<B>, begin: u16, end: u16) -> usize {
  HEADER + 10 * (end - begin) as usize + node.kv_pos(end) - node.kv_pos(begin)
}

/// Smallest cut whose suffix fits one page / 后缀能放入一页的最小切点
fn min_cut<B: AsRef<[u8]>>(node: &Node<B>) -> u16 {
  let n = node.nkeys();
  // Monotonic, and a single entry always fits
  let (mut lo, mut hi) = (1u16, n - 1);
  while lo < hi {
    let mid = lo + (hi - lo) / 2;
    if span(node, mid, n) <= PAGE_SIZE {
      hi = mid;
    } else {
      lo = mid + 1;
    }
  }
  lo
}

fn split_at<B: AsRef<[u8]>>(left: &mut Node, right: &mut Node, old: &Node<B>, cut: u16) {
  let n = old.nkeys();
  left.set_header(old.btype(), cut);
  append_range(left, old, 0, 0, cut);
  right.set_header(old.btype(), n - cut);
  append_range(right, old, 0, cut, n - cut);
}

/// Split in two near the byte midpoint; `right` always fits one page
/// 按字节中点一分为二，右侧总能放入一页
///
/// Nodes left behind by ascending inserts stay about half full.
pub fn split2<B: AsRef<[u8]>>(left: &mut Node, right: &mut Node, old: &Node<B>) {
  let n = old.nkeys();
  assert!(n >= 2, "split node with {n} keys");

  // First cut where the left side is at least as large as the right
  let (mut lo, mut hi) = (1u16, n - 1);
  while lo < hi {
    let mid = lo + (hi - lo) / 2;
    if span(old, 0, mid) >= span(old, mid, n) {
      hi = mid;
    } else {
      lo = mid + 1;
    }
  }
  let larger = |cut: u16| span(old, 0, cut).max(span(old, cut, n));
  if lo > 1 && larger(lo - 1) < larger(lo) {
    lo -= 1;
  }

  split_at(left, right, old, lo.max(min_cut(old)));
}

/// Split an oversized node into 1~3 page-sized nodes
/// 将过大的节点分裂为 1~3 个页大小的节点
///
/// `left` only stays oversized when the cut was pushed right to make `right`
/// fit; it is then cut again taking the largest suffix that fits.
pub fn split3(mut old: Node) -> Vec<Node> {
  if old.nbytes() <= PAGE_SIZE {
    old.truncate();
    return vec![old];
  }

  let mut left = Node::with_pages(2);
  let mut right = Node::with_pages(1);
  split2(&mut left, &mut right, &old);
  if left.nbytes() <= PAGE_SIZE {
    left.truncate();
    return vec![left, right];
  }

  let mut leftleft = Node::with_pages(2);
  let mut middle = Node::with_pages(1);
  let cut = min_cut(&left);
  split_at(&mut leftleft, &mut middle, &left, cut);
  leftleft.truncate();
  vec![leftleft, middle, right]
}

/// Merge two siblings; the caller checks the result fits
/// 合并两个兄弟节点，调用方保证结果放得下
pub fn merge<L: AsRef<[u8]>, R: AsRef<[u8]>>(new: &mut Node, left: &Node<L>, right: &Node<R>) {
  assert_eq!(left.btype(), right.btype(), "merge of mixed node types");
  let (l, r) = (left.nkeys(), right.nkeys());
  new.set_header(left.btype(), l + r);
  append_range(new, left, 0, 0, l);
  append_range(new, right, l, 0, r);
}

/// Whether `updated` is small enough to look for a merge at all
/// updated 是否小到需要合并
#[inline]
pub fn underflow<B: AsRef<[u8]>>(updated: &Node<B>) -> bool {
  updated.nbytes() <= MERGE_MAX
}

/// Whether `sibling` and `updated` fit one page together (one header shared)
/// 两者合并后能否放入一页（共享一个头）
#[inline]
pub fn can_merge<S: AsRef<[u8]>, U: AsRef<[u8]>>(sibling: &Node<S>, updated: &Node<U>) -> bool {
  sibling.nbytes() + updated.nbytes() - HEADER <= PAGE_SIZE
}

/// Replace the link at `idx` with 1~3 links / 以 1~3 个链接替换 idx 处的链接
pub fn replace_kid_n<B: AsRef<[u8]>>(
  new: &mut Node,
  old: &Node<B>,
  idx: u16,
  kids: &[(PageId, Vec<u8>)],
) {
  let inc = kids.len() as u16;
  let n = old.nkeys();
  new.set_header(NODE_INTERNAL, n + inc - 1);
  append_range(new, old, 0, 0, idx);
  for (i, (ptr, key)) in kids.iter().enumerate() {
    append_kv(new, idx + i as u16, *ptr, key, &[]);
  }
  append_range(new, old, idx + inc, idx + 1, n - idx - 1);
}

/// Replace links `idx` and `idx + 1` with one / 以一个链接替换 idx 和 idx+1
pub fn replace_2kid<B: AsRef<[u8]>>(new: &mut Node, old: &Node<B>, idx: u16, ptr: PageId, key: &[u8]) {
  let n = old.nkeys();
  new.set_header(NODE_INTERNAL, n - 1);
  append_range(new, old, 0, 0, idx);
  append_kv(new, idx, ptr, key, &[]);
  append_range(new, old, idx + 1, idx + 2, n - idx - 2);
}

/// Drop the link at `idx` / 移除 idx 处的链接
pub fn remove_kid<B: AsRef<[u8]>>(new: &mut Node, old: &Node<B>, idx: u16) {
  let n = old.nkeys();
  new.set_header(NODE_INTERNAL, n - 1);
  append_range(new, old, 0, 0, idx);
  append_range(new, old, idx, idx + 1, n - idx - 1);
}
