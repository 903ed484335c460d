//! B+ Tree node codec / B+ 树节点编解码
//!
//! ```text
//! | type | nkeys | pointers   | offsets    | key-values
//! | 2B   | 2B    | nkeys * 8B | nkeys * 2B | ...
//!
//! | klen | vlen | key | val |
//! | 2B   | 2B   | ... | ... |
//! ```
//!
//! `offsets[i]` is the end of KV `i` relative to the KV area. `offset(0)` is
//! always 0 and not stored, so `offset(nkeys)` is the KV area length.

use std::ops::Range;

use crate::consts::{HEADER, NODE_LEAF, PAGE_SIZE};

/// Page ID type, 0 means none / 页 ID，0 表示空
pub type PageId = u64;

/// Node over a byte buffer / 字节缓冲区上的节点
///
/// Owned (`Vec<u8>`) while being built, borrowed (`&[u8]`) when read from a page.
/// 构建时持有缓冲区，读取时借用页。
#[derive(Clone, Debug)]
pub struct Node<B = Vec<u8>> {
  buf: B,
}

/// Zero-copy view of a page / 页的零拷贝视图
pub type NodeRef<'a> = Node<&'a [u8]>;

impl Node {
  /// Zeroed working node spanning `pages` pages
  /// 创建跨 `pages` 页的零初始化工作节点
  #[inline]
  pub fn with_pages(pages: usize) -> Self {
    Self {
      buf: vec![0; pages * PAGE_SIZE],
    }
  }

  /// Drop the scratch tail so the buffer is exactly one page
  /// 截断为一页
  pub fn truncate(&mut self) {
    assert!(
      self.nbytes() <= PAGE_SIZE,
      "node {} bytes exceeds page",
      self.nbytes()
    );
    self.buf.truncate(PAGE_SIZE);
  }

  #[inline]
  pub fn into_inner(self) -> Vec<u8> {
    self.buf
  }
}

impl<'a> Node<&'a [u8]> {
  /// Value borrowed for the page lifetime / 按页生命周期借用值
  pub fn val_of(&self, idx: u16) -> &'a [u8] {
    let buf: &'a [u8] = self.buf;
    &buf[self.val_range(idx)]
  }
}

impl<B: AsRef<[u8]>> Node<B> {
  #[inline]
  pub fn new(buf: B) -> Self {
    Self { buf }
  }

  #[inline]
  pub fn as_bytes(&self) -> &[u8] {
    self.buf.as_ref()
  }

  #[inline]
  fn u16_at(&self, pos: usize) -> u16 {
    let b = self.as_bytes();
    u16::from_le_bytes([b[pos], b[pos + 1]])
  }

  #[inline]
  fn u64_at(&self, pos: usize) -> u64 {
    let mut v = [0u8; 8];
    v.copy_from_slice(&self.as_bytes()[pos..pos + 8]);
    u64::from_le_bytes(v)
  }

  #[inline]
  pub fn btype(&self) -> u16 {
    self.u16_at(0)
  }

  #[inline]
  pub fn nkeys(&self) -> u16 {
    self.u16_at(2)
  }

  #[inline]
  pub fn is_leaf(&self) -> bool {
    self.btype() == NODE_LEAF
  }

  /// Child pointer / 子节点指针
  pub fn ptr(&self, idx: u16) -> PageId {
    assert!(idx < self.nkeys(), "ptr {idx} >= nkeys {}", self.nkeys());
    self.u64_at(HEADER + 8 * idx as usize)
  }

  fn offset_pos(&self, idx: u16) -> usize {
    let n = self.nkeys();
    assert!(1 <= idx && idx <= n, "offset {idx} out of 1..={n}");
    HEADER + 8 * n as usize + 2 * (idx as usize - 1)
  }

  /// KV end offset, relative to the KV area / KV 结束偏移（相对 KV 区）
  pub fn offset(&self, idx: u16) -> u16 {
    if idx == 0 {
      return 0;
    }
    self.u16_at(self.offset_pos(idx))
  }

  /// Absolute position of KV `idx` / KV 的绝对位置
  pub fn kv_pos(&self, idx: u16) -> usize {
    let n = self.nkeys();
    assert!(idx <= n, "kv {idx} > nkeys {n}");
    HEADER + 10 * n as usize + self.offset(idx) as usize
  }

  fn key_range(&self, idx: u16) -> Range<usize> {
    assert!(idx < self.nkeys(), "key {idx} >= nkeys {}", self.nkeys());
    let pos = self.kv_pos(idx);
    let klen = self.u16_at(pos) as usize;
    pos + 4..pos + 4 + klen
  }

  fn val_range(&self, idx: u16) -> Range<usize> {
    let key = self.key_range(idx);
    let vlen = self.u16_at(key.start - 2) as usize;
    key.end..key.end + vlen
  }

  #[inline]
  pub fn key(&self, idx: u16) -> &[u8] {
    &self.as_bytes()[self.key_range(idx)]
  }

  #[inline]
  pub fn val(&self, idx: u16) -> &[u8] {
    &self.as_bytes()[self.val_range(idx)]
  }

  /// Encoded size / 编码后大小
  #[inline]
  pub fn nbytes(&self) -> usize {
    self.kv_pos(self.nkeys())
  }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Node<B> {
  #[inline]
  pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
    self.buf.as_mut()
  }

  #[inline]
  pub(crate) fn put_u16(&mut self, pos: usize, v: u16) {
    self.bytes_mut()[pos..pos + 2].copy_from_slice(&v.to_le_bytes());
  }

  pub fn set_header(&mut self, btype: u16, nkeys: u16) {
    self.put_u16(0, btype);
    self.put_u16(2, nkeys);
  }

  pub fn set_ptr(&mut self, idx: u16, ptr: PageId) {
    assert!(idx < self.nkeys(), "ptr {idx} >= nkeys {}", self.nkeys());
    let pos = HEADER + 8 * idx as usize;
    self.bytes_mut()[pos..pos + 8].copy_from_slice(&ptr.to_le_bytes());
  }

  pub fn set_offset(&mut self, idx: u16, offset: u16) {
    let pos = self.offset_pos(idx);
    self.put_u16(pos, offset);
  }
}
