//! In-memory pager / 内存页管理器

use std::cell::RefCell;

use crate::{
  Pager,
  consts::PAGE_SIZE,
  node::{Node, NodeRef, PageId},
};

/// Pages kept in memory, published by [`MemPager::commit`]
/// 内存页，由 commit 发布
///
/// Unlike the file store it reclaims the memory of deallocated pages on commit,
/// so reading a freed page panics.
pub struct MemPager {
  // index = page id, slot 0 unused
  pages: Vec<Option<Box<[u8]>>>,
  staged: RefCell<Vec<Node>>,
  freed: RefCell<Vec<PageId>>,
}

impl Default for MemPager {
  fn default() -> Self {
    Self::new()
  }
}

impl MemPager {
  pub fn new() -> Self {
    Self {
      pages: vec![None],
      staged: RefCell::default(),
      freed: RefCell::default(),
    }
  }

  /// Publish staged pages and drop freed ones / 发布暂存页并回收已释放页
  pub fn commit(&mut self) {
    for node in self.staged.get_mut().drain(..) {
      let mut buf = node.into_inner();
      buf.truncate(PAGE_SIZE);
      self.pages.push(Some(buf.into_boxed_slice()));
    }
    for id in self.freed.get_mut().drain(..) {
      self.pages[id as usize] = None;
    }
  }

  /// Published pages still alive / 存活页数
  pub fn live(&self) -> usize {
    self.pages.iter().filter(|p| p.is_some()).count()
  }
}

impl Pager for MemPager {
  fn page(&self, id: PageId) -> NodeRef<'_> {
    match self.pages.get(id as usize) {
      Some(Some(buf)) => Node::new(&buf[..]),
      _ => panic!("page {id} not published"),
    }
  }

  fn alloc(&self, node: Node) -> PageId {
    assert!(node.nbytes() <= PAGE_SIZE, "alloc oversized node");
    let mut staged = self.staged.borrow_mut();
    let id = (self.pages.len() + staged.len()) as PageId;
    staged.push(node);
    id
  }

  fn dealloc(&self, id: PageId) {
    self.freed.borrow_mut().push(id);
  }
}
