//! Page callbacks injected into the tree / 注入树的页回调

use crate::node::{Node, NodeRef, PageId};

/// Dereference, allocate and deallocate pages
/// 解引用、分配、释放页
///
/// All methods take `&self`: a mutation keeps reading old pages while it
/// allocates new ones, so implementors stage allocations behind a `RefCell`
/// and only publish them from a `&mut self` flush.
pub trait Pager {
  /// Zero-copy view of a published page / 已发布页的零拷贝视图
  fn page(&self, id: PageId) -> NodeRef<'_>;

  /// Stage a committed node and return its new id / 暂存节点并返回新 ID
  fn alloc(&self, node: Node) -> PageId;

  /// The page is no longer reachable from the next root
  /// 页不再可从新根到达
  fn dealloc(&self, id: PageId);
}
