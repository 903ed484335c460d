#![cfg_attr(docsrs, feature(doc_cfg))]

//! Copy-on-write B+ tree over fixed-size pages
//! 基于定长页的写时复制 B+ 树

pub mod algo;
mod consts;
mod mem;
mod node;
mod pager;
mod tree;

pub use consts::{HEADER, MAX_KEY, MAX_VAL, MERGE_MAX, NODE_INTERNAL, NODE_LEAF, PAGE_SIZE};
pub use mem::MemPager;
pub use node::{Node, NodeRef, PageId};
pub use pager::Pager;
pub use tree::BTree;
