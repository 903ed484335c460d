#![cfg_attr(docsrs, feature(doc_cfg))]

//! Page store for the cowkv B+ tree
//! cowkv B+ 树的页存储
//!
//! Page 0 holds the master record, tree pages start at 1. New pages are staged
//! in memory and only become readable after [`PageStore::flush`].

mod conf;
mod error;
pub mod master;
mod store;

pub use conf::{Conf, MMAP_ALIGN, ParsedConf, default};
pub use error::{Error, Result};
pub use master::{MAGIC, MASTER_SIZE, Master};
pub use store::{PageStore, Stat};
#[cfg(any(test, feature = "fault"))]
pub use store::Fault;
