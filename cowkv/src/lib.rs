#![cfg_attr(docsrs, feature(doc_cfg))]

//! Embedded key-value store on a copy-on-write B+ tree
//! 基于写时复制 B+ 树的嵌入式键值存储
//!
//! ```no_run
//! let mut kv = cowkv::Kv::open("cowkv.db", &[])?;
//! kv.set(b"a", b"1")?;
//! assert_eq!(kv.get(b"a"), Some(&b"1"[..]));
//! kv.close();
//! # Ok::<(), cowkv::Error>(())
//! ```

mod error;
mod kv;

pub use cowkv_page::{Conf, Stat};
pub use cowkv_tree::{MAX_KEY, MAX_VAL};
pub use error::{Error, Result};
pub use kv::Kv;
