//! Store API / 存储接口

use std::path::Path;

use cowkv_page::{Conf, PageStore, Stat};
use cowkv_tree::{BTree, MAX_KEY, MAX_VAL};
use log::warn;

use crate::{Error, Result};

/// Key-value store, every write is durable when it returns
/// 键值存储，写操作返回即已持久化
pub struct Kv {
  tree: BTree<PageStore>,
}

fn check_key(key: &[u8]) -> Result<()> {
  if key.is_empty() {
    return Err(Error::EmptyKey);
  }
  if key.len() > MAX_KEY {
    return Err(Error::KeyTooLarge(key.len()));
  }
  Ok(())
}

impl Kv {
  pub fn open(path: impl AsRef<Path>, conf: &[Conf]) -> Result<Self> {
    let store = PageStore::open(path, conf)?;
    let root = store.root();
    Ok(Self {
      tree: BTree::open(store, root),
    })
  }

  /// Value of `key`, `None` if absent or not a valid key
  /// 获取值，不存在或 key 非法时返回 None
  pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
    if key.len() > MAX_KEY {
      return None;
    }
    self.tree.get(key)
  }

  pub fn set(&mut self, key: &[u8], val: &[u8]) -> Result<()> {
    check_key(key)?;
    if val.len() > MAX_VAL {
      return Err(Error::ValTooLarge(val.len()));
    }
    self.tree.insert(key, val);
    self.commit()
  }

  /// Delete `key`, return whether it existed / 删除 key，返回是否存在
  pub fn del(&mut self, key: &[u8]) -> Result<bool> {
    check_key(key)?;
    if !self.tree.delete(key) {
      return Ok(false);
    }
    self.commit()?;
    Ok(true)
  }

  /// Levels from root to leaf / 树高
  pub fn height(&self) -> usize {
    self.tree.height()
  }

  pub fn stat(&self) -> Stat {
    self.tree.pager().stat()
  }

  pub fn close(self) {
    self.tree.into_pager().close();
  }

  /// Flush the new root, or fall back to the last durable one
  /// 刷盘新根，失败则回到上一个持久化的根
  fn commit(&mut self) -> Result<()> {
    let root = self.tree.root();
    let store = self.tree.pager_mut();
    if let Err(e) = store.flush(root) {
      warn!("{}: flush failed: {e}", store.path().display());
      store.rollback();
      let durable = store.root();
      self.tree.set_root(durable);
      return Err(e.into());
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use aok::{OK, Void};
  use cowkv_page::Fault;

  use super::*;

  const NOSYNC: &[Conf] = &[Conf::Sync(false)];

  fn failed_write_is_undone(at: Fault) -> Void {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("db");

    let mut kv = Kv::open(&path, NOSYNC)?;
    for i in 0..50u32 {
      kv.set(format!("k{i:02}").as_bytes(), &[b'v'; 200])?;
    }
    let stat = kv.stat();

    kv.tree.pager_mut().fail_next(at);
    assert!(matches!(kv.set(b"new", b"x"), Err(Error::Page(_))));
    assert_eq!(kv.get(b"new"), None);
    assert_eq!(kv.stat().staged, 0);
    assert_eq!(kv.stat().flushed, stat.flushed);

    kv.tree.pager_mut().fail_next(at);
    assert!(kv.del(b"k07").is_err());
    assert_eq!(kv.get(b"k07"), Some(&[b'v'; 200][..]));

    kv.set(b"after", b"y")?;
    kv.close();

    let kv = Kv::open(&path, NOSYNC)?;
    assert_eq!(kv.get(b"new"), None);
    assert_eq!(kv.get(b"after"), Some(&b"y"[..]));
    for i in 0..50u32 {
      assert_eq!(kv.get(format!("k{i:02}").as_bytes()), Some(&[b'v'; 200][..]));
    }
    OK
  }

  #[test]
  fn master_failure_rolls_back() -> Void {
    failed_write_is_undone(Fault::Master)
  }

  #[test]
  fn page_failure_rolls_back() -> Void {
    failed_write_is_undone(Fault::Pages)
  }
}
