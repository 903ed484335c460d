//! Page store tests / 页存储测试

use std::{fs, path::Path};

use aok::{OK, Void};
use cowkv_page::{Conf, Error, MMAP_ALIGN, Master, PageStore, Result};
use cowkv_tree::{BTree, PAGE_SIZE, Pager};
use log::info;
use zerocopy::IntoBytes;

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

const NOSYNC: &[Conf] = &[Conf::Sync(false)];

fn open(path: &Path, conf: &[Conf]) -> Result<BTree<PageStore>> {
  let store = PageStore::open(path, conf)?;
  let root = store.root();
  Ok(BTree::open(store, root))
}

fn set(tree: &mut BTree<PageStore>, key: &[u8], val: &[u8]) -> Result<()> {
  tree.insert(key, val);
  let root = tree.root();
  tree.pager_mut().flush(root)
}

fn del(tree: &mut BTree<PageStore>, key: &[u8]) -> Result<bool> {
  let found = tree.delete(key);
  let root = tree.root();
  tree.pager_mut().flush(root)?;
  Ok(found)
}

#[test]
fn fresh_file() -> Void {
  let dir = tempfile::tempdir()?;
  let store = PageStore::open(dir.path().join("db"), &[])?;
  assert_eq!(store.root(), 0);
  let stat = store.stat();
  assert_eq!(stat.flushed, 1);
  assert_eq!(stat.staged, 0);
  assert_eq!(stat.file_size, 0);
  assert_eq!(stat.regions, 1);
  assert_eq!(stat.mapped, 64 * 1024 * 1024);
  store.close();
  OK
}

#[test]
fn reopen_round_trip() -> Void {
  let dir = tempfile::tempdir()?;
  let path = dir.path().join("db");

  {
    let mut tree = open(&path, &[])?;
    set(&mut tree, b"a", b"1")?;
    set(&mut tree, b"b", b"2")?;
    set(&mut tree, b"c", b"3")?;
    assert!(del(&mut tree, b"b")?);
    tree.into_pager().close();
  }

  let tree = open(&path, &[])?;
  assert_eq!(tree.get(b"a"), Some(&b"1"[..]));
  assert_eq!(tree.get(b"b"), None);
  assert_eq!(tree.get(b"c"), Some(&b"3"[..]));

  let size = fs::metadata(&path)?.len();
  assert_eq!(size % PAGE_SIZE as u64, 0);
  assert_eq!(tree.pager().stat().file_size, size);
  OK
}

#[test]
fn staged_pages_invisible_until_flush() -> Void {
  let dir = tempfile::tempdir()?;
  let path = dir.path().join("db");

  {
    let mut tree = open(&path, NOSYNC)?;
    set(&mut tree, b"kept", b"1")?;
    // Dropped without flush, as if the process crashed
    tree.insert(b"lost", b"2");
    assert_eq!(tree.pager().stat().staged, 1);
  }

  let tree = open(&path, NOSYNC)?;
  assert_eq!(tree.get(b"kept"), Some(&b"1"[..]));
  assert_eq!(tree.get(b"lost"), None);
  OK
}

#[test]
fn rollback_restores_root() -> Void {
  let dir = tempfile::tempdir()?;
  let mut tree = open(&dir.path().join("db"), NOSYNC)?;
  set(&mut tree, b"a", b"1")?;
  let root = tree.root();

  tree.insert(b"b", b"2");
  assert_ne!(tree.root(), root);
  tree.pager_mut().rollback();
  let durable = tree.pager().root();
  tree.set_root(durable);

  assert_eq!(tree.root(), root);
  assert_eq!(tree.pager().stat().staged, 0);
  assert_eq!(tree.get(b"b"), None);

  // Ids handed out after a rollback reuse the dropped slots
  set(&mut tree, b"b", b"2")?;
  assert_eq!(tree.get(b"b"), Some(&b"2"[..]));
  OK
}

#[test]
fn noop_flush_skips_master() -> Void {
  let dir = tempfile::tempdir()?;
  let mut tree = open(&dir.path().join("db"), NOSYNC)?;
  set(&mut tree, b"a", b"1")?;
  let before = tree.pager().stat();
  let root = tree.root();
  tree.pager_mut().flush(root)?;
  assert_eq!(tree.pager().stat(), before);
  OK
}

#[test]
fn regions_grow() -> Void {
  let dir = tempfile::tempdir()?;
  let path = dir.path().join("db");
  let conf = [Conf::MmapInit(MMAP_ALIGN), Conf::Sync(false)];
  let val = vec![b'v'; 2000];

  {
    let mut tree = open(&path, &conf)?;
    for i in 0..300u32 {
      set(&mut tree, format!("k{i:04}").as_bytes(), &val)?;
    }
    let stat = tree.pager().stat();
    info!("{stat:?}");
    assert!(stat.regions > 2, "{stat:?}");
    assert!(stat.mapped >= stat.flushed * PAGE_SIZE as u64);
    assert!(stat.file_size >= stat.flushed * PAGE_SIZE as u64);
    // Pages in the first region are still readable
    for i in 0..300u32 {
      assert_eq!(tree.get(format!("k{i:04}").as_bytes()), Some(&val[..]));
    }
    tree.into_pager().close();
  }

  let tree = open(&path, &conf)?;
  let stat = tree.pager().stat();
  assert!(stat.mapped >= stat.file_size);
  for i in 0..300u32 {
    assert_eq!(tree.get(format!("k{i:04}").as_bytes()), Some(&val[..]));
  }
  OK
}

#[test]
fn dealloc_is_counted() -> Void {
  let dir = tempfile::tempdir()?;
  let mut tree = open(&dir.path().join("db"), NOSYNC)?;
  set(&mut tree, b"a", b"1")?;
  assert_eq!(tree.pager().stat().freed, 0);
  set(&mut tree, b"a", b"2")?;
  assert_eq!(tree.pager().stat().freed, 1);
  assert!(del(&mut tree, b"a")?);
  assert_eq!(tree.pager().stat().freed, 2);
  OK
}

fn saved(path: &Path) -> Void {
  let mut tree = open(path, NOSYNC)?;
  set(&mut tree, b"a", b"1")?;
  tree.into_pager().close();
  OK
}

fn patch(path: &Path, at: usize, bytes: &[u8]) -> Void {
  let mut data = fs::read(path)?;
  data[at..at + bytes.len()].copy_from_slice(bytes);
  fs::write(path, data)?;
  OK
}

#[test]
fn reject_bad_magic() -> Void {
  let dir = tempfile::tempdir()?;
  let path = dir.path().join("db");
  saved(&path)?;
  patch(&path, 0, b"x")?;
  assert!(matches!(PageStore::open(&path, &[]), Err(Error::BadMagic)));
  OK
}

#[test]
fn reject_bad_crc() -> Void {
  let dir = tempfile::tempdir()?;
  let path = dir.path().join("db");
  saved(&path)?;
  patch(&path, 16, &7u64.to_le_bytes())?;
  assert!(matches!(PageStore::open(&path, &[]), Err(Error::BadCrc { .. })));
  OK
}

#[test]
fn reject_out_of_bounds() -> Void {
  let dir = tempfile::tempdir()?;
  let path = dir.path().join("db");
  saved(&path)?;
  let pages = fs::metadata(&path)?.len() / PAGE_SIZE as u64;
  patch(&path, 0, Master::new(1, pages + 1).as_bytes())?;
  assert!(matches!(
    PageStore::open(&path, &[]),
    Err(Error::BadMaster { .. })
  ));
  patch(&path, 0, Master::new(2, 2).as_bytes())?;
  assert!(matches!(
    PageStore::open(&path, &[]),
    Err(Error::BadMaster { .. })
  ));
  OK
}

#[test]
fn reject_file_size() -> Void {
  let dir = tempfile::tempdir()?;
  let path = dir.path().join("db");
  fs::write(&path, [0u8; 100])?;
  assert!(matches!(
    PageStore::open(&path, &[]),
    Err(Error::FileSize(100))
  ));
  OK
}

#[test]
fn zeroed_master_is_fresh() -> Void {
  let dir = tempfile::tempdir()?;
  let path = dir.path().join("db");
  fs::write(&path, vec![0u8; 2 * PAGE_SIZE])?;
  let mut tree = open(&path, NOSYNC)?;
  assert_eq!(tree.root(), 0);
  set(&mut tree, b"a", b"1")?;
  assert_eq!(tree.root(), 1);
  assert_eq!(tree.get(b"a"), Some(&b"1"[..]));
  OK
}

#[test]
#[should_panic(expected = "page 0 not readable")]
fn master_page_not_readable() {
  let dir = tempfile::tempdir().unwrap();
  let store = PageStore::open(dir.path().join("db"), NOSYNC).unwrap();
  store.page(0);
}
