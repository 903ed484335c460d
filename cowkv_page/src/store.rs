//! Memory-mapped page store
//! 内存映射页存储
//!
//! ```text
//! file:    | master | page 1 | page 2 | ...                     |
//! regions: |<-- init -->|<-- init -->|<---- 2 * init ---->| ...
//! ```
//!
//! The mapping grows by adding regions, never by remapping, so page views
//! handed out by [`PageStore::page`] stay valid for the life of the store.
//! 映射通过追加区域增长而非重新映射，页视图在存储生命周期内一直有效。

use std::{
  cell::{Cell, RefCell},
  fs::{File, OpenOptions},
  path::{Path, PathBuf},
};

use cowkv_tree::{Node, NodeRef, PAGE_SIZE, PageId, Pager};
use log::{debug, info, warn};
use memmap2::{MmapMut, MmapOptions};
use zerocopy::IntoBytes;

use crate::{
  Conf, ParsedConf, Result,
  master::{MASTER_SIZE, Master},
};

const PAGE: u64 = PAGE_SIZE as u64;

/// Store counters / 存储统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stat {
  /// Pages on disk including the master / 已落盘页数（含主记录页）
  pub flushed: u64,
  /// Pages waiting for the next flush / 待刷盘页数
  pub staged: u64,
  /// Deallocated but never reclaimed / 已释放但未回收
  pub freed: u64,
  pub mapped: u64,
  pub regions: usize,
  pub file_size: u64,
}

/// Page store over one file / 单文件页存储
pub struct PageStore {
  // Unmapped before the file is closed
  regions: Vec<MmapMut>,
  file: File,
  path: PathBuf,
  conf: ParsedConf,
  mapped: u64,
  file_pages: u64,
  root: PageId,
  flushed: u64,
  staged: RefCell<Vec<Vec<u8>>>,
  freed: Cell<u64>,
  #[cfg(any(test, feature = "fault"))]
  fault: Option<Fault>,
}

/// Flush step that can be made to fail / 可注入失败的刷盘步骤
#[cfg(any(test, feature = "fault"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
  /// After pages are copied, before they are synced / 数据页已拷贝、未同步
  Pages,
  /// After the new master is written to the mapping / 新主记录已写入映射
  Master,
}

impl PageStore {
  /// Open or create / 打开或创建
  pub fn open(path: impl AsRef<Path>, conf: &[Conf]) -> Result<Self> {
    let path = path.as_ref().to_path_buf();
    let conf = ParsedConf::new(conf);

    let file = OpenOptions::new()
      .read(true)
      .write(true)
      .create(true)
      .truncate(false)
      .open(&path)?;
    let size = file.metadata()?.len();
    if size % PAGE != 0 {
      return Err(crate::Error::FileSize(size));
    }
    let file_pages = size / PAGE;

    let mut mapped = conf.mmap_init as u64;
    while mapped < size {
      mapped *= 2;
    }
    // SAFETY: the file is owned by this store for its whole life and only
    // accessed through these mappings.
    let region = unsafe { MmapOptions::new().len(mapped as usize).map_mut(&file)? };

    let master = &region[..MASTER_SIZE];
    let (root, flushed) = if file_pages == 0 || master.iter().all(|&b| b == 0) {
      // New file, or a crash before the first master write
      (0, 1)
    } else {
      match Master::load(master, file_pages) {
        Ok(m) => (m.root(), m.flushed()),
        Err(e) => {
          warn!("{}: master rejected: {e}", path.display());
          return Err(e);
        }
      }
    };

    info!(
      "open {} root {root} flushed {flushed} file pages {file_pages}",
      path.display()
    );
    Ok(Self {
      regions: vec![region],
      file,
      path,
      conf,
      mapped,
      file_pages,
      root,
      flushed,
      staged: RefCell::default(),
      freed: Cell::new(0),
      #[cfg(any(test, feature = "fault"))]
      fault: None,
    })
  }

  /// Root of the last durable flush / 最近一次持久化的根
  #[inline]
  pub fn root(&self) -> PageId {
    self.root
  }

  #[inline]
  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn stat(&self) -> Stat {
    Stat {
      flushed: self.flushed,
      staged: self.staged.borrow().len() as u64,
      freed: self.freed.get(),
      mapped: self.mapped,
      regions: self.regions.len(),
      file_size: self.file_pages * PAGE,
    }
  }

  /// Persist staged pages, then commit `root` in the master record
  /// 持久化暂存页，再将 root 写入主记录提交
  pub fn flush(&mut self, root: PageId) -> Result<()> {
    let staged = self.staged.get_mut().len() as u64;
    if staged == 0 && root == self.root {
      return Ok(());
    }
    let npages = self.flushed + staged;
    assert!(root < npages, "root {root} >= pages {npages}");

    let grown = self.extend_file(npages)?;
    self.extend_mmap(npages)?;

    let begin = self.flushed;
    for (i, page) in self.staged.get_mut().iter().enumerate() {
      let (r, off) = locate(&self.regions, begin + i as u64);
      self.regions[r][off..off + PAGE_SIZE].copy_from_slice(page);
    }
    #[cfg(any(test, feature = "fault"))]
    self.inject(Fault::Pages)?;
    if self.conf.sync {
      sync_range(&self.regions, begin * PAGE, npages * PAGE)?;
      if grown {
        self.file.sync_data()?;
      }
    }

    // Nothing advances until the master is durable
    let mut prev = [0u8; MASTER_SIZE];
    prev.copy_from_slice(&self.regions[0][..MASTER_SIZE]);
    let master = Master::new(root, npages);
    self.regions[0][..MASTER_SIZE].copy_from_slice(master.as_bytes());
    if let Err(e) = self.sync_master() {
      self.regions[0][..MASTER_SIZE].copy_from_slice(&prev);
      warn!("{}: master sync failed, kept root {}", self.path.display(), self.root);
      return Err(e);
    }

    self.flushed = npages;
    self.staged.get_mut().clear();
    self.root = root;
    debug!("flush {staged} pages, root {root} flushed {npages}");
    Ok(())
  }

  /// Drop staged pages after a failed operation / 失败后丢弃暂存页
  pub fn rollback(&mut self) {
    let n = self.staged.get_mut().len();
    if n > 0 {
      debug!("rollback {n} staged pages");
      self.staged.get_mut().clear();
    }
  }

  /// Unmap and close / 解除映射并关闭
  pub fn close(self) {
    info!("close {} root {} flushed {}", self.path.display(), self.root, self.flushed);
  }

  fn sync_master(&mut self) -> Result<()> {
    #[cfg(any(test, feature = "fault"))]
    self.inject(Fault::Master)?;
    if self.conf.sync {
      self.regions[0].flush_range(0, PAGE_SIZE)?;
    }
    Ok(())
  }

  /// Fail the next flush at `at` / 令下一次刷盘在 `at` 处失败
  #[cfg(any(test, feature = "fault"))]
  pub fn fail_next(&mut self, at: Fault) {
    self.fault = Some(at);
  }

  #[cfg(any(test, feature = "fault"))]
  fn inject(&mut self, at: Fault) -> Result<()> {
    if self.fault == Some(at) {
      self.fault = None;
      return Err(std::io::Error::other(format!("injected {at:?} failure")).into());
    }
    Ok(())
  }

  /// Grow the file in steps of at least 1/8, return whether it grew
  /// 以至少 1/8 的步长扩展文件
  fn extend_file(&mut self, npages: u64) -> Result<bool> {
    if npages <= self.file_pages {
      return Ok(false);
    }
    let mut pages = self.file_pages;
    while pages < npages {
      pages += (pages / 8).max(1);
    }
    self.file.set_len(pages * PAGE)?;
    self.file_pages = pages;
    Ok(true)
  }

  /// Map a new region doubling the mapped size / 追加区域使映射翻倍
  fn extend_mmap(&mut self, npages: u64) -> Result<()> {
    while self.mapped < npages * PAGE {
      // SAFETY: same as in `open`; the new region does not overlap older ones.
      let region = unsafe {
        MmapOptions::new()
          .offset(self.mapped)
          .len(self.mapped as usize)
          .map_mut(&self.file)?
      };
      self.regions.push(region);
      self.mapped *= 2;
      warn!(
        "{}: mapping grown to {} bytes in {} regions",
        self.path.display(),
        self.mapped,
        self.regions.len()
      );
    }
    Ok(())
  }
}

/// Region index and byte offset holding page `id` / 页所在的区域与偏移
fn locate(regions: &[MmapMut], id: PageId) -> (usize, usize) {
  let mut pos = id * PAGE;
  for (i, region) in regions.iter().enumerate() {
    let len = region.len() as u64;
    if pos < len {
      return (i, pos as usize);
    }
    pos -= len;
  }
  panic!("page {id} beyond mapping");
}

/// msync file bytes `begin..end` across regions / 跨区域同步文件区间
fn sync_range(regions: &[MmapMut], begin: u64, end: u64) -> Result<()> {
  let mut start = 0u64;
  for region in regions {
    let stop = start + region.len() as u64;
    let (b, e) = (begin.max(start), end.min(stop));
    if b < e {
      region.flush_range((b - start) as usize, (e - b) as usize)?;
    }
    start = stop;
  }
  Ok(())
}

impl Pager for PageStore {
  fn page(&self, id: PageId) -> NodeRef<'_> {
    assert!(
      id != 0 && id < self.flushed,
      "page {id} not readable, flushed {}",
      self.flushed
    );
    let (r, off) = locate(&self.regions, id);
    Node::new(&self.regions[r][off..off + PAGE_SIZE])
  }

  fn alloc(&self, node: Node) -> PageId {
    assert!(node.nbytes() <= PAGE_SIZE, "alloc {} bytes", node.nbytes());
    let mut page = node.into_inner();
    page.resize(PAGE_SIZE, 0);
    let mut staged = self.staged.borrow_mut();
    let id = self.flushed + staged.len() as PageId;
    staged.push(page);
    id
  }

  fn dealloc(&self, _id: PageId) {
    self.freed.set(self.freed.get() + 1);
  }
}
