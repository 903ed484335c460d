//! Master record in page 0
//! 第 0 页的主记录
//!
//! ```text
//! | magic(16) | root(8) | flushed(8) | crc32(4) | pad(4) |
//! |<---------- crc32 covers ------->|
//! ```
//!
//! Writing it is the commit point of a flush: until then the previous root
//! stays the one visible after a crash.

use cowkv_tree::PageId;
use zerocopy::{
  FromBytes, Immutable, IntoBytes, KnownLayout,
  little_endian::{U32, U64},
};

use crate::{Error, Result};

pub const MAGIC: [u8; 16] = *b"cowkv-master-v01";

/// Encoded size (40 bytes) / 编码大小
pub const MASTER_SIZE: usize = size_of::<Master>();

/// Bytes covered by the checksum / 校验覆盖的字节数
pub const CRC_COVER: usize = 32;

/// Master record / 主记录
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Clone, Copy, Debug)]
#[repr(C)]
pub struct Master {
  pub magic: [u8; 16],
  pub root: U64,
  pub flushed: U64,
  pub crc: U32,
  pub _pad: U32,
}

impl Master {
  pub fn new(root: PageId, flushed: u64) -> Self {
    let mut m = Self {
      magic: MAGIC,
      root: root.into(),
      flushed: flushed.into(),
      crc: 0.into(),
      _pad: 0.into(),
    };
    m.crc = crc32fast::hash(&m.as_bytes()[..CRC_COVER]).into();
    m
  }

  #[inline]
  pub fn root(&self) -> PageId {
    self.root.get()
  }

  #[inline]
  pub fn flushed(&self) -> u64 {
    self.flushed.get()
  }

  /// Decode and validate against a file of `file_pages` pages
  /// 解码并按文件页数校验
  pub fn load(buf: &[u8], file_pages: u64) -> Result<Self> {
    let Ok(m) = Self::read_from_prefix(buf).map(|(m, _)| m) else {
      return Err(Error::BadMagic);
    };
    if m.magic != MAGIC {
      return Err(Error::BadMagic);
    }

    let stored = m.crc.get();
    let computed = crc32fast::hash(&buf[..CRC_COVER]);
    if stored != computed {
      return Err(Error::BadCrc { stored, computed });
    }

    let (root, flushed) = (m.root(), m.flushed());
    if flushed < 1 || flushed > file_pages || root >= flushed {
      return Err(Error::BadMaster {
        root,
        flushed,
        file_pages,
      });
    }
    Ok(m)
  }
}
