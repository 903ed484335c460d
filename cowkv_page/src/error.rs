//! Error types for cowkv_page
//! cowkv_page 错误类型定义

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("IO: {0}")]
  Io(#[from] std::io::Error),

  /// File size is not a whole number of pages / 文件大小不是页的整数倍
  #[error("file size {0} is not a multiple of the page size")]
  FileSize(u64),

  #[error("bad master magic")]
  BadMagic,

  #[error("master crc mismatch: stored {stored:#010x}, computed {computed:#010x}")]
  BadCrc { stored: u32, computed: u32 },

  /// Root or page count out of file bounds / 根或页数越界
  #[error("bad master: root {root}, flushed {flushed}, file pages {file_pages}")]
  BadMaster {
    root: u64,
    flushed: u64,
    file_pages: u64,
  },
}

pub type Result<T> = std::result::Result<T, Error>;
