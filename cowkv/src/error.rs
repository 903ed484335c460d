//! Error types for cowkv
//! cowkv 错误类型定义

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("Page: {0}")]
  Page(#[from] cowkv_page::Error),

  #[error("empty key")]
  EmptyKey,

  #[error("key {0} bytes > {max}", max = cowkv_tree::MAX_KEY)]
  KeyTooLarge(usize),

  #[error("val {0} bytes > {max}", max = cowkv_tree::MAX_VAL)]
  ValTooLarge(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
