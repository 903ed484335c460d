//! Error types for cowkv_cli
//! cowkv_cli 错误类型定义

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  #[error("IO: {0}")]
  Io(#[from] std::io::Error),

  #[error("{0}")]
  Kv(#[from] cowkv::Error),

  #[error("unknown command '{0}'")]
  UnknownCmd(String),

  #[error("unknown option '{0}'")]
  UnknownArg(String),

  #[error("more than one database path")]
  ManyPath,
}

pub type Result<T> = std::result::Result<T, Error>;
