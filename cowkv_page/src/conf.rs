//! Page store configuration
//! 页存储配置

const KB: usize = 1024;
const MB: usize = 1024 * KB;

/// Mapping sizes are kept on this boundary so every extra region starts at a
/// valid mmap offset on all platforms
pub const MMAP_ALIGN: usize = 64 * KB;

/// Default configuration values
/// 默认配置值
pub mod default {
  use super::MB;

  pub const MMAP_INIT: usize = 64 * MB;
  pub const SYNC: bool = true;
}

/// Page store configuration
/// 页存储配置
#[derive(Debug, Clone, Copy)]
pub enum Conf {
  /// Initial mapping size in bytes
  /// 初始映射大小（字节）
  MmapInit(usize),
  /// msync / fsync on flush
  /// 刷盘时同步
  Sync(bool),
}

/// Parsed configuration
/// 解析后的配置
#[derive(Debug, Clone, Copy)]
pub struct ParsedConf {
  pub mmap_init: usize,
  pub sync: bool,
}

impl Default for ParsedConf {
  fn default() -> Self {
    Self {
      mmap_init: default::MMAP_INIT,
      sync: default::SYNC,
    }
  }
}

impl ParsedConf {
  pub fn new(conf: &[Conf]) -> Self {
    let mut c = Self::default();
    for item in conf {
      match *item {
        Conf::MmapInit(v) => c.mmap_init = v.max(1).div_ceil(MMAP_ALIGN) * MMAP_ALIGN,
        Conf::Sync(v) => c.sync = v,
      }
    }
    c
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse() {
    let c = ParsedConf::new(&[]);
    assert_eq!(c.mmap_init, 64 * MB);
    assert!(c.sync);

    let c = ParsedConf::new(&[Conf::MmapInit(0), Conf::Sync(false)]);
    assert_eq!(c.mmap_init, MMAP_ALIGN);
    assert!(!c.sync);

    let c = ParsedConf::new(&[Conf::MmapInit(MMAP_ALIGN + 1)]);
    assert_eq!(c.mmap_init, 2 * MMAP_ALIGN);
  }
}
