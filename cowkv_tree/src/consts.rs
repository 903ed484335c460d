//! Constants / 常量

/// Page size / 页大小
pub const PAGE_SIZE: usize = 4096;

/// type(2) + nkeys(2)
pub const HEADER: usize = 4;

/// Max key size / 键最大长度
pub const MAX_KEY: usize = 1000;

/// Max value size / 值最大长度
pub const MAX_VAL: usize = 3000;

/// Internal node tag / 内部节点
pub const NODE_INTERNAL: u16 = 1;

/// Leaf node tag / 叶子节点
pub const NODE_LEAF: u16 = 2;

/// A child at or below this size looks for a sibling to merge with
/// 子节点不超过此大小时尝试与兄弟合并
pub const MERGE_MAX: usize = PAGE_SIZE / 4;

// A single maximal entry must fit one page with its header.
const _: () = assert!(HEADER + 8 + 2 + 4 + MAX_KEY + MAX_VAL <= PAGE_SIZE);
