//! 缓存常量定义
//!
//! 这个模块包含了块缓存的默认参数：
//! - 块大小与扇区大小
//! - 缓存块数量与分桶数量

//=============================================================================
// 块大小
//=============================================================================

/// 默认块大小（1024 字节）
pub const BSIZE: usize = 1024;

/// 默认物理扇区大小（512 字节）
pub const DEFAULT_SECTOR_SIZE: u32 = 512;

//=============================================================================
// 缓存规模
//=============================================================================

/// 默认缓存块数量
pub const NBUF: usize = 30;

/// 默认分桶数量
pub const NBUCKET: usize = 13;

