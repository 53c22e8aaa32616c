//! bcache_core: 分桶锁块缓存
//!
//! 这是一个纯 Rust 实现的块缓存（buffer cache），位于文件系统与块设备之间：
//! - **零 unsafe 代码**
//! - 分桶锁 + 全局锁的两级锁层级，命中路径只锁一个分桶
//! - 引用计数与 LRU 驱逐，被引用的块永不驱逐
//! - 设备与时钟作为 trait 注入
//!
//! # 示例
//!
//! ```rust,ignore
//! use bcache_core::{BlockId, BufferCache, CacheConfig, RamDisk, Result};
//!
//! fn main() -> Result<()> {
//!     let cache = BufferCache::new(CacheConfig::default(), RamDisk::new(1024))?;
//!
//!     let mut buf = cache.read(BlockId::new(1, 1))?;
//!     buf.data_mut()[0] = 0x42;
//!     buf.write()?;
//!     cache.release(buf)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # 模块结构
//!
//! - [`error`] - 错误类型定义
//! - [`block`] - 块设备抽象
//! - [`clock`] - 逻辑时钟
//! - [`consts`] - 常量定义
//! - [`types`] - 块标识
//! - [`cache`] - 块缓存

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

/// 错误处理
pub mod error;

/// 块设备抽象
pub mod block;

/// 逻辑时钟
pub mod clock;

/// 常量定义
pub mod consts;

/// 数据结构定义
pub mod types;

/// 块缓存
pub mod cache;

// ===== 公共导出 =====

// 错误处理
pub use error::{Error, ErrorKind, Result};

// 块设备
pub use block::{BlockDevice, RamDisk};

// 时钟
pub use clock::{Clock, CountingClock, ManualClock, TickClock};

// 块标识
pub use types::BlockId;

// Cache
pub use cache::{
    BufGuard, BufferCache, CacheConfig, CacheStats, ExhaustionPolicy, PinnedBlock, SlotInfo,
};
