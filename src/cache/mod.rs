//! 块缓存模块
//!
//! 固定容量、多线程共享的块缓存，位于调用者和慢速块设备之间：
//!
//! - 同一个块在缓存中最多只有一份；
//! - 每个缓存块同一时刻最多一个使用者（独占锁）；
//! - 容量用尽时驱逐最久未使用且未被引用的缓存块。
//!
//! # 主要组件
//!
//! - [`BufferCache`] - 对外接口：read / write / release / pin / unpin
//! - [`BufGuard`] / [`PinnedBlock`] - 独占持有与固定引用的 RAII 句柄
//! - [`CacheConfig`] - 缓存块数量、分桶数量、块大小、耗尽策略
//! - [`CacheStats`] - 缓存统计信息
//!
//! # 设计原理
//!
//! 缓存块池按块标识的哈希分到若干分桶，每个分桶一把分桶锁、一条下标链表。
//! 命中只锁一个分桶；未命中才拿全局锁，在全局锁下复查、扫描全部分桶找出
//! 释放时间最早的空闲缓存块，并把它迁移到新标识的分桶。
//!
//! 记账信息（标识、引用计数、释放时间、链表）归分桶锁保护，块数据与有效
//! 标志归独占锁保护，两个锁域互不交叉。
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use bcache_core::{BufferCache, CacheConfig, BlockId, RamDisk};
//!
//! let cache = BufferCache::new(CacheConfig::default(), RamDisk::new(1024))?;
//!
//! // 日志层：读入后固定，释放独占锁，提交完成后再取消固定
//! let buf = cache.read(BlockId::new(1, 2))?;
//! let pinned = cache.pin(&buf)?;
//! cache.release(buf)?;
//! // ...
//! cache.unpin(pinned)?;
//!
//! let stats = cache.stats();
//! println!("hit rate {:.2}", stats.hit_rate());
//! ```

mod bucket;
mod buffer_cache;
mod config;
mod coordinator;
mod handle;
mod slot;
mod stats;

pub use buffer_cache::{BufferCache, SlotInfo};
pub use config::{CacheConfig, ExhaustionPolicy};
pub use handle::{BufGuard, PinnedBlock};
pub use stats::CacheStats;
