//! 分桶与全局锁协调
//!
//! 缓存块池按 `hash(BlockId) % nbucket` 分到若干分桶，每个分桶有自己的
//! 分桶锁。查找命中只需要一个分桶锁；未命中时要在全部分桶里找最久未
//! 使用的空闲缓存块并把它迁移到新标识的分桶，这一步由全局锁串行化。
//!
//! # 锁层级
//!
//! - 分桶锁只在本模块内加锁：[`Coordinator`] 的每个入口自己创建一个
//!   [`ShardToken`]，`shard` 要求可变借用令牌，所以一个入口只能拿着一个
//!   [`ShardGuard`]，返回前释放。模块外拿不到令牌，也拿不到分桶锁。
//! - 同时持有两个分桶锁只发生在 LRU 扫描中，扫描是 [`EvictToken`] 的方法，
//!   而 `EvictToken` 只能在持有全局锁时构造。扫描按分桶编号升序加锁。
//! - 分桶锁和全局锁都不会跨越设备 I/O 或缓存块独占锁的获取。

use super::bucket::BucketList;
use super::config::ExhaustionPolicy;
use super::slot::SlotMeta;
use super::stats::StatsCounters;
use crate::error::{Error, ErrorKind, Result};
use crate::types::BlockId;
use alloc::boxed::Box;
use alloc::vec::Vec;
use spin::{Mutex, MutexGuard};

/// 普通路径的分桶锁令牌
///
/// 每个入口创建一个，借出期间只能持有一个分桶锁。
struct ShardToken(());

impl ShardToken {
    const fn new() -> Self {
        Self(())
    }
}

/// 持有中的分桶锁
struct ShardGuard<'t> {
    key: usize,
    list: MutexGuard<'t, BucketList>,
}

impl ShardGuard<'_> {
    /// 查找持有 `id` 的缓存块，找到则增加引用计数
    fn try_get(&mut self, id: BlockId) -> Option<usize> {
        let slot = self.list.find(id)?;
        let meta = self.list.meta_mut(slot)?;
        meta.ref_count += 1;
        Some(slot)
    }

    /// 增加引用计数
    fn pin(&mut self, slot: usize) {
        match self.list.meta_mut(slot) {
            Some(meta) => meta.ref_count += 1,
            None => debug_assert!(false, "slot {} not in bucket {}", slot, self.key),
        }
    }

    /// 减少引用计数，返回剩余计数
    ///
    /// 计数降到 0 且给出了时间戳时记录释放时间。
    fn unpin(&mut self, slot: usize, stamp: Option<u64>) -> u32 {
        let Some(meta) = self.list.meta_mut(slot) else {
            debug_assert!(false, "slot {} not in bucket {}", slot, self.key);
            return 0;
        };
        debug_assert!(meta.ref_count > 0, "slot {} reference count underflow", slot);
        meta.ref_count = meta.ref_count.saturating_sub(1);
        if meta.ref_count == 0 {
            if let Some(stamp) = stamp {
                meta.last_release = stamp;
            }
        }
        meta.ref_count
    }

    /// 分桶内所有缓存块的记账信息
    fn entries(&self) -> impl Iterator<Item = (usize, SlotMeta)> + '_ {
        self.list
            .iter()
            .filter_map(move |slot| self.list.meta(slot).map(|meta| (slot, *meta)))
    }
}

/// 全局锁凭证
///
/// 持有期间可以执行跨分桶的 LRU 扫描和迁移。
pub(crate) struct EvictToken<'a> {
    coord: &'a Coordinator,
    _global: MutexGuard<'a, ()>,
}

/// 一次驱逐的结果
#[derive(Debug, Clone, Copy)]
pub(crate) struct Replacement {
    /// 被复用的缓存块
    pub slot: usize,
    /// 复用前缓存块所在的分桶
    pub from: usize,
    /// 复用前缓存块的标识
    pub previous: Option<BlockId>,
    /// 扫描时可驱逐的缓存块数量
    pub eligible: usize,
}

impl<'a> EvictToken<'a> {
    /// 在全局锁下复查 `bucket[key]`
    ///
    /// 释放分桶锁到拿到全局锁之间，其他线程可能已经为同一块完成了驱逐。
    pub fn recheck(&mut self, id: BlockId, key: usize) -> Option<usize> {
        let mut list = self.coord.buckets[key].lock();
        let slot = list.find(id)?;
        let meta = list.meta_mut(slot)?;
        meta.ref_count += 1;
        Some(slot)
    }

    /// 选出全局最久未使用的空闲缓存块，改作 `id` 使用并迁移到 `bucket[key]`
    ///
    /// 没有空闲缓存块时返回 None，此时没有修改任何状态。
    pub fn replace_lru(&mut self, id: BlockId, key: usize) -> Option<Replacement> {
        let coord = self.coord;
        let mut best: Option<(usize, usize, MutexGuard<'a, BucketList>)> = None;
        let mut min_stamp: Option<u64> = None;
        let mut eligible = 0;

        for (index, bucket) in coord.buckets.iter().enumerate() {
            let list = bucket.lock();
            let mut found = None;
            for slot in list.iter() {
                let Some(meta) = list.meta(slot) else { continue };
                if meta.is_referenced() {
                    continue;
                }
                eligible += 1;
                if min_stamp.map_or(true, |min| meta.last_release < min) {
                    min_stamp = Some(meta.last_release);
                    found = Some(slot);
                }
            }
            if let Some(slot) = found {
                // 替换后旧的最小值所在分桶的锁随之释放
                best = Some((slot, index, list));
            }
        }

        let (slot, from, mut list) = best?;
        let meta = list.meta_mut(slot)?;
        let previous = meta.identity;
        meta.identity = Some(id);
        meta.ref_count = 1;

        if from != key {
            let meta = list.remove(slot)?;
            drop(list);
            let mut home = coord.buckets[key].lock();
            home.insert(slot, meta);
        }

        Some(Replacement {
            slot,
            from,
            previous,
            eligible,
        })
    }
}

/// 分桶集合与全局锁
pub(crate) struct Coordinator {
    buckets: Box<[Mutex<BucketList>]>,
    global: Mutex<()>,
    nbuf: usize,
}

impl Coordinator {
    /// 把 `nbuf` 个缓存块轮流分配到 `nbucket` 个分桶
    pub fn new(nbuf: usize, nbucket: usize, stamp: u64) -> Self {
        let mut lists: Vec<BucketList> = (0..nbucket).map(|_| BucketList::new(nbuf)).collect();
        for slot in 0..nbuf {
            lists[slot % nbucket].insert(slot, SlotMeta::new(stamp));
        }
        Self {
            buckets: lists.into_iter().map(Mutex::new).collect(),
            global: Mutex::new(()),
            nbuf,
        }
    }

    /// 分桶数量
    pub fn nbucket(&self) -> usize {
        self.buckets.len()
    }

    fn shard<'t>(&'t self, _token: &'t mut ShardToken, key: usize) -> ShardGuard<'t> {
        ShardGuard {
            key,
            list: self.buckets[key].lock(),
        }
    }

    /// 在 `bucket[key]` 中给缓存块增加一个引用
    pub fn pin(&self, key: usize, slot: usize) {
        let mut token = ShardToken::new();
        self.shard(&mut token, key).pin(slot);
    }

    /// 在 `bucket[key]` 中归还缓存块的一个引用，返回剩余计数
    pub fn unpin(&self, key: usize, slot: usize, stamp: Option<u64>) -> u32 {
        let mut token = ShardToken::new();
        let remaining = self.shard(&mut token, key).unpin(slot, stamp);
        remaining
    }

    /// `bucket[key]` 中是否有缓存块持有 `id`
    pub fn contains(&self, key: usize, id: BlockId) -> bool {
        let mut token = ShardToken::new();
        let shard = self.shard(&mut token, key);
        let found = shard.entries().any(|(_, meta)| meta.holds(id));
        found
    }

    /// `bucket[key]` 中所有缓存块的记账信息副本
    pub fn bucket_entries(&self, key: usize) -> Vec<(usize, SlotMeta)> {
        let mut token = ShardToken::new();
        let shard = self.shard(&mut token, key);
        let entries = shard.entries().collect();
        entries
    }

    fn evict_token(&self) -> EvictToken<'_> {
        EvictToken {
            coord: self,
            _global: self.global.lock(),
        }
    }

    /// 为 `id` 预留一个缓存块（引用计数已加 1）
    ///
    /// 返回缓存块编号和是否命中。调用者随后获取该缓存块的独占锁。
    pub fn reserve(
        &self,
        id: BlockId,
        stats: &StatsCounters,
        policy: ExhaustionPolicy,
    ) -> Result<(usize, bool)> {
        let key = id.bucket(self.nbucket());

        let mut token = ShardToken::new();
        let hit = self.shard(&mut token, key).try_get(id);
        if let Some(slot) = hit {
            StatsCounters::bump(&stats.hits);
            log::trace!("[BCACHE] bget {} HIT slot={} bucket={}", id, slot, key);
            return Ok((slot, true));
        }

        let mut evict = self.evict_token();
        if let Some(slot) = evict.recheck(id, key) {
            StatsCounters::bump(&stats.hits);
            log::trace!("[BCACHE] bget {} HIT on recheck slot={} bucket={}", id, slot, key);
            return Ok((slot, true));
        }

        StatsCounters::bump(&stats.misses);
        let Some(replaced) = evict.replace_lru(id, key) else {
            StatsCounters::bump(&stats.exhaustions);
            log::error!("[BCACHE] bget {} MISS: all {} buffers are referenced", id, self.nbuf);
            return match policy {
                ExhaustionPolicy::Panic => panic!("bget: no buffers"),
                ExhaustionPolicy::ReturnError => Err(Error::new(
                    ErrorKind::CacheExhausted,
                    "bget: no buffers",
                )),
            };
        };
        drop(evict);

        StatsCounters::bump(&stats.evictions);
        if replaced.from != key {
            StatsCounters::bump(&stats.relocations);
        }
        if replaced.eligible == 1 {
            log::warn!("[BCACHE] bget {} took the last unreferenced buffer", id);
        }
        log::debug!(
            "[BCACHE] bget {} MISS: slot={} evicted {:?}, bucket {} -> {}",
            id,
            replaced.slot,
            replaced.previous,
            replaced.from,
            key
        );

        Ok((replaced.slot, false))
    }

    /// 缓存块总数
    pub fn nbuf(&self) -> usize {
        self.nbuf
    }
}
