//! 分桶块缓存
//!
//! 对外接口对应 xv6 的 `bread` / `bwrite` / `brelse` / `bpin` / `bunpin`：
//!
//! | xv6              | bcache_core                      |
//! |------------------|----------------------------------|
//! | `binit()`        | [`BufferCache::with_clock()`]     |
//! | `bget()`         | [`BufferCache::get()`]            |
//! | `bread()`        | [`BufferCache::read()`]           |
//! | `bwrite()`       | [`BufferCache::write()`]          |
//! | `brelse()`       | [`BufferCache::release()`]        |
//! | `bpin()`         | [`BufferCache::pin()`]            |
//! | `bunpin()`       | [`BufferCache::unpin()`]          |
//!
//! 分桶锁、全局锁只保护记账信息，且都在设备 I/O 和独占锁获取之前释放。
//! 设备放在自己的锁后面，与缓存的锁互不嵌套。

use super::config::CacheConfig;
use super::coordinator::Coordinator;
use super::handle::{BufGuard, PinnedBlock, SlotRef};
use super::slot::SlotData;
use super::stats::{CacheStats, StatsCounters};
use crate::block::BlockDevice;
use crate::clock::{Clock, CountingClock};
use crate::error::{Error, ErrorKind, Result};
use crate::types::BlockId;
use alloc::boxed::Box;
use alloc::vec::Vec;
use spin::Mutex;

/// 单个缓存块的诊断视图
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInfo {
    /// 缓存块编号
    pub slot: usize,
    /// 当前所在分桶
    pub bucket: usize,
    /// 当前标识
    pub identity: Option<BlockId>,
    /// 引用计数
    pub ref_count: u32,
    /// 最近释放时间
    pub last_release: u64,
    /// 数据是否有效；独占锁被他人持有时为 None
    pub valid: Option<bool>,
}

/// 分桶块缓存
///
/// 固定数量的缓存块在初始化时一次性分配，之后只改作他用，不再创建或销毁。
///
/// # 示例
///
/// ```rust,ignore
/// use bcache_core::{BufferCache, CacheConfig, BlockId, RamDisk};
///
/// let cache = BufferCache::new(CacheConfig::default(), RamDisk::new(1024))?;
///
/// let mut buf = cache.read(BlockId::new(1, 46))?;
/// buf.data_mut()[0] = 1;
/// cache.write(&mut buf)?;
/// cache.release(buf)?;
/// ```
pub struct BufferCache<D: BlockDevice, C: Clock = CountingClock> {
    config: CacheConfig,
    coord: Coordinator,
    slots: Box<[Mutex<SlotData>]>,
    device: Mutex<D>,
    clock: C,
    stats: StatsCounters,
}

impl<D: BlockDevice> BufferCache<D, CountingClock> {
    /// 使用计数时钟创建缓存
    ///
    /// 每次释放取到一个新的时间戳，LRU 顺序就是释放顺序。
    /// 由外部节拍驱动时用 [`BufferCache::with_clock`] 传入
    /// [`TickClock`](crate::clock::TickClock)。
    pub fn new(config: CacheConfig, device: D) -> Result<Self> {
        Self::with_clock(config, device, CountingClock::new())
    }
}

impl<D: BlockDevice, C: Clock> BufferCache<D, C> {
    /// 创建缓存
    ///
    /// 所有缓存块以当前时间戳作为释放时间，轮流挂到各个分桶。
    pub fn with_clock(config: CacheConfig, device: D, clock: C) -> Result<Self> {
        config.validate(device.sector_size())?;
        if device.block_size() != config.block_size {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Device block size does not match cache block size",
            ));
        }

        let stamp = clock.now();
        let coord = Coordinator::new(config.nbuf, config.nbucket, stamp);
        let slots = (0..config.nbuf)
            .map(|_| Mutex::new(SlotData::new(config.block_size)))
            .collect();

        log::debug!(
            "[BCACHE] init: {} buffers of {} bytes in {} buckets",
            config.nbuf,
            config.block_size,
            config.nbucket
        );

        Ok(Self {
            config,
            coord,
            slots,
            device: Mutex::new(device),
            clock,
            stats: StatsCounters::default(),
        })
    }

    /// 获取持有 `id` 的上锁缓存块
    ///
    /// 返回时引用计数已增加、独占锁已持有。数据可能尚未从设备载入。
    fn acquire_slot(&self, id: BlockId) -> Result<BufGuard<'_, D, C>> {
        let (slot, _hit) = self.coord.reserve(id, &self.stats, self.config.exhaustion)?;
        // 预留之后再阻塞获取独占锁，此时不持有任何分桶锁
        let reference = SlotRef::new(self, slot, id, true);
        let mut data = self.slots[slot].lock();
        data.bind(id);
        Ok(BufGuard::new(data, reference))
    }

    /// 获取缓存块但不读取设备
    ///
    /// 对应 lwext4 的 `get_noread`：调用者准备整块覆盖时使用，
    /// 用 [`BufGuard::fill`] 写入数据并标记为有效。
    pub fn get(&self, id: BlockId) -> Result<BufGuard<'_, D, C>> {
        self.acquire_slot(id)
    }

    /// 读取块，返回上锁的缓存块（`bread`）
    ///
    /// 数据无效时从设备载入。设备读取失败时缓存块保持无效并被释放。
    pub fn read(&self, id: BlockId) -> Result<BufGuard<'_, D, C>> {
        let mut buf = self.acquire_slot(id)?;
        if !buf.is_valid() {
            self.load(&mut buf)?;
        }
        Ok(buf)
    }

    fn load(&self, buf: &mut BufGuard<'_, D, C>) -> Result<()> {
        let id = buf.id();
        let result = self.device.lock().read_block(id, &mut buf.slot_data_mut().data);
        if let Err(e) = result {
            log::error!("[BCACHE] device read {} failed: {}", id, e);
            return Err(e);
        }
        StatsCounters::bump(&self.stats.device_reads);
        buf.slot_data_mut().mark_valid();
        log::debug!("[BCACHE] loaded {} into slot {}", id, buf.slot());
        Ok(())
    }

    /// 把缓存块写回设备（`bwrite`）
    ///
    /// 句柄就是独占锁的凭证；句柄不是本缓存发出的时返回 `InvalidState`。
    /// 设备只读时返回 `ReadOnly`，不调用设备的写操作。
    pub fn write(&self, buf: &mut BufGuard<'_, D, C>) -> Result<()> {
        self.check_owner(buf.owner())?;
        let id = buf.id();
        let mut device = self.device.lock();
        if device.is_read_only() {
            log::warn!("[BCACHE] write {} rejected: device is read-only", id);
            return Err(Error::new(ErrorKind::ReadOnly, "Device is read-only"));
        }
        let result = device.write_block(id, &buf.slot_data().data);
        drop(device);
        if let Err(e) = result {
            log::error!("[BCACHE] device write {} failed: {}", id, e);
            return Err(e);
        }
        StatsCounters::bump(&self.stats.device_writes);
        log::debug!("[BCACHE] stored {} from slot {}", id, buf.slot());
        Ok(())
    }

    /// 释放缓存块（`brelse`）
    ///
    /// 先释放独占锁，再在分桶锁下减少引用计数；计数降到 0 时记录释放时间。
    /// 句柄不是本缓存发出的时返回 `InvalidState`，句柄照常归还给它的缓存。
    pub fn release(&self, buf: BufGuard<'_, D, C>) -> Result<()> {
        let owned = self.check_owner(buf.owner());
        drop(buf);
        owned
    }

    /// 固定缓存块（`bpin`）
    ///
    /// 增加引用计数而不占用独占锁，块在返回的 [`PinnedBlock`] 存活期间不会被驱逐。
    pub fn pin<'a>(&'a self, buf: &BufGuard<'a, D, C>) -> Result<PinnedBlock<'a, D, C>> {
        self.check_owner(buf.owner())?;
        Ok(self.pin_slot(buf.slot(), buf.id()))
    }

    /// 取消固定（`bunpin`）
    pub fn unpin(&self, pinned: PinnedBlock<'_, D, C>) -> Result<()> {
        let owned = self.check_owner(pinned.owner());
        drop(pinned);
        owned
    }

    /// 刷新设备
    pub fn flush(&self) -> Result<()> {
        self.device.lock().flush()
    }

    pub(crate) fn pin_slot(&self, slot: usize, id: BlockId) -> PinnedBlock<'_, D, C> {
        self.coord.pin(id.bucket(self.coord.nbucket()), slot);
        log::trace!("[BCACHE] pin {} slot={}", id, slot);
        PinnedBlock::new(SlotRef::new(self, slot, id, false))
    }

    /// 归还一个引用
    ///
    /// 被引用的缓存块不会迁移，所以它一定在 `id` 的分桶里。
    pub(crate) fn put_slot(&self, slot: usize, id: BlockId, stamp_on_release: bool) {
        let key = id.bucket(self.coord.nbucket());
        let stamp = stamp_on_release.then(|| self.clock.now());
        let remaining = self.coord.unpin(key, slot, stamp);
        log::trace!("[BCACHE] put {} slot={} refcnt={}", id, slot, remaining);
    }

    fn check_owner(&self, owner: &BufferCache<D, C>) -> Result<()> {
        if core::ptr::eq(owner, self) {
            Ok(())
        } else {
            Err(Error::new(
                ErrorKind::InvalidState,
                "Buffer handle belongs to a different cache",
            ))
        }
    }

    /// `id` 当前是否在缓存中（不影响 LRU 和统计）
    pub fn contains(&self, id: BlockId) -> bool {
        self.coord.contains(id.bucket(self.coord.nbucket()), id)
    }

    /// 所有缓存块的诊断视图，按缓存块编号排序
    ///
    /// 各分桶依次加锁读取，只有在没有并发操作时才是一致的快照。
    pub fn snapshot(&self) -> Vec<SlotInfo> {
        let mut infos = Vec::with_capacity(self.config.nbuf);
        for key in 0..self.coord.nbucket() {
            let entries = self.coord.bucket_entries(key);
            infos.extend(entries.into_iter().map(|(slot, meta)| SlotInfo {
                slot,
                bucket: key,
                identity: meta.identity,
                ref_count: meta.ref_count,
                last_release: meta.last_release,
                valid: None,
            }));
        }
        // 分桶锁全部释放后再探测独占锁
        for info in infos.iter_mut() {
            info.valid = self.slots[info.slot]
                .try_lock()
                .map(|data| data.is_valid() && data.block == info.identity);
        }
        infos.sort_by_key(|info| info.slot);
        infos
    }

    /// 统计信息
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// 缓存块数量
    pub fn capacity(&self) -> usize {
        self.coord.nbuf()
    }

    /// 分桶数量
    pub fn nbucket(&self) -> usize {
        self.coord.nbucket()
    }

    /// 块大小
    pub fn block_size(&self) -> usize {
        self.config.block_size
    }

    /// 缓存配置
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// 逻辑时钟
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// 在设备锁下访问设备
    pub fn with_device<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut self.device.lock())
    }
}

impl<D: BlockDevice, C: Clock> core::fmt::Debug for BufferCache<D, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufferCache")
            .field("capacity", &self.capacity())
            .field("nbucket", &self.nbucket())
            .field("block_size", &self.config.block_size)
            .field("exhaustion", &self.config.exhaustion)
            .field("stats", &self.stats())
            .finish()
    }
}
