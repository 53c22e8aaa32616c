//! 缓存块句柄 - RAII 风格的块访问
//!
//! - [`BufGuard`]：持有缓存块的独占锁和一个引用。丢弃时先释放独占锁，
//!   再在分桶锁下减少引用计数并记录释放时间（`brelse`）。
//! - [`PinnedBlock`]：只持有一个引用，不占独占锁，保证块在此期间常驻
//!   缓存（`bpin`）。丢弃时减少引用计数（`bunpin`）。
//!
//! 独占锁由句柄类型本身表示，不持有独占锁就拿不到 `BufGuard`，也就无法
//! 调用写回或释放。

use super::buffer_cache::BufferCache;
use super::slot::SlotData;
use crate::block::BlockDevice;
use crate::clock::Clock;
use crate::error::Result;
use crate::types::BlockId;
use spin::MutexGuard;

/// 对缓存块的一个引用，丢弃时归还
pub(crate) struct SlotRef<'a, D: BlockDevice, C: Clock> {
    pub(crate) cache: &'a BufferCache<D, C>,
    pub(crate) slot: usize,
    pub(crate) id: BlockId,
    /// 引用计数降到 0 时是否记录释放时间
    stamp_on_release: bool,
}

impl<'a, D: BlockDevice, C: Clock> SlotRef<'a, D, C> {
    pub(crate) fn new(
        cache: &'a BufferCache<D, C>,
        slot: usize,
        id: BlockId,
        stamp_on_release: bool,
    ) -> Self {
        Self {
            cache,
            slot,
            id,
            stamp_on_release,
        }
    }
}

impl<D: BlockDevice, C: Clock> Drop for SlotRef<'_, D, C> {
    fn drop(&mut self) {
        self.cache.put_slot(self.slot, self.id, self.stamp_on_release);
    }
}

/// 独占持有的缓存块
///
/// 对应 xv6 中 `bread` 返回的上锁 `struct buf`。
///
/// 独占锁是 `spin::Mutex`，不是睡眠锁：同一块的其他使用者在句柄存活期间
/// 一直自旋等待，包括句柄持有者做设备 I/O 的时间。持有时间应尽量短，
/// 需要长期保留块时用 [`BufGuard::pin`] 固定后释放句柄。
///
/// # 示例
///
/// ```rust,ignore
/// let mut buf = cache.read(BlockId::new(1, 33))?;
/// buf.data_mut()[0] = 0x42;
/// buf.write()?;
/// buf.release();
/// ```
pub struct BufGuard<'a, D: BlockDevice, C: Clock> {
    // 字段按声明顺序析构：先释放独占锁，再归还引用
    data: MutexGuard<'a, SlotData>,
    reference: SlotRef<'a, D, C>,
}

impl<'a, D: BlockDevice, C: Clock> BufGuard<'a, D, C> {
    pub(crate) fn new(data: MutexGuard<'a, SlotData>, reference: SlotRef<'a, D, C>) -> Self {
        Self { data, reference }
    }

    /// 块标识
    pub fn id(&self) -> BlockId {
        self.reference.id
    }

    /// 缓存块编号
    pub fn slot(&self) -> usize {
        self.reference.slot
    }

    /// 数据是否与设备一致
    pub fn is_valid(&self) -> bool {
        self.data.is_valid()
    }

    /// 块数据
    pub fn data(&self) -> &[u8] {
        &self.data.data
    }

    /// 块数据（可变）
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data.data
    }

    /// 用 `src` 填充整块并标记为有效，不足部分补零
    ///
    /// 配合 [`BufferCache::get`] 使用：整块覆盖时不必先从设备读取。
    pub fn fill(&mut self, src: &[u8]) {
        let data = &mut self.data.data;
        let len = src.len().min(data.len());
        data[..len].copy_from_slice(&src[..len]);
        data[len..].fill(0);
        self.data.mark_valid();
    }

    /// 写回设备（`bwrite`）
    pub fn write(&mut self) -> Result<()> {
        let cache = self.reference.cache;
        cache.write(self)
    }

    /// 固定该块，释放独占锁后仍常驻缓存
    pub fn pin(&self) -> PinnedBlock<'a, D, C> {
        let cache = self.reference.cache;
        cache.pin_slot(self.reference.slot, self.reference.id)
    }

    /// 释放缓存块（`brelse`）
    pub fn release(self) {
        drop(self);
    }

    pub(crate) fn owner(&self) -> &'a BufferCache<D, C> {
        self.reference.cache
    }

    pub(crate) fn slot_data(&self) -> &SlotData {
        &self.data
    }

    pub(crate) fn slot_data_mut(&mut self) -> &mut SlotData {
        &mut self.data
    }
}

impl<D: BlockDevice, C: Clock> core::fmt::Debug for BufGuard<'_, D, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufGuard")
            .field("id", &self.id())
            .field("slot", &self.slot())
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// 固定在缓存中的块
#[must_use = "dropping a PinnedBlock unpins it immediately"]
pub struct PinnedBlock<'a, D: BlockDevice, C: Clock> {
    reference: SlotRef<'a, D, C>,
}

impl<'a, D: BlockDevice, C: Clock> PinnedBlock<'a, D, C> {
    pub(crate) fn new(reference: SlotRef<'a, D, C>) -> Self {
        Self { reference }
    }

    /// 块标识
    pub fn id(&self) -> BlockId {
        self.reference.id
    }

    /// 缓存块编号
    pub fn slot(&self) -> usize {
        self.reference.slot
    }

    /// 取消固定（`bunpin`）
    pub fn unpin(self) {
        drop(self);
    }

    pub(crate) fn owner(&self) -> &'a BufferCache<D, C> {
        self.reference.cache
    }
}

impl<D: BlockDevice, C: Clock> core::fmt::Debug for PinnedBlock<'_, D, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PinnedBlock")
            .field("id", &self.id())
            .field("slot", &self.slot())
            .finish()
    }
}
