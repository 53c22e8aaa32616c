//! 缓存块结构
//!
//! 一个缓存块的状态分属两个锁域：
//!
//! - [`SlotMeta`]：标识、引用计数、释放时间戳。存放在缓存块当前所在分桶的
//!   链表节点里，由该分桶的分桶锁保护。
//! - [`SlotData`]：块数据和有效标志，由缓存块自己的独占锁保护。

use crate::types::BlockId;
use alloc::boxed::Box;
use bitflags::bitflags;

bitflags! {
    /// 缓存块数据标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SlotFlags: u8 {
        /// 数据与设备内容一致
        const VALID = 0x01;
    }
}

/// 缓存块记账信息（分桶锁保护）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotMeta {
    /// 当前分配给缓存块的块标识，从未使用过的缓存块为 None
    pub identity: Option<BlockId>,
    /// 引用计数，为 0 时可被驱逐
    pub ref_count: u32,
    /// 引用计数最近一次降到 0 时的时间戳
    pub last_release: u64,
}

impl SlotMeta {
    /// 初始化时的空闲缓存块
    pub const fn new(stamp: u64) -> Self {
        Self {
            identity: None,
            ref_count: 0,
            last_release: stamp,
        }
    }

    /// 是否正在被引用
    pub fn is_referenced(&self) -> bool {
        self.ref_count > 0
    }

    /// 是否持有指定块
    pub fn holds(&self, id: BlockId) -> bool {
        self.identity == Some(id)
    }
}

/// 缓存块数据（独占锁保护）
///
/// `block` 记录 `data` 最近一次服务的块标识。缓存块被驱逐改作他用时，
/// 新的持有者在取得独占锁后发现 `block` 与自己的标识不一致，随即清除
/// `VALID`，所以有效标志只会在独占锁下被修改。
pub struct SlotData {
    pub(crate) block: Option<BlockId>,
    pub(crate) flags: SlotFlags,
    pub(crate) data: Box<[u8]>,
}

impl SlotData {
    /// 创建空缓存块
    pub fn new(block_size: usize) -> Self {
        Self {
            block: None,
            flags: SlotFlags::empty(),
            data: alloc::vec![0u8; block_size].into_boxed_slice(),
        }
    }

    /// 绑定到 `id`，标识改变时数据失效
    pub(crate) fn bind(&mut self, id: BlockId) {
        if self.block != Some(id) {
            self.block = Some(id);
            self.flags.remove(SlotFlags::VALID);
        }
    }

    /// 数据是否有效
    pub fn is_valid(&self) -> bool {
        self.flags.contains(SlotFlags::VALID)
    }

    pub(crate) fn mark_valid(&mut self) {
        self.flags.insert(SlotFlags::VALID);
    }
}

impl core::fmt::Debug for SlotData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SlotData")
            .field("block", &self.block)
            .field("flags", &self.flags)
            .field("data_len", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_creation() {
        let meta = SlotMeta::new(7);
        assert_eq!(meta.identity, None);
        assert_eq!(meta.ref_count, 0);
        assert_eq!(meta.last_release, 7);
        assert!(!meta.is_referenced());
        assert!(!meta.holds(BlockId::new(0, 0)));
    }

    #[test]
    fn test_bind_invalidates_on_identity_change() {
        let a = BlockId::new(1, 1);
        let b = BlockId::new(1, 2);
        let mut data = SlotData::new(64);
        assert_eq!(data.data.len(), 64);

        data.bind(a);
        assert!(!data.is_valid());
        data.mark_valid();
        assert!(data.is_valid());

        // 同一标识重复绑定保持有效
        data.bind(a);
        assert!(data.is_valid());

        data.bind(b);
        assert!(!data.is_valid());
        assert_eq!(data.block, Some(b));
    }
}
