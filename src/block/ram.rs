//! 内存块设备
//!
//! 稀疏存储，未写过的块读出全零。可限制每个设备的块数、切换只读、
//! 注入 I/O 失败，并统计物理读写次数。

use crate::block::BlockDevice;
use crate::error::{Error, ErrorKind, Result};
use crate::types::BlockId;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

/// 内存块设备
#[derive(Debug)]
pub struct RamDisk {
    block_size: usize,
    /// 每个设备的块数上限，None 表示不限制
    blocks_per_dev: Option<u32>,
    storage: BTreeMap<BlockId, Vec<u8>>,
    read_only: bool,
    failing: BTreeSet<BlockId>,
    reads: u64,
    writes: u64,
}

impl RamDisk {
    /// 创建内存设备
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            blocks_per_dev: None,
            storage: BTreeMap::new(),
            read_only: false,
            failing: BTreeSet::new(),
            reads: 0,
            writes: 0,
        }
    }

    /// 限制每个设备的块数
    pub fn with_blocks_per_dev(mut self, blocks: u32) -> Self {
        self.blocks_per_dev = Some(blocks);
        self
    }

    /// 设置只读
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// 让对 `id` 的后续传输失败
    pub fn fail_block(&mut self, id: BlockId) {
        self.failing.insert(id);
    }

    /// 取消失败注入
    pub fn heal_block(&mut self, id: BlockId) {
        self.failing.remove(&id);
    }

    /// 直接写入设备内容（不计入统计）
    pub fn preload(&mut self, id: BlockId, data: &[u8]) {
        let mut block = alloc::vec![0u8; self.block_size];
        let len = data.len().min(self.block_size);
        block[..len].copy_from_slice(&data[..len]);
        self.storage.insert(id, block);
    }

    /// 直接读取设备内容（不计入统计）
    pub fn peek(&self, id: BlockId) -> Option<&[u8]> {
        self.storage.get(&id).map(Vec::as_slice)
    }

    /// 物理读取次数
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// 物理写入次数
    pub fn writes(&self) -> u64 {
        self.writes
    }

    fn check(&self, id: BlockId, len: usize) -> Result<()> {
        if len != self.block_size {
            return Err(Error::new(ErrorKind::InvalidInput, "Buffer length must equal block size"));
        }
        if let Some(limit) = self.blocks_per_dev {
            if id.blockno >= limit {
                return Err(Error::new(ErrorKind::OutOfRange, "Block number beyond device end"));
            }
        }
        if self.failing.contains(&id) {
            return Err(Error::new(ErrorKind::Io, "Injected device failure"));
        }
        Ok(())
    }
}

impl BlockDevice for RamDisk {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn read_block(&mut self, id: BlockId, buf: &mut [u8]) -> Result<()> {
        self.check(id, buf.len())?;
        match self.storage.get(&id) {
            Some(block) => buf.copy_from_slice(block),
            None => buf.fill(0),
        }
        self.reads += 1;
        Ok(())
    }

    fn write_block(&mut self, id: BlockId, buf: &[u8]) -> Result<()> {
        if self.read_only {
            return Err(Error::new(ErrorKind::ReadOnly, "Device is read-only"));
        }
        self.check(id, buf.len())?;
        self.storage.insert(id, buf.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritten_block_reads_zero() {
        let mut disk = RamDisk::new(16);
        let mut buf = [0xAAu8; 16];
        disk.read_block(BlockId::new(1, 3), &mut buf).unwrap();
        assert_eq!(buf, [0u8; 16]);
        assert_eq!(disk.reads(), 1);
    }

    #[test]
    fn test_write_then_read() {
        let mut disk = RamDisk::new(16);
        let id = BlockId::new(1, 3);
        disk.write_block(id, &[7u8; 16]).unwrap();
        let mut buf = [0u8; 16];
        disk.read_block(id, &mut buf).unwrap();
        assert_eq!(buf, [7u8; 16]);
        assert_eq!(disk.writes(), 1);
        // 不同设备号互不影响
        disk.read_block(BlockId::new(2, 3), &mut buf).unwrap();
        assert_eq!(buf, [0u8; 16]);
    }

    #[test]
    fn test_limits_and_failures() {
        let mut disk = RamDisk::new(16).with_blocks_per_dev(4);
        let mut buf = [0u8; 16];
        let err = disk.read_block(BlockId::new(0, 4), &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);

        let err = disk.read_block(BlockId::new(0, 1), &mut [0u8; 8]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        disk.fail_block(BlockId::new(0, 2));
        let err = disk.read_block(BlockId::new(0, 2), &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        disk.heal_block(BlockId::new(0, 2));
        disk.read_block(BlockId::new(0, 2), &mut buf).unwrap();

        disk.set_read_only(true);
        assert!(disk.is_read_only());
        let err = disk.write_block(BlockId::new(0, 1), &buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReadOnly);
        assert_eq!(disk.writes(), 0);
    }
}
