//! 块设备核心类型

use crate::consts::DEFAULT_SECTOR_SIZE;
use crate::error::Result;
use crate::types::BlockId;

/// 块设备接口
///
/// 实现此 trait 以提供底层块设备访问。每次传输都是整块、同步完成的：
/// 返回时数据已经在缓冲区与设备之间搬运完毕。
///
/// 缓存把设备放在独立的锁后面，实现者不需要自行处理并发。
///
/// # 示例
///
/// ```rust,ignore
/// use bcache_core::{BlockDevice, BlockId, Result};
///
/// struct VirtioDisk {
///     // ...
/// }
///
/// impl BlockDevice for VirtioDisk {
///     fn block_size(&self) -> usize {
///         1024
///     }
///
///     fn read_block(&mut self, id: BlockId, buf: &mut [u8]) -> Result<()> {
///         // 提交读请求并等待完成
///         Ok(())
///     }
///
///     fn write_block(&mut self, id: BlockId, buf: &[u8]) -> Result<()> {
///         // 提交写请求并等待完成
///         Ok(())
///     }
/// }
/// ```
pub trait BlockDevice: Send {
    /// 逻辑块大小（字节）
    fn block_size(&self) -> usize;

    /// 物理扇区大小（通常 512）
    fn sector_size(&self) -> u32 {
        DEFAULT_SECTOR_SIZE
    }

    /// 读取一个块
    ///
    /// # 参数
    ///
    /// * `id` - 块标识
    /// * `buf` - 目标缓冲区（长度等于 `block_size`）
    fn read_block(&mut self, id: BlockId, buf: &mut [u8]) -> Result<()>;

    /// 写入一个块
    ///
    /// # 参数
    ///
    /// * `id` - 块标识
    /// * `buf` - 源缓冲区（长度等于 `block_size`）
    fn write_block(&mut self, id: BlockId, buf: &[u8]) -> Result<()>;

    /// 刷新设备缓存
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// 是否只读
    fn is_read_only(&self) -> bool {
        false
    }
}
