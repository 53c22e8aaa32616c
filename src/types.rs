//! 基础数据类型

use core::fmt;

/// 块标识：(设备号, 块号)
///
/// 唯一确定设备上的一个存储单元。分配给缓存块后在其被引用期间不可变。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct BlockId {
    /// 设备号
    pub dev: u32,
    /// 块号
    pub blockno: u32,
}

impl BlockId {
    /// 创建块标识
    pub const fn new(dev: u32, blockno: u32) -> Self {
        Self { dev, blockno }
    }

    /// 计算所属分桶
    ///
    /// `(dev + blockno) % nbucket`，加法按回绕处理
    #[inline]
    pub fn bucket(&self, nbucket: usize) -> usize {
        self.dev.wrapping_add(self.blockno) as usize % nbucket
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dev, self.blockno)
    }
}

impl From<(u32, u32)> for BlockId {
    fn from((dev, blockno): (u32, u32)) -> Self {
        Self::new(dev, blockno)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_bucket_hash() {
        assert_eq!(BlockId::new(1, 12).bucket(13), 0);
        assert_eq!(BlockId::new(1, 13).bucket(13), 1);
        assert_eq!(BlockId::new(0, 7).bucket(2), 1);
        // 回绕
        assert_eq!(BlockId::new(u32::MAX, 1).bucket(13), 0);
    }

    #[test]
    fn test_display_and_from() {
        let id: BlockId = (2, 40).into();
        assert_eq!(id, BlockId::new(2, 40));
        assert_eq!(id.to_string(), "2:40");
    }
}
