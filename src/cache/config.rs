//! 缓存配置

use crate::consts::{BSIZE, NBUCKET, NBUF};
use crate::error::{Error, ErrorKind, Result};

/// 所有缓存块都被引用时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustionPolicy {
    /// 返回 [`ErrorKind::CacheExhausted`]，由调用者决定重试或失败
    #[default]
    ReturnError,
    /// 直接 panic（`bget: no buffers`）
    Panic,
}

/// 缓存配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// 缓存块数量
    pub nbuf: usize,
    /// 分桶数量
    pub nbucket: usize,
    /// 块大小（字节）
    pub block_size: usize,
    /// 缓存耗尽策略
    pub exhaustion: ExhaustionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            nbuf: NBUF,
            nbucket: NBUCKET,
            block_size: BSIZE,
            exhaustion: ExhaustionPolicy::ReturnError,
        }
    }
}

impl CacheConfig {
    /// 设置缓存块数量
    pub fn with_nbuf(mut self, nbuf: usize) -> Self {
        self.nbuf = nbuf;
        self
    }

    /// 设置分桶数量
    pub fn with_nbucket(mut self, nbucket: usize) -> Self {
        self.nbucket = nbucket;
        self
    }

    /// 设置块大小
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// 设置缓存耗尽策略
    pub fn with_exhaustion(mut self, exhaustion: ExhaustionPolicy) -> Self {
        self.exhaustion = exhaustion;
        self
    }

    /// 检查配置
    ///
    /// `sector_size` 为设备扇区大小，块大小必须是它的整数倍。
    pub fn validate(&self, sector_size: u32) -> Result<()> {
        if self.nbuf == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "Cache needs at least one buffer"));
        }
        if self.nbucket == 0 {
            return Err(Error::new(ErrorKind::InvalidInput, "Cache needs at least one bucket"));
        }
        if self.block_size == 0 || sector_size == 0 || self.block_size % sector_size as usize != 0 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "Block size must be a multiple of sector size",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.nbuf, 30);
        assert_eq!(config.nbucket, 13);
        assert_eq!(config.block_size, 1024);
        assert_eq!(config.exhaustion, ExhaustionPolicy::ReturnError);
        assert!(config.validate(512).is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CacheConfig::default()
            .with_nbuf(4)
            .with_nbucket(2)
            .with_block_size(4096)
            .with_exhaustion(ExhaustionPolicy::Panic);
        assert_eq!(config.nbuf, 4);
        assert_eq!(config.nbucket, 2);
        assert_eq!(config.block_size, 4096);
        assert_eq!(config.exhaustion, ExhaustionPolicy::Panic);
    }

    #[test]
    fn test_invalid_config() {
        let err = CacheConfig::default().with_nbuf(0).validate(512).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = CacheConfig::default().with_nbucket(0).validate(512).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = CacheConfig::default().with_block_size(1000).validate(512).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        assert!(CacheConfig::default().validate(0).is_err());
    }
}
