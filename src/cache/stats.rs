//! 缓存统计信息

use core::sync::atomic::{AtomicU64, Ordering};

/// 缓存统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// 缓存命中次数（包括全局锁下复查命中）
    pub hits: u64,
    /// 缓存未命中次数
    pub misses: u64,
    /// 驱逐次数
    pub evictions: u64,
    /// 驱逐时缓存块跨分桶迁移的次数
    pub relocations: u64,
    /// 物理读取次数
    pub device_reads: u64,
    /// 物理写入次数
    pub device_writes: u64,
    /// 缓存耗尽次数
    pub exhaustions: u64,
}

impl CacheStats {
    /// 总访问次数
    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }

    /// 计算命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_accesses();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// 并发更新的计数器
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub evictions: AtomicU64,
    pub relocations: AtomicU64,
    pub device_reads: AtomicU64,
    pub device_writes: AtomicU64,
    pub exhaustions: AtomicU64,
}

impl StatsCounters {
    #[inline]
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            relocations: self.relocations.load(Ordering::Relaxed),
            device_reads: self.device_reads.load(Ordering::Relaxed),
            device_writes: self.device_writes.load(Ordering::Relaxed),
            exhaustions: self.exhaustions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        let counters = StatsCounters::default();
        assert_eq!(counters.snapshot().hit_rate(), 0.0);

        StatsCounters::bump(&counters.hits);
        StatsCounters::bump(&counters.misses);
        let stats = counters.snapshot();
        assert_eq!(stats.total_accesses(), 2);
        assert_eq!(stats.hit_rate(), 0.5);
    }
}
