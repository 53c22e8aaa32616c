//! 逻辑时钟
//!
//! 缓存只用时间戳比较缓存块的释放先后（LRU），不涉及墙上时间。
//! 时钟作为协作者注入缓存，测试中可以替换为 [`ManualClock`]。

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

/// 单调不减的逻辑时钟
pub trait Clock: Sync {
    /// 当前时间戳
    fn now(&self) -> u64;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

impl<T: Clock + ?Sized + Send> Clock for Arc<T> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

/// 外部推进的节拍计数器
///
/// 对应内核时钟中断维护的 `ticks`，由定时器或调用方调用 [`TickClock::tick`]。
#[derive(Debug, Default)]
pub struct TickClock {
    ticks: AtomicU64,
}

impl TickClock {
    /// 从 0 开始计数
    pub const fn new() -> Self {
        Self { ticks: AtomicU64::new(0) }
    }

    /// 推进一个节拍，返回推进后的值
    pub fn tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 设置节拍值（只允许向前）
    pub fn set(&self, ticks: u64) {
        self.ticks.fetch_max(ticks, Ordering::Relaxed);
    }
}

impl Clock for TickClock {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

/// 每次读取都自增的时钟
///
/// 保证每次释放得到不同的时间戳，LRU 顺序严格等于释放顺序。
#[derive(Debug, Default)]
pub struct CountingClock {
    next: AtomicU64,
}

impl CountingClock {
    /// 从 0 开始计数
    pub const fn new() -> Self {
        Self { next: AtomicU64::new(0) }
    }
}

impl Clock for CountingClock {
    fn now(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

/// 手动控制的时钟（测试用）
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// 创建时钟
    pub const fn new(start: u64) -> Self {
        Self { now: AtomicU64::new(start) }
    }

    /// 前进 `delta`
    pub fn advance(&self, delta: u64) {
        self.now.fetch_add(delta, Ordering::Relaxed);
    }

    /// 直接设置时间戳
    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_clock() {
        let clock = TickClock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.tick(), 1);
        clock.set(10);
        assert_eq!(clock.now(), 10);
        // 不允许回退
        clock.set(3);
        assert_eq!(clock.now(), 10);
    }

    #[test]
    fn test_counting_clock_strictly_increasing() {
        let clock = CountingClock::new();
        let a = clock.now();
        let b = clock.now();
        let c = clock.now();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_manual_clock_through_arc() {
        let clock = Arc::new(ManualClock::new(5));
        let shared = clock.clone();
        shared.advance(2);
        assert_eq!(clock.now(), 7);
        clock.set(1);
        assert_eq!(Clock::now(&shared), 1);
    }
}
