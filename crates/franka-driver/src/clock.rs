//! 单调时钟抽象
//!
//! 看门狗只关心"距上次命令过去了多久"，因此只需要单调时间。
//! 生产环境使用 [`MonotonicClock`]（`Instant::now()`，不受系统时钟调整影响）；
//! 测试和仿真使用 [`ManualClock`]，由调用方显式推进时间。

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 单调时钟
pub trait Clock: Send + Sync {
    /// 当前单调时间
    fn now(&self) -> Instant;
}

/// 系统单调时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 手动推进的时钟
///
/// `Clone` 共享同一个时间轴，便于测试线程推进时间、被测对象读取时间。
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// 以当前时刻为原点创建
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// 推进时间
    pub fn advance(&self, delta: Duration) {
        *self.offset.lock() += delta;
    }

    /// 自原点以来经过的时间
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}
