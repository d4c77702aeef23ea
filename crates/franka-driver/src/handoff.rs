//! 状态交接单元（Shared Hand-off Cell）
//!
//! 单槽、覆盖写、非阻塞读的共享容器：一个线程发布不可变快照，
//! 任意线程读取最新快照，读写双方互不阻塞。
//!
//! # 架构
//!
//! ```text
//! ┌──────────────────────┐
//! │   HandoffCell<T>     │
//! ├──────────────────────┤
//! │ slot                 │ ← ArcSwapOption<T>（原子替换 Arc 指针）
//! └──────────────────────┘
//!      ▲ set()        │ get()
//!   写线程          读线程（wait-free）
//! ```
//!
//! # 语义
//!
//! - `set()` 原子替换快照；不保证与调用时刻的墙钟顺序，读者可能看到稍旧的值
//! - `get()` 在未设置时返回 `None`，调用方应将其视为"尚未提供"，而不是错误

use arc_swap::ArcSwapOption;
use std::fmt;
use std::sync::Arc;

/// 单槽共享交接单元
pub struct HandoffCell<T> {
    slot: ArcSwapOption<T>,
}

impl<T> HandoffCell<T> {
    /// 创建空单元
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
        }
    }

    /// 创建带初始值的单元
    pub fn with_value(value: T) -> Self {
        Self {
            slot: ArcSwapOption::from_pointee(value),
        }
    }

    /// 发布新快照（覆盖旧值）
    pub fn set(&self, value: T) {
        self.slot.store(Some(Arc::new(value)));
    }

    /// 发布已有的 `Arc` 快照
    pub fn set_arc(&self, value: Arc<T>) {
        self.slot.store(Some(value));
    }

    /// 读取最新快照
    ///
    /// # 性能
    /// - 无锁读取（ArcSwap::load_full）
    /// - 不阻塞写线程，也不阻塞其他读线程
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.load_full()
    }

    /// 撤销已发布的快照
    pub fn clear(&self) {
        self.slot.store(None);
    }

    /// 是否已发布过快照
    pub fn is_set(&self) -> bool {
        self.slot.load().is_some()
    }
}

impl<T: Copy> HandoffCell<T> {
    /// 读取最新快照的副本（适合 `Duration` / `Instant` 等小类型）
    pub fn get_copy(&self) -> Option<T> {
        self.slot.load().as_deref().copied()
    }
}

impl<T> Default for HandoffCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for HandoffCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoffCell").field("value", &self.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_unset_cell_is_empty() {
        let cell: HandoffCell<Duration> = HandoffCell::new();
        assert!(cell.get().is_none());
        assert!(cell.get_copy().is_none());
        assert!(!cell.is_set());
    }

    #[test]
    fn test_set_overwrites() {
        let cell = HandoffCell::with_value(Duration::from_millis(200));
        assert_eq!(cell.get_copy(), Some(Duration::from_millis(200)));

        cell.set(Duration::from_millis(500));
        assert_eq!(cell.get_copy(), Some(Duration::from_millis(500)));

        cell.clear();
        assert!(cell.get().is_none());
    }

    #[test]
    fn test_snapshot_outlives_overwrite() {
        let cell = HandoffCell::with_value(String::from("first"));
        let snapshot = cell.get().unwrap();
        cell.set(String::from("second"));

        // 已取出的快照不受后续写入影响
        assert_eq!(snapshot.as_str(), "first");
        assert_eq!(cell.get().unwrap().as_str(), "second");
    }

    #[test]
    fn test_set_arc_shares_pointer() {
        let cell = HandoffCell::new();
        let value = Arc::new(Instant::now());
        cell.set_arc(Arc::clone(&value));
        assert!(Arc::ptr_eq(&value, &cell.get().unwrap()));
    }

    #[test]
    fn test_concurrent_readers_and_writer() {
        let cell = Arc::new(HandoffCell::with_value(0u64));
        let mut handles = vec![];

        // 多个读线程：读到的值必须单调不减
        for _ in 0..4 {
            let cell = Arc::clone(&cell);
            handles.push(thread::spawn(move || {
                let mut last = 0;
                for _ in 0..10_000 {
                    let v = cell.get_copy().unwrap();
                    assert!(v >= last, "value went backwards: {} < {}", v, last);
                    last = v;
                }
            }));
        }

        // 一个写线程
        let writer = Arc::clone(&cell);
        handles.push(thread::spawn(move || {
            for i in 1..=10_000u64 {
                writer.set(i);
            }
        }));

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cell.get_copy(), Some(10_000));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HandoffCell<Duration>>();
        assert_send_sync::<HandoffCell<Instant>>();
    }
}
