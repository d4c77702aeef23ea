//! 驱动层模块
//!
//! 本模块定义控制核心与外部协作方之间的边界，包括：
//! - 状态交接单元（ArcSwap 无锁读取）
//! - 单调时钟抽象（便于测试中注入时间）
//! - 硬件协作接口：模型/状态提供者、关节力矩执行器、控制器激活权威
//! - Mock 硬件（`mock` feature）：无机器人环境下的测试替身
//!
//! # 使用场景
//!
//! 宿主框架的适配层实现这里的 trait；`franka-control` 只依赖这些 trait，
//! 不依赖任何具体的驱动绑定。

pub mod clock;
mod error;
pub mod handoff;
pub mod hardware;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::DriverError;
pub use handoff::HandoffCell;
pub use hardware::*;
