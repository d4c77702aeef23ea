//! 控制器生命周期
//!
//! 宿主框架的插件回调被显式化为三个阶段：
//!
//! - **init**: 由具体控制器的构造函数完成（解析句柄、建立初始目标）
//! - **starting**: 控制器被激活时调用一次（读取初始状态）
//! - **update**: 每个控制周期调用一次，`period` 为标称周期或钳位后的实际周期
//!
//! 宿主适配层只需要把自己的回调转发到这些方法。
//!
//! # 示例
//!
//! ```rust
//! use franka_control::control::ControllerLifecycle;
//! use std::time::Duration;
//!
//! struct Counter {
//!     ticks: u64,
//! }
//!
//! impl ControllerLifecycle for Counter {
//!     type Error = std::io::Error;
//!
//!     fn starting(&mut self) -> Result<(), Self::Error> {
//!         self.ticks = 0;
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, _period: Duration) -> Result<(), Self::Error> {
//!         self.ticks += 1;
//!         Ok(())
//!     }
//! }
//! ```

use std::time::Duration;

/// 控制器生命周期接口
///
/// `ControllerLifecycle` 本身不要求 `Send`；需要移入控制线程时由调用方约束。
pub trait ControllerLifecycle {
    /// 控制器错误类型
    type Error: std::error::Error + Send + 'static;

    /// 控制器被激活
    ///
    /// 读取失败应作为错误返回，由宿主决定是否放弃激活。
    fn starting(&mut self) -> Result<(), Self::Error>;

    /// 执行一个控制周期
    ///
    /// 周期内无法获得有效状态时返回错误；不在周期内重试。
    fn update(&mut self, period: Duration) -> Result<(), Self::Error>;

    /// 处理时间跳变
    ///
    /// 当实际周期超过钳位阈值时由循环调用，之后 `update` 收到钳位后的周期。
    /// 默认什么都不做。
    fn on_time_jump(&mut self, _period: Duration) -> Result<(), Self::Error> {
        Ok(())
    }

    /// 控制器被停用
    fn stopping(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
