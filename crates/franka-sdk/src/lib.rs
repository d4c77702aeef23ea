//! Franka SDK - 7 轴机械臂实时控制核心
//!
//! 笛卡尔阻抗控制与控制器模式监督，面向 1kHz 力矩控制。
//!
//! # 架构设计
//!
//! 分层结构，从底层到高层：
//!
//! - **协议层** ([`protocol`]): 入站消息（位姿目标、刚度/阻尼、模式命令、超时）
//! - **驱动层** ([`driver`]): 硬件协作接口、状态交接单元、时钟
//! - **控制层** ([`control`]): 阻抗控制器、模式监督器、看门狗、控制循环
//!
//! # 快速开始
//!
//! ```rust,ignore
//! use franka_sdk::prelude::*;
//!
//! franka_sdk::init_logger!();
//!
//! let config = ArmConfig::load("franka.toml")?;
//! let (supervisor, _watchdog) = start_supervisor(&config.controllers, switcher)?;
//! let mut controller = CartesianImpedanceController::init(&hardware, &config)?;
//! ```
//!
//! # 日志
//!
//! 控制核心使用 `tracing` 记录日志；[`init_logger()`] 安装 `fmt` 订阅者，
//! 过滤规则取自 `RUST_LOG`（未设置时为 `info`），并把 `log` crate 的记录桥接到 `tracing`。

pub use franka_control as control;
pub use franka_driver as driver;
pub use franka_protocol as protocol;

pub mod prelude;

// 常用类型
pub use franka_control::{
    ArmConfig, CartesianImpedanceController, ControlError, ControlMode, ControllerLifecycle,
    ImpedanceHandle, LoopConfig, ModeSupervisor, SwitchError, run_controller, start_supervisor,
};
pub use franka_driver::{DriverError, HandoffCell};
pub use franka_protocol::{
    ImpedanceUpdate, JointCommandMode, ModeCommand, PoseTarget, ProtocolError, StiffnessMessage,
    TimeoutUpdate,
};

use tracing_subscriber::EnvFilter;

/// 默认日志过滤规则
pub const DEFAULT_LOG_FILTER: &str = "info";

/// 初始化日志（`RUST_LOG` 优先，默认 `info`）
///
/// 重复调用是安全的：只有第一次生效。
pub fn init_logger() {
    init_logger_with_filter(DEFAULT_LOG_FILTER);
}

/// 以指定的默认过滤规则初始化日志
///
/// 返回 `false` 表示已经存在全局订阅者，本次调用未生效。
pub fn init_logger_with_filter(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        return false;
    }
    // log → tracing
    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::debug!("log bridge already installed: {}", e);
    }
    true
}

/// 初始化日志的便捷宏
///
/// ```rust
/// franka_sdk::init_logger!();
/// franka_sdk::init_logger!("franka_control=debug");
/// ```
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger()
    };
    ($filter:expr) => {{
        let _ = $crate::init_logger_with_filter($filter);
    }};
}
