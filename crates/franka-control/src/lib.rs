//! 控制层
//!
//! 两个实时子系统：
//!
//! - **笛卡尔阻抗控制** ([`impedance`]): 把目标位姿和外部给定的刚度/阻尼转换为 7 个关节力矩，
//!   固定频率运行，输出经过力矩变化率限幅
//! - **控制器模式监督** ([`supervisor`]): 保证同一时刻只有一个控制器激活，
//!   命令流中断时在有界时间内回退到默认（安全）控制器
//!
//! 此外：
//!
//! - [`control`]: 控制器生命周期 trait 与固定频率循环
//! - [`config`]: TOML 配置
//!
//! # 示例
//!
//! ```rust,ignore
//! use franka_control::prelude::*;
//!
//! let config = ArmConfig::load("franka.toml")?;
//! let mut controller = CartesianImpedanceController::init(&hardware, &config)?;
//! let handle = controller.handle(); // 交给消息线程
//!
//! let stop = AtomicBool::new(false);
//! run_controller(&mut controller, &LoopConfig::from_rate(1000.0), &stop)?;
//! ```

pub mod config;
pub mod control;
mod error;
pub mod impedance;
pub mod supervisor;

pub use config::{ArmConfig, ControllersConfig, ImpedanceConfig};
pub use control::{ControllerLifecycle, LoopConfig, LoopStats, run_controller};
pub use error::{ConfigError, ControlError, SwitchError};
pub use impedance::{CartesianImpedanceController, CartesianPose, ImpedanceGains, ImpedanceHandle};
pub use supervisor::{
    ControlMode, ControllerRegistry, ModeSupervisor, WatchdogHandle, spawn_watchdog,
    start_supervisor,
};

/// 常用类型
pub mod prelude {
    pub use crate::config::ArmConfig;
    pub use crate::control::{ControllerLifecycle, LoopConfig, run_controller};
    pub use crate::error::{ControlError, SwitchError};
    pub use crate::impedance::{CartesianImpedanceController, ImpedanceHandle};
    pub use crate::supervisor::{ControlMode, ModeSupervisor, start_supervisor};
}
