//! 控制器模式监督
//!
//! - [`registry`]: 控制器名称、语义模式、切换表
//! - [`mode`]: 互斥切换、命令处理、超时回退
//! - [`watchdog`]: 周期性超时检查线程

pub mod mode;
pub mod registry;
pub mod watchdog;

pub use mode::{MAX_COMMAND_TIMEOUT, ModeSupervisor, clamp_command_timeout};
pub use registry::{
    ControlMode, ControllerRegistry, ControllerSlot, DEFAULT_CONTROLLER_NAME, SwitchPlan,
    SwitchTable,
};
pub use watchdog::{WatchdogHandle, spawn_watchdog};

use crate::config::ControllersConfig;
use crate::error::ControlError;
use franka_driver::ControllerSwitcher;
use std::sync::Arc;

/// 创建监督器并按配置频率启动看门狗
pub fn start_supervisor<S>(
    config: &ControllersConfig,
    switcher: S,
) -> Result<(Arc<ModeSupervisor<S>>, WatchdogHandle), ControlError>
where
    S: ControllerSwitcher + 'static,
{
    config.validate()?;
    let supervisor = Arc::new(ModeSupervisor::new(config, switcher)?);
    let watchdog = spawn_watchdog(Arc::clone(&supervisor), config.watchdog_rate_hz())?;
    Ok((supervisor, watchdog))
}
