//! 控制器模式监督器
//!
//! # 并发模型
//!
//! ```text
//! 命令线程 ──handle_command()──┐
//!                              ├──► Mutex<SupervisorState>（切换判定 + 阻塞的激活请求）
//! 看门狗线程 ─check_command_timeout()┘
//!
//! 超时线程 ──set_command_timeout()──► HandoffCell<Duration>   （无锁）
//!                                     HandoffCell<Instant>   ◄── 命令成功后记录
//! ```
//!
//! 同一时刻最多一个控制器处于激活状态：每次切换都启动一个控制器并停止其余全部注册控制器，
//! 激活权威失败时状态保持不变。

use super::registry::{ControlMode, ControllerRegistry, SwitchPlan, SwitchTable};
use crate::config::ControllersConfig;
use crate::error::{ConfigError, SwitchError};
use franka_driver::{Clock, ControllerSwitcher, HandoffCell, MonotonicClock, Strictness};
use franka_protocol::{JointCommandMode, ModeCommand, ProtocolError, TimeoutUpdate};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// 命令超时上限（秒）
pub const MAX_COMMAND_TIMEOUT: f64 = 1.0;

/// 将超时钳位到 [0, 1] 秒；NaN 返回 `None`
pub fn clamp_command_timeout(seconds: f64) -> Option<Duration> {
    if seconds.is_nan() {
        return None;
    }
    Some(Duration::from_secs_f64(seconds.clamp(0.0, MAX_COMMAND_TIMEOUT)))
}

/// 锁内可变状态
struct SupervisorState<S> {
    switcher: S,
    current_controller: String,
    current_mode: ControlMode,
    last_switch: Option<Instant>,
}

/// 控制器模式监督器
pub struct ModeSupervisor<S, C = MonotonicClock> {
    registry: ControllerRegistry,
    table: SwitchTable,
    state: Mutex<SupervisorState<S>>,
    command_timeout: HandoffCell<Duration>,
    last_command: HandoffCell<Instant>,
    clock: C,
}

impl<S: ControllerSwitcher> ModeSupervisor<S, MonotonicClock> {
    /// 使用系统单调时钟创建
    pub fn new(config: &ControllersConfig, switcher: S) -> Result<Self, ConfigError> {
        Self::with_clock(config, switcher, MonotonicClock)
    }
}

impl<S: ControllerSwitcher, C: Clock> ModeSupervisor<S, C> {
    /// 使用指定时钟创建
    ///
    /// 假定宿主已激活默认控制器；当前模式取默认控制器的模式。
    pub fn with_clock(
        config: &ControllersConfig,
        switcher: S,
        clock: C,
    ) -> Result<Self, ConfigError> {
        let registry = ControllerRegistry::from_config(config);
        let table = SwitchTable::build(&registry)?;

        let timeout = clamp_command_timeout(config.command_timeout()).ok_or_else(|| {
            ConfigError::Invalid("command_timeout must not be NaN".to_string())
        })?;

        let current_controller = registry.default_controller().to_string();
        let current_mode = registry.mode_of(&current_controller);

        info!(
            "Mode supervisor initialized: default controller '{}', command timeout {:?}",
            current_controller, timeout
        );

        Ok(Self {
            registry,
            table,
            state: Mutex::new(SupervisorState {
                switcher,
                current_controller,
                current_mode,
                last_switch: None,
            }),
            command_timeout: HandoffCell::with_value(timeout),
            last_command: HandoffCell::new(),
            clock,
        })
    }

    /// 切换到指定关节命令模式
    ///
    /// 请求的模式与当前模式相同时直接成功，不触发激活请求。
    pub fn switch_controllers(&self, mode: JointCommandMode) -> Result<(), SwitchError> {
        let mut state = self.state.lock();
        self.switch_locked(&mut state, mode)
    }

    /// 回退到默认控制器
    pub fn switch_to_default_controller(&self) -> Result<(), SwitchError> {
        let mut state = self.state.lock();
        self.fallback_locked(&mut state)
    }

    /// 处理外部模式命令
    ///
    /// 只有切换成功（含相同模式的空操作）才记录命令到达时间，
    /// 因此连续的非法命令不会掩盖命令流中断。
    pub fn handle_command(&self, command: &ModeCommand) -> Result<(), SwitchError> {
        let mode = command.mode().map_err(|e| {
            error!("{}", e);
            SwitchError::UnknownMode(command.mode)
        })?;

        let mut state = self.state.lock();
        self.switch_locked(&mut state, mode)?;
        self.last_command.set(self.clock.now());
        Ok(())
    }

    /// 看门狗检查
    ///
    /// 超时长度与上次命令时间都存在、距上次命令超过超时长度、且当前不是默认控制器时回退。
    /// 返回 `Ok(true)` 表示执行了回退。
    pub fn check_command_timeout(&self) -> Result<bool, SwitchError> {
        let mut state = self.state.lock();

        let (Some(timeout), Some(last_command)) =
            (self.command_timeout.get_copy(), self.last_command.get_copy())
        else {
            return Ok(false);
        };

        let elapsed = self.clock.now().saturating_duration_since(last_command);
        if elapsed <= timeout || state.current_controller == self.registry.default_controller() {
            return Ok(false);
        }

        warn!(
            "Command timeout violated ({:?} > {:?}): switching to default controller '{}'",
            elapsed,
            timeout,
            self.registry.default_controller()
        );
        self.fallback_locked(&mut state)?;
        Ok(true)
    }

    /// 更新命令超时（钳位到 [0, 1] 秒）
    ///
    /// NaN 被拒绝并保留旧值。返回实际生效的超时。
    pub fn set_command_timeout(&self, seconds: f64) -> Result<Duration, ProtocolError> {
        let Some(timeout) = clamp_command_timeout(seconds) else {
            warn!("Ignoring NaN joint command timeout");
            return Err(ProtocolError::NonFinite {
                field: "command_timeout",
            });
        };
        self.command_timeout.set(timeout);
        info!("Joint command timeout: {} (stored {:?})", seconds, timeout);
        Ok(timeout)
    }

    /// 处理线格式的超时更新
    pub fn handle_timeout_update(&self, update: &TimeoutUpdate) -> Result<Duration, ProtocolError> {
        self.set_command_timeout(update.seconds)
    }

    /// 当前生效的命令超时
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout.get_copy()
    }

    /// 最近一次被接受的命令时间
    pub fn last_command_time(&self) -> Option<Instant> {
        self.last_command.get_copy()
    }

    /// 最近一次实际发生切换的时间
    pub fn last_switch_time(&self) -> Option<Instant> {
        self.state.lock().last_switch
    }

    pub fn current_controller(&self) -> String {
        self.state.lock().current_controller.clone()
    }

    pub fn current_mode(&self) -> ControlMode {
        self.state.lock().current_mode
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    fn switch_locked(
        &self,
        state: &mut SupervisorState<S>,
        mode: JointCommandMode,
    ) -> Result<(), SwitchError> {
        if state.current_mode == ControlMode::from(mode) {
            debug!("Mode {:?} already active", mode);
            return Ok(());
        }
        let plan = self.table.plan(mode);
        self.apply_locked(state, plan)?;
        state.current_mode = ControlMode::from(mode);
        Ok(())
    }

    fn fallback_locked(&self, state: &mut SupervisorState<S>) -> Result<(), SwitchError> {
        let plan = self.table.fallback();
        self.apply_locked(state, plan)?;
        state.current_mode = self.registry.mode_of(&plan.start);
        Ok(())
    }

    /// 发出激活请求；失败时不修改任何状态
    fn apply_locked(
        &self,
        state: &mut SupervisorState<S>,
        plan: &SwitchPlan,
    ) -> Result<(), SwitchError> {
        if let Err(e) =
            state
                .switcher
                .switch_controllers(plan.start_set(), &plan.stop, Strictness::BestEffort)
        {
            error!("Failed to switch controllers to '{}': {}", plan.start, e);
            return Err(SwitchError::ActivationFailed(e));
        }

        state.current_controller = plan.start.clone();
        state.last_switch = Some(self.clock.now());
        info!(
            "Controller {} started; controllers {} stopped",
            plan.start,
            plan.stop.join(", ")
        );
        Ok(())
    }
}
