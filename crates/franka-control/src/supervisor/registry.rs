//! 控制器注册表与切换表
//!
//! 注册表在启动时由配置构建一次，此后只读。切换表为每个关节命令模式预先算好
//! "启动哪个控制器、停止哪些控制器"，运行期只做查表。

use crate::config::ControllersConfig;
use crate::error::ConfigError;
use franka_protocol::JointCommandMode;
use tracing::error;

/// 控制器槽位
///
/// 每个槽位对应一个控制器名称（可由配置覆盖）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControllerSlot {
    JointPosition,
    JointVelocity,
    JointTorque,
    JointImpedance,
    CartesianPose,
    CartesianImpedance,
    CartesianForce,
    Trajectory,
}

impl ControllerSlot {
    /// 注册顺序
    pub const ALL: [ControllerSlot; 8] = [
        ControllerSlot::JointPosition,
        ControllerSlot::JointVelocity,
        ControllerSlot::JointTorque,
        ControllerSlot::JointImpedance,
        ControllerSlot::CartesianPose,
        ControllerSlot::CartesianImpedance,
        ControllerSlot::CartesianForce,
        ControllerSlot::Trajectory,
    ];

    /// 内置默认名称
    pub fn default_name(self) -> &'static str {
        match self {
            ControllerSlot::JointPosition => "joint_position_controller",
            ControllerSlot::JointVelocity => "joint_velocity_controller",
            ControllerSlot::JointTorque => "joint_torque_controller",
            ControllerSlot::JointImpedance => "joint_impedance_controller",
            ControllerSlot::CartesianPose => "cartesian_pose_controller",
            ControllerSlot::CartesianImpedance => "cartesian_impedance_controller",
            ControllerSlot::CartesianForce => "cartesian_force_controller",
            ControllerSlot::Trajectory => "position_joint_trajectory_controller",
        }
    }

    /// 语义控制模式
    ///
    /// 笛卡尔类与轨迹控制器没有对应的关节命令模式，归为 [`ControlMode::Unmapped`]。
    pub fn mode(self) -> ControlMode {
        match self {
            ControllerSlot::JointPosition => ControlMode::Position,
            ControllerSlot::JointVelocity => ControlMode::Velocity,
            ControllerSlot::JointTorque => ControlMode::Torque,
            ControllerSlot::JointImpedance => ControlMode::Impedance,
            ControllerSlot::CartesianPose
            | ControllerSlot::CartesianImpedance
            | ControllerSlot::CartesianForce
            | ControllerSlot::Trajectory => ControlMode::Unmapped,
        }
    }

    fn configured_name(self, config: &ControllersConfig) -> Option<&str> {
        let name = match self {
            ControllerSlot::JointPosition => &config.joint_position_controller,
            ControllerSlot::JointVelocity => &config.joint_velocity_controller,
            ControllerSlot::JointTorque => &config.joint_torque_controller,
            ControllerSlot::JointImpedance => &config.joint_impedance_controller,
            ControllerSlot::CartesianPose => &config.cartesian_pose_controller,
            ControllerSlot::CartesianImpedance => &config.cartesian_impedance_controller,
            ControllerSlot::CartesianForce => &config.cartesian_force_controller,
            ControllerSlot::Trajectory => &config.trajectory_controller,
        };
        name.as_deref()
    }

    /// 关节命令模式对应的槽位
    pub fn for_command(mode: JointCommandMode) -> Self {
        match mode {
            JointCommandMode::Position => ControllerSlot::JointPosition,
            JointCommandMode::Velocity => ControllerSlot::JointVelocity,
            JointCommandMode::Torque => ControllerSlot::JointTorque,
            JointCommandMode::Impedance => ControllerSlot::JointImpedance,
        }
    }
}

/// 语义控制模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlMode {
    Position,
    Velocity,
    Torque,
    Impedance,
    /// 无法由关节命令选中（笛卡尔类、轨迹控制器）
    Unmapped,
}

impl From<JointCommandMode> for ControlMode {
    fn from(mode: JointCommandMode) -> Self {
        ControllerSlot::for_command(mode).mode()
    }
}

/// 默认控制器名称
pub const DEFAULT_CONTROLLER_NAME: &str = "position_joint_trajectory_controller";

/// 控制器注册表
#[derive(Debug, Clone)]
pub struct ControllerRegistry {
    entries: Vec<(ControllerSlot, String)>,
    default_controller: String,
}

impl ControllerRegistry {
    /// 按配置解析名称（未设置时使用内置名称）
    ///
    /// 默认控制器不在注册表中时只记录错误，不中止。
    pub fn from_config(config: &ControllersConfig) -> Self {
        let entries = ControllerSlot::ALL
            .iter()
            .map(|slot| {
                let name = slot.configured_name(config).unwrap_or(slot.default_name());
                (*slot, name.to_string())
            })
            .collect();
        let default_controller = config
            .default_controller
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTROLLER_NAME.to_string());

        let registry = Self {
            entries,
            default_controller,
        };
        if !registry.contains(&registry.default_controller) {
            error!(
                "Default controller '{}' not present in the provided controllers",
                registry.default_controller
            );
        }
        registry
    }

    /// 按注册顺序列出全部名称（去重）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.entries.len());
        for (_, name) in &self.entries {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    /// 槽位当前绑定的名称
    pub fn name_of(&self, slot: ControllerSlot) -> &str {
        self.entries
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, name)| name.as_str())
            .unwrap_or(slot.default_name())
    }

    /// 名称对应的控制模式；未注册的名称视为 `Unmapped`
    ///
    /// 同一名称绑定多个槽位时以注册顺序靠前的为准。
    pub fn mode_of(&self, name: &str) -> ControlMode {
        self.entries
            .iter()
            .find(|(_, n)| n == name)
            .map(|(slot, _)| slot.mode())
            .unwrap_or(ControlMode::Unmapped)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(_, n)| n == name)
    }

    pub fn default_controller(&self) -> &str {
        &self.default_controller
    }

    pub fn has_default(&self) -> bool {
        self.contains(&self.default_controller)
    }

    /// 启动 `start`、停止其余全部注册控制器的切换方案
    pub fn plan_for(&self, start: &str) -> SwitchPlan {
        let stop = self
            .names()
            .into_iter()
            .filter(|name| *name != start)
            .map(str::to_string)
            .collect();
        SwitchPlan {
            start: start.to_string(),
            stop,
        }
    }
}

/// 一次切换：启动一个控制器，停止其余控制器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchPlan {
    pub start: String,
    pub stop: Vec<String>,
}

impl SwitchPlan {
    /// `start` 作为单元素切片
    pub fn start_set(&self) -> &[String] {
        std::slice::from_ref(&self.start)
    }
}

/// 模式 → 切换方案
#[derive(Debug, Clone)]
pub struct SwitchTable {
    plans: [SwitchPlan; 4],
    fallback: SwitchPlan,
}

impl SwitchTable {
    /// 由注册表构建并校验
    pub fn build(registry: &ControllerRegistry) -> Result<Self, ConfigError> {
        let plans = JointCommandMode::ALL
            .map(|mode| registry.plan_for(registry.name_of(ControllerSlot::for_command(mode))));
        let fallback = registry.plan_for(registry.default_controller());

        let table = Self { plans, fallback };
        table.validate(registry)?;
        Ok(table)
    }

    fn validate(&self, registry: &ControllerRegistry) -> Result<(), ConfigError> {
        for (mode, plan) in JointCommandMode::ALL.iter().zip(&self.plans) {
            if plan.start.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "controller name for {:?} mode must not be empty",
                    mode
                )));
            }
            if registry.mode_of(&plan.start) != ControlMode::from(*mode) {
                return Err(ConfigError::Invalid(format!(
                    "controller '{}' is registered under several modes",
                    plan.start
                )));
            }
        }
        if self.fallback.start.is_empty() {
            return Err(ConfigError::Invalid(
                "default_controller must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// 关节命令模式对应的方案
    pub fn plan(&self, mode: JointCommandMode) -> &SwitchPlan {
        // 与 JointCommandMode::ALL 的顺序一致
        let index = match mode {
            JointCommandMode::Position => 0,
            JointCommandMode::Velocity => 1,
            JointCommandMode::Torque => 2,
            JointCommandMode::Impedance => 3,
        };
        &self.plans[index]
    }

    /// 回退到默认控制器的方案
    pub fn fallback(&self) -> &SwitchPlan {
        &self.fallback
    }
}
