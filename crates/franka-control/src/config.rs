//! # 配置
//!
//! 启动时读取一次的配置项（TOML）：
//!
//! ```toml
//! arm_id = "panda"
//! joint_names = ["panda_joint1", "panda_joint2", "panda_joint3", "panda_joint4",
//!                "panda_joint5", "panda_joint6", "panda_joint7"]
//!
//! [impedance]
//! stiffness_gains = [200.0, 200.0, 200.0, 20.0, 20.0, 20.0]
//! filter_coefficient = 0.005
//! max_torque_delta = 1.0
//!
//! [controllers]
//! default_controller = "position_joint_trajectory_controller"
//! command_timeout = 0.2
//! ```
//!
//! 所有字段都有默认值；控制器名称未设置时由 [`ControllerRegistry`](crate::supervisor::ControllerRegistry)
//! 使用内置名称。

use crate::error::ConfigError;
use franka_protocol::{CARTESIAN_DOF, JOINT_COUNT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 整臂配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmConfig {
    /// 机械臂标识（模型句柄名为 `<arm_id>_model`）
    pub arm_id: String,

    /// 7 个关节名称
    pub joint_names: Vec<String>,

    /// 笛卡尔阻抗控制参数
    pub impedance: ImpedanceConfig,

    /// 控制器名称与命令超时
    pub controllers: ControllersConfig,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            arm_id: "panda".to_string(),
            joint_names: (1..=JOINT_COUNT).map(|i| format!("panda_joint{}", i)).collect(),
            impedance: ImpedanceConfig::default(),
            controllers: ControllersConfig::default(),
        }
    }
}

impl ArmConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ArmConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载并校验
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 模型句柄名称
    pub fn model_handle_name(&self) -> String {
        format!("{}_model", self.arm_id)
    }

    /// 校验全部配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arm_id.is_empty() {
            return Err(ConfigError::Invalid("arm_id must not be empty".to_string()));
        }
        if self.joint_names.len() != JOINT_COUNT {
            return Err(ConfigError::Invalid(format!(
                "joint_names must have {} entries, got {}",
                JOINT_COUNT,
                self.joint_names.len()
            )));
        }
        self.impedance.validate()?;
        self.controllers.validate()?;
        Ok(())
    }
}

/// 笛卡尔阻抗控制参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpedanceConfig {
    /// 初始刚度 [x, y, z, xrot, yrot, zrot]（N/m, Nm/rad）
    pub stiffness_gains: Vec<f64>,

    /// 目标滤波系数 α ∈ (0, 1]
    ///
    /// 每周期 `current = α·target + (1-α)·current`。
    pub filter_coefficient: f64,

    /// 单周期最大力矩变化（Nm）
    pub max_torque_delta: f64,

    /// 消息指定临界阻尼时的系数：`damping = factor * sqrt(stiffness)`
    pub critical_damping_factor: f64,

    /// 伪逆阻尼系数 λ（0 表示不加阻尼的 SVD 伪逆）
    pub pinv_damping: f64,

    /// 标称控制频率（Hz）
    pub control_rate_hz: f64,
}

impl Default for ImpedanceConfig {
    fn default() -> Self {
        Self {
            stiffness_gains: vec![200.0, 200.0, 200.0, 20.0, 20.0, 20.0],
            filter_coefficient: 0.005,
            max_torque_delta: 1.0,
            critical_damping_factor: 0.5,
            pinv_damping: 0.2,
            control_rate_hz: 1000.0,
        }
    }
}

impl ImpedanceConfig {
    /// 以固定大小数组取出刚度增益（长度已由 `validate` 保证）
    pub fn gains(&self) -> Result<[f64; CARTESIAN_DOF], ConfigError> {
        <[f64; CARTESIAN_DOF]>::try_from(self.stiffness_gains.as_slice()).map_err(|_| {
            ConfigError::Invalid(format!(
                "stiffness_gains must have {} entries, got {}",
                CARTESIAN_DOF,
                self.stiffness_gains.len()
            ))
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let gains = self.gains()?;
        if gains.iter().any(|k| !k.is_finite() || *k < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "stiffness_gains must be finite and non-negative: {:?}",
                gains
            )));
        }
        if !(self.filter_coefficient > 0.0 && self.filter_coefficient <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "filter_coefficient must be in (0, 1], got {}",
                self.filter_coefficient
            )));
        }
        if !(self.max_torque_delta.is_finite() && self.max_torque_delta > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_torque_delta must be > 0, got {}",
                self.max_torque_delta
            )));
        }
        if !(self.critical_damping_factor.is_finite() && self.critical_damping_factor >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "critical_damping_factor must be >= 0, got {}",
                self.critical_damping_factor
            )));
        }
        if !(self.pinv_damping.is_finite() && self.pinv_damping >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "pinv_damping must be >= 0, got {}",
                self.pinv_damping
            )));
        }
        if !(self.control_rate_hz.is_finite() && self.control_rate_hz > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "control_rate_hz must be > 0, got {}",
                self.control_rate_hz
            )));
        }
        Ok(())
    }
}

/// 控制器名称覆盖与命令超时
///
/// 名称为 `None` 时使用内置默认名称。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllersConfig {
    pub joint_position_controller: Option<String>,
    pub joint_velocity_controller: Option<String>,
    pub joint_torque_controller: Option<String>,
    pub joint_impedance_controller: Option<String>,
    pub cartesian_pose_controller: Option<String>,
    pub cartesian_impedance_controller: Option<String>,
    pub cartesian_force_controller: Option<String>,
    pub trajectory_controller: Option<String>,
    pub default_controller: Option<String>,

    /// 默认命令超时（秒），启动时钳位到 [0, 1]
    pub command_timeout: Option<f64>,

    /// 看门狗频率（Hz），默认 100
    pub watchdog_rate_hz: Option<f64>,
}

impl ControllersConfig {
    /// 默认命令超时（秒）
    pub const DEFAULT_COMMAND_TIMEOUT: f64 = 0.2;

    /// 默认看门狗频率（Hz）
    pub const DEFAULT_WATCHDOG_RATE_HZ: f64 = 100.0;

    pub fn command_timeout(&self) -> f64 {
        self.command_timeout.unwrap_or(Self::DEFAULT_COMMAND_TIMEOUT)
    }

    pub fn watchdog_rate_hz(&self) -> f64 {
        self.watchdog_rate_hz.unwrap_or(Self::DEFAULT_WATCHDOG_RATE_HZ)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.watchdog_rate_hz();
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "watchdog_rate_hz must be > 0, got {}",
                rate
            )));
        }
        Ok(())
    }
}
