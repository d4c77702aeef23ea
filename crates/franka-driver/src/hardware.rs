//! 硬件协作接口
//!
//! 控制核心通过以下 trait 与宿主框架交互：
//!
//! | 接口                   | 职责                                              |
//! |------------------------|---------------------------------------------------|
//! | [`ModelStateProvider`] | 关节状态、雅可比、科氏力、末端位姿（控制频率可查询）|
//! | [`JointActuator`]      | 每个关节每周期接收一个力矩命令                     |
//! | [`RobotHardware`]      | 初始化时按名称解析上述句柄                          |
//! | [`ControllerSwitcher`] | 控制器激活权威：启动/停止控制器集合                 |

use crate::DriverError;
use franka_protocol::{CARTESIAN_DOF, JOINT_COUNT};
use nalgebra::{Isometry3, SMatrix, SVector};
use std::sync::Arc;

/// 关节空间向量（7 维）
pub type JointVector = SVector<f64, JOINT_COUNT>;

/// 任务空间雅可比（6x7）
pub type Jacobian = SMatrix<f64, CARTESIAN_DOF, JOINT_COUNT>;

/// 参考坐标系
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frame {
    /// 法兰
    Flange,
    /// 末端执行器（默认）
    #[default]
    EndEffector,
}

/// 一个控制周期内一致的机器人状态快照
#[derive(Debug, Clone, PartialEq)]
pub struct RobotSnapshot {
    /// 关节位置（rad）
    pub q: JointVector,
    /// 关节速度（rad/s）
    pub dq: JointVector,
    /// 上一周期实际下发的力矩命令（Nm）
    ///
    /// 力矩变化率限幅以此为基准。
    pub tau_commanded: JointVector,
    /// 科氏力补偿（Nm）
    pub coriolis: JointVector,
    /// 基坐标系下的雅可比（对应请求的 [`Frame`]）
    pub jacobian: Jacobian,
    /// 基坐标系下的末端位姿
    pub ee_transform: Isometry3<f64>,
}

impl RobotSnapshot {
    /// 静止状态快照：零速度、零力矩、零科氏力
    pub fn at_rest(q: JointVector, jacobian: Jacobian, ee_transform: Isometry3<f64>) -> Self {
        Self {
            q,
            dq: JointVector::zeros(),
            tau_commanded: JointVector::zeros(),
            coriolis: JointVector::zeros(),
            jacobian,
            ee_transform,
        }
    }

    /// 检查所有字段为有限值
    pub fn validate(&self) -> Result<(), DriverError> {
        fn finite<'a>(mut values: impl Iterator<Item = &'a f64>) -> bool {
            values.all(|v| v.is_finite())
        }

        if !finite(self.q.iter()) {
            return Err(DriverError::InvalidState("q"));
        }
        if !finite(self.dq.iter()) {
            return Err(DriverError::InvalidState("dq"));
        }
        if !finite(self.tau_commanded.iter()) {
            return Err(DriverError::InvalidState("tau_commanded"));
        }
        if !finite(self.coriolis.iter()) {
            return Err(DriverError::InvalidState("coriolis"));
        }
        if !finite(self.jacobian.iter()) {
            return Err(DriverError::InvalidState("jacobian"));
        }
        let t = &self.ee_transform;
        if !finite(t.translation.vector.iter()) || !finite(t.rotation.coords.iter()) {
            return Err(DriverError::InvalidState("ee_transform"));
        }
        Ok(())
    }
}

/// 模型/状态提供者
///
/// 必须能在控制频率下（1kHz）以有界延迟查询。
pub trait ModelStateProvider: Send + Sync {
    /// 读取当前状态快照
    fn snapshot(&self, frame: Frame) -> Result<RobotSnapshot, DriverError>;
}

/// 单关节力矩执行器
pub trait JointActuator: Send {
    /// 关节名称
    fn name(&self) -> &str;

    /// 下发力矩命令（Nm）
    fn set_command(&mut self, torque: f64);
}

/// 宿主硬件抽象
///
/// 仅在初始化阶段使用：句柄解析失败属于配置错误。
pub trait RobotHardware {
    /// 按名称获取模型/状态句柄（通常为 `<arm_id>_model`）
    fn model_state(&self, name: &str) -> Result<Arc<dyn ModelStateProvider>, DriverError>;

    /// 按关节名获取力矩执行器
    fn effort_joint(&self, joint_name: &str) -> Result<Box<dyn JointActuator>, DriverError>;
}

/// 切换请求的严格程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strictness {
    /// 尽力而为：忽略无法停止的未运行控制器
    #[default]
    BestEffort,
    /// 严格：任何一项失败则整体失败
    Strict,
}

/// 控制器激活权威
///
/// # 约定
///
/// 返回 `Err` 时必须保证没有发生部分激活：原来处于激活状态的控制器保持激活。
/// 监督器的互斥不变式依赖这一点。
pub trait ControllerSwitcher: Send {
    /// 启动 `start` 中的控制器，停止 `stop` 中的控制器
    fn switch_controllers(
        &mut self,
        start: &[String],
        stop: &[String],
        strictness: Strictness,
    ) -> Result<(), DriverError>;
}

impl<S: ControllerSwitcher + ?Sized> ControllerSwitcher for Box<S> {
    fn switch_controllers(
        &mut self,
        start: &[String],
        stop: &[String],
        strictness: Strictness,
    ) -> Result<(), DriverError> {
        (**self).switch_controllers(start, stop, strictness)
    }
}
