//! 笛卡尔阻抗控制器
//!
//! # 数据流
//!
//! ```text
//! 位姿/刚度消息 (任意线程) ──► ImpedanceHandle ──► Mutex<ImpedanceTargets>
//!                                                         │ 每周期拷贝一次
//!                                                         ▼
//! ModelStateProvider ──► update() ──► τ ──► JointActuator ×7
//!                            │
//!                            └── 当前（滤波后）目标由控制线程独占，无锁
//! ```
//!
//! 控制律：
//!
//! ```text
//! τ_task = Jᵀ(-K·e - D·(J·dq))
//! τ_null = (I - Jᵀ·pinv(Jᵀ))·(k_n·(q_ref - q) - 2·sqrt(k_n)·dq)
//! τ_d    = τ_task + τ_null + coriolis
//! τ      = τ_last + clamp(τ_d - τ_last, ±Δτ_max)
//! ```

use super::gains::{INITIAL_DAMPING_FACTOR, ImpedanceGains};
use super::math::{damped_pseudo_inverse, saturate_torque_rate};
use super::pose::{CartesianPose, align_hemisphere};
use crate::config::ArmConfig;
use crate::control::ControllerLifecycle;
use crate::error::ControlError;
use franka_driver::{
    Frame, JointActuator, JointVector, ModelStateProvider, RobotHardware, RobotSnapshot,
};
use franka_protocol::{
    ImpedanceUpdate, JOINT_COUNT, PoseTarget, ProtocolError, StiffnessMessage,
};
use nalgebra::SMatrix;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// 外部写入的原始目标（未滤波）
#[derive(Debug, Clone, Copy)]
struct ImpedanceTargets {
    pose: CartesianPose,
    gains: ImpedanceGains,
}

/// 目标更新句柄
///
/// 可克隆、可跨线程传递。所有方法只持有目标锁，不会阻塞在硬件访问上。
#[derive(Debug, Clone)]
pub struct ImpedanceHandle {
    targets: Arc<Mutex<ImpedanceTargets>>,
    critical_damping_factor: f64,
}

impl ImpedanceHandle {
    fn new(gains: ImpedanceGains, critical_damping_factor: f64) -> Self {
        Self {
            targets: Arc::new(Mutex::new(ImpedanceTargets {
                pose: CartesianPose::identity(),
                gains,
            })),
            critical_damping_factor,
        }
    }

    /// 设置新的平衡位姿
    ///
    /// 新姿态先对齐到旧目标所在半球，避免符号翻转。
    pub fn apply_pose(&self, target: &PoseTarget) -> Result<(), ProtocolError> {
        target.validate()?;
        let mut pose = CartesianPose::from_target(target);

        let mut targets = self.targets.lock();
        pose.orientation = align_hemisphere(&pose.orientation, &targets.pose.orientation);
        targets.pose = pose;
        drop(targets);

        trace!(
            "Equilibrium pose updated: position = {:?}",
            target.position
        );
        Ok(())
    }

    /// 设置新的刚度/阻尼目标
    pub fn set_impedance(&self, update: &ImpedanceUpdate) -> Result<(), ProtocolError> {
        update.validate()?;
        let mut targets = self.targets.lock();
        targets.gains = ImpedanceGains::from_update(
            update,
            self.critical_damping_factor,
            targets.gains.nullspace_stiffness,
        );
        drop(targets);

        trace!("Impedance target updated: {:?}", update);
        Ok(())
    }

    /// 处理线格式的刚度消息
    pub fn apply_stiffness_message(&self, message: StiffnessMessage) -> Result<(), ProtocolError> {
        let update = ImpedanceUpdate::try_from(message)?;
        self.set_impedance(&update)
    }

    /// 当前原始目标位姿
    pub fn target_pose(&self) -> CartesianPose {
        self.targets.lock().pose
    }

    /// 当前原始目标增益
    pub fn target_gains(&self) -> ImpedanceGains {
        self.targets.lock().gains
    }

    fn snapshot(&self) -> ImpedanceTargets {
        *self.targets.lock()
    }

    fn reset_pose(&self, pose: CartesianPose) {
        self.targets.lock().pose = pose;
    }
}

/// 笛卡尔阻抗控制器
pub struct CartesianImpedanceController {
    model: Arc<dyn ModelStateProvider>,
    joints: Vec<Box<dyn JointActuator>>,
    handle: ImpedanceHandle,

    // 以下状态仅由控制线程访问
    current_pose: CartesianPose,
    current_gains: ImpedanceGains,
    nullspace_reference: Option<JointVector>,
    last_command: JointVector,

    filter_coefficient: f64,
    max_torque_delta: f64,
    pinv_damping: f64,
}

impl CartesianImpedanceController {
    /// 解析硬件句柄并建立初始目标
    ///
    /// 任何句柄缺失或配置不合法都返回 [`ControlError::Config`]。
    pub fn init(hardware: &dyn RobotHardware, config: &ArmConfig) -> Result<Self, ControlError> {
        config.validate()?;
        let gains = config.impedance.gains()?;

        let model_name = config.model_handle_name();
        let model = hardware.model_state(&model_name).map_err(|e| {
            ControlError::Config(format!("Failed to get model handle '{}': {}", model_name, e))
        })?;

        let joints = config
            .joint_names
            .iter()
            .map(|name| {
                hardware.effort_joint(name).map_err(|e| {
                    ControlError::Config(format!("Failed to get joint handle '{}': {}", name, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if joints.len() != JOINT_COUNT {
            return Err(ControlError::Config(format!(
                "Expected {} joint handles, got {}",
                JOINT_COUNT,
                joints.len()
            )));
        }

        let targets = ImpedanceGains::critically_damped(&gains, INITIAL_DAMPING_FACTOR);
        let handle = ImpedanceHandle::new(targets, config.impedance.critical_damping_factor);

        info!(
            "Cartesian impedance controller initialized for '{}' (stiffness = {:?})",
            config.arm_id, gains
        );

        Ok(Self {
            model,
            joints,
            handle,
            current_pose: CartesianPose::identity(),
            current_gains: ImpedanceGains::zeros(),
            nullspace_reference: None,
            last_command: JointVector::zeros(),
            filter_coefficient: config.impedance.filter_coefficient,
            max_torque_delta: config.impedance.max_torque_delta,
            pinv_damping: config.impedance.pinv_damping,
        })
    }

    /// 目标更新句柄（可交给消息处理线程）
    pub fn handle(&self) -> ImpedanceHandle {
        self.handle.clone()
    }

    /// 当前（滤波后）目标位姿
    pub fn current_pose(&self) -> &CartesianPose {
        &self.current_pose
    }

    /// 当前（滤波后）增益
    pub fn current_gains(&self) -> &ImpedanceGains {
        &self.current_gains
    }

    /// 零空间参考构型（`starting()` 之后可用）
    pub fn nullspace_reference(&self) -> Option<&JointVector> {
        self.nullspace_reference.as_ref()
    }

    /// 最近一个周期下发的力矩
    pub fn last_command(&self) -> &JointVector {
        &self.last_command
    }

    fn read_state(&self) -> Result<RobotSnapshot, ControlError> {
        let snapshot = self.model.snapshot(Frame::EndEffector)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn compute_torque(
        &self,
        state: &RobotSnapshot,
        nullspace_reference: &JointVector,
    ) -> Result<JointVector, ControlError> {
        let gains = &self.current_gains;
        let pose = CartesianPose::from_isometry(&state.ee_transform);
        let error = pose.error_to(&self.current_pose);

        let jacobian_t = state.jacobian.transpose();
        let pinv = damped_pseudo_inverse(&jacobian_t, self.pinv_damping)
            .ok_or(ControlError::Numerical("SVD of Jacobian transpose failed"))?;

        let twist = state.jacobian * state.dq;
        let tau_task = jacobian_t * (-gains.stiffness * error - gains.damping * twist);

        let projector = SMatrix::<f64, JOINT_COUNT, JOINT_COUNT>::identity() - jacobian_t * pinv;
        let tau_nullspace = projector
            * ((nullspace_reference - state.q) * gains.nullspace_stiffness
                - state.dq * gains.nullspace_damping());

        let desired = tau_task + tau_nullspace + state.coriolis;
        Ok(saturate_torque_rate(
            &desired,
            &state.tau_commanded,
            self.max_torque_delta,
        ))
    }
}

impl ControllerLifecycle for CartesianImpedanceController {
    type Error = ControlError;

    fn starting(&mut self) -> Result<(), ControlError> {
        let state = self.read_state()?;
        let pose = CartesianPose::from_isometry(&state.ee_transform);

        self.current_pose = pose;
        self.handle.reset_pose(pose);
        self.nullspace_reference = Some(state.q);
        self.last_command = state.tau_commanded;

        debug!(
            "Impedance controller starting at position {:?}",
            pose.position.as_slice()
        );
        Ok(())
    }

    fn update(&mut self, _period: Duration) -> Result<(), ControlError> {
        let nullspace_reference = self.nullspace_reference.ok_or(ControlError::NotStarted)?;
        let state = self.read_state()?;

        let tau = self.compute_torque(&state, &nullspace_reference)?;
        for (joint, torque) in self.joints.iter_mut().zip(tau.iter()) {
            joint.set_command(*torque);
        }
        self.last_command = tau;

        // 目标只在锁内拷贝一次
        let targets = self.handle.snapshot();
        let alpha = self.filter_coefficient;
        self.current_gains.filter_toward(&targets.gains, alpha);
        self.current_pose.filter_toward(&targets.pose, alpha);
        Ok(())
    }

    fn stopping(&mut self) -> Result<(), ControlError> {
        debug!("Impedance controller stopping");
        Ok(())
    }
}
