//! Mock 硬件接口
//!
//! 用于无机器人环境下测试的模拟硬件：
//! - [`MockArm`]: 可脚本化的模型/状态提供者，回读执行器收到的力矩作为"上一周期命令"
//! - [`MockHardware`]: 按名称提供句柄，可模拟缺失的模型句柄或关节
//! - [`MockSwitcher`]: 跟踪激活集合的控制器激活权威，可模拟拒绝

use crate::hardware::{
    ControllerSwitcher, Frame, Jacobian, JointActuator, JointVector, ModelStateProvider,
    RobotHardware, RobotSnapshot, Strictness,
};
use crate::DriverError;
use arc_swap::ArcSwap;
use nalgebra::Isometry3;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// 模拟机械臂（模型/状态提供者）
pub struct MockArm {
    snapshot: ArcSwap<RobotSnapshot>,
    commanded: Arc<Mutex<JointVector>>,
    fail_reads: AtomicBool,
    reads: AtomicUsize,
}

impl MockArm {
    /// 以给定快照创建
    pub fn new(snapshot: RobotSnapshot) -> Self {
        let commanded = Arc::new(Mutex::new(snapshot.tau_commanded));
        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            commanded,
            fail_reads: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
        }
    }

    /// 静止在零位、末端位于原点、雅可比为零
    pub fn at_rest() -> Self {
        Self::new(RobotSnapshot::at_rest(
            JointVector::zeros(),
            Jacobian::zeros(),
            Isometry3::identity(),
        ))
    }

    /// 替换状态快照（保留已下发的力矩命令）
    pub fn set_snapshot(&self, snapshot: RobotSnapshot) {
        self.snapshot.store(Arc::new(snapshot));
    }

    /// 就地修改状态快照
    pub fn update_snapshot(&self, f: impl FnOnce(&mut RobotSnapshot)) {
        let mut next = self.snapshot.load().as_ref().clone();
        f(&mut next);
        self.snapshot.store(Arc::new(next));
    }

    /// 模拟读取失败
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    /// 最近一次下发到各关节的力矩
    pub fn commanded(&self) -> JointVector {
        *self.commanded.lock()
    }

    /// 直接设置"上一周期命令"
    pub fn set_commanded(&self, tau: JointVector) {
        *self.commanded.lock() = tau;
    }

    /// 已发生的读取次数
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// 创建写入本臂命令缓冲的关节执行器
    pub fn joint(&self, index: usize, name: impl Into<String>) -> MockJoint {
        MockJoint {
            name: name.into(),
            index,
            commanded: Arc::clone(&self.commanded),
        }
    }
}

impl ModelStateProvider for MockArm {
    fn snapshot(&self, _frame: Frame) -> Result<RobotSnapshot, DriverError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(DriverError::ModelRead("mock read failure".to_string()));
        }
        let mut snapshot = self.snapshot.load().as_ref().clone();
        snapshot.tau_commanded = *self.commanded.lock();
        Ok(snapshot)
    }
}

/// 模拟关节执行器
pub struct MockJoint {
    name: String,
    index: usize,
    commanded: Arc<Mutex<JointVector>>,
}

impl JointActuator for MockJoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_command(&mut self, torque: f64) {
        self.commanded.lock()[self.index] = torque;
    }
}

/// 模拟宿主硬件
pub struct MockHardware {
    model_name: String,
    arm: Option<Arc<MockArm>>,
    joint_names: Vec<String>,
}

impl MockHardware {
    /// 创建提供 `<arm_id>_model` 与给定关节的硬件
    pub fn new(arm_id: &str, arm: Arc<MockArm>, joint_names: &[String]) -> Self {
        Self {
            model_name: format!("{}_model", arm_id),
            arm: Some(arm),
            joint_names: joint_names.to_vec(),
        }
    }

    /// 不提供模型句柄的硬件
    pub fn without_model(joint_names: &[String]) -> Self {
        Self {
            model_name: String::new(),
            arm: None,
            joint_names: joint_names.to_vec(),
        }
    }
}

impl RobotHardware for MockHardware {
    fn model_state(&self, name: &str) -> Result<Arc<dyn ModelStateProvider>, DriverError> {
        match &self.arm {
            Some(arm) if name == self.model_name => {
                Ok(Arc::clone(arm) as Arc<dyn ModelStateProvider>)
            },
            _ => Err(DriverError::MissingHandle {
                kind: "model",
                name: name.to_string(),
            }),
        }
    }

    fn effort_joint(&self, joint_name: &str) -> Result<Box<dyn JointActuator>, DriverError> {
        let missing = || DriverError::MissingHandle {
            kind: "effort joint",
            name: joint_name.to_string(),
        };
        let index = self
            .joint_names
            .iter()
            .position(|n| n == joint_name)
            .ok_or_else(missing)?;
        let arm = self.arm.as_ref().ok_or_else(missing)?;
        Ok(Box::new(arm.joint(index, joint_name)))
    }
}

/// 一次切换请求的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchRecord {
    pub start: Vec<String>,
    pub stop: Vec<String>,
    pub strictness: Strictness,
    pub accepted: bool,
}

#[derive(Debug, Default)]
struct SwitcherState {
    active: BTreeSet<String>,
    reject: bool,
    history: Vec<SwitchRecord>,
}

/// 模拟控制器激活权威
///
/// `Clone` 共享同一状态：一份交给监督器，一份留给测试观察。
#[derive(Debug, Clone, Default)]
pub struct MockSwitcher {
    state: Arc<Mutex<SwitcherState>>,
}

impl MockSwitcher {
    /// 以给定控制器处于激活状态创建
    pub fn with_active(name: &str) -> Self {
        let switcher = Self::default();
        switcher.state.lock().active.insert(name.to_string());
        switcher
    }

    /// 设置是否拒绝后续请求
    pub fn set_reject(&self, reject: bool) {
        self.state.lock().reject = reject;
    }

    /// 当前激活的控制器集合
    pub fn active(&self) -> Vec<String> {
        self.state.lock().active.iter().cloned().collect()
    }

    /// 全部切换请求记录
    pub fn history(&self) -> Vec<SwitchRecord> {
        self.state.lock().history.clone()
    }

    /// 切换请求次数
    pub fn request_count(&self) -> usize {
        self.state.lock().history.len()
    }
}

impl ControllerSwitcher for MockSwitcher {
    fn switch_controllers(
        &mut self,
        start: &[String],
        stop: &[String],
        strictness: Strictness,
    ) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        let accepted = !state.reject;
        state.history.push(SwitchRecord {
            start: start.to_vec(),
            stop: stop.to_vec(),
            strictness,
            accepted,
        });
        if !accepted {
            return Err(DriverError::SwitchRejected("mock rejection".to_string()));
        }
        for name in stop {
            state.active.remove(name);
        }
        for name in start {
            state.active.insert(name.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joint_names() -> Vec<String> {
        (1..=7).map(|i| format!("panda_joint{}", i)).collect()
    }

    #[test]
    fn test_commands_feed_back_into_snapshot() {
        let arm = Arc::new(MockArm::at_rest());
        let hw = MockHardware::new("panda", Arc::clone(&arm), &joint_names());

        let mut joint = hw.effort_joint("panda_joint3").unwrap();
        joint.set_command(1.5);

        let model = hw.model_state("panda_model").unwrap();
        let snapshot = model.snapshot(Frame::EndEffector).unwrap();
        assert_eq!(snapshot.tau_commanded[2], 1.5);
        assert_eq!(arm.read_count(), 1);
    }

    #[test]
    fn test_missing_handles() {
        let arm = Arc::new(MockArm::at_rest());
        let hw = MockHardware::new("panda", arm, &joint_names());
        assert!(matches!(
            hw.model_state("other_model"),
            Err(DriverError::MissingHandle { kind: "model", .. })
        ));
        assert!(hw.effort_joint("panda_joint8").is_err());

        let hw = MockHardware::without_model(&joint_names());
        assert!(hw.model_state("panda_model").is_err());
    }

    #[test]
    fn test_fail_reads() {
        let arm = MockArm::at_rest();
        arm.set_fail_reads(true);
        assert!(arm.snapshot(Frame::EndEffector).is_err());
        arm.set_fail_reads(false);
        assert!(arm.snapshot(Frame::EndEffector).is_ok());
    }

    #[test]
    fn test_switcher_tracks_active_set() {
        let observer = MockSwitcher::with_active("a");
        let mut switcher = observer.clone();

        switcher
            .switch_controllers(&["b".into()], &["a".into(), "c".into()], Strictness::BestEffort)
            .unwrap();
        assert_eq!(observer.active(), vec!["b".to_string()]);

        observer.set_reject(true);
        let result =
            switcher.switch_controllers(&["a".into()], &["b".into()], Strictness::BestEffort);
        assert!(result.is_err());
        assert_eq!(observer.active(), vec!["b".to_string()]);
        assert_eq!(observer.request_count(), 2);
        assert!(!observer.history()[1].accepted);
    }
}
