//! 控制模式切换命令
//!
//! 模式编码与上游 `JointCommand` 消息保持一致：
//!
//! | 编码 | 模式     |
//! |------|----------|
//! | 1    | Position |
//! | 2    | Velocity |
//! | 3    | Torque   |
//! | 4    | Impedance|
//!
//! 其他编码视为非法，由 [`ModeCommand::mode`] 返回 [`ProtocolError::UnknownMode`]。

use crate::ProtocolError;

/// 关节空间控制模式（可由外部命令请求的四种模式）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, num_enum::TryFromPrimitive, num_enum::IntoPrimitive,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum JointCommandMode {
    /// 关节位置控制
    Position = 1,
    /// 关节速度控制
    Velocity = 2,
    /// 关节力矩控制
    Torque = 3,
    /// 关节阻抗控制
    Impedance = 4,
}

impl JointCommandMode {
    /// 所有可请求的模式（按编码顺序）
    pub const ALL: [JointCommandMode; 4] = [
        JointCommandMode::Position,
        JointCommandMode::Velocity,
        JointCommandMode::Torque,
        JointCommandMode::Impedance,
    ];

    /// 从整数编码解析
    pub fn from_code(code: i32) -> Result<Self, ProtocolError> {
        Self::try_from(code).map_err(|_| ProtocolError::UnknownMode(code))
    }

    /// 整数编码
    pub fn code(self) -> i32 {
        self.into()
    }
}

/// 模式切换命令
///
/// 只携带原始编码；编码是否合法在分发时才判定，
/// 这样非法命令可以被记录并丢弃，而不是在反序列化阶段失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModeCommand {
    /// 请求的模式编码
    pub mode: i32,
}

impl ModeCommand {
    pub const fn new(mode: i32) -> Self {
        Self { mode }
    }

    /// 解析请求的模式
    pub fn mode(&self) -> Result<JointCommandMode, ProtocolError> {
        JointCommandMode::from_code(self.mode)
    }
}

impl From<JointCommandMode> for ModeCommand {
    fn from(mode: JointCommandMode) -> Self {
        Self { mode: mode.code() }
    }
}

/// 命令超时时长设定（秒）
///
/// 数值范围不在此处约束，由监督器钳位到 [0, 1] 秒。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeoutUpdate {
    pub seconds: f64,
}

impl TimeoutUpdate {
    pub const fn new(seconds: f64) -> Self {
        Self { seconds }
    }
}
