//! # Franka Protocol
//!
//! 控制核心的入站消息定义（无硬件依赖、与传输层无关）
//!
//! ## 模块
//!
//! - `command`: 控制模式切换命令、命令超时设定
//! - `impedance`: 平衡位姿目标、刚度/阻尼参数
//!
//! ## 边界转换
//!
//! 线上格式（如 `StiffnessMessage` 中以 `-1` 表示"临界阻尼"的约定）只在本层出现，
//! 上层只看到类型化的 [`ImpedanceUpdate`] / [`DampingSpec`]。

pub mod command;
pub mod impedance;

// 重新导出常用类型
pub use command::*;
pub use impedance::*;

use thiserror::Error;

/// 关节数量（7 自由度机械臂）
pub const JOINT_COUNT: usize = 7;

/// 笛卡尔空间自由度（平移 3 + 旋转 3）
pub const CARTESIAN_DOF: usize = 6;

/// 协议层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("Unknown joint command mode: {0}")]
    UnknownMode(i32),

    #[error("Non-finite value in field {field}")]
    NonFinite { field: &'static str },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },

    #[error("Degenerate orientation quaternion (norm {norm})")]
    DegenerateQuaternion { norm: f64 },
}

/// 检查一组数值是否全部有限
pub(crate) fn ensure_finite(field: &'static str, values: &[f64]) -> Result<(), ProtocolError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ProtocolError::NonFinite { field })
    }
}
