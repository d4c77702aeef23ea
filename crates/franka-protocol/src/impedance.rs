//! 阻抗控制相关的入站消息
//!
//! - [`PoseTarget`]: 平衡位姿（位置 xyz + 四元数 xyzw）
//! - [`StiffnessMessage`]: 刚度/阻尼参数的线上格式（含模式标志与哨兵值）
//! - [`ImpedanceUpdate`]: 经过校验的类型化参数更新
//!
//! # 线上格式约定
//!
//! `StiffnessMessage.use_flag == 0` 表示对角模式，否则为全耦合模式。
//! 对角模式下，若 `diagonal_damping[0] == -1.0`，表示阻尼由刚度按临界阻尼推导；
//! 该哨兵值在 [`TryFrom<StiffnessMessage>`] 中被翻译为 [`DampingSpec::Critical`]，
//! 不会泄漏到控制层。

use crate::{ProtocolError, ensure_finite};

/// 线上格式中表示"按临界阻尼推导"的哨兵值
pub const CRITICAL_DAMPING_SENTINEL: f64 = -1.0;

/// 四元数模长阈值（避免除零）
const QUATERNION_NORM_THRESHOLD: f64 = 1e-10;

/// 平衡位姿目标
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseTarget {
    /// 位置 [x, y, z]（米）
    pub position: [f64; 3],
    /// 姿态四元数 [x, y, z, w]
    pub orientation: [f64; 4],
}

impl PoseTarget {
    pub const fn new(position: [f64; 3], orientation: [f64; 4]) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// 姿态为单位四元数的位姿
    pub const fn from_position(position: [f64; 3]) -> Self {
        Self::new(position, [0.0, 0.0, 0.0, 1.0])
    }

    /// 四元数模长
    pub fn orientation_norm(&self) -> f64 {
        self.orientation.iter().map(|c| c * c).sum::<f64>().sqrt()
    }

    /// 校验数值有效性
    ///
    /// 四元数不要求已归一化，但模长不能接近零。
    pub fn validate(&self) -> Result<(), ProtocolError> {
        ensure_finite("position", &self.position)?;
        ensure_finite("orientation", &self.orientation)?;
        let norm = self.orientation_norm();
        if norm < QUATERNION_NORM_THRESHOLD {
            return Err(ProtocolError::DegenerateQuaternion { norm });
        }
        Ok(())
    }
}

/// 阻尼来源
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DampingSpec {
    /// 按临界阻尼由刚度推导（`factor * sqrt(k)`，系数由控制器配置）
    Critical,
    /// 显式给出的 6 个对角阻尼
    Explicit([f64; 6]),
}

/// 3x3 矩阵块（行优先）
pub type Block3 = [[f64; 3]; 3];

/// 类型化的刚度/阻尼更新
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ImpedanceUpdate {
    /// 对角模式：[x, y, z, xrot, yrot, zrot]
    Diagonal {
        stiffness: [f64; 6],
        damping: DampingSpec,
        nullspace_stiffness: Option<f64>,
    },
    /// 全耦合模式：平移块（左上）与旋转块（右下），平移-旋转耦合块恒为零
    Coupled {
        stiffness_translational: Block3,
        stiffness_rotational: Block3,
        damping_translational: Block3,
        damping_rotational: Block3,
        nullspace_stiffness: Option<f64>,
    },
}

impl ImpedanceUpdate {
    /// 对角刚度 + 临界阻尼
    pub const fn critical(stiffness: [f64; 6]) -> Self {
        Self::Diagonal {
            stiffness,
            damping: DampingSpec::Critical,
            nullspace_stiffness: None,
        }
    }

    /// 零空间刚度目标（未给出则保持当前目标）
    pub fn nullspace_stiffness(&self) -> Option<f64> {
        match self {
            Self::Diagonal {
                nullspace_stiffness,
                ..
            }
            | Self::Coupled {
                nullspace_stiffness,
                ..
            } => *nullspace_stiffness,
        }
    }

    /// 校验数值有效性
    ///
    /// 临界阻尼要求对角刚度非负（否则开方无意义）；零空间刚度同理。
    pub fn validate(&self) -> Result<(), ProtocolError> {
        match self {
            Self::Diagonal {
                stiffness, damping, ..
            } => {
                ensure_finite("stiffness", stiffness)?;
                match damping {
                    DampingSpec::Critical => {
                        if let Some(&k) = stiffness.iter().find(|k| **k < 0.0) {
                            return Err(ProtocolError::InvalidValue {
                                field: "stiffness",
                                value: k,
                            });
                        }
                    },
                    DampingSpec::Explicit(d) => ensure_finite("damping", d)?,
                }
            },
            Self::Coupled {
                stiffness_translational,
                stiffness_rotational,
                damping_translational,
                damping_rotational,
                ..
            } => {
                ensure_finite("stiffness_translational", stiffness_translational.as_flattened())?;
                ensure_finite("stiffness_rotational", stiffness_rotational.as_flattened())?;
                ensure_finite("damping_translational", damping_translational.as_flattened())?;
                ensure_finite("damping_rotational", damping_rotational.as_flattened())?;
            },
        }
        if let Some(kn) = self.nullspace_stiffness() {
            if !kn.is_finite() {
                return Err(ProtocolError::NonFinite {
                    field: "nullspace_stiffness",
                });
            }
            if kn < 0.0 {
                return Err(ProtocolError::InvalidValue {
                    field: "nullspace_stiffness",
                    value: kn,
                });
            }
        }
        Ok(())
    }
}

/// 刚度/阻尼参数的线上格式
///
/// 与上游 `CartImpedanceStiffness` 消息逐字段对应，按块分组。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StiffnessMessage {
    /// 0：对角模式；其他：全耦合模式
    pub use_flag: i32,
    /// [x, y, z, xrot, yrot, zrot]
    pub diagonal_stiffness: [f64; 6],
    /// [bx, by, bz, bxrot, byrot, bzrot]；`bx == -1` 表示临界阻尼
    pub diagonal_damping: [f64; 6],
    pub stiffness_translational: Block3,
    pub stiffness_rotational: Block3,
    pub damping_translational: Block3,
    pub damping_rotational: Block3,
    pub nullspace_stiffness: Option<f64>,
}

impl StiffnessMessage {
    /// 是否为对角模式
    pub fn is_diagonal(&self) -> bool {
        self.use_flag == 0
    }
}

impl TryFrom<StiffnessMessage> for ImpedanceUpdate {
    type Error = ProtocolError;

    fn try_from(msg: StiffnessMessage) -> Result<Self, Self::Error> {
        let update = if msg.is_diagonal() {
            let damping = if msg.diagonal_damping[0] == CRITICAL_DAMPING_SENTINEL {
                DampingSpec::Critical
            } else {
                DampingSpec::Explicit(msg.diagonal_damping)
            };
            ImpedanceUpdate::Diagonal {
                stiffness: msg.diagonal_stiffness,
                damping,
                nullspace_stiffness: msg.nullspace_stiffness,
            }
        } else {
            ImpedanceUpdate::Coupled {
                stiffness_translational: msg.stiffness_translational,
                stiffness_rotational: msg.stiffness_rotational,
                damping_translational: msg.damping_translational,
                damping_rotational: msg.damping_rotational,
                nullspace_stiffness: msg.nullspace_stiffness,
            }
        };
        update.validate()?;
        Ok(update)
    }
}
