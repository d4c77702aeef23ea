//! 笛卡尔阻抗控制
//!
//! - [`pose`]: 位姿误差与四元数双覆盖处理
//! - [`gains`]: 刚度/阻尼矩阵
//! - [`math`]: 伪逆与力矩变化率限幅
//! - [`controller`]: 控制器与目标更新句柄

pub mod controller;
pub mod gains;
pub mod math;
pub mod pose;

pub use controller::{CartesianImpedanceController, ImpedanceHandle};
pub use gains::ImpedanceGains;
pub use pose::CartesianPose;
