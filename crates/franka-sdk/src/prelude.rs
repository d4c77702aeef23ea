//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use franka_sdk::prelude::*;
//! ```

// 控制层
pub use franka_control::prelude::*;
pub use franka_control::{ControllersConfig, ImpedanceConfig, LoopStats, WatchdogHandle};

// 驱动层（宿主适配层需要实现的 trait）
pub use franka_driver::{
    Clock, ControllerSwitcher, JointActuator, ModelStateProvider, MonotonicClock, RobotHardware,
    RobotSnapshot, Strictness,
};

// 入站消息
pub use franka_protocol::{
    DampingSpec, ImpedanceUpdate, JointCommandMode, ModeCommand, PoseTarget, StiffnessMessage,
    TimeoutUpdate,
};

// 错误类型
pub use franka_driver::DriverError;
pub use franka_protocol::ProtocolError;
