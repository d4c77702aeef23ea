//! 控制器生命周期与固定频率循环

pub mod lifecycle;
pub mod loop_runner;

pub use lifecycle::ControllerLifecycle;
pub use loop_runner::{LoopConfig, LoopStats, run_controller};
