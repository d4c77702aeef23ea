//! 驱动层错误类型定义

use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// 宿主未提供所需的句柄（模型接口、关节执行器等）
    #[error("Missing {kind} handle: {name}")]
    MissingHandle { kind: &'static str, name: String },

    /// 模型/状态读取失败
    #[error("Model/state read failed: {0}")]
    ModelRead(String),

    /// 状态快照包含非有限值
    #[error("Invalid robot state: non-finite value in {0}")]
    InvalidState(&'static str),

    /// 控制器激活权威拒绝了切换请求（未发生部分激活）
    #[error("Controller switch rejected: {0}")]
    SwitchRejected(String),

    /// 无效输入
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::DriverError;

    /// 测试 DriverError 的 Display 实现
    #[test]
    fn test_driver_error_display() {
        let err = DriverError::MissingHandle {
            kind: "effort joint",
            name: "panda_joint3".to_string(),
        };
        assert_eq!(format!("{}", err), "Missing effort joint handle: panda_joint3");

        let err = DriverError::ModelRead("bus timeout".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Model/state read failed") && msg.contains("bus timeout"));

        let err = DriverError::InvalidState("jacobian");
        assert!(format!("{}", err).contains("jacobian"));

        let err = DriverError::SwitchRejected("controller busy".to_string());
        assert!(format!("{}", err).contains("controller busy"));
    }
}
