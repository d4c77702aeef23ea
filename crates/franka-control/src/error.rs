//! 控制层错误类型定义

use franka_driver::DriverError;
use franka_protocol::ProtocolError;
use thiserror::Error;

/// 控制层错误类型
#[derive(Error, Debug)]
pub enum ControlError {
    /// 配置错误（加载期致命错误，初始化中止）
    #[error("Configuration fault: {0}")]
    Config(String),

    /// 驱动层错误
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 入站消息无效
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 数值计算失败（如 SVD 未收敛）
    #[error("Numerical failure: {0}")]
    Numerical(&'static str),

    /// 控制器尚未经过 `starting()`
    #[error("Controller not started")]
    NotStarted,

    /// 控制循环配置无效
    #[error("Invalid loop configuration: {0}")]
    LoopConfig(String),
}

/// 模式切换错误
///
/// 任何一种错误都意味着监督器状态未改变。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwitchError {
    /// 命令中的模式编码无法识别，命令被忽略
    #[error("Unknown joint command mode {0}; ignoring command")]
    UnknownMode(i32),

    /// 控制器激活权威拒绝切换
    #[error("Failed to switch controllers: {0}")]
    ActivationFailed(#[source] DriverError),
}

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl From<ConfigError> for ControlError {
    fn from(err: ConfigError) -> Self {
        ControlError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_error_display() {
        let err = ControlError::Config("joint_names must have 7 entries".to_string());
        assert!(format!("{}", err).starts_with("Configuration fault"));

        let err: ControlError = DriverError::ModelRead("timeout".to_string()).into();
        assert!(matches!(err, ControlError::Driver(_)));
        assert!(format!("{}", err).contains("timeout"));

        let err: ControlError = ProtocolError::UnknownMode(7).into();
        assert!(format!("{}", err).contains("7"));

        assert_eq!(format!("{}", ControlError::NotStarted), "Controller not started");
    }

    #[test]
    fn test_switch_error_display() {
        let err = SwitchError::UnknownMode(9);
        assert_eq!(format!("{}", err), "Unknown joint command mode 9; ignoring command");

        let err = SwitchError::ActivationFailed(DriverError::SwitchRejected("busy".into()));
        assert!(format!("{}", err).contains("busy"));
    }

    #[test]
    fn test_config_error_into_control_error() {
        let err: ControlError = ConfigError::Invalid("bad gains".to_string()).into();
        match err {
            ControlError::Config(msg) => assert!(msg.contains("bad gains")),
            _ => panic!("Expected Config variant"),
        }
    }
}
