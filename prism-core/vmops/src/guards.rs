//! 电源状态转换守卫
//!
//! 每个变更操作在发出任何远端调用之前，先对本地已知的原始电源
//! 状态做前置校验。状态机：`OFF → start → ON`，
//! `ON → stop | shutdown_guest | reboot_guest | reset`，
//! `terminate` 仅在 `OFF` 下允许；`suspend` 在本平台永久不支持。

use crate::error::{OpsError, Result};

/// 电源操作类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerOp {
    Start,
    Stop,
    ShutdownGuest,
    RebootGuest,
    Reset,
    Terminate,
    Suspend,
}

impl PowerOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::ShutdownGuest => "shutdown_guest",
            Self::RebootGuest => "reboot_guest",
            Self::Reset => "reset",
            Self::Terminate => "terminate",
            Self::Suspend => "suspend",
        }
    }
}

/// 校验操作是否适用于当前原始电源状态
pub fn validate_transition(op: PowerOp, raw_state: Option<&str>) -> Result<()> {
    let state = raw_state.unwrap_or("unknown");
    let allowed = match op {
        PowerOp::Suspend => return Err(OpsError::Unsupported("suspend")),
        PowerOp::Start | PowerOp::Terminate => state == "OFF",
        PowerOp::Stop | PowerOp::ShutdownGuest | PowerOp::RebootGuest | PowerOp::Reset => {
            state == "ON"
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(OpsError::InvalidPowerState {
            op: op.name(),
            state: state.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_only_from_off() {
        assert!(validate_transition(PowerOp::Start, Some("OFF")).is_ok());
        assert!(matches!(
            validate_transition(PowerOp::Start, Some("ON")),
            Err(OpsError::InvalidPowerState { op: "start", .. })
        ));
        assert!(validate_transition(PowerOp::Start, None).is_err());
    }

    #[test]
    fn test_on_only_operations() {
        for op in [
            PowerOp::Stop,
            PowerOp::ShutdownGuest,
            PowerOp::RebootGuest,
            PowerOp::Reset,
        ] {
            assert!(validate_transition(op, Some("ON")).is_ok());
            assert!(validate_transition(op, Some("OFF")).is_err());
        }
    }

    #[test]
    fn test_terminate_only_from_off() {
        assert!(validate_transition(PowerOp::Terminate, Some("OFF")).is_ok());
        assert!(validate_transition(PowerOp::Terminate, Some("ON")).is_err());
    }

    #[test]
    fn test_suspend_is_permanently_unsupported() {
        for state in [Some("ON"), Some("OFF"), None] {
            assert!(matches!(
                validate_transition(PowerOp::Suspend, state),
                Err(OpsError::Unsupported("suspend"))
            ));
        }
    }
}
