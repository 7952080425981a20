//! 远程控制台
//!
//! 仅支持 HTML5/VNC；控制台地址是经代理的 `vnc_auto.html` 页面，
//! 要求虚拟机处于运行状态。

use crate::error::{OpsError, Result};

/// 构造代理控制台地址，虚拟机必须处于 ON 状态
pub fn console_url(
    hostname: &str,
    vm_uuid: &str,
    vm_name: &str,
    known_raw_state: Option<&str>,
) -> Result<String> {
    if known_raw_state != Some("ON") {
        return Err(OpsError::InvalidPowerState {
            op: "remote_console",
            state: known_raw_state.unwrap_or("unknown").to_string(),
        });
    }

    let encoded_name: String = url::form_urlencoded::byte_serialize(vm_name.as_bytes()).collect();
    Ok(format!(
        "https://{}/console/vnc_auto.html?path=proxy/{}&name={}",
        hostname, vm_uuid, encoded_name
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_url_for_running_vm() {
        let url = console_url("pc.lab.local", "vm-uuid-1", "web 01", Some("ON")).unwrap();
        assert_eq!(
            url,
            "https://pc.lab.local/console/vnc_auto.html?path=proxy/vm-uuid-1&name=web+01"
        );
    }

    #[test]
    fn test_console_requires_running_vm() {
        assert!(matches!(
            console_url("pc.lab.local", "vm-uuid-1", "web-01", Some("OFF")),
            Err(OpsError::InvalidPowerState { op: "remote_console", .. })
        ));
        assert!(console_url("pc.lab.local", "vm-uuid-1", "web-01", None).is_err());
    }
}
