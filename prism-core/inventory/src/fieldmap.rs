//! 字段名归一化适配
//!
//! 远端 API 在不同版本间混用驼峰与下划线命名（`extId` / `ext_id`、
//! `backingInfo` / `backing_info`）。所有兼容回退集中在这一个查找
//! 函数里，业务逻辑只声明候选路径列表，按序取第一个命中。

use serde_json::Value;

/// 按候选路径列表查找字段，返回第一个非空命中
///
/// 路径支持点号分段，例如 `"backingInfo.diskSizeBytes"`。
pub fn lookup<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    for path in paths {
        let mut current = value;
        let mut found = true;
        for segment in path.split('.') {
            match current.get(segment) {
                Some(next) => current = next,
                None => {
                    found = false;
                    break;
                }
            }
        }
        if found && !current.is_null() {
            return Some(current);
        }
    }
    None
}

/// 查找字符串字段
pub fn lookup_str<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a str> {
    lookup(value, paths).and_then(|v| v.as_str())
}

/// 查找整数字段
pub fn lookup_i64(value: &Value, paths: &[&str]) -> Option<i64> {
    lookup(value, paths).and_then(|v| v.as_i64())
}

/// 查找数组字段
pub fn lookup_array<'a>(value: &'a Value, paths: &[&str]) -> Option<&'a Vec<Value>> {
    lookup(value, paths).and_then(|v| v.as_array())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_prefers_first_candidate() {
        let v = json!({"extId": "a", "ext_id": "b"});
        assert_eq!(lookup_str(&v, &["extId", "ext_id"]), Some("a"));
        assert_eq!(lookup_str(&v, &["ext_id", "extId"]), Some("b"));
    }

    #[test]
    fn test_lookup_falls_back_across_variants() {
        let v = json!({"backing_info": {"disk_size_bytes": 42}});
        assert_eq!(
            lookup_i64(
                &v,
                &["backingInfo.diskSizeBytes", "backing_info.disk_size_bytes"]
            ),
            Some(42)
        );
    }

    #[test]
    fn test_lookup_skips_null_values() {
        let v = json!({"name": null, "hostName": "h1"});
        assert_eq!(lookup_str(&v, &["name", "hostName"]), Some("h1"));
    }

    #[test]
    fn test_lookup_missing_returns_none() {
        let v = json!({"a": 1});
        assert_eq!(lookup(&v, &["b", "c.d"]), None);
    }
}
