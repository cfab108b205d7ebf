//! 数据库驱动抽象：标识符引用、LIMIT 方言与能力探测。

use dyn_clone::DynClone;

/// 驱动方言接口。所有与具体引擎相关的差异都收敛到这里。
pub trait Driver: DynClone {
    /// 引用单段标识符（表名或列名，不含 `.`）。
    fn quote_identifier(&self, name: &str) -> String;

    /// 渲染 LIMIT 片段；两者皆无时返回空串。
    fn limit_clause(&self, count: Option<u64>, offset: Option<u64>) -> String;

    /// 是否支持 FULL JOIN。
    fn supports_full_join(&self) -> bool {
        true
    }

    /// 是否支持 ON DUPLICATE KEY UPDATE。
    fn supports_duplicate_key_update(&self) -> bool {
        false
    }
}

dyn_clone::clone_trait_object!(Driver);

/// MySQL 方言。
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDriver;

impl Driver for MysqlDriver {
    fn quote_identifier(&self, name: &str) -> String {
        format!("`{name}`")
    }

    fn limit_clause(&self, count: Option<u64>, offset: Option<u64>) -> String {
        match (count, offset) {
            (Some(count), Some(offset)) => format!("LIMIT {offset},{count}"),
            (Some(count), None) => format!("LIMIT {count}"),
            // 只有偏移时用哨兵值补足行数上限
            (None, Some(offset)) => format!("LIMIT {offset},18446744073709551615"),
            (None, None) => String::new(),
        }
    }

    fn supports_full_join(&self) -> bool {
        false
    }

    fn supports_duplicate_key_update(&self) -> bool {
        true
    }
}
