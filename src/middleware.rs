//! 条件中间件：`handle` 在构建期改写配置，`terminate` 在装配期改写 SQL 分段。

use crate::string_builder::StringBuilder;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// 中间件配置：随语句携带的键值对。
pub type MiddlewareConfigs = BTreeMap<String, String>;

/// 语句分段集合，保持装配顺序。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlSections {
    entries: Vec<(String, String)>,
}

impl SqlSections {
    pub fn push(&mut self, name: impl Into<String>, sql: impl Into<String>) {
        self.entries.push((name.into(), sql.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.as_str())
    }

    /// 改写分段；不存在时追加到末尾。
    pub fn set(&mut self, name: &str, sql: impl Into<String>) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = sql.into();
        } else {
            self.entries.push((name.to_string(), sql.into()));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s.as_str()))
    }

    /// 跳过空分段，以空格拼出完整语句。
    pub fn join_non_empty(&self) -> String {
        let mut buf = StringBuilder::new();
        for (_, sql) in &self.entries {
            buf.write_leading(sql);
        }
        buf.into_string()
    }
}

/// 构建期中间件：拿到配置并返回改写后的配置。
pub trait HandleMiddleware {
    fn handle(&self, configs: MiddlewareConfigs) -> MiddlewareConfigs;
}

/// 装配期中间件：改写语句分段后交还。
pub trait TerminateMiddleware {
    fn terminate(&self, configs: &MiddlewareConfigs, sections: SqlSections) -> SqlSections;
}

/// 注册表中的一项，两个阶段都可选。
#[derive(Clone, Default)]
pub struct MiddlewareEntry {
    pub handle: Option<Rc<dyn HandleMiddleware>>,
    pub terminate: Option<Rc<dyn TerminateMiddleware>>,
}

impl fmt::Debug for MiddlewareEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareEntry")
            .field("handle", &self.handle.is_some())
            .field("terminate", &self.terminate.is_some())
            .finish()
    }
}

/// 按名称注册的中间件集合。
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    entries: HashMap<String, MiddlewareEntry>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, entry: MiddlewareEntry) -> &mut Self {
        self.entries.insert(name.into(), entry);
        self
    }

    pub fn register_handle(
        &mut self,
        name: impl Into<String>,
        middleware: Rc<dyn HandleMiddleware>,
    ) -> &mut Self {
        self.entries.entry(name.into()).or_default().handle = Some(middleware);
        self
    }

    pub fn register_terminate(
        &mut self,
        name: impl Into<String>,
        middleware: Rc<dyn TerminateMiddleware>,
    ) -> &mut Self {
        self.entries.entry(name.into()).or_default().terminate = Some(middleware);
        self
    }

    pub(crate) fn get(&self, name: &str) -> Option<&MiddlewareEntry> {
        self.entries.get(name)
    }
}

impl fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("MiddlewareRegistry")
            .field("names", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::SqlSections;
    use pretty_assertions::assert_eq;

    #[test]
    fn join_skips_empty_sections() {
        let mut sections = SqlSections::default();
        sections.push("select", "SELECT");
        sections.push("distinct", "");
        sections.push("columns", "*");
        assert_eq!(sections.join_non_empty(), "SELECT *");
    }

    #[test]
    fn set_replaces_in_place() {
        let mut sections = SqlSections::default();
        sections.push("where", "WHERE a = 1");
        sections.set("where", "WHERE a = 2");
        assert_eq!(sections.get("where"), Some("WHERE a = 2"));
        assert_eq!(sections.iter().count(), 1);
    }
}
