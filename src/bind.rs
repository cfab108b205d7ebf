//! 绑定参数登记：命名净化、冲突去重与子表达式前缀。

use crate::value::BindParam;
use std::collections::HashMap;

/// 有序的命名绑定参数集合，保持登记顺序。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindParams {
    entries: Vec<(String, BindParam)>,
}

impl BindParams {
    pub fn get(&self, name: &str) -> Option<&BindParam> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    pub fn insert(&mut self, name: impl Into<String>, param: BindParam) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = param;
        } else {
            self.entries.push((name, param));
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BindParam)> {
        self.entries.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, BindParam)> {
        self.entries
    }
}

/// 把任意字符串净化成合法的绑定参数名。
///
/// 合法字符为字母、数字与下划线；其余字符替换为 `_`，
/// 连续的 `_` 折叠为一个，并去掉首尾的 `_`。
pub(crate) fn sanitize_bind_name(name: &str) -> String {
    let valid =
        !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() { c } else { '_' };
        if c == '_' {
            if prev_underscore {
                continue;
            }
            prev_underscore = true;
        } else {
            prev_underscore = false;
        }
        out.push(c);
    }
    out.trim_matches('_').to_string()
}

/// 把 `:name` 占位符换名；只在词边界上整名匹配。
pub(crate) fn rewrite_placeholder(sql: &str, old: &str, new: &str) -> String {
    let pat = format!(":{old}");
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    while let Some(i) = rest.find(&pat) {
        let end = i + pat.len();
        let at_boundary = rest[end..]
            .chars()
            .next()
            .is_none_or(|c| !(c.is_ascii_alphanumeric() || c == '_'));
        out.push_str(&rest[..i]);
        if at_boundary {
            out.push(':');
            out.push_str(new);
        } else {
            out.push_str(&rest[i..end]);
        }
        rest = &rest[end..];
    }
    out.push_str(rest);
    out
}

/// 绑定参数登记簿：负责生成唯一参数名并累积参数值。
#[derive(Debug, Clone, Default)]
pub(crate) struct BindRegistry {
    params: BindParams,
    cache: HashMap<String, u32>,
    sub_prefix: String,
    bind_prefix: String,
}

impl BindRegistry {
    pub(crate) fn params(&self) -> &BindParams {
        &self.params
    }

    pub(crate) fn take_params(&mut self) -> BindParams {
        std::mem::take(&mut self.params)
    }

    pub(crate) fn clear(&mut self) {
        self.params = BindParams::default();
        self.cache.clear();
    }

    /// 子表达式作用域前缀：`sub<N>_`。
    pub(crate) fn set_sub_prefix(&mut self, id: u32) {
        self.sub_prefix = format!("sub{id}_");
    }

    /// 语句级绑定名前缀；自动补一个 `_` 分隔。
    pub(crate) fn set_bind_prefix(&mut self, prefix: &str) {
        self.bind_prefix = if prefix.is_empty() {
            String::new()
        } else {
            format!("{prefix}_")
        };
    }

    /// 由字段名生成唯一绑定名；重名时追加 `_<n>` 计数。
    pub(crate) fn generate(&mut self, hint: &str) -> String {
        let base = sanitize_bind_name(hint);
        let mut name = format!("{}{}{base}", self.sub_prefix, self.bind_prefix);
        loop {
            let Some(count) = self.cache.get(&name).copied() else {
                self.cache.insert(name.clone(), 1);
                return name;
            };
            let candidate = format!("{name}_{count}");
            if self.cache.contains_key(&candidate) {
                name = candidate;
                continue;
            }
            self.cache.insert(name.clone(), count + 1);
            self.cache.insert(candidate.clone(), 1);
            return candidate;
        }
    }

    pub(crate) fn bind(&mut self, name: &str, param: BindParam) {
        self.params.insert(name, param);
    }

    /// 合并子作用域的绑定；同名时保留已有的一方。
    pub(crate) fn merge(&mut self, child: BindRegistry) {
        for (name, param) in child.params.into_entries() {
            if !self.params.contains(&name) {
                self.params.insert(name, param);
            }
        }
        for (name, count) in child.cache {
            self.cache.entry(name).or_insert(count);
        }
    }
}
