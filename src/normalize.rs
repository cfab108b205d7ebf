//! 标识符归一化：表名、列名与含 `[table.column]` 宏的表达式。

use crate::driver::Driver;
use crate::raw::{contains_raw, strip_markers};

/// 归一化 `db.table.column` 形式的标识符路径，逐段交给驱动引用。
///
/// `*` 段原样保留；空段（如多余的 `.`）丢弃。
pub(crate) fn normalize_table_or_column(
    driver: &dyn Driver,
    names: &str,
    alias: Option<&str>,
    with_as: bool,
) -> String {
    let mut out = names
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|seg| {
            if seg == "*" {
                seg.to_string()
            } else {
                driver.quote_identifier(seg)
            }
        })
        .collect::<Vec<_>>()
        .join(".");

    if let Some(alias) = alias.filter(|a| !a.is_empty()) {
        out.push(' ');
        if with_as {
            out.push_str("AS ");
        }
        out.push_str(&driver.quote_identifier(alias));
    }
    out
}

/// 归一化条件字段：带 `.` 的字段自带表名，否则用当前表名限定。
pub(crate) fn normalize_column(driver: &dyn Driver, field: &str, table: &str) -> String {
    if contains_raw(field) || field.contains('(') {
        return normalize_expression(driver, field, table);
    }
    if field.contains('.') || table.is_empty() {
        normalize_table_or_column(driver, field, None, false)
    } else {
        normalize_table_or_column(driver, &format!("{table}.{field}"), None, false)
    }
}

/// 归一化表达式：去掉 raw 标记，并展开 `[column]` / `[table.column]` 宏。
pub(crate) fn normalize_expression(driver: &dyn Driver, sql: &str, table: &str) -> String {
    let sql = strip_markers(sql);
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql.as_str();

    while let Some(i) = rest.find('[') {
        if let Some(j) = rest[i + 1..].find(']') {
            let token = &rest[i + 1..i + 1 + j];
            if is_ident_token(token) {
                out.push_str(&rest[..i]);
                out.push_str(&expand_macro(driver, token, table));
                rest = &rest[i + 1 + j + 1..];
                continue;
            }
        }
        out.push_str(&rest[..=i]);
        rest = &rest[i + 1..];
    }
    out.push_str(rest);
    out
}

fn is_ident_token(t: &str) -> bool {
    let mut chars = t.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || matches!(first, '_' | '*'))
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '*'))
}

fn expand_macro(driver: &dyn Driver, token: &str, table: &str) -> String {
    if token.contains('.') || table.is_empty() {
        normalize_table_or_column(driver, token, None, false)
    } else {
        normalize_table_or_column(driver, &format!("{table}.{token}"), None, false)
    }
}
