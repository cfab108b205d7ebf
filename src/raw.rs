//! 原样 SQL 标记：被标记的片段不做归一化改写，也不会变成绑定参数。
//!
//! 标记格式为 `{~~{#!<key>…<key>!#}~~}`，`key` 是进程级一次性随机串，
//! 防止用户数据伪造出可被解释的标记。

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::Rng;
use std::sync::OnceLock;

const MARKER_PREFIX: &str = "{~~{#!";
const MARKER_SUFFIX: &str = "!#}~~}";

static MARKER_KEY: OnceLock<String> = OnceLock::new();

fn marker_key() -> &'static str {
    MARKER_KEY.get_or_init(|| {
        let mut rng = rand::rng();
        format!("{:08x}{:08x}", rng.random::<u32>(), rng.random::<u32>())
    })
}

/// 标记一段 SQL 原样拼接。
pub fn raw(sql: impl AsRef<str>) -> String {
    let key = marker_key();
    format!("{MARKER_PREFIX}{key}{}{key}{MARKER_SUFFIX}", sql.as_ref())
}

/// 字符串里是否出现过 raw 片段。
pub(crate) fn contains_raw(s: &str) -> bool {
    s.contains(MARKER_PREFIX)
}

/// 整串恰好是一个 raw 片段时取出负载。
pub(crate) fn unwrap_raw(s: &str) -> Option<&str> {
    let key = marker_key();
    s.strip_prefix(MARKER_PREFIX)?
        .strip_suffix(MARKER_SUFFIX)?
        .strip_prefix(key)?
        .strip_suffix(key)
}

/// 抹掉所有 raw 标记，保留负载本身。
pub(crate) fn strip_markers(s: &str) -> String {
    if !contains_raw(s) {
        return s.to_string();
    }
    let mut out = s.to_string();
    for payload in extract_payloads(s) {
        out = out.replace(&raw(&payload), &payload);
    }
    out
}

fn extract_payloads(s: &str) -> Vec<String> {
    let key = marker_key();
    let open = format!("{MARKER_PREFIX}{key}");
    let close = format!("{key}{MARKER_SUFFIX}");
    let mut out = Vec::new();
    let mut rest = s;
    while let Some(i) = rest.find(&open) {
        let after = &rest[i + open.len()..];
        let Some(j) = after.find(&close) else {
            break;
        };
        out.push(after[..j].to_string());
        rest = &after[j + close.len()..];
    }
    out
}

/// 按逗号切分表达式列表；raw 片段里的逗号不参与切分。
///
/// 切分前先把 raw 负载替换为 base64 形式（base64 字母表不含逗号），
/// 切分后再还原。
pub(crate) fn split_list(expr: &str) -> Vec<String> {
    if !expr.contains(',') {
        let t = expr.trim();
        return if t.is_empty() {
            Vec::new()
        } else {
            vec![t.to_string()]
        };
    }

    let mut work = expr.to_string();
    let mut encoded: Vec<(String, String)> = Vec::new();
    for payload in extract_payloads(expr) {
        let enc = BASE64.encode(payload.as_bytes());
        work = work.replace(&raw(&payload), &raw(&enc));
        encoded.push((enc, payload));
    }

    work.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|part| {
            if let Some(p) = unwrap_raw(part) {
                for (enc, orig) in &encoded {
                    if p == enc {
                        return raw(orig);
                    }
                }
            }
            part.to_string()
        })
        .collect()
}
