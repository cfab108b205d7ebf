//! 绑定参数值类型。

use std::borrow::Cow;

/// 绑定参数值。
#[derive(Debug, Clone, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    String(Cow<'static, str>),
    Bytes(Vec<u8>),
    DateTime(time::OffsetDateTime),
}

impl BindValue {
    /// 将 `Option<T>` 映射为 `BindValue`：`None => Null`，`Some(v) => v.into()`。
    pub fn from_option<T: Into<BindValue>>(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// 字符串值的只读视图。
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// 尽力转成整数；时间戳等场景使用。
    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            Self::U64(v) => i64::try_from(*v).ok(),
            Self::Bool(v) => Some(*v as i64),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

/// 绑定参数的类型提示，留给驱动层决定如何发送参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindHint {
    Null,
    Bool,
    Int,
    Str,
    Blob,
}

/// 带可选类型提示的绑定参数。
#[derive(Debug, Clone, PartialEq)]
pub struct BindParam {
    pub value: BindValue,
    pub hint: Option<BindHint>,
}

impl BindParam {
    pub fn new(value: impl Into<BindValue>) -> Self {
        Self {
            value: value.into(),
            hint: None,
        }
    }

    pub fn with_hint(value: impl Into<BindValue>, hint: BindHint) -> Self {
        Self {
            value: value.into(),
            hint: Some(hint),
        }
    }
}

impl From<()> for BindValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for BindValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i8> for BindValue {
    fn from(v: i8) -> Self {
        Self::I64(v as i64)
    }
}

impl From<i16> for BindValue {
    fn from(v: i16) -> Self {
        Self::I64(v as i64)
    }
}

impl From<i32> for BindValue {
    fn from(v: i32) -> Self {
        Self::I64(v as i64)
    }
}

impl From<i64> for BindValue {
    fn from(v: i64) -> Self {
        Self::I64(v)
    }
}

impl From<u8> for BindValue {
    fn from(v: u8) -> Self {
        Self::U64(v as u64)
    }
}

impl From<u16> for BindValue {
    fn from(v: u16) -> Self {
        Self::U64(v as u64)
    }
}

impl From<u32> for BindValue {
    fn from(v: u32) -> Self {
        Self::U64(v as u64)
    }
}

impl From<u64> for BindValue {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<f32> for BindValue {
    fn from(v: f32) -> Self {
        Self::F64(v as f64)
    }
}

impl From<f64> for BindValue {
    fn from(v: f64) -> Self {
        Self::F64(v)
    }
}

impl From<String> for BindValue {
    fn from(v: String) -> Self {
        Self::String(Cow::Owned(v))
    }
}

impl From<&'static str> for BindValue {
    fn from(v: &'static str) -> Self {
        Self::String(Cow::Borrowed(v))
    }
}

impl From<Vec<u8>> for BindValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<time::OffsetDateTime> for BindValue {
    fn from(v: time::OffsetDateTime) -> Self {
        Self::DateTime(v)
    }
}
