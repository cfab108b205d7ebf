//! 条件构造过程中的错误类型。

/// 错误分类：调用方式错误、数据形状错误、配置错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 链式调用顺序或参数组合不合法。
    Usage,
    /// 传入的数据本身不满足要求。
    DataShape,
    /// 构造器环境缺失或不支持。
    Configuration,
}

/// 条件构造错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConditionError {
    #[error("days can only be less than 31, but `{0}` given")]
    DayOutOfRange(i64),

    #[error("months can only be less than 12, but `{0}` given")]
    MonthOutOfRange(i64),

    #[error("`{0}` is not a recognizable time value")]
    InvalidTimeValue(String),

    #[error("the [not] in param value must not be an empty list")]
    EmptyInList,

    #[error("the [not] between param value must contain at least two elements")]
    BetweenTooFew,

    #[error("having does not support [not] exists")]
    ExistsInHaving,

    #[error("lock share and for update cannot exist at the same time")]
    LockConflict,

    #[error("JOIN queries cannot be used while using UNION queries")]
    JoinWithUnion,

    #[error("driver does not support FULL JOIN")]
    FullJoinUnsupported,

    #[error("positional parameters do not match with bind data")]
    PositionalBindMismatch,

    #[error("data for insert can not be empty")]
    EmptyInsertData,

    #[error("rows for batch insert must share the same field set")]
    JaggedInsertRows,

    #[error("data for update can not be empty")]
    EmptyUpdateData,

    #[error("no table has been set for the statement")]
    MissingTable,

    #[error("middleware registry was not set")]
    MiddlewareRegistryMissing,

    #[error("condition middleware `{0}` was not registered")]
    UndefinedMiddleware(String),
}

impl ConditionError {
    /// 返回错误所属分类。
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ExistsInHaving
            | Self::LockConflict
            | Self::JoinWithUnion
            | Self::FullJoinUnsupported
            | Self::MissingTable => ErrorKind::Usage,
            Self::DayOutOfRange(_)
            | Self::MonthOutOfRange(_)
            | Self::InvalidTimeValue(_)
            | Self::EmptyInList
            | Self::BetweenTooFew
            | Self::PositionalBindMismatch
            | Self::EmptyInsertData
            | Self::JaggedInsertRows
            | Self::EmptyUpdateData => ErrorKind::DataShape,
            Self::MiddlewareRegistryMissing
            | Self::UndefinedMiddleware(_) => ErrorKind::Configuration,
        }
    }
}
