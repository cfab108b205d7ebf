//! 语句配置：一条语句从 builder 调用到装配前的全部状态。

use crate::middleware::MiddlewareConfigs;
use crate::node::ConditionNode;

/// 子查询没有显式别名时使用的默认别名。
pub(crate) const DEFAULT_SUBQUERY_ALIAS: &str = "a";

/// JOIN 类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    Natural,
}

impl JoinType {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL JOIN",
            Self::Cross => "CROSS JOIN",
            Self::Natural => "NATURAL JOIN",
        }
    }
}

/// UNION 类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionType {
    Union,
    UnionAll,
}

impl UnionType {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Union => "UNION",
            Self::UnionAll => "UNION ALL",
        }
    }
}

/// 排序方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sort {
    Asc,
    Desc,
}

impl Sort {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// FROM 列表中的一项；首项为主表，其余为 JOIN。
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FromEntry {
    pub(crate) join_type: JoinType,
    pub(crate) schema: Option<String>,
    pub(crate) table_name: String,
    pub(crate) alias: String,
    pub(crate) join_cond: Option<String>,
}

/// SELECT 列表中的一列。
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnEntry {
    pub(crate) table: String,
    pub(crate) col: String,
    pub(crate) alias: Option<String>,
}

/// 聚合列。
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AggregateEntry {
    pub(crate) expr: String,
    pub(crate) alias: String,
}

/// 可单独重置的配置分区。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Comment,
    Prefix,
    Distinct,
    Columns,
    Aggregate,
    Union,
    From,
    Index,
    Where,
    Group,
    Having,
    Order,
    Limit,
    Lock,
    MiddlewareConfigs,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StatementConfig {
    pub(crate) comment: Option<String>,
    pub(crate) prefix: Vec<String>,
    pub(crate) distinct: bool,
    pub(crate) columns: Vec<ColumnEntry>,
    pub(crate) aggregate: Vec<AggregateEntry>,
    pub(crate) union: Vec<(String, UnionType)>,
    pub(crate) from: Vec<FromEntry>,
    pub(crate) force_index: Vec<String>,
    pub(crate) ignore_index: Vec<String>,
    pub(crate) where_nodes: Vec<ConditionNode>,
    pub(crate) group: Vec<String>,
    pub(crate) having_nodes: Vec<ConditionNode>,
    pub(crate) order: Vec<String>,
    pub(crate) limit_count: Option<u64>,
    pub(crate) limit_offset: Option<u64>,
    pub(crate) limit_query: bool,
    pub(crate) for_update: bool,
    pub(crate) lock_share: bool,
    pub(crate) middleware_configs: MiddlewareConfigs,
}

impl Default for StatementConfig {
    fn default() -> Self {
        Self {
            comment: None,
            prefix: Vec::new(),
            distinct: false,
            columns: Vec::new(),
            aggregate: Vec::new(),
            union: Vec::new(),
            from: Vec::new(),
            force_index: Vec::new(),
            ignore_index: Vec::new(),
            where_nodes: Vec::new(),
            group: Vec::new(),
            having_nodes: Vec::new(),
            order: Vec::new(),
            limit_count: None,
            limit_offset: None,
            limit_query: true,
            for_update: false,
            lock_share: false,
            middleware_configs: MiddlewareConfigs::new(),
        }
    }
}

impl StatementConfig {
    pub(crate) fn reset_section(&mut self, section: ConfigSection) {
        match section {
            ConfigSection::Comment => self.comment = None,
            ConfigSection::Prefix => self.prefix.clear(),
            ConfigSection::Distinct => self.distinct = false,
            ConfigSection::Columns => self.columns.clear(),
            ConfigSection::Aggregate => self.aggregate.clear(),
            ConfigSection::Union => self.union.clear(),
            ConfigSection::From => self.from.clear(),
            ConfigSection::Index => {
                self.force_index.clear();
                self.ignore_index.clear();
            }
            ConfigSection::Where => self.where_nodes.clear(),
            ConfigSection::Group => self.group.clear(),
            ConfigSection::Having => self.having_nodes.clear(),
            ConfigSection::Order => self.order.clear(),
            ConfigSection::Limit => {
                self.limit_count = None;
                self.limit_offset = None;
                self.limit_query = true;
            }
            ConfigSection::Lock => {
                self.for_update = false;
                self.lock_share = false;
            }
            ConfigSection::MiddlewareConfigs => self.middleware_configs.clear(),
        }
    }
}
