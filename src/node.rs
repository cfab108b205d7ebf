//! 条件节点：WHERE / HAVING 子句的中间表示。

/// 条件连接词。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Logic {
    And,
    Or,
}

impl Logic {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// 条件所属子句。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ClauseType {
    Where,
    Having,
}

impl ClauseType {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            Self::Where => "WHERE",
            Self::Having => "HAVING",
        }
    }
}

/// 条件右侧：命名占位符或已编译的 SQL 片段。
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Bound(String),
    Spliced(String),
}

impl Operand {
    pub(crate) fn render(&self) -> String {
        match self {
            Self::Bound(name) => format!(":{name}"),
            Self::Spliced(sql) => sql.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ConditionNode {
    Logic(Logic),
    Comparison {
        field: String,
        operator: String,
        operand: Operand,
    },
    Null {
        field: String,
        not: bool,
    },
    In {
        field: String,
        not: bool,
        operands: Vec<Operand>,
    },
    Between {
        field: String,
        not: bool,
        lower: Operand,
        upper: Operand,
    },
    Exists {
        not: bool,
        sql: String,
    },
    Raw(String),
    Group(String),
}

fn not_prefix(not: bool) -> &'static str {
    if not { "NOT " } else { "" }
}

impl ConditionNode {
    pub(crate) fn render(&self) -> String {
        match self {
            Self::Logic(logic) => logic.as_sql().to_string(),
            Self::Comparison {
                field,
                operator,
                operand,
            } => format!("{field} {} {}", operator.to_uppercase(), operand.render()),
            Self::Null { field, not } => format!("{field} IS {}NULL", not_prefix(*not)),
            Self::In {
                field,
                not,
                operands,
            } => {
                // 子查询已自带括号，不再嵌套一层
                if let [Operand::Spliced(sql)] = operands.as_slice()
                    && sql.starts_with('(')
                {
                    return format!("{field} {}IN {sql}", not_prefix(*not));
                }
                let list = operands
                    .iter()
                    .map(Operand::render)
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{field} {}IN ({list})", not_prefix(*not))
            }
            Self::Between {
                field,
                not,
                lower,
                upper,
            } => format!(
                "{field} {}BETWEEN {} AND {}",
                not_prefix(*not),
                lower.render(),
                upper.render()
            ),
            Self::Exists { not, sql } => format!("{}EXISTS ({sql})", not_prefix(*not)),
            Self::Raw(sql) | Self::Group(sql) => sql.clone(),
        }
    }
}
