//! 语句装配：FROM / JOIN / UNION、分段渲染与增删改语句。

use crate::bind::BindParams;
use crate::condition::{CondArg, Condition, SubquerySource};
use crate::config::{
    AggregateEntry, ColumnEntry, ConfigSection, DEFAULT_SUBQUERY_ALIAS, FromEntry, JoinType, Sort,
    StatementConfig, UnionType,
};
use crate::error::ConditionError;
use crate::middleware::{MiddlewareConfigs, SqlSections};
use crate::node::{ClauseType, Logic};
use crate::normalize::{normalize_column, normalize_expression, normalize_table_or_column};
use crate::raw::{contains_raw, split_list};
use crate::string_builder::{IntoStrings, StringBuilder, collect_into_strings};
use crate::value::{BindParam, BindValue};

/// JOIN 的数据来源：表名（可带 `db.`、`AS 别名` 或子查询文本）或子查询构造器。
#[derive(Debug, Clone)]
pub enum JoinTable {
    Name(String),
    Sub(Box<Condition>),
}

impl From<&str> for JoinTable {
    fn from(v: &str) -> Self {
        Self::Name(v.to_string())
    }
}

impl From<String> for JoinTable {
    fn from(v: String) -> Self {
        Self::Name(v)
    }
}

impl From<Condition> for JoinTable {
    fn from(v: Condition) -> Self {
        Self::Sub(Box::new(v))
    }
}

/// 写入冲突策略。
#[derive(Debug, Clone, Default)]
pub enum OnDuplicate {
    #[default]
    None,
    /// `REPLACE INTO`。
    Replace,
    /// `ON DUPLICATE KEY UPDATE`；驱动不支持时静默忽略。
    Update(Vec<DuplicateUpdate>),
}

/// ON DUPLICATE KEY UPDATE 的一项。
#[derive(Debug, Clone)]
pub enum DuplicateUpdate {
    /// `f = VALUES(f)`。
    Values(String),
    /// `f = <值>`；值为 raw 时原样拼接。
    Assign(String, BindValue),
}

/// 编译完成的可执行语句。
#[derive(Debug, Clone, PartialEq)]
pub struct ExecuteStatement {
    pub kind: &'static str,
    pub sql: String,
    pub bind_params: BindParams,
}

impl ExecuteStatement {
    fn new(sql: String, bind_params: BindParams) -> Self {
        Self {
            kind: "execute",
            sql,
            bind_params,
        }
    }
}

type JoinOn = (String, String, CondArg);

impl Condition {
    // ---- 表与列 ----

    /// 设置主表并注册查询列，如 `table("users", "*")`、`table("users AS u", ["id","name"])`。
    pub fn table(
        &mut self,
        table: impl Into<JoinTable>,
        cols: impl IntoStrings,
    ) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        self.is_table = true;
        let result = self.add_join(
            JoinType::Inner,
            table.into(),
            collect_into_strings(cols),
            None,
        );
        self.is_table = false;
        result?;
        Ok(self)
    }

    pub fn get_table(&self) -> &str {
        &self.table
    }

    /// 子查询别名；未显式设置时用默认别名。
    pub fn get_alias(&self) -> String {
        if self.alias.is_empty() {
            DEFAULT_SUBQUERY_ALIAS.to_string()
        } else {
            self.alias.clone()
        }
    }

    pub fn alias(&mut self, alias: &str) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.alias = alias.to_string();
        self
    }

    /// 追加查询列。
    pub fn columns(&mut self, cols: impl IntoStrings) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        let table = self.table.clone();
        self.add_cols(&table, collect_into_strings(cols));
        self
    }

    /// 替换查询列。
    pub fn set_columns(&mut self, cols: impl IntoStrings) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.configs.columns.clear();
        self.columns(cols)
    }

    // ---- JOIN ----

    pub fn join(
        &mut self,
        table: impl Into<JoinTable>,
        cols: impl IntoStrings,
        field: &str,
        operator: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.join_with(JoinType::Inner, table, cols, field, operator, value)
    }

    pub fn inner_join(
        &mut self,
        table: impl Into<JoinTable>,
        cols: impl IntoStrings,
        field: &str,
        operator: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.join_with(JoinType::Inner, table, cols, field, operator, value)
    }

    pub fn left_join(
        &mut self,
        table: impl Into<JoinTable>,
        cols: impl IntoStrings,
        field: &str,
        operator: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.join_with(JoinType::Left, table, cols, field, operator, value)
    }

    pub fn right_join(
        &mut self,
        table: impl Into<JoinTable>,
        cols: impl IntoStrings,
        field: &str,
        operator: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.join_with(JoinType::Right, table, cols, field, operator, value)
    }

    /// FULL JOIN；驱动不支持时报错。
    pub fn full_join(
        &mut self,
        table: impl Into<JoinTable>,
        cols: impl IntoStrings,
        field: &str,
        operator: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        if !self.driver.supports_full_join() {
            return Err(ConditionError::FullJoinUnsupported);
        }
        self.join_with(JoinType::Full, table, cols, field, operator, value)
    }

    pub fn cross_join(
        &mut self,
        table: impl Into<JoinTable>,
        cols: impl IntoStrings,
    ) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        self.add_join(
            JoinType::Cross,
            table.into(),
            collect_into_strings(cols),
            None,
        )?;
        Ok(self)
    }

    pub fn natural_join(
        &mut self,
        table: impl Into<JoinTable>,
        cols: impl IntoStrings,
    ) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        self.add_join(
            JoinType::Natural,
            table.into(),
            collect_into_strings(cols),
            None,
        )?;
        Ok(self)
    }

    fn join_with(
        &mut self,
        join_type: JoinType,
        table: impl Into<JoinTable>,
        cols: impl IntoStrings,
        field: &str,
        operator: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        self.add_join(
            join_type,
            table.into(),
            collect_into_strings(cols),
            Some((field.to_string(), operator.to_string(), value.into())),
        )?;
        Ok(self)
    }

    fn add_join(
        &mut self,
        join_type: JoinType,
        source: JoinTable,
        cols: Vec<String>,
        on: Option<JoinOn>,
    ) -> Result<(), ConditionError> {
        if !self.configs.union.is_empty() {
            return Err(ConditionError::JoinWithUnion);
        }

        let (table_name, mut alias, parse_schema) = match source {
            JoinTable::Sub(child) => {
                let mut child = *child;
                let alias = child.get_alias();
                let sql = child.assemble(true)?;
                let params = child.binds.take_params();
                let sql = self.absorb_compiled(sql, params);
                (sql, alias, false)
            }
            JoinTable::Name(name) => {
                let name = name.trim().to_string();
                if name.starts_with('(') {
                    match split_as(&name) {
                        Some((table, alias)) => (table, alias, false),
                        None => (name, DEFAULT_SUBQUERY_ALIAS.to_string(), false),
                    }
                } else if !contains_raw(&name)
                    && let Some((table, alias)) = split_as(&name)
                {
                    (table, alias, true)
                } else {
                    (name, String::new(), true)
                }
            }
        };

        let mut schema = None;
        let mut table_name = table_name;
        if parse_schema
            && let Some((sch, rest)) = table_name.split_once('.')
            && !rest.contains('.')
        {
            schema = Some(sch.to_string());
            table_name = rest.to_string();
        }
        if alias.is_empty() {
            alias = table_name.clone();
        }

        if self.is_table {
            self.table = alias.clone();
            self.alias = alias.clone();
        }

        let join_cond = match on {
            None => None,
            Some((field, operator, value)) => {
                let mut child = self.make_child();
                child.table = alias.clone();
                self.sub_seq += 1;
                child.binds.set_sub_prefix(self.sub_seq);
                child.sub_seq = self.sub_seq;
                child.set_clause(ClauseType::Where, Logic::And);
                child.add_condition(&field, &operator, vec![value])?;
                let body = child.render_clause_body(ClauseType::Where);
                self.finish_child(child);
                Some(body)
            }
        };

        let entry = FromEntry {
            join_type,
            schema,
            table_name,
            alias: alias.clone(),
            join_cond,
        };
        if let Some(existing) = self.configs.from.iter_mut().find(|e| e.alias == alias) {
            *existing = entry;
        } else {
            self.configs.from.push(entry);
        }

        self.add_cols(&alias, cols);
        Ok(())
    }

    fn add_cols(&mut self, table: &str, cols: Vec<String>) {
        for col in cols {
            for item in split_list(&col) {
                if contains_raw(&item) {
                    self.configs.columns.push(ColumnEntry {
                        table: table.to_string(),
                        col: item,
                        alias: None,
                    });
                    continue;
                }
                let (expr, alias) = match split_as(&item) {
                    Some((expr, alias)) => (expr, Some(alias)),
                    None => (item, None),
                };
                let (col_table, col) = if expr.contains('.') && !expr.contains('(') {
                    match expr.split_once('.') {
                        Some((t, c)) => (t.to_string(), c.to_string()),
                        None => (table.to_string(), expr),
                    }
                } else {
                    (table.to_string(), expr)
                };
                self.configs.columns.push(ColumnEntry {
                    table: col_table,
                    col,
                    alias,
                });
            }
        }
    }

    // ---- UNION ----

    pub fn union(
        &mut self,
        source: impl Into<SubquerySource>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_union(source.into(), UnionType::Union)
    }

    pub fn union_all(
        &mut self,
        source: impl Into<SubquerySource>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_union(source.into(), UnionType::UnionAll)
    }

    fn add_union(
        &mut self,
        source: SubquerySource,
        union_type: UnionType,
    ) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        if self.configs.from.len() > 1 {
            return Err(ConditionError::JoinWithUnion);
        }
        let sql = match source {
            SubquerySource::Sql(sql) => sql,
            SubquerySource::Builder(child) => {
                let mut child = *child;
                let sql = child.assemble(false)?;
                let params = child.binds.take_params();
                self.absorb_compiled(sql, params)
            }
        };
        self.configs.union.push((sql, union_type));
        Ok(self)
    }

    // ---- GROUP BY / ORDER BY ----

    pub fn group_by(&mut self, expr: impl IntoStrings) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        for col in collect_into_strings(expr) {
            for item in split_list(&col) {
                let sql = if contains_raw(&item) || item.contains('(') {
                    normalize_expression(self.driver.as_ref(), &item, &self.table)
                } else {
                    normalize_column(self.driver.as_ref(), &item, &self.table)
                };
                self.configs.group.push(sql);
            }
        }
        self
    }

    pub fn order_by(&mut self, expr: impl IntoStrings) -> &mut Self {
        self.add_order(expr, Sort::Asc)
    }

    pub fn order_by_asc(&mut self, expr: impl IntoStrings) -> &mut Self {
        self.add_order(expr, Sort::Asc)
    }

    pub fn order_by_desc(&mut self, expr: impl IntoStrings) -> &mut Self {
        self.add_order(expr, Sort::Desc)
    }

    /// 按字段倒序，常用于取最新记录。
    pub fn latest(&mut self, field: &str) -> &mut Self {
        self.add_order(field, Sort::Desc)
    }

    pub fn oldest(&mut self, field: &str) -> &mut Self {
        self.add_order(field, Sort::Asc)
    }

    fn add_order(&mut self, expr: impl IntoStrings, default_sort: Sort) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        for col in collect_into_strings(expr) {
            for item in split_list(&col) {
                let entry = if contains_raw(&item) || item.contains('(') {
                    let expr = normalize_expression(self.driver.as_ref(), &item, &self.table);
                    let (expr, sort) = split_sort(&expr);
                    format!("{expr} {}", sort.unwrap_or(default_sort).as_sql())
                } else {
                    let (expr, sort) = split_sort(&item);
                    let col = normalize_column(self.driver.as_ref(), &expr, &self.table);
                    format!("{col} {}", sort.unwrap_or(default_sort).as_sql())
                };
                self.configs.order.push(entry);
            }
        }
        self
    }

    // ---- 聚合 ----

    pub fn count(&mut self, field: &str, alias: &str) -> &mut Self {
        self.add_aggregate("COUNT", field, alias)
    }

    pub fn avg(&mut self, field: &str, alias: &str) -> &mut Self {
        self.add_aggregate("AVG", field, alias)
    }

    pub fn max(&mut self, field: &str, alias: &str) -> &mut Self {
        self.add_aggregate("MAX", field, alias)
    }

    pub fn min(&mut self, field: &str, alias: &str) -> &mut Self {
        self.add_aggregate("MIN", field, alias)
    }

    pub fn sum(&mut self, field: &str, alias: &str) -> &mut Self {
        self.add_aggregate("SUM", field, alias)
    }

    fn add_aggregate(&mut self, func: &'static str, field: &str, alias: &str) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        // 聚合查询不再输出普通列，且退化为单行
        self.configs.columns.clear();
        self.one();
        let expr = if field == "*" {
            "*".to_string()
        } else if contains_raw(field) || field.contains('(') {
            normalize_expression(self.driver.as_ref(), field, &self.table)
        } else {
            normalize_column(self.driver.as_ref(), field, &self.table)
        };
        self.configs.aggregate.push(AggregateEntry {
            expr: format!("{func}({expr})"),
            alias: alias.to_string(),
        });
        self
    }

    // ---- LIMIT 与锁 ----

    /// 单行模式：`LIMIT 1`。
    pub fn one(&mut self) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.configs.limit_count = Some(1);
        self.configs.limit_offset = None;
        self.configs.limit_query = false;
        self
    }

    /// 回到多行模式并清掉 LIMIT。
    pub fn all(&mut self) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.configs.limit_count = None;
        self.configs.limit_offset = None;
        self.configs.limit_query = true;
        self
    }

    pub fn top(&mut self, count: u64) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.configs.limit_count = Some(count);
        self.configs.limit_offset = None;
        self.configs.limit_query = true;
        self
    }

    pub fn limit(&mut self, offset: u64, count: u64) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.configs.limit_offset = Some(offset);
        self.configs.limit_count = Some(count);
        self.configs.limit_query = true;
        self
    }

    pub fn for_page(&mut self, page: u64, per_page: u64) -> &mut Self {
        self.limit(page.saturating_sub(1).saturating_mul(per_page), per_page)
    }

    pub fn for_update(&mut self, flag: bool) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        if flag && self.configs.lock_share {
            return Err(ConditionError::LockConflict);
        }
        self.configs.for_update = flag;
        Ok(self)
    }

    pub fn lock_share(&mut self, flag: bool) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        if flag && self.configs.for_update {
            return Err(ConditionError::LockConflict);
        }
        self.configs.lock_share = flag;
        Ok(self)
    }

    // ---- 其余修饰 ----

    pub fn distinct(&mut self, flag: bool) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.configs.distinct = flag;
        self
    }

    pub fn comment(&mut self, comment: &str) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.configs.comment = Some(comment.to_string());
        self
    }

    /// SELECT 修饰前缀，如 `SQL_CALC_FOUND_ROWS`。
    pub fn prefix(&mut self, prefix: &str) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.configs.prefix.push(prefix.to_string());
        self
    }

    pub fn force_index(&mut self, indexes: impl IntoStrings) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        for item in collect_into_strings(indexes) {
            self.configs.force_index.extend(split_list(&item));
        }
        self
    }

    pub fn ignore_index(&mut self, indexes: impl IntoStrings) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        for item in collect_into_strings(indexes) {
            self.configs.ignore_index.extend(split_list(&item));
        }
        self
    }

    /// 重置配置；`section` 为 `None` 时整体重置。
    pub fn reset(&mut self, section: Option<ConfigSection>) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        match section {
            None => {
                self.configs = StatementConfig::default();
                self.table.clear();
                self.alias.clear();
                self.in_time = None;
            }
            Some(section) => self.configs.reset_section(section),
        }
        self
    }

    // ---- 中间件 ----

    /// 挂载已注册的中间件：`handle` 立即作用于配置，`terminate` 延迟到装配。
    pub fn middlewares(&mut self, names: &[&str]) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        if names.is_empty() {
            return Ok(self);
        }
        let registry = self
            .registry
            .clone()
            .ok_or(ConditionError::MiddlewareRegistryMissing)?;

        let mut handles = Vec::new();
        for name in names {
            let entry = registry
                .get(name)
                .ok_or_else(|| ConditionError::UndefinedMiddleware(name.to_string()))?;
            if let Some(terminate) = &entry.terminate
                && !self.terminators.iter().any(|(n, _)| n == name)
            {
                self.terminators.push((name.to_string(), terminate.clone()));
            }
            if let Some(handle) = &entry.handle {
                handles.push(handle.clone());
            }
        }

        let mut configs = std::mem::take(&mut self.configs.middleware_configs);
        for handle in handles {
            configs = handle.handle(configs);
        }
        self.configs.middleware_configs = configs;
        Ok(self)
    }

    pub fn middleware_configs(&self) -> &MiddlewareConfigs {
        &self.configs.middleware_configs
    }

    // ---- 装配 ----

    /// 编译 SELECT 语句。重复调用结果一致。
    pub fn make_sql(&self) -> Result<String, ConditionError> {
        self.assemble(false)
    }

    pub(crate) fn assemble(&self, with_logic_group: bool) -> Result<String, ConditionError> {
        let mut sections = SqlSections::default();
        sections.push("comment", self.parse_comment());
        sections.push("select", "SELECT");
        sections.push("prefix", self.configs.prefix.join(" "));
        sections.push(
            "distinct",
            if self.configs.distinct { "DISTINCT" } else { "" },
        );
        sections.push("columns", self.parse_columns());
        sections.push("aggregate", self.parse_aggregate());
        sections.push("from", self.parse_from());
        sections.push("index", self.parse_index());
        sections.push("where", self.render_clause(ClauseType::Where));
        sections.push("group", self.parse_group());
        sections.push("having", self.render_clause(ClauseType::Having));
        sections.push("order", self.parse_order());
        sections.push("limit", self.parse_limit(false));
        sections.push(
            "forupdate",
            if self.configs.for_update {
                "FOR UPDATE"
            } else {
                ""
            },
        );
        sections.push(
            "lockshare",
            if self.configs.lock_share {
                "LOCK IN SHARE MODE"
            } else {
                ""
            },
        );
        sections.push("union", self.parse_union());

        let sections = self.apply_terminators(sections);
        let sql = sections.join_non_empty();
        tracing::debug!(target: "sql_condition", %sql, "compiled select statement");
        Ok(if with_logic_group {
            format!("({sql})")
        } else {
            sql
        })
    }

    fn apply_terminators(&self, mut sections: SqlSections) -> SqlSections {
        for (_, terminate) in &self.terminators {
            sections = terminate.terminate(&self.configs.middleware_configs, sections);
        }
        sections
    }

    fn parse_comment(&self) -> String {
        match &self.configs.comment {
            Some(comment) => format!("/*{comment}*/"),
            None => String::new(),
        }
    }

    fn parse_columns(&self) -> String {
        let mut items = Vec::with_capacity(self.configs.columns.len());
        for entry in &self.configs.columns {
            let sql = if contains_raw(&entry.col) || entry.col.contains('(') {
                let expr =
                    normalize_expression(self.driver.as_ref(), &entry.col, &entry.table);
                match &entry.alias {
                    Some(alias) => {
                        format!("{expr} AS {}", self.driver.quote_identifier(alias))
                    }
                    None => expr,
                }
            } else {
                let path = if entry.table.is_empty() {
                    entry.col.clone()
                } else {
                    format!("{}.{}", entry.table, entry.col)
                };
                normalize_table_or_column(
                    self.driver.as_ref(),
                    &path,
                    entry.alias.as_deref(),
                    true,
                )
            };
            items.push(sql);
        }
        items.join(",")
    }

    fn parse_aggregate(&self) -> String {
        self.configs
            .aggregate
            .iter()
            .map(|a| format!("{} AS {}", a.expr, self.driver.quote_identifier(&a.alias)))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn parse_from(&self) -> String {
        if self.configs.from.is_empty() {
            return String::new();
        }
        let mut buf = StringBuilder::new();
        for (i, entry) in self.configs.from.iter().enumerate() {
            if i > 0 {
                buf.write_leading(entry.join_type.as_sql());
            }
            let target = if entry.table_name.starts_with('(') {
                format!(
                    "{} {}",
                    entry.table_name,
                    self.driver.quote_identifier(&entry.alias)
                )
            } else {
                let path = match &entry.schema {
                    Some(schema) => format!("{schema}.{}", entry.table_name),
                    None => entry.table_name.clone(),
                };
                if entry.alias == entry.table_name {
                    normalize_table_or_column(self.driver.as_ref(), &path, None, false)
                } else {
                    normalize_table_or_column(
                        self.driver.as_ref(),
                        &path,
                        Some(&entry.alias),
                        false,
                    )
                }
            };
            buf.write_leading(&target);
            if i > 0
                && let Some(cond) = &entry.join_cond
                && !cond.is_empty()
            {
                buf.write_leading(&format!("ON {cond}"));
            }
        }
        format!("FROM {}", buf.into_string())
    }

    fn parse_index(&self) -> String {
        let mut buf = StringBuilder::new();
        if !self.configs.force_index.is_empty() {
            buf.write_leading(&format!(
                "FORCE INDEX({})",
                self.configs.force_index.join(",")
            ));
        }
        if !self.configs.ignore_index.is_empty() {
            buf.write_leading(&format!(
                "IGNORE INDEX({})",
                self.configs.ignore_index.join(",")
            ));
        }
        buf.into_string()
    }

    fn parse_group(&self) -> String {
        if self.configs.group.is_empty() {
            return String::new();
        }
        format!("GROUP BY {}", self.configs.group.join(","))
    }

    fn parse_order(&self) -> String {
        if self.configs.order.is_empty() {
            return String::new();
        }
        let mut seen = Vec::new();
        for item in &self.configs.order {
            if !seen.contains(item) {
                seen.push(item.clone());
            }
        }
        format!("ORDER BY {}", seen.join(","))
    }

    fn parse_limit(&self, without_offset: bool) -> String {
        // 单行模式下不输出偏移
        let offset = if without_offset || !self.configs.limit_query {
            None
        } else {
            self.configs.limit_offset
        };
        self.driver.limit_clause(self.configs.limit_count, offset)
    }

    fn parse_union(&self) -> String {
        let mut out = String::new();
        for (sql, union_type) in &self.configs.union {
            out.push('\n');
            out.push_str(union_type.as_sql());
            out.push(' ');
            out.push_str(sql);
        }
        out
    }

    fn parse_master_table(&self) -> Result<String, ConditionError> {
        let first = self
            .configs
            .from
            .first()
            .ok_or(ConditionError::MissingTable)?;
        let path = match &first.schema {
            Some(schema) => format!("{schema}.{}", first.table_name),
            None => first.table_name.clone(),
        };
        Ok(normalize_table_or_column(
            self.driver.as_ref(),
            &path,
            None,
            false,
        ))
    }

    // ---- 增删改 ----

    /// 编译 INSERT（或 REPLACE）语句。
    pub fn insert(
        &mut self,
        data: Vec<(String, BindValue)>,
        bind: Vec<BindParam>,
        on_duplicate: OnDuplicate,
    ) -> Result<ExecuteStatement, ConditionError> {
        if data.is_empty() {
            return Err(ConditionError::EmptyInsertData);
        }
        let table = self.parse_master_table()?;
        let mut positional = bind.into_iter();
        let mut positional_seq = 0_usize;

        let mut fields = Vec::with_capacity(data.len());
        let mut values = Vec::with_capacity(data.len());
        for (field, value) in data {
            let (field_sql, value_sql) =
                self.normalize_bind_entry(&field, value, 0, &mut positional, &mut positional_seq)?;
            fields.push(field_sql);
            values.push(value_sql);
        }
        if positional.next().is_some() {
            return Err(ConditionError::PositionalBindMismatch);
        }

        let verb = match &on_duplicate {
            OnDuplicate::Replace => "REPLACE",
            _ => "INSERT",
        };
        let duplicate = self.parse_duplicate(&on_duplicate)?;
        let mut buf = StringBuilder::new();
        buf.write_leading(verb);
        buf.write_leading("INTO");
        buf.write_leading(&table);
        buf.write_leading(&format!("({})", fields.join(",")));
        buf.write_leading("VALUES");
        buf.write_leading(&format!("({})", values.join(",")));
        buf.write_leading(&duplicate);

        let sql = buf.into_string();
        tracing::debug!(target: "sql_condition", %sql, "compiled insert statement");
        Ok(ExecuteStatement::new(sql, self.binds.params().clone()))
    }

    /// 编译多行 INSERT；各行字段集必须一致。
    pub fn insert_all(
        &mut self,
        rows: Vec<Vec<(String, BindValue)>>,
        bind: Vec<BindParam>,
        on_duplicate: OnDuplicate,
    ) -> Result<ExecuteStatement, ConditionError> {
        if rows.is_empty() || rows.iter().any(Vec::is_empty) {
            return Err(ConditionError::EmptyInsertData);
        }
        let table = self.parse_master_table()?;
        let mut positional = bind.into_iter();
        let mut positional_seq = 0_usize;

        let mut rows = rows;
        for row in &mut rows {
            row.sort_by(|a, b| a.0.cmp(&b.0));
        }
        let field_names: Vec<&str> = rows[0].iter().map(|(f, _)| f.as_str()).collect();
        for row in &rows[1..] {
            let names: Vec<&str> = row.iter().map(|(f, _)| f.as_str()).collect();
            if names != field_names {
                return Err(ConditionError::JaggedInsertRows);
            }
        }

        let mut fields = Vec::new();
        let mut value_rows = Vec::with_capacity(rows.len());
        for (row_index, row) in rows.into_iter().enumerate() {
            let mut values = Vec::with_capacity(row.len());
            for (field, value) in row {
                let (field_sql, value_sql) = self.normalize_bind_entry(
                    &field,
                    value,
                    row_index,
                    &mut positional,
                    &mut positional_seq,
                )?;
                if row_index == 0 {
                    fields.push(field_sql);
                }
                values.push(value_sql);
            }
            value_rows.push(format!("({})", values.join(",")));
        }
        if positional.next().is_some() {
            return Err(ConditionError::PositionalBindMismatch);
        }

        let verb = match &on_duplicate {
            OnDuplicate::Replace => "REPLACE",
            _ => "INSERT",
        };
        let duplicate = self.parse_duplicate(&on_duplicate)?;
        let mut buf = StringBuilder::new();
        buf.write_leading(verb);
        buf.write_leading("INTO");
        buf.write_leading(&table);
        buf.write_leading(&format!("({})", fields.join(",")));
        buf.write_leading("VALUES");
        buf.write_leading(&value_rows.join(","));
        buf.write_leading(&duplicate);

        let sql = buf.into_string();
        tracing::debug!(target: "sql_condition", %sql, "compiled batch insert statement");
        Ok(ExecuteStatement::new(sql, self.binds.params().clone()))
    }

    /// 原样 INSERT 文本；`?` 占位符按顺序提升为命名参数。
    pub fn insert_sql(
        &mut self,
        sql: &str,
        bind: Vec<BindParam>,
    ) -> Result<ExecuteStatement, ConditionError> {
        let expr = normalize_expression(self.driver.as_ref(), sql, &self.table);
        let sql = self.promote_positional(&expr, bind)?;
        tracing::debug!(target: "sql_condition", %sql, "compiled raw insert statement");
        Ok(ExecuteStatement::new(sql, self.binds.params().clone()))
    }

    /// 编译 UPDATE 语句；携带当前 WHERE / ORDER / LIMIT。
    pub fn update(
        &mut self,
        data: Vec<(String, BindValue)>,
        bind: Vec<BindParam>,
    ) -> Result<ExecuteStatement, ConditionError> {
        if data.is_empty() {
            return Err(ConditionError::EmptyUpdateData);
        }
        // 校验主表存在
        self.parse_master_table()?;
        let mut positional = bind.into_iter();
        let mut positional_seq = 0_usize;

        let mut sets = Vec::with_capacity(data.len());
        for (field, value) in data {
            let (field_sql, value_sql) =
                self.normalize_bind_entry(&field, value, 0, &mut positional, &mut positional_seq)?;
            sets.push(format!("{field_sql} = {value_sql}"));
        }
        if positional.next().is_some() {
            return Err(ConditionError::PositionalBindMismatch);
        }

        let from = self.parse_from();
        let from = from.strip_prefix("FROM ").unwrap_or(&from);
        let mut buf = StringBuilder::new();
        buf.write_leading("UPDATE");
        buf.write_leading(from);
        buf.write_leading(&format!("SET {}", sets.join(",")));
        buf.write_leading(&self.render_clause(ClauseType::Where));
        buf.write_leading(&self.parse_order());
        buf.write_leading(&self.parse_limit(true));

        let sql = buf.into_string();
        tracing::debug!(target: "sql_condition", %sql, "compiled update statement");
        Ok(ExecuteStatement::new(sql, self.binds.params().clone()))
    }

    /// 原样 UPDATE 文本；`?` 占位符按顺序提升为命名参数。
    pub fn update_sql(
        &mut self,
        sql: &str,
        bind: Vec<BindParam>,
    ) -> Result<ExecuteStatement, ConditionError> {
        let expr = normalize_expression(self.driver.as_ref(), sql, &self.table);
        let sql = self.promote_positional(&expr, bind)?;
        tracing::debug!(target: "sql_condition", %sql, "compiled raw update statement");
        Ok(ExecuteStatement::new(sql, self.binds.params().clone()))
    }

    /// 编译 DELETE 语句；单表形式携带当前 WHERE / ORDER / LIMIT，
    /// 带 JOIN 时输出多表删除形式（不再输出 ORDER / LIMIT）。
    pub fn delete(&mut self) -> Result<ExecuteStatement, ConditionError> {
        let table = self.parse_master_table()?;
        let mut buf = StringBuilder::new();
        buf.write_leading("DELETE");
        if self.configs.from.len() > 1 {
            buf.write_leading(&self.driver.quote_identifier(&self.get_alias()));
            buf.write_leading(&self.parse_from());
            buf.write_leading(&self.render_clause(ClauseType::Where));
        } else {
            buf.write_leading("FROM");
            buf.write_leading(&table);
            buf.write_leading(&self.render_clause(ClauseType::Where));
            buf.write_leading(&self.parse_order());
            buf.write_leading(&self.parse_limit(true));
        }

        let sql = buf.into_string();
        tracing::debug!(target: "sql_condition", %sql, "compiled delete statement");
        Ok(ExecuteStatement::new(sql, self.binds.params().clone()))
    }

    /// 编译 TRUNCATE 语句；无绑定参数。
    pub fn truncate(&mut self) -> Result<ExecuteStatement, ConditionError> {
        let table = self.parse_master_table()?;
        let sql = format!("TRUNCATE TABLE {table}");
        tracing::debug!(target: "sql_condition", %sql, "compiled truncate statement");
        Ok(ExecuteStatement::new(sql, BindParams::default()))
    }

    /// 字段与值落到 SQL 片段：raw 值原样展开，普通值登记为命名参数。
    fn normalize_bind_entry(
        &mut self,
        field: &str,
        value: BindValue,
        row: usize,
        positional: &mut impl Iterator<Item = BindParam>,
        positional_seq: &mut usize,
    ) -> Result<(String, String), ConditionError> {
        let field_sql = normalize_column(self.driver.as_ref(), field, &self.table);

        if let Some(s) = value.as_str()
            && contains_raw(s)
        {
            let expr = normalize_expression(self.driver.as_ref(), s, &self.table);
            if expr == "?" {
                let param = positional
                    .next()
                    .ok_or(ConditionError::PositionalBindMismatch)?;
                let name = self
                    .binds
                    .generate(&format!("positional_param_{}", *positional_seq));
                *positional_seq += 1;
                self.binds.bind(&name, param);
                return Ok((field_sql, format!(":{name}")));
            }
            return Ok((field_sql, expr));
        }

        let hint = if row == 0 {
            format!("named_param_{field}")
        } else {
            format!("named_param_{field}_{row}")
        };
        let name = self.binds.generate(&hint);
        self.binds.bind(&name, BindParam::new(value));
        Ok((field_sql, format!(":{name}")))
    }

    fn parse_duplicate(&mut self, on_duplicate: &OnDuplicate) -> Result<String, ConditionError> {
        let OnDuplicate::Update(updates) = on_duplicate else {
            return Ok(String::new());
        };
        if updates.is_empty() || !self.driver.supports_duplicate_key_update() {
            return Ok(String::new());
        }
        let mut items = Vec::with_capacity(updates.len());
        for update in updates {
            match update {
                DuplicateUpdate::Values(field) => {
                    let field_sql = normalize_column(self.driver.as_ref(), field, &self.table);
                    items.push(format!("{field_sql} = VALUES({field_sql})"));
                }
                DuplicateUpdate::Assign(field, value) => {
                    let field_sql = normalize_column(self.driver.as_ref(), field, &self.table);
                    if let Some(s) = value.as_str()
                        && contains_raw(s)
                    {
                        let expr = normalize_expression(self.driver.as_ref(), s, &self.table);
                        items.push(format!("{field_sql} = {expr}"));
                    } else {
                        let name = self.binds.generate(&format!("named_param_{field}"));
                        self.binds.bind(&name, BindParam::new(value.clone()));
                        items.push(format!("{field_sql} = :{name}"));
                    }
                }
            }
        }
        Ok(format!("ON DUPLICATE KEY UPDATE {}", items.join(",")))
    }

    /// 把 `?` 占位符按顺序替换为 `positional_param_<n>` 命名参数。
    fn promote_positional(
        &mut self,
        sql: &str,
        bind: Vec<BindParam>,
    ) -> Result<String, ConditionError> {
        let mut positional = bind.into_iter();
        let mut seq = 0_usize;
        let mut out = String::with_capacity(sql.len());
        for ch in sql.chars() {
            if ch == '?' {
                let param = positional
                    .next()
                    .ok_or(ConditionError::PositionalBindMismatch)?;
                let name = self.binds.generate(&format!("positional_param_{seq}"));
                seq += 1;
                self.binds.bind(&name, param);
                out.push(':');
                out.push_str(&name);
            } else {
                out.push(ch);
            }
        }
        if positional.next().is_some() {
            return Err(ConditionError::PositionalBindMismatch);
        }
        Ok(out)
    }
}

/// 按最后一个大小写不敏感的 ` as ` 拆出别名。
fn split_as(s: &str) -> Option<(String, String)> {
    let bytes = s.as_bytes();
    let pat = b" as ";
    if bytes.len() < pat.len() {
        return None;
    }
    // 匹配到的都是 ASCII，切分点必然落在字符边界上
    let i = (0..=bytes.len() - pat.len())
        .rev()
        .find(|&i| bytes[i..i + pat.len()].eq_ignore_ascii_case(pat))?;
    Some((
        s[..i].trim().to_string(),
        s[i + pat.len()..].trim().to_string(),
    ))
}

/// 剥掉末尾的 ASC / DESC 后缀。
fn split_sort(s: &str) -> (String, Option<Sort>) {
    let t = s.trim();
    if let Some(pos) = t.rfind(' ') {
        let tail = &t[pos + 1..];
        if tail.eq_ignore_ascii_case("desc") {
            return (t[..pos].trim_end().to_string(), Some(Sort::Desc));
        }
        if tail.eq_ignore_ascii_case("asc") {
            return (t[..pos].trim_end().to_string(), Some(Sort::Asc));
        }
    }
    (t.to_string(), None)
}
