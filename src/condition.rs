//! 条件构造器：WHERE / HAVING 条件树的链式构建。
//!
//! 语句级的装配（FROM / JOIN / UNION / INSERT 等）见 `statement`。

use crate::bind::{BindParams, BindRegistry, rewrite_placeholder};
use crate::config::StatementConfig;
use crate::driver::Driver;
use crate::error::ConditionError;
use crate::flow::FlowControl;
use crate::middleware::{MiddlewareRegistry, TerminateMiddleware};
use crate::node::{ClauseType, ConditionNode, Logic, Operand};
use crate::normalize::{normalize_column, normalize_expression};
use crate::raw::contains_raw;
use crate::string_builder::StringBuilder;
use crate::value::{BindHint, BindParam, BindValue};
use std::fmt;
use std::rc::Rc;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime};

/// 时间语义条件的取值类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeType {
    /// 完整日期（字符串或时间戳）。
    Date,
    /// 当月第几天。
    Day,
    /// 当年第几月。
    Month,
    /// 某年（取 1 月 1 日）。
    Year,
}

/// 条件右值：普通值或子查询构造器。
#[derive(Debug, Clone)]
pub enum CondArg {
    Value(BindValue),
    Sub(Box<Condition>),
}

impl From<BindValue> for CondArg {
    fn from(v: BindValue) -> Self {
        Self::Value(v)
    }
}

impl From<Condition> for CondArg {
    fn from(v: Condition) -> Self {
        Self::Sub(Box::new(v))
    }
}

impl From<()> for CondArg {
    fn from(_: ()) -> Self {
        Self::Value(BindValue::Null)
    }
}

impl From<bool> for CondArg {
    fn from(v: bool) -> Self {
        Self::Value(v.into())
    }
}

impl From<i8> for CondArg {
    fn from(v: i8) -> Self {
        Self::Value(v.into())
    }
}

impl From<i16> for CondArg {
    fn from(v: i16) -> Self {
        Self::Value(v.into())
    }
}

impl From<i32> for CondArg {
    fn from(v: i32) -> Self {
        Self::Value(v.into())
    }
}

impl From<i64> for CondArg {
    fn from(v: i64) -> Self {
        Self::Value(v.into())
    }
}

impl From<u8> for CondArg {
    fn from(v: u8) -> Self {
        Self::Value(v.into())
    }
}

impl From<u16> for CondArg {
    fn from(v: u16) -> Self {
        Self::Value(v.into())
    }
}

impl From<u32> for CondArg {
    fn from(v: u32) -> Self {
        Self::Value(v.into())
    }
}

impl From<u64> for CondArg {
    fn from(v: u64) -> Self {
        Self::Value(v.into())
    }
}

impl From<f32> for CondArg {
    fn from(v: f32) -> Self {
        Self::Value(v.into())
    }
}

impl From<f64> for CondArg {
    fn from(v: f64) -> Self {
        Self::Value(v.into())
    }
}

impl From<String> for CondArg {
    fn from(v: String) -> Self {
        Self::Value(v.into())
    }
}

impl From<&'static str> for CondArg {
    fn from(v: &'static str) -> Self {
        Self::Value(v.into())
    }
}

impl From<Vec<u8>> for CondArg {
    fn from(v: Vec<u8>) -> Self {
        Self::Value(v.into())
    }
}

impl From<OffsetDateTime> for CondArg {
    fn from(v: OffsetDateTime) -> Self {
        Self::Value(v.into())
    }
}

impl<T> From<Option<T>> for CondArg
where
    T: Into<BindValue>,
{
    fn from(v: Option<T>) -> Self {
        Self::Value(BindValue::from_option(v))
    }
}

/// 子查询来源：现成的 SQL 文本或另一个构造器。
#[derive(Debug, Clone)]
pub enum SubquerySource {
    Sql(String),
    Builder(Box<Condition>),
}

impl From<&str> for SubquerySource {
    fn from(v: &str) -> Self {
        Self::Sql(v.to_string())
    }
}

impl From<String> for SubquerySource {
    fn from(v: String) -> Self {
        Self::Sql(v)
    }
}

impl From<Condition> for SubquerySource {
    fn from(v: Condition) -> Self {
        Self::Builder(Box::new(v))
    }
}

/// SQL 条件构造器。
///
/// 一个实例对应一条语句；所有链式调用累积到配置与绑定登记簿，
/// `make_sql` 纯读地装配出最终 SQL。
#[derive(Clone)]
pub struct Condition {
    pub(crate) driver: Box<dyn Driver>,
    pub(crate) configs: StatementConfig,
    pub(crate) binds: BindRegistry,
    pub(crate) flow: FlowControl,
    pub(crate) clause: ClauseType,
    pub(crate) logic: Logic,
    pub(crate) table: String,
    pub(crate) is_table: bool,
    pub(crate) alias: String,
    pub(crate) in_time: Option<TimeType>,
    pub(crate) sub_seq: u32,
    pub(crate) registry: Option<Rc<MiddlewareRegistry>>,
    pub(crate) terminators: Vec<(String, Rc<dyn TerminateMiddleware>)>,
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Condition")
            .field("table", &self.table)
            .field("alias", &self.alias)
            .field("configs", &self.configs)
            .field("binds", &self.binds)
            .finish_non_exhaustive()
    }
}

impl Condition {
    pub fn new(driver: Box<dyn Driver>) -> Self {
        Self {
            driver,
            configs: StatementConfig::default(),
            binds: BindRegistry::default(),
            flow: FlowControl::default(),
            clause: ClauseType::Where,
            logic: Logic::And,
            table: String::new(),
            is_table: false,
            alias: String::new(),
            in_time: None,
            sub_seq: 0,
            registry: None,
            terminators: Vec::new(),
        }
    }

    pub fn with_middlewares(driver: Box<dyn Driver>, registry: Rc<MiddlewareRegistry>) -> Self {
        let mut cond = Self::new(driver);
        cond.registry = Some(registry);
        cond
    }

    /// 派生一个同驱动、同中间件注册表的全新构造器。
    pub fn fork(&self) -> Condition {
        let mut cond = Self::new(self.driver.clone());
        cond.registry = self.registry.clone();
        cond
    }

    // ---- 流程控制 ----

    pub fn if_(&mut self, cond: bool) -> &mut Self {
        self.flow.begin(cond);
        self
    }

    pub fn elif_(&mut self, cond: bool) -> &mut Self {
        self.flow.elif(cond);
        self
    }

    pub fn else_(&mut self) -> &mut Self {
        self.flow.otherwise();
        self
    }

    pub fn fi(&mut self) -> &mut Self {
        self.flow.end();
        self
    }

    // ---- 时间语义 ----

    /// 进入时间模式：后续条件值按 `time_type` 解释为时间。
    pub fn time(&mut self, time_type: TimeType) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.in_time = Some(time_type);
        self
    }

    pub fn end_time(&mut self) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.in_time = None;
        self
    }

    // ---- 绑定参数 ----

    /// 手工登记一个命名绑定参数。
    pub fn bind(&mut self, name: &str, value: impl Into<BindValue>) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.binds.bind(name, BindParam::new(value));
        self
    }

    pub fn bind_with_hint(
        &mut self,
        name: &str,
        value: impl Into<BindValue>,
        hint: BindHint,
    ) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.binds.bind(name, BindParam::with_hint(value, hint));
        self
    }

    pub fn bind_params(&self) -> &BindParams {
        self.binds.params()
    }

    pub fn reset_bind_params(&mut self) -> &mut Self {
        self.binds.clear();
        self
    }

    // ---- WHERE ----

    /// 相等条件；值为 `Null` 时退化为 `IS NULL`。
    pub fn where_(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_single(ClauseType::Where, Logic::And, field, "=", value.into())
    }

    pub fn or_where(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_single(ClauseType::Where, Logic::Or, field, "=", value.into())
    }

    /// 带比较符的条件，如 `where_op("age", ">", 18)`。
    pub fn where_op(
        &mut self,
        field: &str,
        operator: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_single(ClauseType::Where, Logic::And, field, operator, value.into())
    }

    pub fn or_where_op(
        &mut self,
        field: &str,
        operator: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_single(ClauseType::Where, Logic::Or, field, operator, value.into())
    }

    /// 批量相等条件。
    pub fn where_pairs(
        &mut self,
        pairs: Vec<(&str, CondArg)>,
    ) -> Result<&mut Self, ConditionError> {
        for (field, value) in pairs {
            self.where_(field, value)?;
        }
        Ok(self)
    }

    /// 批量带比较符的条件。
    pub fn where_conds(
        &mut self,
        conds: Vec<(&str, &str, CondArg)>,
    ) -> Result<&mut Self, ConditionError> {
        for (field, operator, value) in conds {
            self.where_op(field, operator, value)?;
        }
        Ok(self)
    }

    /// 原样条件片段；`[column]` 宏会被展开。
    pub fn where_raw(&mut self, sql: &str) -> &mut Self {
        self.add_raw(ClauseType::Where, Logic::And, sql)
    }

    pub fn or_where_raw(&mut self, sql: &str) -> &mut Self {
        self.add_raw(ClauseType::Where, Logic::Or, sql)
    }

    /// 括号分组：闭包里构建的条件整体作为一组，以 AND 连接。
    pub fn where_group<F>(&mut self, f: F) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        self.add_group(ClauseType::Where, Logic::And, f)
    }

    pub fn or_where_group<F>(&mut self, f: F) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        self.add_group(ClauseType::Where, Logic::Or, f)
    }

    /// 子分组：独立的绑定作用域，以 AND 挂到当前子句。
    pub fn where_sub_and<F>(&mut self, f: F) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        self.add_sub_group(ClauseType::Where, Logic::And, f)
    }

    /// 子分组：独立的绑定作用域，以 OR 挂到当前子句。
    pub fn where_sub_or<F>(&mut self, f: F) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        self.add_sub_group(ClauseType::Where, Logic::Or, f)
    }

    pub fn where_exists(
        &mut self,
        source: impl Into<SubquerySource>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_exists(false, source.into())
    }

    pub fn where_not_exists(
        &mut self,
        source: impl Into<SubquerySource>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_exists(true, source.into())
    }

    pub fn where_exists_with<F>(&mut self, f: F) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        self.add_exists_with(false, f)
    }

    pub fn where_not_exists_with<F>(&mut self, f: F) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        self.add_exists_with(true, f)
    }

    pub fn where_in(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = impl Into<CondArg>>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_list(ClauseType::Where, field, "in", values)
    }

    pub fn where_not_in(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = impl Into<CondArg>>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_list(ClauseType::Where, field, "not in", values)
    }

    pub fn where_between(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = impl Into<CondArg>>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_list(ClauseType::Where, field, "between", values)
    }

    pub fn where_not_between(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = impl Into<CondArg>>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_list(ClauseType::Where, field, "not between", values)
    }

    pub fn where_null(&mut self, field: &str) -> Result<&mut Self, ConditionError> {
        self.add_single(
            ClauseType::Where,
            Logic::And,
            field,
            "null",
            CondArg::Value(BindValue::Null),
        )
    }

    pub fn where_not_null(&mut self, field: &str) -> Result<&mut Self, ConditionError> {
        self.add_single(
            ClauseType::Where,
            Logic::And,
            field,
            "not null",
            CondArg::Value(BindValue::Null),
        )
    }

    pub fn where_like(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_single(ClauseType::Where, Logic::And, field, "like", value.into())
    }

    pub fn where_not_like(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_single(ClauseType::Where, Logic::And, field, "not like", value.into())
    }

    pub fn where_date(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_time(ClauseType::Where, TimeType::Date, field, value.into())
    }

    pub fn where_day(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_time(ClauseType::Where, TimeType::Day, field, value.into())
    }

    pub fn where_month(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_time(ClauseType::Where, TimeType::Month, field, value.into())
    }

    pub fn where_year(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_time(ClauseType::Where, TimeType::Year, field, value.into())
    }

    // ---- HAVING ----

    pub fn having(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_single(ClauseType::Having, Logic::And, field, "=", value.into())
    }

    pub fn or_having(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_single(ClauseType::Having, Logic::Or, field, "=", value.into())
    }

    pub fn having_op(
        &mut self,
        field: &str,
        operator: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_single(ClauseType::Having, Logic::And, field, operator, value.into())
    }

    pub fn or_having_op(
        &mut self,
        field: &str,
        operator: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_single(ClauseType::Having, Logic::Or, field, operator, value.into())
    }

    pub fn having_raw(&mut self, sql: &str) -> &mut Self {
        self.add_raw(ClauseType::Having, Logic::And, sql)
    }

    pub fn or_having_raw(&mut self, sql: &str) -> &mut Self {
        self.add_raw(ClauseType::Having, Logic::Or, sql)
    }

    pub fn having_group<F>(&mut self, f: F) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        self.add_group(ClauseType::Having, Logic::And, f)
    }

    pub fn or_having_group<F>(&mut self, f: F) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        self.add_group(ClauseType::Having, Logic::Or, f)
    }

    pub fn having_sub_and<F>(&mut self, f: F) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        self.add_sub_group(ClauseType::Having, Logic::And, f)
    }

    pub fn having_sub_or<F>(&mut self, f: F) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        self.add_sub_group(ClauseType::Having, Logic::Or, f)
    }

    pub fn having_in(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = impl Into<CondArg>>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_list(ClauseType::Having, field, "in", values)
    }

    pub fn having_not_in(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = impl Into<CondArg>>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_list(ClauseType::Having, field, "not in", values)
    }

    pub fn having_between(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = impl Into<CondArg>>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_list(ClauseType::Having, field, "between", values)
    }

    pub fn having_not_between(
        &mut self,
        field: &str,
        values: impl IntoIterator<Item = impl Into<CondArg>>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_list(ClauseType::Having, field, "not between", values)
    }

    pub fn having_null(&mut self, field: &str) -> Result<&mut Self, ConditionError> {
        self.add_single(
            ClauseType::Having,
            Logic::And,
            field,
            "null",
            CondArg::Value(BindValue::Null),
        )
    }

    pub fn having_not_null(&mut self, field: &str) -> Result<&mut Self, ConditionError> {
        self.add_single(
            ClauseType::Having,
            Logic::And,
            field,
            "not null",
            CondArg::Value(BindValue::Null),
        )
    }

    pub fn having_like(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_single(ClauseType::Having, Logic::And, field, "like", value.into())
    }

    pub fn having_not_like(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_single(ClauseType::Having, Logic::And, field, "not like", value.into())
    }

    pub fn having_date(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_time(ClauseType::Having, TimeType::Date, field, value.into())
    }

    pub fn having_day(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_time(ClauseType::Having, TimeType::Day, field, value.into())
    }

    pub fn having_month(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_time(ClauseType::Having, TimeType::Month, field, value.into())
    }

    pub fn having_year(
        &mut self,
        field: &str,
        value: impl Into<CondArg>,
    ) -> Result<&mut Self, ConditionError> {
        self.add_time(ClauseType::Having, TimeType::Year, field, value.into())
    }

    // ---- 内部 ----

    pub(crate) fn set_clause(&mut self, clause: ClauseType, logic: Logic) {
        self.clause = clause;
        self.logic = logic;
    }

    fn nodes_mut(&mut self) -> &mut Vec<ConditionNode> {
        match self.clause {
            ClauseType::Where => &mut self.configs.where_nodes,
            ClauseType::Having => &mut self.configs.having_nodes,
        }
    }

    fn push_node(&mut self, node: ConditionNode) {
        let logic = self.logic;
        let nodes = self.nodes_mut();
        nodes.push(ConditionNode::Logic(logic));
        nodes.push(node);
    }

    fn add_single(
        &mut self,
        clause: ClauseType,
        logic: Logic,
        field: &str,
        operator: &str,
        value: CondArg,
    ) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        self.set_clause(clause, logic);
        self.add_condition(field, operator, vec![value])?;
        Ok(self)
    }

    fn add_list(
        &mut self,
        clause: ClauseType,
        field: &str,
        operator: &str,
        values: impl IntoIterator<Item = impl Into<CondArg>>,
    ) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        self.set_clause(clause, Logic::And);
        let values = values.into_iter().map(Into::into).collect();
        self.add_condition(field, operator, values)?;
        Ok(self)
    }

    fn add_time(
        &mut self,
        clause: ClauseType,
        time_type: TimeType,
        field: &str,
        value: CondArg,
    ) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        self.set_clause(clause, Logic::And);
        self.in_time = Some(time_type);
        let result = self.add_condition(field, "=", vec![value]);
        self.in_time = None;
        result?;
        Ok(self)
    }

    fn add_raw(&mut self, clause: ClauseType, logic: Logic, sql: &str) -> &mut Self {
        if self.flow.discards() {
            return self;
        }
        self.set_clause(clause, logic);
        let sql = normalize_expression(self.driver.as_ref(), sql, &self.table);
        self.push_node(ConditionNode::Raw(sql));
        self
    }

    fn add_group<F>(
        &mut self,
        clause: ClauseType,
        logic: Logic,
        f: F,
    ) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        if self.flow.discards() {
            return Ok(self);
        }
        self.set_clause(clause, logic);
        let child = self.sub_scope(None, f)?;
        let body = child.render_clause_body(clause);
        self.finish_child(child);
        if !body.is_empty() {
            self.push_node(ConditionNode::Group(format!("({body})")));
        }
        Ok(self)
    }

    fn add_sub_group<F>(
        &mut self,
        clause: ClauseType,
        logic: Logic,
        f: F,
    ) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        if self.flow.discards() {
            return Ok(self);
        }
        self.set_clause(clause, logic);
        let key = match logic {
            Logic::And => "suband",
            Logic::Or => "subor",
        };
        let prefix_field = format!("{}.{key}", self.table);
        let child = self.sub_scope(Some(&prefix_field), f)?;
        let body = child.render_clause_body(clause);
        self.finish_child(child);
        if !body.is_empty() {
            self.push_node(ConditionNode::Group(format!("({body})")));
        }
        Ok(self)
    }

    fn add_exists(
        &mut self,
        not: bool,
        source: SubquerySource,
    ) -> Result<&mut Self, ConditionError> {
        if self.flow.discards() {
            return Ok(self);
        }
        if self.clause == ClauseType::Having {
            return Err(ConditionError::ExistsInHaving);
        }
        self.logic = Logic::And;
        let sql = match source {
            SubquerySource::Sql(sql) => sql,
            SubquerySource::Builder(child) => self.compile_exists_subquery(*child)?,
        };
        self.push_node(ConditionNode::Exists { not, sql });
        Ok(self)
    }

    fn add_exists_with<F>(&mut self, not: bool, f: F) -> Result<&mut Self, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        if self.flow.discards() {
            return Ok(self);
        }
        if self.clause == ClauseType::Having {
            return Err(ConditionError::ExistsInHaving);
        }
        self.logic = Logic::And;
        let prefix_field = format!("{}.exists", self.table);
        let mut child = self.sub_scope(Some(&prefix_field), f)?;
        let sql = child.assemble(false)?;
        self.finish_child(child);
        self.push_node(ConditionNode::Exists { not, sql });
        Ok(self)
    }

    /// 核心入口：归一化字段、按比较符分派、登记绑定并入树。
    pub(crate) fn add_condition(
        &mut self,
        field: &str,
        operator: &str,
        values: Vec<CondArg>,
    ) -> Result<(), ConditionError> {
        let field_sql = if contains_raw(field) || field.contains('(') {
            normalize_expression(self.driver.as_ref(), field, &self.table)
        } else {
            normalize_column(self.driver.as_ref(), field, &self.table)
        };
        let op = operator.trim().to_lowercase();

        let node = match op.as_str() {
            "null" => ConditionNode::Null {
                field: field_sql,
                not: false,
            },
            "not null" => ConditionNode::Null {
                field: field_sql,
                not: true,
            },
            "in" | "not in" => self.build_in_node(field_sql, op == "not in", values)?,
            "between" | "not between" => {
                self.build_between_node(field_sql, op == "not between", values)?
            }
            _ => {
                let value = values
                    .into_iter()
                    .next()
                    .unwrap_or(CondArg::Value(BindValue::Null));
                match value {
                    CondArg::Value(BindValue::Null) if op == "=" => ConditionNode::Null {
                        field: field_sql,
                        not: false,
                    },
                    CondArg::Sub(child) => {
                        let sql = self.compile_value_subquery(*child)?;
                        ConditionNode::Comparison {
                            field: field_sql,
                            operator: op,
                            operand: Operand::Spliced(sql),
                        }
                    }
                    CondArg::Value(value) => {
                        if let Some(s) = value.as_str()
                            && contains_raw(s)
                        {
                            let sql = normalize_expression(self.driver.as_ref(), s, &self.table);
                            ConditionNode::Comparison {
                                field: field_sql,
                                operator: op,
                                operand: Operand::Spliced(sql),
                            }
                        } else {
                            let name = self.binds.generate(&field_sql);
                            let operand = self.bind_operand(name, value)?;
                            ConditionNode::Comparison {
                                field: field_sql,
                                operator: op,
                                operand,
                            }
                        }
                    }
                }
            }
        };
        self.push_node(node);
        Ok(())
    }

    fn build_in_node(
        &mut self,
        field_sql: String,
        not: bool,
        values: Vec<CondArg>,
    ) -> Result<ConditionNode, ConditionError> {
        let values = expand_list_values(values);
        if values.is_empty() {
            return Err(ConditionError::EmptyInList);
        }
        let base = self.binds.generate(&field_sql);
        let mut operands = Vec::with_capacity(values.len());
        for (i, value) in values.into_iter().enumerate() {
            operands.push(self.resolve_list_operand(value, format!("{base}_in{i}"))?);
        }
        Ok(ConditionNode::In {
            field: field_sql,
            not,
            operands,
        })
    }

    fn build_between_node(
        &mut self,
        field_sql: String,
        not: bool,
        values: Vec<CondArg>,
    ) -> Result<ConditionNode, ConditionError> {
        let mut values = expand_list_values(values);
        if values.len() < 2 {
            return Err(ConditionError::BetweenTooFew);
        }
        values.truncate(2);
        let suffix = if not { "notbetween" } else { "between" };
        let base = self.binds.generate(&field_sql);
        let mut operands = Vec::with_capacity(2);
        for (i, value) in values.into_iter().enumerate() {
            operands.push(self.resolve_list_operand(value, format!("{base}_{suffix}{i}"))?);
        }
        let upper = operands.pop().unwrap_or(Operand::Spliced(String::new()));
        let lower = operands.pop().unwrap_or(Operand::Spliced(String::new()));
        Ok(ConditionNode::Between {
            field: field_sql,
            not,
            lower,
            upper,
        })
    }

    fn resolve_list_operand(
        &mut self,
        value: CondArg,
        bind_name: String,
    ) -> Result<Operand, ConditionError> {
        match value {
            CondArg::Sub(child) => Ok(Operand::Spliced(self.compile_value_subquery(*child)?)),
            CondArg::Value(value) => {
                if let Some(s) = value.as_str()
                    && contains_raw(s)
                {
                    Ok(Operand::Spliced(normalize_expression(
                        self.driver.as_ref(),
                        s,
                        &self.table,
                    )))
                } else {
                    self.bind_operand(bind_name, value)
                }
            }
        }
    }

    fn bind_operand(
        &mut self,
        name: String,
        value: BindValue,
    ) -> Result<Operand, ConditionError> {
        let value = match self.in_time {
            Some(time_type) => parse_time_value(&value, time_type)?,
            None => value,
        };
        self.binds.bind(&name, BindParam::new(value));
        Ok(Operand::Bound(name))
    }

    /// 预编译子查询为 `(SELECT …)`，并把它的绑定并入当前作用域。
    fn compile_exists_subquery(&mut self, mut child: Condition) -> Result<String, ConditionError> {
        let sql = child.assemble(false)?;
        let params = child.binds.take_params();
        Ok(self.absorb_compiled(sql, params))
    }

    fn compile_value_subquery(&mut self, mut child: Condition) -> Result<String, ConditionError> {
        let sql = child.assemble(true)?;
        let params = child.binds.take_params();
        Ok(self.absorb_compiled(sql, params))
    }

    /// 并入已编译子查询的绑定；重名的改名并同步改写占位符。
    pub(crate) fn absorb_compiled(&mut self, mut sql: String, params: BindParams) -> String {
        for (name, param) in params.into_entries() {
            let final_name = self.binds.generate(&name);
            if final_name != name {
                sql = rewrite_placeholder(&sql, &name, &final_name);
            }
            self.binds.bind(&final_name, param);
        }
        sql
    }

    /// 新建一个共享表上下文的子构造器。
    pub(crate) fn make_child(&self) -> Condition {
        let mut child = Condition::new(self.driver.clone());
        child.registry = self.registry.clone();
        child.table = self.table.clone();
        child.alias = self.alias.clone();
        child
    }

    /// 打开一个子表达式作用域：分配 `sub<N>_` 前缀后交给闭包填充。
    fn sub_scope<F>(
        &mut self,
        prefix_from: Option<&str>,
        f: F,
    ) -> Result<Condition, ConditionError>
    where
        F: FnOnce(&mut Condition) -> Result<(), ConditionError>,
    {
        let mut child = self.make_child();
        self.sub_seq += 1;
        child.binds.set_sub_prefix(self.sub_seq);
        child.sub_seq = self.sub_seq;
        if let Some(field) = prefix_from {
            let prefix = self.binds.generate(field);
            child.binds.set_bind_prefix(&prefix);
        }
        f(&mut child)?;
        Ok(child)
    }

    pub(crate) fn finish_child(&mut self, child: Condition) {
        self.sub_seq = child.sub_seq;
        self.binds.merge(child.binds);
    }

    /// 渲染子句内容（不含 WHERE/HAVING 关键字）；首个连接词被丢弃。
    pub(crate) fn render_clause_body(&self, clause: ClauseType) -> String {
        let nodes = match clause {
            ClauseType::Where => &self.configs.where_nodes,
            ClauseType::Having => &self.configs.having_nodes,
        };
        let mut buf = StringBuilder::new();
        for (i, node) in nodes.iter().enumerate() {
            if i == 0 && matches!(node, ConditionNode::Logic(_)) {
                continue;
            }
            buf.write_leading(&node.render());
        }
        buf.into_string()
    }

    pub(crate) fn render_clause(&self, clause: ClauseType) -> String {
        let body = self.render_clause_body(clause);
        if body.is_empty() {
            return body;
        }
        format!("{} {body}", clause.keyword())
    }
}

/// 单个逗号分隔字符串展开为值列表。
fn expand_list_values(values: Vec<CondArg>) -> Vec<CondArg> {
    if values.len() == 1
        && let CondArg::Value(BindValue::String(s)) = &values[0]
        && !contains_raw(s)
        && s.contains(',')
    {
        return s
            .split(',')
            .map(|p| CondArg::Value(BindValue::from(p.trim().to_string())))
            .collect();
    }
    values
}

/// 按时间类型把值换算成 Unix 时间戳。
pub(crate) fn parse_time_value(
    value: &BindValue,
    time_type: TimeType,
) -> Result<BindValue, ConditionError> {
    let now = OffsetDateTime::now_utc();
    let timestamp = match time_type {
        TimeType::Day => {
            let day = int_value(value)?;
            if day > 31 {
                return Err(ConditionError::DayOutOfRange(day));
            }
            let day = u8::try_from(day)
                .ok()
                .filter(|d| *d >= 1)
                .ok_or_else(|| ConditionError::InvalidTimeValue(day.to_string()))?;
            Date::from_calendar_date(now.year(), now.month(), day)
                .map_err(|_| ConditionError::InvalidTimeValue(day.to_string()))?
                .midnight()
                .assume_utc()
                .unix_timestamp()
        }
        TimeType::Month => {
            let month = int_value(value)?;
            if month > 12 {
                return Err(ConditionError::MonthOutOfRange(month));
            }
            let month = u8::try_from(month)
                .ok()
                .filter(|m| *m >= 1)
                .and_then(|m| Month::try_from(m).ok())
                .ok_or_else(|| ConditionError::InvalidTimeValue(month.to_string()))?;
            Date::from_calendar_date(now.year(), month, 1)
                .map_err(|_| ConditionError::InvalidTimeValue(format!("{month:?}")))?
                .midnight()
                .assume_utc()
                .unix_timestamp()
        }
        TimeType::Year => {
            let year = int_value(value)?;
            let year = i32::try_from(year)
                .map_err(|_| ConditionError::InvalidTimeValue(year.to_string()))?;
            Date::from_calendar_date(year, Month::January, 1)
                .map_err(|_| ConditionError::InvalidTimeValue(year.to_string()))?
                .midnight()
                .assume_utc()
                .unix_timestamp()
        }
        TimeType::Date => match value {
            BindValue::DateTime(dt) => dt.unix_timestamp(),
            BindValue::I64(v) => *v,
            BindValue::U64(v) => i64::try_from(*v)
                .map_err(|_| ConditionError::InvalidTimeValue(v.to_string()))?,
            BindValue::String(s) => parse_date_string(s)?,
            other => {
                return Err(ConditionError::InvalidTimeValue(format!("{other:?}")));
            }
        },
    };
    Ok(BindValue::I64(timestamp))
}

fn int_value(value: &BindValue) -> Result<i64, ConditionError> {
    value
        .as_i64()
        .ok_or_else(|| ConditionError::InvalidTimeValue(format!("{value:?}")))
}

fn parse_date_string(s: &str) -> Result<i64, ConditionError> {
    let s = s.trim();
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .map_err(|_| ConditionError::InvalidTimeValue(s.to_string()));
    }

    let datetime_format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    if let Ok(dt) = PrimitiveDateTime::parse(s, &datetime_format) {
        return Ok(dt.assume_utc().unix_timestamp());
    }

    let date_formats = [
        format_description!("[year]-[month]-[day]"),
        format_description!("[year]/[month]/[day]"),
    ];
    for format in date_formats {
        if let Ok(date) = Date::parse(s, format) {
            return Ok(date.midnight().assume_utc().unix_timestamp());
        }
    }
    Err(ConditionError::InvalidTimeValue(s.to_string()))
}
