//! 链式 SQL 条件构造器。
//!
//! 把 builder 调用编译为参数化 SQL 文本与命名绑定参数，覆盖
//! WHERE / HAVING 条件树、FROM / JOIN / UNION 装配与增删改语句。
//!
//! ```
//! use sql_condition::{Condition, MysqlDriver};
//!
//! let mut cond = Condition::new(Box::new(MysqlDriver));
//! cond.table("users", "*")?;
//! cond.where_op("age", ">", 18)?;
//! assert_eq!(
//!     cond.make_sql()?,
//!     "SELECT `users`.* FROM `users` WHERE `users`.`age` > :users_age"
//! );
//! # Ok::<(), sql_condition::ConditionError>(())
//! ```

mod bind;
mod condition;
mod config;
mod driver;
mod error;
mod flow;
mod middleware;
mod node;
mod normalize;
mod raw;
mod statement;
mod string_builder;
mod value;

#[cfg(test)]
mod condition_tests;
#[cfg(test)]
mod statement_tests;

pub use bind::BindParams;
pub use condition::{CondArg, Condition, SubquerySource, TimeType};
pub use config::{ConfigSection, JoinType, Sort, UnionType};
pub use driver::{Driver, MysqlDriver};
pub use error::{ConditionError, ErrorKind};
pub use middleware::{
    HandleMiddleware, MiddlewareConfigs, MiddlewareEntry, MiddlewareRegistry, SqlSections,
    TerminateMiddleware,
};
pub use raw::raw;
pub use statement::{DuplicateUpdate, ExecuteStatement, JoinTable, OnDuplicate};
pub use string_builder::IntoStrings;
pub use value::{BindHint, BindParam, BindValue};
