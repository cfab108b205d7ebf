#[cfg(test)]
mod tests {
    use crate::{
        BindParam, Condition, ConditionError, ConfigSection, DuplicateUpdate, HandleMiddleware,
        MiddlewareConfigs, MiddlewareRegistry, MysqlDriver, OnDuplicate, SqlSections,
        TerminateMiddleware, raw,
    };
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn cond() -> Condition {
        Condition::new(Box::new(MysqlDriver))
    }

    #[test]
    fn table_with_alias_and_columns() {
        let mut c = cond();
        c.table("users AS u", ["id", "name"]).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `u`.`id`,`u`.`name` FROM `users` `u`"
        );
        assert_eq!(c.get_table(), "u");
    }

    #[test]
    fn table_with_schema() {
        let mut c = cond();
        c.table("db.users", "*").unwrap();

        assert_eq!(c.make_sql().unwrap(), "SELECT `users`.* FROM `db`.`users`");
    }

    #[test]
    fn columns_can_be_appended_or_replaced() {
        let mut c = cond();
        c.table("users", "id").unwrap();
        c.columns("name AS n");
        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.`id`,`users`.`name` AS `n` FROM `users`"
        );

        c.set_columns("id");
        assert_eq!(c.make_sql().unwrap(), "SELECT `users`.`id` FROM `users`");
    }

    #[test]
    fn left_join_with_raw_on_condition() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.left_join("orders", "orders.id AS oid", "uid", "=", raw("[users.id]"))
            .unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.*,`orders`.`id` AS `oid` FROM `users` \
             LEFT JOIN `orders` ON `orders`.`uid` = `users`.`id`"
        );
    }

    #[test]
    fn join_binds_value_in_sub_scope() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.join("orders", "", "status", "=", 1).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` \
             INNER JOIN `orders` ON `orders`.`status` = :sub1_orders_status"
        );
        assert_eq!(c.bind_params().names(), vec!["sub1_orders_status"]);
    }

    #[test]
    fn join_subquery_text_keeps_alias() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.left_join("(SELECT 1) AS t", "", "id", "=", raw("[users.id]"))
            .unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` LEFT JOIN (SELECT 1) `t` ON `t`.`id` = `users`.`id`"
        );
    }

    #[test]
    fn join_builder_subquery_absorbs_binds() {
        let mut sub = cond();
        sub.table("orders", "*").unwrap();
        sub.where_op("amount", ">", 100).unwrap();
        sub.alias("o");

        let mut c = cond();
        c.table("users", "*").unwrap();
        c.left_join(sub, "", "uid", "=", raw("[users.id]")).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` LEFT JOIN \
             (SELECT `orders`.* FROM `orders` WHERE `orders`.`amount` > :orders_amount) `o` \
             ON `o`.`uid` = `users`.`id`"
        );
        assert_eq!(c.bind_params().names(), vec!["orders_amount"]);
    }

    #[test]
    fn cross_join_has_no_on_clause() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.cross_join("logs", "").unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` CROSS JOIN `logs`"
        );
    }

    #[test]
    fn full_join_needs_driver_support() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        assert_eq!(
            c.full_join("orders", "", "uid", "=", 1).unwrap_err(),
            ConditionError::FullJoinUnsupported
        );
    }

    #[test]
    fn union_appends_on_new_line() {
        let mut c = cond();
        c.table("users", "id").unwrap();
        c.union("SELECT `id` FROM `admins`").unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.`id` FROM `users` \nUNION SELECT `id` FROM `admins`"
        );
    }

    #[test]
    fn union_all_from_builder() {
        let mut sub = cond();
        sub.table("admins", "id").unwrap();

        let mut c = cond();
        c.table("users", "id").unwrap();
        c.union_all(sub).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.`id` FROM `users` \nUNION ALL SELECT `admins`.`id` FROM `admins`"
        );
    }

    #[test]
    fn union_and_join_are_exclusive() {
        let mut c = cond();
        c.table("users", "id").unwrap();
        c.union("SELECT `id` FROM `admins`").unwrap();
        assert_eq!(
            c.left_join("orders", "", "uid", "=", 1).unwrap_err(),
            ConditionError::JoinWithUnion
        );

        let mut c = cond();
        c.table("users", "*").unwrap();
        c.join("orders", "", "status", "=", 1).unwrap();
        assert_eq!(
            c.union("SELECT 1").unwrap_err(),
            ConditionError::JoinWithUnion
        );
    }

    #[test]
    fn order_by_parses_direction_suffix() {
        let mut c = cond();
        c.table("t", "*").unwrap();
        c.order_by("age desc, name");

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `t`.* FROM `t` ORDER BY `t`.`age` DESC,`t`.`name` ASC"
        );
    }

    #[test]
    fn order_by_deduplicates() {
        let mut c = cond();
        c.table("t", "*").unwrap();
        c.order_by("id");
        c.order_by("id");
        c.latest("created");

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `t`.* FROM `t` ORDER BY `t`.`id` ASC,`t`.`created` DESC"
        );
    }

    #[test]
    fn aggregate_replaces_plain_columns_and_limits_to_one() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.count("*", "total");
        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT COUNT(*) AS `total` FROM `users` LIMIT 1"
        );

        let mut c = cond();
        c.table("orders", "*").unwrap();
        c.sum("amount", "total");
        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT SUM(`orders`.`amount`) AS `total` FROM `orders` LIMIT 1"
        );
    }

    #[test]
    fn limit_family() {
        let mut c = cond();
        c.table("t", "*").unwrap();

        c.one();
        assert_eq!(c.make_sql().unwrap(), "SELECT `t`.* FROM `t` LIMIT 1");

        c.top(5);
        assert_eq!(c.make_sql().unwrap(), "SELECT `t`.* FROM `t` LIMIT 5");

        c.limit(5, 10);
        assert_eq!(c.make_sql().unwrap(), "SELECT `t`.* FROM `t` LIMIT 5,10");

        c.for_page(3, 10);
        assert_eq!(c.make_sql().unwrap(), "SELECT `t`.* FROM `t` LIMIT 20,10");

        c.all();
        assert_eq!(c.make_sql().unwrap(), "SELECT `t`.* FROM `t`");
    }

    #[test]
    fn locks_are_mutually_exclusive() {
        let mut c = cond();
        c.table("t", "*").unwrap();
        c.for_update(true).unwrap();
        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `t`.* FROM `t` FOR UPDATE"
        );
        assert_eq!(c.lock_share(true).unwrap_err(), ConditionError::LockConflict);

        let mut c = cond();
        c.table("t", "*").unwrap();
        c.lock_share(true).unwrap();
        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `t`.* FROM `t` LOCK IN SHARE MODE"
        );
        assert_eq!(c.for_update(true).unwrap_err(), ConditionError::LockConflict);
    }

    #[test]
    fn index_hints_follow_from() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.force_index("idx_a,idx_b");
        c.ignore_index("idx_c");
        c.where_("id", 1).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` FORCE INDEX(idx_a,idx_b) IGNORE INDEX(idx_c) \
             WHERE `users`.`id` = :users_id"
        );
    }

    #[test]
    fn comment_prefix_distinct() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.comment("pick master");
        c.prefix("SQL_CALC_FOUND_ROWS");
        c.distinct(true);

        assert_eq!(
            c.make_sql().unwrap(),
            "/*pick master*/ SELECT SQL_CALC_FOUND_ROWS DISTINCT `users`.* FROM `users`"
        );
    }

    #[test]
    fn reset_whole_or_single_section() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_("id", 1).unwrap();
        c.reset(Some(ConfigSection::Where));
        assert_eq!(c.make_sql().unwrap(), "SELECT `users`.* FROM `users`");

        c.reset(None);
        assert_eq!(c.make_sql().unwrap(), "SELECT");
        assert_eq!(c.get_table(), "");
    }

    struct SoftDelete;

    impl HandleMiddleware for SoftDelete {
        fn handle(&self, mut configs: MiddlewareConfigs) -> MiddlewareConfigs {
            configs.insert("soft_delete".to_string(), "1".to_string());
            configs
        }
    }

    impl TerminateMiddleware for SoftDelete {
        fn terminate(&self, configs: &MiddlewareConfigs, mut sections: SqlSections) -> SqlSections {
            if configs.contains_key("soft_delete") {
                let clause = match sections.get("where") {
                    Some(w) if !w.is_empty() => format!("{w} AND `deleted_at` IS NULL"),
                    _ => "WHERE `deleted_at` IS NULL".to_string(),
                };
                sections.set("where", clause);
            }
            sections
        }
    }

    fn soft_delete_registry() -> Rc<MiddlewareRegistry> {
        let mut registry = MiddlewareRegistry::new();
        registry.register_handle("soft_delete", Rc::new(SoftDelete));
        registry.register_terminate("soft_delete", Rc::new(SoftDelete));
        Rc::new(registry)
    }

    #[test]
    fn middleware_handle_and_terminate_phases() {
        let mut c = Condition::with_middlewares(Box::new(MysqlDriver), soft_delete_registry());
        c.table("users", "*").unwrap();
        c.middlewares(&["soft_delete"]).unwrap();

        assert_eq!(
            c.middleware_configs().get("soft_delete").map(String::as_str),
            Some("1")
        );
        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `deleted_at` IS NULL"
        );
    }

    #[test]
    fn middleware_terminate_extends_existing_where() {
        let mut c = Condition::with_middlewares(Box::new(MysqlDriver), soft_delete_registry());
        c.table("users", "*").unwrap();
        c.where_("id", 1).unwrap();
        c.middlewares(&["soft_delete"]).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`id` = :users_id \
             AND `deleted_at` IS NULL"
        );
    }

    #[test]
    fn middleware_errors() {
        let mut c = Condition::with_middlewares(Box::new(MysqlDriver), soft_delete_registry());
        assert_eq!(
            c.middlewares(&["nope"]).unwrap_err(),
            ConditionError::UndefinedMiddleware("nope".to_string())
        );

        let mut c = cond();
        assert_eq!(
            c.middlewares(&["soft_delete"]).unwrap_err(),
            ConditionError::MiddlewareRegistryMissing
        );
    }

    #[test]
    fn fork_shares_driver_and_registry() {
        let c = Condition::with_middlewares(Box::new(MysqlDriver), soft_delete_registry());
        let mut forked = c.fork();
        forked.table("users", "*").unwrap();
        forked.middlewares(&["soft_delete"]).unwrap();

        assert_eq!(
            forked.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `deleted_at` IS NULL"
        );
    }

    #[test]
    fn insert_named_params() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        let stmt = c
            .insert(
                vec![("name".to_string(), "foo".into()), ("age".to_string(), 18.into())],
                vec![],
                OnDuplicate::None,
            )
            .unwrap();

        assert_eq!(stmt.kind, "execute");
        assert_eq!(
            stmt.sql,
            "INSERT INTO `users` (`users`.`name`,`users`.`age`) \
             VALUES (:named_param_name,:named_param_age)"
        );
        assert_eq!(
            stmt.bind_params.names(),
            vec!["named_param_name", "named_param_age"]
        );
    }

    #[test]
    fn insert_promotes_positional_placeholders() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        let stmt = c
            .insert(
                vec![("created".to_string(), raw("?").into())],
                vec![BindParam::new(1_714_953_600_i64)],
                OnDuplicate::None,
            )
            .unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO `users` (`users`.`created`) VALUES (:positional_param_0)"
        );
        assert_eq!(stmt.bind_params.names(), vec!["positional_param_0"]);
    }

    #[test]
    fn insert_positional_mismatch() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        assert_eq!(
            c.insert(
                vec![("created".to_string(), raw("?").into())],
                vec![],
                OnDuplicate::None,
            )
            .unwrap_err(),
            ConditionError::PositionalBindMismatch
        );

        let mut c = cond();
        c.table("users", "*").unwrap();
        assert_eq!(
            c.insert(
                vec![("name".to_string(), "foo".into())],
                vec![BindParam::new(1_i64)],
                OnDuplicate::None,
            )
            .unwrap_err(),
            ConditionError::PositionalBindMismatch
        );
    }

    #[test]
    fn insert_rejects_empty_data() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        assert_eq!(
            c.insert(vec![], vec![], OnDuplicate::None).unwrap_err(),
            ConditionError::EmptyInsertData
        );
    }

    #[test]
    fn insert_on_duplicate_key_update() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        let stmt = c
            .insert(
                vec![("name".to_string(), "foo".into())],
                vec![],
                OnDuplicate::Update(vec![DuplicateUpdate::Values("name".to_string())]),
            )
            .unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO `users` (`users`.`name`) VALUES (:named_param_name) \
             ON DUPLICATE KEY UPDATE `users`.`name` = VALUES(`users`.`name`)"
        );
    }

    #[test]
    fn replace_into() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        let stmt = c
            .insert(
                vec![("name".to_string(), "foo".into())],
                vec![],
                OnDuplicate::Replace,
            )
            .unwrap();

        assert_eq!(
            stmt.sql,
            "REPLACE INTO `users` (`users`.`name`) VALUES (:named_param_name)"
        );
    }

    #[test]
    fn insert_all_sorts_fields_and_suffixes_rows() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        let stmt = c
            .insert_all(
                vec![
                    vec![("name".to_string(), "a".into()), ("age".to_string(), 1.into())],
                    vec![("age".to_string(), 2.into()), ("name".to_string(), "b".into())],
                ],
                vec![],
                OnDuplicate::None,
            )
            .unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO `users` (`users`.`age`,`users`.`name`) VALUES \
             (:named_param_age,:named_param_name),(:named_param_age_1,:named_param_name_1)"
        );
    }

    #[test]
    fn insert_all_rejects_jagged_rows() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        assert_eq!(
            c.insert_all(
                vec![
                    vec![("name".to_string(), "a".into())],
                    vec![("age".to_string(), 2.into())],
                ],
                vec![],
                OnDuplicate::None,
            )
            .unwrap_err(),
            ConditionError::JaggedInsertRows
        );
    }

    #[test]
    fn update_carries_where_and_limit_without_offset() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_("id", 1).unwrap();
        c.limit(5, 10);
        let stmt = c
            .update(vec![("name".to_string(), "bar".into())], vec![])
            .unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE `users` SET `users`.`name` = :named_param_name \
             WHERE `users`.`id` = :users_id LIMIT 10"
        );
        assert_eq!(stmt.bind_params.names(), vec!["users_id", "named_param_name"]);
    }

    #[test]
    fn update_rejects_empty_data() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        assert_eq!(
            c.update(vec![], vec![]).unwrap_err(),
            ConditionError::EmptyUpdateData
        );
    }

    #[test]
    fn update_sql_promotes_positional() {
        let mut c = cond();
        let stmt = c
            .update_sql(
                "UPDATE `users` SET `a` = ? WHERE `id` = ?",
                vec![BindParam::new(1_i64), BindParam::new(2_i64)],
            )
            .unwrap();

        assert_eq!(
            stmt.sql,
            "UPDATE `users` SET `a` = :positional_param_0 WHERE `id` = :positional_param_1"
        );
    }

    #[test]
    fn delete_with_order_and_limit() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_("id", 1).unwrap();
        c.latest("created");
        c.top(5);
        let stmt = c.delete().unwrap();

        assert_eq!(
            stmt.sql,
            "DELETE FROM `users` WHERE `users`.`id` = :users_id \
             ORDER BY `users`.`created` DESC LIMIT 5"
        );
    }

    #[test]
    fn delete_with_join_uses_multi_table_form() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.left_join("orders", "", "uid", "=", raw("[users.id]")).unwrap();
        c.where_("id", 1).unwrap();
        let stmt = c.delete().unwrap();

        assert_eq!(
            stmt.sql,
            "DELETE `users` FROM `users` LEFT JOIN `orders` ON `orders`.`uid` = `users`.`id` \
             WHERE `users`.`id` = :users_id"
        );
    }

    #[test]
    fn truncate_has_no_binds() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        let stmt = c.truncate().unwrap();

        assert_eq!(stmt.sql, "TRUNCATE TABLE `users`");
        assert!(stmt.bind_params.is_empty());
    }

    #[test]
    fn dml_requires_master_table() {
        let mut c = cond();
        assert_eq!(c.delete().unwrap_err(), ConditionError::MissingTable);
        assert_eq!(c.truncate().unwrap_err(), ConditionError::MissingTable);
    }
}
