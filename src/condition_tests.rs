#[cfg(test)]
mod tests {
    use crate::{
        BindValue, CondArg, Condition, ConditionError, ErrorKind, MysqlDriver, TimeType, raw,
    };
    use pretty_assertions::assert_eq;

    fn cond() -> Condition {
        Condition::new(Box::new(MysqlDriver))
    }

    #[test]
    fn where_basic_and_or() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_("name", "foo").unwrap();
        c.where_op("age", ">", 18).unwrap();
        c.or_where("vip", true).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`name` = :users_name \
             AND `users`.`age` > :users_age OR `users`.`vip` = :users_vip"
        );
        assert_eq!(
            c.bind_params().names(),
            vec!["users_name", "users_age", "users_vip"]
        );
    }

    #[test]
    fn make_sql_is_idempotent() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_op("age", ">=", 18).unwrap();

        let first = c.make_sql().unwrap();
        assert_eq!(c.make_sql().unwrap(), first);
        assert_eq!(c.bind_params().len(), 1);
    }

    #[test]
    fn equal_null_becomes_is_null() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_("deleted_at", Option::<i64>::None).unwrap();
        c.where_not_null("name").unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`deleted_at` IS NULL \
             AND `users`.`name` IS NOT NULL"
        );
        assert!(c.bind_params().is_empty());
    }

    #[test]
    fn colliding_fields_get_counter_suffix() {
        let mut c = cond();
        c.where_op("age", ">", 1).unwrap();
        c.where_op("age", "<", 10).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT WHERE `age` > :age AND `age` < :age_1"
        );
        assert_eq!(c.bind_params().names(), vec!["age", "age_1"]);
    }

    #[test]
    fn where_in_list() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_in("age", [1_i64, 2, 3]).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`age` IN \
             (:users_age_in0,:users_age_in1,:users_age_in2)"
        );
    }

    #[test]
    fn where_in_splits_comma_string() {
        let mut c = cond();
        c.where_not_in("id", ["1,2"]).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT WHERE `id` NOT IN (:id_in0,:id_in1)"
        );
        assert_eq!(
            c.bind_params().get("id_in0").map(|p| p.value.clone()),
            Some(BindValue::from("1".to_string()))
        );
    }

    #[test]
    fn where_in_rejects_empty_list() {
        let mut c = cond();
        let err = c.where_in("id", Vec::<i64>::new()).unwrap_err();
        assert_eq!(err, ConditionError::EmptyInList);
        assert_eq!(err.kind(), ErrorKind::DataShape);
    }

    #[test]
    fn where_between_without_table() {
        let mut c = cond();
        c.where_between("price", [100_i64, 200]).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT WHERE `price` BETWEEN :price_between0 AND :price_between1"
        );
        assert_eq!(c.bind_params().names(), vec!["price_between0", "price_between1"]);
    }

    #[test]
    fn not_between_names_and_arity() {
        let mut c = cond();
        c.where_not_between("price", [100_i64, 200]).unwrap();
        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT WHERE `price` NOT BETWEEN :price_notbetween0 AND :price_notbetween1"
        );

        let mut c = cond();
        let err = c.where_between("price", [100_i64]).unwrap_err();
        assert_eq!(err, ConditionError::BetweenTooFew);
        assert_eq!(err.kind(), ErrorKind::DataShape);
    }

    #[test]
    fn like_and_not_like() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_like("name", "%foo%").unwrap();
        c.where_not_like("email", "%@spam%").unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`name` LIKE :users_name \
             AND `users`.`email` NOT LIKE :users_email"
        );
    }

    #[test]
    fn raw_fragment_expands_bracket_macros() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_raw("[age] > 5");
        c.or_where_raw("[o.status] = 1");

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`age` > 5 OR `o`.`status` = 1"
        );
        assert!(c.bind_params().is_empty());
    }

    #[test]
    fn raw_value_splices_without_binding() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_op("created", ">", raw("UNIX_TIMESTAMP()")).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`created` > UNIX_TIMESTAMP()"
        );
        assert!(c.bind_params().is_empty());
    }

    #[test]
    fn manual_bind_with_raw_condition() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_raw("[age] > :min");
        c.bind("min", 18);

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`age` > :min"
        );
        assert_eq!(c.bind_params().names(), vec!["min"]);
    }

    #[test]
    fn group_closure_wraps_in_parens_with_sub_prefix() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_("a", 1).unwrap();
        c.or_where_group(|g| {
            g.where_("b", 2)?;
            g.or_where("c", 3)?;
            Ok(())
        })
        .unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`a` = :users_a \
             OR (`users`.`b` = :sub1_users_b OR `users`.`c` = :sub1_users_c)"
        );
        assert_eq!(
            c.bind_params().names(),
            vec!["users_a", "sub1_users_b", "sub1_users_c"]
        );
    }

    #[test]
    fn nested_groups_get_distinct_sub_ids() {
        let mut c = cond();
        c.table("t", "*").unwrap();
        c.where_group(|g| {
            g.where_("a", 1)?;
            g.where_group(|inner| {
                inner.where_("b", 2)?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();
        c.where_group(|g| {
            g.where_("c", 3)?;
            Ok(())
        })
        .unwrap();

        assert_eq!(
            c.bind_params().names(),
            vec!["sub1_t_a", "sub2_t_b", "sub3_t_c"]
        );
    }

    #[test]
    fn sub_or_prefixes_binds_with_field_scope() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_("a", 1).unwrap();
        c.where_sub_or(|g| {
            g.where_("x", 2)?;
            Ok(())
        })
        .unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`a` = :users_a \
             OR (`users`.`x` = :sub1_users_subor_x)"
        );
    }

    #[test]
    fn sub_and_scope_key() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_sub_and(|g| {
            g.where_("x", 2)?;
            Ok(())
        })
        .unwrap();

        assert_eq!(c.bind_params().names(), vec!["sub1_users_suband_x"]);
    }

    #[test]
    fn exists_from_sql_text() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_exists("SELECT 1").unwrap();
        c.where_not_exists("SELECT 2").unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE EXISTS (SELECT 1) AND NOT EXISTS (SELECT 2)"
        );
    }

    #[test]
    fn exists_from_builder_absorbs_binds() {
        let mut sub = cond();
        sub.table("orders", "*").unwrap();
        sub.where_("uid", 5).unwrap();

        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_exists(sub).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE EXISTS \
             (SELECT `orders`.* FROM `orders` WHERE `orders`.`uid` = :orders_uid)"
        );
        assert_eq!(c.bind_params().names(), vec!["orders_uid"]);
    }

    #[test]
    fn exists_closure_correlates_tables() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_exists_with(|sub| {
            sub.table("orders", "*")?;
            sub.where_raw("[orders.uid] = [users.id]");
            Ok(())
        })
        .unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE EXISTS \
             (SELECT `orders`.* FROM `orders` WHERE `orders`.`uid` = `users`.`id`)"
        );
    }

    #[test]
    fn exists_is_rejected_in_having() {
        let mut c = cond();
        c.table("t", "*").unwrap();
        c.having_op("cnt", ">", 1).unwrap();

        assert_eq!(
            c.where_exists("SELECT 1").unwrap_err(),
            ConditionError::ExistsInHaving
        );
    }

    #[test]
    fn subquery_as_comparison_value() {
        let mut sub = cond();
        sub.table("orders", "id").unwrap();

        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_op("id", "=", sub).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`id` = \
             (SELECT `orders`.`id` FROM `orders`)"
        );
    }

    #[test]
    fn subquery_inside_in_keeps_single_parens() {
        let mut sub = cond();
        sub.table("orders", "id").unwrap();

        let mut c = cond();
        c.table("users", "*").unwrap();
        c.where_in("id", [CondArg::from(sub)]).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`id` IN \
             (SELECT `orders`.`id` FROM `orders`)"
        );
    }

    #[test]
    fn having_clause_renders_after_group() {
        let mut c = cond();
        c.table("t", "*").unwrap();
        c.group_by("type");
        c.having_op("cnt", ">", 5).unwrap();
        c.or_having("cnt", 0).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `t`.* FROM `t` GROUP BY `t`.`type` \
             HAVING `t`.`cnt` > :t_cnt OR `t`.`cnt` = :t_cnt_1"
        );
    }

    #[test]
    fn where_pairs_and_conds() {
        let mut c = cond();
        c.table("t", "*").unwrap();
        c.where_pairs(vec![("a", 1.into()), ("b", 2.into())]).unwrap();
        c.where_conds(vec![("c", ">", 3.into())]).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `t`.* FROM `t` WHERE `t`.`a` = :t_a AND `t`.`b` = :t_b AND `t`.`c` > :t_c"
        );
    }

    #[test]
    fn day_and_month_are_range_checked() {
        let mut c = cond();
        assert_eq!(
            c.where_day("created", 55).unwrap_err(),
            ConditionError::DayOutOfRange(55)
        );
        assert_eq!(
            c.where_month("created", 13).unwrap_err(),
            ConditionError::MonthOutOfRange(13)
        );
    }

    #[test]
    fn year_binds_unix_timestamp() {
        let mut c = cond();
        c.table("t", "*").unwrap();
        c.where_year("created", 2024).unwrap();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `t`.* FROM `t` WHERE `t`.`created` = :t_created"
        );
        assert_eq!(
            c.bind_params().get("t_created").map(|p| p.value.clone()),
            Some(BindValue::I64(1_704_067_200))
        );
    }

    #[test]
    fn date_parses_common_string_formats() {
        let mut c = cond();
        c.where_date("created", "2024-05-06").unwrap();
        assert_eq!(
            c.bind_params().get("created").map(|p| p.value.clone()),
            Some(BindValue::I64(1_714_953_600))
        );

        let mut c = cond();
        c.where_date("created", "1714953600").unwrap();
        assert_eq!(
            c.bind_params().get("created").map(|p| p.value.clone()),
            Some(BindValue::I64(1_714_953_600))
        );

        let mut c = cond();
        assert_eq!(
            c.where_date("created", "not a date").unwrap_err(),
            ConditionError::InvalidTimeValue("not a date".to_string())
        );
    }

    #[test]
    fn time_mode_applies_until_end_time() {
        let mut c = cond();
        c.table("t", "*").unwrap();
        c.time(TimeType::Year);
        c.where_("created", 2024).unwrap();
        c.end_time();
        c.where_("status", 1).unwrap();

        assert_eq!(
            c.bind_params().get("t_created").map(|p| p.value.clone()),
            Some(BindValue::I64(1_704_067_200))
        );
        assert_eq!(
            c.bind_params().get("t_status").map(|p| p.value.clone()),
            Some(BindValue::I64(1))
        );
    }

    #[test]
    fn flow_control_keeps_only_taken_branch() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.if_(false);
        c.where_("a", 1).unwrap();
        c.elif_(false);
        c.where_("b", 2).unwrap();
        c.else_();
        c.where_("c", 3).unwrap();
        c.fi();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`c` = :users_c"
        );
    }

    #[test]
    fn flow_control_first_match_wins() {
        let mut c = cond();
        c.table("users", "*").unwrap();
        c.if_(true);
        c.where_("a", 1).unwrap();
        c.elif_(true);
        c.where_("b", 2).unwrap();
        c.fi();

        assert_eq!(
            c.make_sql().unwrap(),
            "SELECT `users`.* FROM `users` WHERE `users`.`a` = :users_a"
        );
    }

    #[test]
    fn reset_bind_params_clears_registry() {
        let mut c = cond();
        c.where_("a", 1).unwrap();
        assert_eq!(c.bind_params().len(), 1);
        c.reset_bind_params();
        assert!(c.bind_params().is_empty());
    }
}
