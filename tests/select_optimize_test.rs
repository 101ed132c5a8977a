mod common;
use common::*;

use pretty_assertions::assert_eq;
use shardopt::route::{RangeRouteValue, RouteValue, ShardingCondition, ValueRange};
use shardopt::{ShardingError, ShardingValue, SqlValue};

#[test]
fn test_equality_yields_single_list_value() {
    let fixture = Fixture::new();
    for value in [1_i64, 42, -7] {
        let sql = format!("SELECT * FROM t_order WHERE user_id = {value}");
        let result = fixture.optimize(&sql, &[]).unwrap();
        let conditions = result.sharding_conditions();
        assert_eq!(conditions.len(), 1, "{sql}");
        assert_eq!(conditions.conditions()[0].route_values(), &[list("user_id", "t_order", &[value])]);
    }
}

#[test]
fn test_in_list_values_and_unresolvable_elements() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize("SELECT * FROM t_order WHERE order_id IN (3, ?, 1, upper('x'))", &[SqlValue::Int(2)])
        .unwrap();
    let condition = &result.sharding_conditions().conditions()[0];
    let mut values = list_values(condition, "order_id", "t_order");
    values.sort();
    assert_eq!(values, ints(&[1, 2, 3]));
}

#[test]
fn test_between_builds_range() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize("SELECT * FROM t_order WHERE user_id BETWEEN ? AND ?", &[SqlValue::Int(10), SqlValue::Int(20)])
        .unwrap();
    let range = ValueRange::closed(ShardingValue::Int(10), ShardingValue::Int(20)).unwrap().unwrap();
    assert_eq!(
        result.sharding_conditions().conditions()[0].route_values(),
        &[RouteValue::Range(RangeRouteValue::new("user_id", "t_order", range))]
    );
}

#[test]
fn test_inverted_between_is_always_false() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize("SELECT * FROM t_order WHERE user_id BETWEEN 20 AND 10", &[])
        .unwrap();
    assert_eq!(result.sharding_conditions().conditions(), &[ShardingCondition::AlwaysFalse]);
    assert!(result.is_always_false());
}

#[test]
fn test_intersection_law() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize("SELECT * FROM t_order WHERE user_id = 5 AND user_id IN (5, 6)", &[])
        .unwrap();
    assert_eq!(
        result.sharding_conditions().conditions()[0].route_values(),
        &[list("user_id", "t_order", &[5])]
    );

    let result = fixture
        .optimize("SELECT * FROM t_order WHERE user_id = 5 AND user_id IN (6, 7)", &[])
        .unwrap();
    assert!(result.is_always_false());
}

#[test]
fn test_list_and_range_intersection() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize("SELECT * FROM t_order WHERE user_id IN (1, 5, 9) AND user_id BETWEEN 4 AND 10", &[])
        .unwrap();
    assert_eq!(
        result.sharding_conditions().conditions()[0].route_values(),
        &[list("user_id", "t_order", &[5, 9])]
    );
}

#[test]
fn test_branch_voiding_law() {
    let fixture = Fixture::new();
    for sql in [
        "SELECT * FROM t_order WHERE user_id = 1 OR status = 'A'",
        "SELECT * FROM t_order WHERE status = 'A' OR user_id = 1",
        "SELECT * FROM t_order WHERE (user_id = 1 AND status = 'A') OR user_id > 3",
    ] {
        let result = fixture.optimize(sql, &[]).unwrap();
        assert!(result.sharding_conditions().is_empty(), "{sql}");
        assert!(!result.is_always_false(), "{sql}");
    }
}

#[test]
fn test_or_branches_give_one_condition_each() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize("SELECT * FROM t_order WHERE (user_id = 1 AND order_id = 2) OR user_id = 3", &[])
        .unwrap();
    let conditions = result.sharding_conditions().conditions();
    assert_eq!(conditions.len(), 2);
    assert_eq!(
        conditions[0].route_values(),
        &[list("user_id", "t_order", &[1]), list("order_id", "t_order", &[2])]
    );
    assert_eq!(conditions[1].route_values(), &[list("user_id", "t_order", &[3])]);
}

#[test]
fn test_unsupported_operators_do_not_narrow() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize("SELECT * FROM t_order WHERE user_id > 1 AND order_id = 2", &[])
        .unwrap();
    assert_eq!(
        result.sharding_conditions().conditions()[0].route_values(),
        &[list("order_id", "t_order", &[2])]
    );
    let result = fixture
        .optimize("SELECT * FROM t_order WHERE user_id NOT IN (1, 2)", &[])
        .unwrap();
    assert!(result.sharding_conditions().is_empty());
}

#[test]
fn test_end_to_end_parameter_and_non_sharding_predicate() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize(
            "SELECT * FROM t_order WHERE user_id = ? AND status IN ('A','B')",
            &[SqlValue::Int(42)],
        )
        .unwrap();
    let conditions = result.sharding_conditions().conditions();
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].route_values(), &[list("user_id", "t_order", &[42])]);
}

#[test]
fn test_idempotence() {
    let fixture = Fixture::new();
    let sql = "SELECT * FROM t_order o WHERE o.user_id IN (?, ?) AND o.order_id BETWEEN 1 AND 100 LIMIT ?, ?";
    let parameters = [SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(0), SqlValue::Int(10)];
    let first = fixture.optimize(sql, &parameters).unwrap();
    let second = fixture.optimize(sql, &parameters).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_join_binds_aliases() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize(
            "SELECT * FROM t_order o JOIN t_order_item i ON o.order_id = i.order_id WHERE o.user_id = 1 AND i.order_id = 9",
            &[],
        )
        .unwrap();
    assert_eq!(
        result.sharding_conditions().conditions()[0].route_values(),
        &[list("user_id", "t_order", &[1]), list("order_id", "t_order_item", &[9])]
    );
}

#[test]
fn test_unqualified_column_bound_through_metadata() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize("SELECT * FROM t_user, t_order_item WHERE item_id = 3 AND order_id = 4", &[])
        .unwrap();
    assert_eq!(
        result.sharding_conditions().conditions()[0].route_values(),
        &[list("order_id", "t_order_item", &[4])]
    );
}

#[test]
fn test_subquery_conditions_appended() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize(
            "SELECT * FROM t_order WHERE user_id = 1 AND order_id IN (SELECT order_id FROM t_order_item WHERE user_id = 2)",
            &[],
        )
        .unwrap();
    let conditions = result.sharding_conditions().conditions();
    assert_eq!(conditions.len(), 2);
    assert_eq!(conditions[0].route_values(), &[list("user_id", "t_order", &[1])]);
    assert_eq!(conditions[1].route_values(), &[list("user_id", "t_order_item", &[2])]);
}

#[test]
fn test_correlated_subquery_binds_outer_alias() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize(
            "SELECT * FROM t_order o WHERE o.order_id = 1 \
             AND EXISTS (SELECT 1 FROM t_user u WHERE u.id = 5 AND o.user_id = 3)",
            &[],
        )
        .unwrap();
    assert_eq!(
        result.sharding_conditions().conditions(),
        &[
            ShardingCondition::new(vec![list("order_id", "t_order", &[1])]),
            ShardingCondition::new(vec![list("user_id", "t_order", &[3])]),
        ]
    );
}

#[test]
fn test_correlated_subquery_under_voided_disjunction_routes_everywhere() {
    let fixture = Fixture::new();
    for sql in [
        "SELECT * FROM t_order o WHERE o.status = 'x' OR EXISTS (SELECT 1 FROM t_user u WHERE o.user_id = 3)",
        "SELECT * FROM t_order o WHERE EXISTS (SELECT 1 FROM t_user u WHERE u.id = 5 AND o.user_id = 3)",
    ] {
        let result = fixture.optimize(sql, &[]).unwrap();
        assert!(result.sharding_conditions().is_empty(), "{sql}");
        assert!(!result.is_always_false(), "{sql}");
    }
}

#[test]
fn test_unplaced_inner_column_does_not_bind_to_outer_table() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize(
            "SELECT * FROM t_order WHERE order_id = 1 \
             AND EXISTS (SELECT 1 FROM t_user a, t_user b WHERE a.id = b.id AND user_id = 5)",
            &[],
        )
        .unwrap();
    assert_eq!(
        result.sharding_conditions().conditions(),
        &[ShardingCondition::new(vec![list("order_id", "t_order", &[1])])]
    );
}

#[test]
fn test_alias_of_sibling_scope_is_not_visible() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize(
            "SELECT * FROM t_user u WHERE EXISTS (SELECT 1 FROM t_user x WHERE x.id = u.id AND o.user_id = 3) \
             AND u.id IN (SELECT user_id FROM t_order o WHERE o.user_id = 4)",
            &[],
        )
        .unwrap();
    assert_eq!(
        result.sharding_conditions().conditions(),
        &[ShardingCondition::new(vec![list("user_id", "t_order", &[4])])]
    );
}

#[test]
fn test_cte_is_a_scope() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize(
            "WITH recent AS (SELECT * FROM t_order WHERE user_id = 8) SELECT * FROM recent",
            &[],
        )
        .unwrap();
    assert_eq!(
        result.sharding_conditions().conditions()[0].route_values(),
        &[list("user_id", "t_order", &[8])]
    );
}

#[test]
fn test_pagination_attached() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize("SELECT * FROM t_order WHERE user_id = ? LIMIT ? OFFSET ?", &ints_params(&[1, 10, 20]))
        .unwrap();
    let pagination = result.pagination().unwrap();
    assert_eq!(pagination.actual_row_count(), Some(10));
    assert_eq!(pagination.actual_offset(), 20);
    assert_eq!(pagination.revised_row_count(), Some(30));
    assert_eq!(pagination.revised_parameters(), ints_params(&[1, 30, 0]));
    assert_eq!(result.sharding_conditions().len(), 1);
}

#[test]
fn test_postgres_numbered_markers() {
    let fixture = Fixture::new();
    let result = fixture
        .optimize_with_dialect(
            "SELECT * FROM t_order WHERE order_id = $2 AND user_id = $1",
            &ints_params(&[7, 8]),
            "postgresql",
        )
        .unwrap();
    assert_eq!(
        result.sharding_conditions().conditions()[0].route_values(),
        &[list("order_id", "t_order", &[8]), list("user_id", "t_order", &[7])]
    );
}

#[test]
fn test_null_sharding_value_is_type_error() {
    let fixture = Fixture::new();
    let err = fixture
        .optimize("SELECT * FROM t_order WHERE user_id = ?", &[SqlValue::Null])
        .unwrap_err();
    assert!(matches!(err, ShardingError::ShardingValueType(_)));
}

#[test]
fn test_mixed_value_types_is_type_error() {
    let fixture = Fixture::new();
    let err = fixture
        .optimize("SELECT * FROM t_order WHERE user_id = 1 AND user_id = '1'", &[])
        .unwrap_err();
    assert!(matches!(err, ShardingError::ShardingValueType(_)));
}

#[test]
fn test_missing_parameter_is_invalid() {
    let fixture = Fixture::new();
    let err = fixture
        .optimize("SELECT * FROM t_order WHERE user_id = ? AND order_id = ?", &[SqlValue::Int(1)])
        .unwrap_err();
    assert!(matches!(err, ShardingError::InvalidParameter(_)));
}

#[test]
fn test_non_sharding_table_has_no_conditions() {
    let fixture = Fixture::new();
    let result = fixture.optimize("SELECT * FROM t_user WHERE id = 1", &[]).unwrap();
    assert!(result.sharding_conditions().is_empty());
}

fn ints_params(values: &[i64]) -> Vec<SqlValue> {
    values.iter().map(|v| SqlValue::Int(*v)).collect()
}
