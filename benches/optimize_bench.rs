use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shardopt::rule::{IncrementKeyGenerator, RuleConfiguration};
use shardopt::statement::SqlStatementParser;
use shardopt::{OptimizeContext, OptimizeEngineFactory, SqlValue};
use sqlparser::dialect::MySqlDialect;

fn rules() -> RuleConfiguration {
    RuleConfiguration::default()
        .with_sharding_table("t_order", ["user_id", "order_id"], Some("order_id"))
        .with_sharding_table("t_order_item", ["user_id", "order_id"], Some("item_id"))
}

fn benchmark_optimize(c: &mut Criterion) {
    let rules = rules();
    let generator = IncrementKeyGenerator::default();
    let context = OptimizeContext::new(&rules).with_key_generator(&generator);
    let dialect = MySqlDialect {};

    let selects = vec![
        "SELECT * FROM t_order WHERE user_id = ? AND status = 'A'",
        "SELECT * FROM t_order WHERE user_id IN (?, ?, ?) AND order_id BETWEEN 1 AND 1000 LIMIT ?, ?",
        "SELECT * FROM t_order o JOIN t_order_item i ON o.order_id = i.order_id WHERE (o.user_id = ? AND i.order_id = 9) OR o.user_id = 3",
        "SELECT * FROM t_order WHERE user_id = 1 AND order_id IN (SELECT order_id FROM t_order_item WHERE user_id = ?)",
    ];
    let select_statements: Vec<_> = selects
        .iter()
        .map(|sql| SqlStatementParser::parse_one(sql, &dialect).unwrap())
        .collect();
    let select_params: Vec<SqlValue> = (1..=5).map(SqlValue::Int).collect();

    c.bench_function("optimize_select", |b| {
        b.iter(|| {
            for statement in &select_statements {
                black_box(OptimizeEngineFactory::optimize(context, statement, &select_params).unwrap());
            }
        })
    });

    let rows: Vec<String> = (0..100).map(|i| format!("({i}, 'init')")).collect();
    let insert_sql = format!("INSERT INTO t_order (user_id, status) VALUES {}", rows.join(", "));
    let insert_statement = SqlStatementParser::parse_one(&insert_sql, &dialect).unwrap();

    c.bench_function("optimize_insert_100_rows", |b| {
        b.iter(|| black_box(OptimizeEngineFactory::optimize(context, &insert_statement, &[]).unwrap()))
    });

    c.bench_function("parse_and_optimize_select", |b| {
        b.iter(|| {
            let statement = SqlStatementParser::parse_one(black_box(selects[1]), &dialect).unwrap();
            black_box(OptimizeEngineFactory::optimize(context, &statement, &select_params).unwrap());
        })
    });
}

criterion_group!(benches, benchmark_optimize);
criterion_main!(benches);
