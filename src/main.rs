use anyhow::{Context, Result};
use tracing::info;

use shardopt::config::Config;
use shardopt::rule::IncrementKeyGenerator;
use shardopt::{OptimizeContext, OptimizeEngineFactory, SqlStatementParser};

fn main() -> Result<()> {
    let config = Config::load();

    // Logs go to stderr so stdout carries only the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(config.log_level.clone())
        .with_writer(std::io::stderr)
        .init();

    info!("shardopt v{}", env!("CARGO_PKG_VERSION"));

    let rules = config.load_rules().context("Failed to load rules")?;
    let parameters = config.parameters()?;
    let dialect = config.sql_dialect()?;
    let sql = config.sql_text().context("Failed to read SQL")?;
    let statement = SqlStatementParser::parse_one(&sql, dialect.as_ref())?;

    let key_generator = IncrementKeyGenerator::new(config.key_start);
    let context = OptimizeContext::new(&rules)
        .with_encrypt_rule(&rules)
        .with_metadata(&rules)
        .with_key_generator(&key_generator);

    let result = OptimizeEngineFactory::optimize(context, &statement, &parameters)
        .map_err(|e| anyhow::anyhow!("[{}] {}", e.error_code(), e))?;
    info!(
        "Resolved {} sharding condition(s){}",
        result.sharding_conditions().len(),
        if result.is_always_false() { ", always false" } else { "" }
    );

    let json = if config.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{json}");
    Ok(())
}
