use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;
use std::time::Duration;

/// 创建数据库连接池 (惰性连接, 只校验 URL)
///
/// 数据库不可达不影响启动, 首次使用时的错误由存储层上报.
pub fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let mut connect_options = PgConnectOptions::from_str(database_url)?;

    // 慢查询日志阈值: 5秒
    connect_options = connect_options.log_slow_statements(
        tracing::log::LevelFilter::Warn,
        Duration::from_secs(5),
    );

    Ok(PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy_with(connect_options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_database_still_builds_a_pool() {
        let pool = create_pool("postgres://u:p@127.0.0.1:1/stock", 1).unwrap();
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(create_pool("not a url", 1).is_err());
    }
}
