use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use stock_ledger::api::{self, AppState};
use stock_ledger::db::{DocumentStore, FileStore, PgStore};
use stock_ledger::external::HttpExtractor;
use stock_ledger::{create_pool, AppConfig, StockLedger};
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 本地时间格式
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config.server);

    // 本地缓存 + 可选的远程存储
    let local: Arc<dyn DocumentStore> = Arc::new(FileStore::new(&config.storage.cache_path));
    let remote: Option<Arc<dyn DocumentStore>> = match &config.storage.database_url {
        Some(url) if config.has_remote_store() => {
            // 惰性连接: 数据库不可达时照常启动, 同步失败在各次写入中上报
            match create_pool(url, config.storage.max_connections) {
                Ok(pool) => {
                    info!("Database pool created");
                    let store: Arc<dyn DocumentStore> = Arc::new(PgStore::new(pool));
                    Some(store)
                }
                Err(e) => {
                    warn!("远程存储地址无效, 仅本地运行: {}", e);
                    None
                }
            }
        }
        _ => {
            warn!("未配置远程存储, 仅本地运行");
            None
        }
    };

    let mut ledger = StockLedger::new(local, remote);
    let outcome = ledger.load().await;
    if !outcome.is_synced() {
        warn!("初始加载部分失败: {} 个存储不可用", outcome.failures.len());
    }

    let extractor = Arc::new(HttpExtractor::new(&config.extraction)?);
    if config.extraction.endpoint.is_none() {
        warn!("未配置文档抽取服务, 上传将失败");
    }

    let state = AppState {
        ledger: Arc::new(RwLock::new(ledger)),
        extractor,
        max_upload_bytes: config.extraction.max_upload_bytes,
    };

    // base64 编码约增加 1/3
    let body_limit = config.extraction.max_upload_bytes * 2;

    let document_routes = Router::new()
        .route("/api/documents", get(api::list_documents).post(api::upload_document))
        .route("/api/documents/:id", axum::routing::delete(api::delete_document))
        .route("/api/documents/:id/supplier", patch(api::rename_supplier))
        .route("/api/documents/:id/items/:index", patch(api::correct_line_item))
        .route("/api/physical-counts/sheet", post(api::import_physical_count_sheet))
        .route("/api/reset", post(api::reset));

    let inventory_routes = Router::new()
        .route("/api/inventory", get(api::get_inventory))
        .route("/api/inventory/groups", get(api::get_inventory_groups))
        .route("/api/inventory/export", get(api::export_inventory))
        .route(
            "/api/inventory/entries/:key",
            patch(api::edit_stock_entry).delete(api::edit_stock_entry),
        )
        .route("/api/summary", get(api::get_summary))
        .route("/api/reconciliation/:id", get(api::get_reconciliation))
        .route("/api/reconciliation/:id/export", get(api::export_reconciliation));

    let app = Router::new()
        .route("/health", get(api::health_check))
        .merge(document_routes)
        .merge(inventory_routes)
        .with_state(state)
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(body_limit)));

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
