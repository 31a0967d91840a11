use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 本地缓存文件
    pub cache_path: String,
    /// 远程存储, 未设置时仅本地运行
    pub database_url: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                cache_path: "data/documents.json".to_string(),
                database_url: None,
                max_connections: 5,
            },
            extraction: ExtractionConfig {
                endpoint: None,
                api_key: None,
                timeout_secs: 60,
                max_upload_bytes: 15 * 1024 * 1024,
            },
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> config/stock-ledger.toml -> STOCK_ 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(Self::environment())
    }

    /// 环境变量: STOCK_SERVER__PORT -> server.port
    fn environment() -> Environment {
        Environment::with_prefix("STOCK")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with(env: Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("storage.cache_path", defaults.storage.cache_path)?
            .set_default("storage.max_connections", i64::from(defaults.storage.max_connections))?
            .set_default("extraction.timeout_secs", defaults.extraction.timeout_secs as i64)?
            .set_default(
                "extraction.max_upload_bytes",
                defaults.extraction.max_upload_bytes as i64,
            )?
            .add_source(File::with_name("config/stock-ledger").required(false))
            .add_source(env)
            .build()?
            .try_deserialize()
    }

    /// 是否配置了远程存储
    pub fn has_remote_store(&self) -> bool {
        self.storage
            .database_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
    }
}
