//! 单据存储适配器: 本地缓存 (文件 / 内存) 与远程多设备存储 (PostgreSQL)

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, OnceCell};

use crate::db::queries;
use crate::error::PersistenceError;
use crate::models::SourceDocument;

/// 单据存储 (键值文档库: 列表 / 插入或替换 / 删除)
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 存储名称, 用于日志
    fn name(&self) -> &'static str;

    /// 全部单据, 日期倒序
    async fn list_all(&self) -> Result<Vec<SourceDocument>, PersistenceError>;

    async fn upsert(&self, doc: &SourceDocument) -> Result<(), PersistenceError>;

    async fn delete(&self, id: &str) -> Result<(), PersistenceError>;

    async fn clear(&self) -> Result<(), PersistenceError>;

    /// 用给定集合整体替换存储内容
    async fn replace_all(&self, docs: &[SourceDocument]) -> Result<(), PersistenceError> {
        self.clear().await?;
        for doc in docs {
            self.upsert(doc).await?;
        }
        Ok(())
    }
}

fn sort_newest_first(docs: &mut [SourceDocument]) {
    docs.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.id.cmp(&b.id)));
}

/// 内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<String, SourceDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<SourceDocument> {
        self.documents.get(id).map(|d| d.value().clone())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn list_all(&self) -> Result<Vec<SourceDocument>, PersistenceError> {
        let mut docs: Vec<SourceDocument> =
            self.documents.iter().map(|d| d.value().clone()).collect();
        sort_newest_first(&mut docs);
        Ok(docs)
    }

    async fn upsert(&self, doc: &SourceDocument) -> Result<(), PersistenceError> {
        self.documents.insert(doc.id.clone(), doc.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        self.documents.remove(id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        self.documents.clear();
        Ok(())
    }
}

/// 本地缓存文件: 一个 JSON 文件保存全部单据, 每次写入整体重写
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Vec<SourceDocument>, PersistenceError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, docs: &[SourceDocument]) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(docs)?;
        // 先写临时文件再替换, 避免中断时留下半个文件
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    fn name(&self) -> &'static str {
        "local-cache"
    }

    async fn list_all(&self) -> Result<Vec<SourceDocument>, PersistenceError> {
        let _guard = self.lock.lock().await;
        let mut docs = self.read().await?;
        sort_newest_first(&mut docs);
        Ok(docs)
    }

    async fn upsert(&self, doc: &SourceDocument) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().await;
        let mut docs = self.read().await?;
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }
        self.write(&docs).await
    }

    async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().await;
        let mut docs = self.read().await?;
        docs.retain(|d| d.id != id);
        self.write(&docs).await
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().await;
        self.write(&[]).await
    }

    async fn replace_all(&self, docs: &[SourceDocument]) -> Result<(), PersistenceError> {
        let _guard = self.lock.lock().await;
        self.write(docs).await
    }
}

/// 远程存储 (PostgreSQL)
///
/// 建表推迟到第一次访问, 失败后下次访问重试.
#[derive(Debug)]
pub struct PgStore {
    pool: PgPool,
    schema: OnceCell<()>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema: OnceCell::new(),
        }
    }

    async fn ready(&self) -> Result<&PgPool, PersistenceError> {
        self.schema
            .get_or_try_init(|| queries::ensure_schema(&self.pool))
            .await?;
        Ok(&self.pool)
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    fn name(&self) -> &'static str {
        "cloud"
    }

    async fn list_all(&self) -> Result<Vec<SourceDocument>, PersistenceError> {
        queries::list_documents(self.ready().await?).await
    }

    async fn upsert(&self, doc: &SourceDocument) -> Result<(), PersistenceError> {
        queries::upsert_document(self.ready().await?, doc).await
    }

    async fn delete(&self, id: &str) -> Result<(), PersistenceError> {
        queries::delete_document(self.ready().await?, id).await
    }

    async fn clear(&self) -> Result<(), PersistenceError> {
        let removed = queries::delete_all_documents(self.ready().await?).await?;
        tracing::info!("远程存储已清空, 删除 {} 张单据", removed);
        Ok(())
    }
}
