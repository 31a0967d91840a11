//! 仓库账本: 内存中的单据集合 + 本地缓存 + 远程存储
//!
//! 所有修改先同步更新内存 (乐观) 并返回 `PendingSync`, 调用方释放锁后再 `commit`
//! 写本地缓存与远程存储. 存储失败不回滚内存, 通过 `SyncOutcome` 交给调用方通知用户.
//! 库存与对账每次都从当前单据集合完整重算.

use futures::future::join;
use std::sync::Arc;

use crate::db::DocumentStore;
use crate::error::{AppError, AppResult, PersistenceError};
use crate::models::{
    DocType, Inventory, LineItemPatch, ReconciliationReport, SourceDocument, StockSummary,
};
use crate::service::{aggregator, ingestion, reconciler, summary};

/// 存储写入失败记录
#[derive(Debug)]
pub struct SyncFailure {
    pub store: &'static str,
    pub error: PersistenceError,
}

/// 一次修改的同步结果
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub remote_configured: bool,
    pub failures: Vec<SyncFailure>,
}

impl SyncOutcome {
    /// 所有存储均写入成功
    pub fn is_synced(&self) -> bool {
        self.failures.is_empty()
    }

    /// 远程存储已写入 (未配置远程时为 false)
    pub fn cloud_synced(&self) -> bool {
        self.remote_configured && self.is_synced()
    }

    /// 面向用户的提示
    pub fn message(&self, action: &str) -> String {
        if !self.is_synced() {
            format!("{action}: errore di sincronizzazione, dati salvati solo in memoria.")
        } else if self.remote_configured {
            format!("{action}: salvato nel cloud.")
        } else {
            format!("{action}: salvato in locale.")
        }
    }
}

enum StoreOp {
    Upsert(SourceDocument),
    Delete(String),
    Clear,
    ReplaceAll(Vec<SourceDocument>),
}

async fn apply(store: &dyn DocumentStore, op: &StoreOp) -> Result<(), PersistenceError> {
    match op {
        StoreOp::Upsert(doc) => store.upsert(doc).await,
        StoreOp::Delete(id) => store.delete(id).await,
        StoreOp::Clear => store.clear().await,
        StoreOp::ReplaceAll(docs) => store.replace_all(docs).await,
    }
}

/// 内存已修改, 尚未写入存储的变更
///
/// 持有存储句柄的副本, 可以在释放账本锁之后再 `commit`.
#[must_use = "the change is only in memory until committed"]
pub struct PendingSync {
    op: StoreOp,
    local: Arc<dyn DocumentStore>,
    remote: Option<Arc<dyn DocumentStore>>,
}

impl PendingSync {
    /// 变更后的单据 (删除与清空时为 None)
    pub fn document(&self) -> Option<&SourceDocument> {
        match &self.op {
            StoreOp::Upsert(doc) => Some(doc),
            _ => None,
        }
    }

    /// 并发写入本地缓存与远程存储
    pub async fn commit(self) -> SyncOutcome {
        let local = apply(self.local.as_ref(), &self.op);
        let remote = async {
            match &self.remote {
                Some(store) => Some(apply(store.as_ref(), &self.op).await),
                None => None,
            }
        };
        let (local_result, remote_result) = join(local, remote).await;

        let mut outcome = SyncOutcome {
            remote_configured: self.remote.is_some(),
            failures: Vec::new(),
        };
        if let Err(error) = local_result {
            tracing::warn!("本地缓存写入失败: {}", error);
            outcome.failures.push(SyncFailure { store: self.local.name(), error });
        }
        if let (Some(Err(error)), Some(store)) = (remote_result, &self.remote) {
            tracing::warn!("远程同步失败 (本地数据仍然有效): {}", error);
            outcome.failures.push(SyncFailure { store: store.name(), error });
        }
        outcome
    }
}

pub struct StockLedger {
    invoices: Vec<SourceDocument>,
    delivery_notes: Vec<SourceDocument>,
    physical_counts: Vec<SourceDocument>,
    local: Arc<dyn DocumentStore>,
    remote: Option<Arc<dyn DocumentStore>>,
}

impl StockLedger {
    pub fn new(local: Arc<dyn DocumentStore>, remote: Option<Arc<dyn DocumentStore>>) -> Self {
        Self {
            invoices: Vec::new(),
            delivery_notes: Vec::new(),
            physical_counts: Vec::new(),
            local,
            remote,
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// 初始加载: 先读本地缓存, 远程有数据时以远程为准
    pub async fn load(&mut self) -> SyncOutcome {
        let mut outcome = SyncOutcome {
            remote_configured: self.remote.is_some(),
            failures: Vec::new(),
        };

        match self.local.list_all().await {
            Ok(docs) => {
                tracing::info!("本地缓存加载 {} 张单据", docs.len());
                self.set_all(docs);
            }
            Err(error) => {
                tracing::warn!("本地缓存读取失败: {}", error);
                outcome.failures.push(SyncFailure { store: self.local.name(), error });
            }
        }

        let Some(remote) = self.remote.clone() else {
            return outcome;
        };
        match remote.list_all().await {
            Ok(docs) if !docs.is_empty() => {
                tracing::info!("远程存储加载 {} 张单据, 替换本地视图", docs.len());
                if let Err(error) = apply(self.local.as_ref(), &StoreOp::ReplaceAll(docs.clone())).await {
                    tracing::warn!("本地缓存更新失败: {}", error);
                    outcome.failures.push(SyncFailure { store: self.local.name(), error });
                }
                self.set_all(docs);
            }
            Ok(_) => tracing::info!("远程存储为空, 保留本地数据"),
            Err(error) => {
                tracing::warn!("远程存储读取失败, 使用本地数据: {}", error);
                outcome.failures.push(SyncFailure { store: remote.name(), error });
            }
        }
        outcome
    }

    fn set_all(&mut self, docs: Vec<SourceDocument>) {
        self.invoices.clear();
        self.delivery_notes.clear();
        self.physical_counts.clear();
        for doc in docs {
            self.list_mut(doc.doc_type).push(doc);
        }
    }

    fn list_mut(&mut self, doc_type: DocType) -> &mut Vec<SourceDocument> {
        match doc_type {
            DocType::Invoice => &mut self.invoices,
            DocType::DeliveryNote => &mut self.delivery_notes,
            DocType::PhysicalCount => &mut self.physical_counts,
        }
    }

    /// 某类单据 (最新在前)
    pub fn documents(&self, doc_type: DocType) -> &[SourceDocument] {
        match doc_type {
            DocType::Invoice => &self.invoices,
            DocType::DeliveryNote => &self.delivery_notes,
            DocType::PhysicalCount => &self.physical_counts,
        }
    }

    /// 全部单据: 发票, 送货单, 盘点单
    pub fn all_documents(&self) -> impl Iterator<Item = &SourceDocument> {
        self.invoices
            .iter()
            .chain(self.delivery_notes.iter())
            .chain(self.physical_counts.iter())
    }

    pub fn find(&self, id: &str) -> Option<&SourceDocument> {
        self.all_documents().find(|d| d.id == id)
    }

    fn find_mut(&mut self, id: &str) -> AppResult<&mut SourceDocument> {
        self.invoices
            .iter_mut()
            .chain(self.delivery_notes.iter_mut())
            .chain(self.physical_counts.iter_mut())
            .find(|d| d.id == id)
            .ok_or_else(|| AppError::NotFound(format!("document {id}")))
    }

    fn pending(&self, op: StoreOp) -> PendingSync {
        PendingSync {
            op,
            local: Arc::clone(&self.local),
            remote: self.remote.clone(),
        }
    }

    /// 新增单据 (放在同类单据最前面)
    pub fn add_document(&mut self, doc: SourceDocument) -> PendingSync {
        tracing::info!(
            "新增单据 {} ({}), {} 条明细",
            doc.document_number,
            doc.doc_type,
            doc.line_items.len()
        );
        let list = self.list_mut(doc.doc_type);
        list.retain(|d| d.id != doc.id);
        list.insert(0, doc.clone());
        self.pending(StoreOp::Upsert(doc))
    }

    /// 整体替换单据 (类型不可变)
    pub fn update_document(&mut self, doc: SourceDocument) -> AppResult<PendingSync> {
        let existing = self.find_mut(&doc.id)?;
        if existing.doc_type != doc.doc_type {
            return Err(AppError::Validation(format!(
                "document {} is a {}, its type cannot change",
                doc.id, existing.doc_type
            )));
        }
        *existing = doc.clone();
        tracing::info!("单据 {} 已更新", doc.id);
        Ok(self.pending(StoreOp::Upsert(doc)))
    }

    /// 修改供应商名称
    pub fn rename_supplier(&mut self, id: &str, supplier: &str) -> AppResult<PendingSync> {
        let doc = self.find_mut(id)?;
        if !doc.rename_supplier(supplier) {
            return Err(AppError::Validation("supplier name cannot be empty".to_string()));
        }
        let doc = doc.clone();
        tracing::info!("单据 {} 供应商改为 {}", id, doc.supplier);
        Ok(self.pending(StoreOp::Upsert(doc)))
    }

    /// 人工修正明细 (只能通过所属单据)
    pub fn correct_line_item(
        &mut self,
        id: &str,
        index: usize,
        patch: &LineItemPatch,
    ) -> AppResult<PendingSync> {
        let doc = self.find_mut(id)?;
        let item = doc
            .line_items
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("line item {index} of document {id}")))?;
        ingestion::apply_patch(item, patch);
        doc.recompute_total();
        let doc = doc.clone();
        tracing::info!("单据 {} 第 {} 行已人工修正", id, index);
        Ok(self.pending(StoreOp::Upsert(doc)))
    }

    /// 删除单据及其全部明细
    pub fn delete_document(&mut self, id: &str) -> AppResult<PendingSync> {
        let doc_type = self
            .find(id)
            .map(|d| d.doc_type)
            .ok_or_else(|| AppError::NotFound(format!("document {id}")))?;
        self.list_mut(doc_type).retain(|d| d.id != id);
        tracing::info!("单据 {} 已删除", id);
        Ok(self.pending(StoreOp::Delete(id.to_string())))
    }

    /// 清空仓库 (本地与远程)
    pub fn reset(&mut self) -> PendingSync {
        self.set_all(Vec::new());
        tracing::warn!("仓库已清空");
        self.pending(StoreOp::Clear)
    }

    /// 汇总库存: 发票在前, 送货单在后, 各自最新在前
    pub fn inventory(&self) -> Inventory {
        aggregator::consolidate(self.invoices.iter().chain(self.delivery_notes.iter()))
    }

    /// 盘点单对账
    pub fn reconcile(&self, id: &str) -> AppResult<ReconciliationReport> {
        let doc = self
            .find(id)
            .ok_or_else(|| AppError::NotFound(format!("document {id}")))?;
        if doc.doc_type != DocType::PhysicalCount {
            return Err(AppError::Validation(format!(
                "document {id} is not a physical count"
            )));
        }
        let rows = reconciler::reconcile(doc, &self.inventory());
        Ok(ReconciliationReport::new(
            doc.id.clone(),
            doc.document_number.clone(),
            doc.date,
            rows,
        ))
    }

    /// 仪表盘统计
    pub fn summary(&self) -> StockSummary {
        summary::summarize(
            &self.inventory(),
            self.invoices.iter().chain(self.delivery_notes.iter()),
        )
    }
}
