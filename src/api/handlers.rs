use crate::error::{AppError, AppResult, ExtractionError};
use crate::external::DocumentExtractor;
use crate::models::{
    ConsolidatedStockEntry, DocType, GroupBy, InventoryGroup, LineItemPatch,
    ReconciliationReport, SourceDocument, StockSummary,
};
use crate::service::{export, ingestion, summary, StockLedger, SyncOutcome};
use axum::{
    body::Bytes,
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<RwLock<StockLedger>>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub max_upload_bytes: usize,
}

/// 上传请求: 文件内容为 base64
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(rename = "type")]
    pub doc_type: DocType,
    pub file_name: String,
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentFilter {
    #[serde(rename = "type")]
    pub doc_type: Option<DocType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetParams {
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SupplierRequest {
    pub supplier: String,
}

#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    pub q: Option<String>,
    pub group: Option<GroupBy>,
}

/// 修改类接口响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
    pub cloud_synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<SourceDocument>,
}

impl MutationResponse {
    fn from_outcome(outcome: &SyncOutcome, action: &str, document: Option<SourceDocument>) -> Self {
        Self {
            success: true,
            message: outcome.message(action),
            cloud_synced: outcome.cloud_synced(),
            document,
        }
    }
}

fn check_size(size: usize, max: usize) -> Result<(), ExtractionError> {
    if size > max {
        return Err(ExtractionError::FileTooLarge { size, max });
    }
    Ok(())
}

fn csv_response(file_name: &str, body: Vec<u8>) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];
    (StatusCode::OK, headers, body).into_response()
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 单据列表
pub async fn list_documents(
    State(state): State<AppState>,
    Query(filter): Query<DocumentFilter>,
) -> Json<Vec<SourceDocument>> {
    let ledger = state.ledger.read().await;
    let docs = match filter.doc_type {
        Some(doc_type) => ledger.documents(doc_type).to_vec(),
        None => ledger.all_documents().cloned().collect(),
    };
    Json(docs)
}

/// 上传单据: 抽取 -> 入库 -> 保存. 抽取失败不新增单据
pub async fn upload_document(
    State(state): State<AppState>,
    Json(req): Json<UploadRequest>,
) -> AppResult<Json<MutationResponse>> {
    let bytes = STANDARD
        .decode(req.data.trim())
        .map_err(|e| AppError::Validation(format!("invalid base64 data: {e}")))?;
    check_size(bytes.len(), state.max_upload_bytes)?;

    tracing::info!(
        "收到上传 {} ({}, {} 字节, 类型 {})",
        req.file_name,
        req.mime_type,
        bytes.len(),
        req.doc_type
    );
    let extracted = state
        .extractor
        .extract(&bytes, &req.mime_type)
        .await
        .inspect_err(|e| tracing::warn!("文档抽取失败 {}: {}", req.file_name, e))?;
    let doc = ingestion::build_document(req.doc_type, &req.file_name, &extracted);

    let pending = state.ledger.write().await.add_document(doc.clone());
    let outcome = pending.commit().await;
    Ok(Json(MutationResponse::from_outcome(&outcome, "Documento caricato", Some(doc))))
}

/// 导入盘点表 (CSV)
pub async fn import_physical_count_sheet(
    State(state): State<AppState>,
    Query(params): Query<SheetParams>,
    body: Bytes,
) -> AppResult<Json<MutationResponse>> {
    check_size(body.len(), state.max_upload_bytes)?;
    let file_name = params.file_name.unwrap_or_else(|| "inventario.csv".to_string());
    let doc = ingestion::parse_physical_count_sheet(&body, &file_name)?;

    let pending = state.ledger.write().await.add_document(doc.clone());
    let outcome = pending.commit().await;
    Ok(Json(MutationResponse::from_outcome(&outcome, "Inventario importato", Some(doc))))
}

/// 修改供应商
pub async fn rename_supplier(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SupplierRequest>,
) -> AppResult<Json<MutationResponse>> {
    let pending = state.ledger.write().await.rename_supplier(&id, &req.supplier)?;
    let doc = pending.document().cloned();
    let outcome = pending.commit().await;
    Ok(Json(MutationResponse::from_outcome(&outcome, "Fornitore aggiornato", doc)))
}

/// 人工修正明细
pub async fn correct_line_item(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
    Json(patch): Json<LineItemPatch>,
) -> AppResult<Json<MutationResponse>> {
    let pending = state.ledger.write().await.correct_line_item(&id, index, &patch)?;
    let doc = pending.document().cloned();
    let outcome = pending.commit().await;
    Ok(Json(MutationResponse::from_outcome(&outcome, "Riga corretta", doc)))
}

/// 删除单据
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MutationResponse>> {
    let pending = state.ledger.write().await.delete_document(&id)?;
    let outcome = pending.commit().await;
    Ok(Json(MutationResponse::from_outcome(&outcome, "Documento rimosso", None)))
}

/// 清空仓库
pub async fn reset(State(state): State<AppState>) -> Json<MutationResponse> {
    let pending = state.ledger.write().await.reset();
    let outcome = pending.commit().await;
    Json(MutationResponse::from_outcome(&outcome, "Magazzino svuotato", None))
}

/// 汇总库存 (可搜索)
pub async fn get_inventory(
    State(state): State<AppState>,
    Query(query): Query<InventoryQuery>,
) -> Json<Vec<ConsolidatedStockEntry>> {
    let inventory = state.ledger.read().await.inventory();
    Json(summary::search(&inventory, query.q.as_deref().unwrap_or_default()))
}

/// 分组库存
pub async fn get_inventory_groups(
    State(state): State<AppState>,
    Query(query): Query<InventoryQuery>,
) -> Json<Vec<InventoryGroup>> {
    let inventory = state.ledger.read().await.inventory();
    let entries = summary::search(&inventory, query.q.as_deref().unwrap_or_default());
    Json(summary::group_inventory(entries, query.group.unwrap_or_default()))
}

/// 汇总库存行不可直接修改
pub async fn edit_stock_entry(Path(key): Path<String>) -> AppResult<Json<MutationResponse>> {
    tracing::debug!("拒绝直接修改库存行 {}", key);
    Err(AppError::Validation(
        "Modifica il documento sorgente per aggiornare lo stock.".to_string(),
    ))
}

/// 导出库存 CSV
pub async fn export_inventory(State(state): State<AppState>) -> AppResult<Response> {
    let inventory = state.ledger.read().await.inventory();
    let entries: Vec<ConsolidatedStockEntry> = inventory.iter().cloned().collect();
    let mut body = Vec::new();
    export::write_inventory_csv(&entries, &mut body)?;
    let file_name = export::inventory_file_name(chrono::Local::now().date_naive());
    Ok(csv_response(&file_name, body))
}

/// 仪表盘统计
pub async fn get_summary(State(state): State<AppState>) -> Json<StockSummary> {
    Json(state.ledger.read().await.summary())
}

/// 盘点对账
pub async fn get_reconciliation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ReconciliationReport>> {
    let report = state.ledger.read().await.reconcile(&id)?;
    Ok(Json(report))
}

/// 导出对账报告 CSV
pub async fn export_reconciliation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let report = state.ledger.read().await.reconcile(&id)?;
    let mut body = Vec::new();
    export::write_reconciliation_csv(&report, &mut body)?;
    Ok(csv_response(&export::reconciliation_file_name(&report), body))
}
