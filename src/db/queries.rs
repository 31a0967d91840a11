use crate::models::{DocType, LineItem, SourceDocument};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::future::Future;
use std::time::Duration;

use crate::error::PersistenceError;

/// 单条语句超时: 30秒
const STATEMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// 单据表行
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    document_number: String,
    date: NaiveDate,
    supplier: String,
    total_amount: BigDecimal,
    file_name: String,
    doc_type: String,
    line_items: Json<Vec<LineItem>>,
}

impl TryFrom<DocumentRow> for SourceDocument {
    type Error = String;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(SourceDocument {
            doc_type: row.doc_type.parse::<DocType>()?,
            id: row.id,
            document_number: row.document_number,
            date: row.date,
            supplier: row.supplier,
            total_amount: row.total_amount,
            file_name: row.file_name,
            line_items: row.line_items.0,
        })
    }
}

async fn with_timeout<T, F>(op: &str, fut: F) -> Result<T, PersistenceError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let start = std::time::Instant::now();
    match tokio::time::timeout(STATEMENT_TIMEOUT, fut).await {
        Ok(Ok(result)) => {
            tracing::debug!("{} 执行成功, 耗时: {:?}", op, start.elapsed());
            Ok(result)
        }
        Ok(Err(e)) => {
            tracing::error!("✗ {} 执行失败, 耗时: {:?}, 错误: {:?}", op, start.elapsed(), e);
            Err(e.into())
        }
        Err(_) => {
            tracing::error!("✗ {} 操作超时 (>30秒)!", op);
            Err(PersistenceError::Timeout)
        }
    }
}

/// 建表 (幂等)
pub async fn ensure_schema(pool: &PgPool) -> Result<(), PersistenceError> {
    with_timeout(
        "CREATE TABLE",
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id              TEXT PRIMARY KEY,
                document_number TEXT NOT NULL,
                date            DATE NOT NULL,
                supplier        TEXT NOT NULL,
                total_amount    NUMERIC NOT NULL DEFAULT 0,
                file_name       TEXT NOT NULL DEFAULT '',
                doc_type        TEXT NOT NULL,
                line_items      JSONB NOT NULL DEFAULT '[]'::jsonb
            )
            "#,
        )
        .execute(pool),
    )
    .await?;
    Ok(())
}

/// 查询全部单据 (日期倒序)
pub async fn list_documents(pool: &PgPool) -> Result<Vec<SourceDocument>, PersistenceError> {
    let rows = with_timeout(
        "SELECT documents",
        sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, document_number, date, supplier, total_amount,
                   file_name, doc_type, line_items
            FROM documents
            ORDER BY date DESC, id
            "#,
        )
        .fetch_all(pool),
    )
    .await?;

    let mut documents = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id.clone();
        match SourceDocument::try_from(row) {
            Ok(doc) => documents.push(doc),
            Err(e) => tracing::warn!("跳过无法识别的单据 {}: {}", id, e),
        }
    }
    Ok(documents)
}

/// 新增或整体替换单据
pub async fn upsert_document(pool: &PgPool, doc: &SourceDocument) -> Result<(), PersistenceError> {
    with_timeout(
        "UPSERT document",
        sqlx::query(
            r#"
            INSERT INTO documents (
                id, document_number, date, supplier, total_amount,
                file_name, doc_type, line_items
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                document_number = EXCLUDED.document_number,
                date = EXCLUDED.date,
                supplier = EXCLUDED.supplier,
                total_amount = EXCLUDED.total_amount,
                file_name = EXCLUDED.file_name,
                doc_type = EXCLUDED.doc_type,
                line_items = EXCLUDED.line_items
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.document_number)
        .bind(doc.date)
        .bind(&doc.supplier)
        .bind(doc.total_amount.clone())
        .bind(&doc.file_name)
        .bind(doc.doc_type.as_str())
        .bind(Json(&doc.line_items))
        .execute(pool),
    )
    .await?;
    Ok(())
}

/// 删除单据 (明细随单据一起删除)
pub async fn delete_document(pool: &PgPool, id: &str) -> Result<(), PersistenceError> {
    with_timeout(
        "DELETE document",
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(pool),
    )
    .await?;
    Ok(())
}

/// 清空仓库
pub async fn delete_all_documents(pool: &PgPool) -> Result<u64, PersistenceError> {
    let result = with_timeout(
        "DELETE all documents",
        sqlx::query("DELETE FROM documents").execute(pool),
    )
    .await?;
    Ok(result.rows_affected())
}
