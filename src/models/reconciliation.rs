use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;

use super::stock::MergeKey;

/// 盘点差异分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    Ok,
    /// 实盘多于账面
    Surplus,
    /// 实盘少于账面
    Shortage,
}

impl ReconciliationStatus {
    /// 按差异值分类
    pub fn classify(diff: &BigDecimal) -> Self {
        if diff.is_zero() {
            ReconciliationStatus::Ok
        } else if *diff > BigDecimal::zero() {
            ReconciliationStatus::Surplus
        } else {
            ReconciliationStatus::Shortage
        }
    }

    /// 导出报表中的标签
    pub fn label(&self) -> &'static str {
        match self {
            ReconciliationStatus::Ok => "OK",
            ReconciliationStatus::Surplus => "Eccedenza",
            ReconciliationStatus::Shortage => "Smanchi",
        }
    }
}

/// 对账行 - 每条盘点明细一行
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationRow {
    pub sku: String,
    pub name: String,
    pub unit_of_measure: String,
    pub physical_quantity: BigDecimal,
    pub system_quantity: BigDecimal,
    pub difference: BigDecimal,
    pub status: ReconciliationStatus,
    /// 匹配到的库存行, 未匹配为 None
    pub matched_key: Option<MergeKey>,
}

/// 对账报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub document_id: String,
    pub document_number: String,
    pub date: chrono::NaiveDate,
    pub rows: Vec<ReconciliationRow>,
    pub ok_count: usize,
    pub surplus_count: usize,
    pub shortage_count: usize,
}

impl ReconciliationReport {
    pub fn new(
        document_id: String,
        document_number: String,
        date: chrono::NaiveDate,
        rows: Vec<ReconciliationRow>,
    ) -> Self {
        let count = |status| rows.iter().filter(|r| r.status == status).count();
        let ok_count = count(ReconciliationStatus::Ok);
        let surplus_count = count(ReconciliationStatus::Surplus);
        let shortage_count = count(ReconciliationStatus::Shortage);
        Self {
            document_id,
            document_number,
            date,
            rows,
            ok_count,
            surplus_count,
            shortage_count,
        }
    }
}
