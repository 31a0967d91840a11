use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::document::DocType;

/// 合并键 - 用于跨单据聚合同一商品
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergeKey(String);

impl MergeKey {
    pub fn sku(normalized_sku: &str) -> Self {
        Self(format!("sku:{normalized_sku}"))
    }

    pub fn name(normalized_name: &str, canonical_unit: &str) -> Self {
        Self(format!("name:{normalized_name}:{canonical_unit}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MergeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 汇总库存行 (派生数据, 不持久化)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedStockEntry {
    pub key: MergeKey,
    pub sku: String,
    pub name: String,
    pub category: String,
    pub supplier: String,
    /// 规范化后的单位
    pub unit_of_measure: String,
    /// 首条明细的原始单位
    pub original_unit: String,
    pub quantity: BigDecimal,
    pub total_price: BigDecimal,
    pub unit_price: BigDecimal,
    pub last_load_date: NaiveDate,
    pub document_id: String,
    pub document_number: String,
    pub doc_type: DocType,
}

/// 汇总库存 (保持合并键首次出现的顺序)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Inventory {
    entries: IndexMap<MergeKey, ConsolidatedStockEntry>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut IndexMap<MergeKey, ConsolidatedStockEntry> {
        &mut self.entries
    }

    pub fn get(&self, key: &MergeKey) -> Option<&ConsolidatedStockEntry> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConsolidatedStockEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 库存总价值
    pub fn total_value(&self) -> BigDecimal {
        self.iter()
            .fold(BigDecimal::from(0), |acc, e| acc + &e.total_price)
    }
}

/// 库存分组方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Month,
    Category,
    Supplier,
    None,
}

/// 分组后的库存
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryGroup {
    pub label: String,
    pub total_value: BigDecimal,
    pub entries: Vec<ConsolidatedStockEntry>,
}

/// 仪表盘统计
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub total_value: BigDecimal,
    pub distinct_products: usize,
    pub distinct_suppliers: usize,
    pub quantity_by_unit: IndexMap<String, BigDecimal>,
    pub quantity_by_category: IndexMap<String, BigDecimal>,
    /// 月份 (YYYY-MM) -> 采购金额, 升序
    pub spend_by_month: Vec<(String, BigDecimal)>,
}
