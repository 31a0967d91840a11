use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 单据类型 (固定于创建时, 之后不可变)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocType {
    Invoice,
    DeliveryNote,
    PhysicalCount,
}

impl DocType {
    /// 存储与接口中使用的字符串形式
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Invoice => "invoice",
            DocType::DeliveryNote => "deliveryNote",
            DocType::PhysicalCount => "physicalCount",
        }
    }

    /// 内部ID前缀
    pub fn id_prefix(&self) -> &'static str {
        match self {
            DocType::Invoice => "INV",
            DocType::DeliveryNote => "DDT",
            DocType::PhysicalCount => "DOC-PC",
        }
    }

    /// 是否参与库存汇总 (盘点单只用于对账)
    pub fn feeds_inventory(&self) -> bool {
        !matches!(self, DocType::PhysicalCount)
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invoice" => Ok(DocType::Invoice),
            "deliveryNote" => Ok(DocType::DeliveryNote),
            "physicalCount" => Ok(DocType::PhysicalCount),
            other => Err(format!("unknown document type: {other}")),
        }
    }
}

/// 单据明细行 (一个商品)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default)]
    pub sku: String,
    pub name: String,
    pub quantity: BigDecimal,
    pub unit_of_measure: String,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub category: String,
    // 来源信息
    pub document_date: NaiveDate,
    pub document_id: String,
    pub document_number: String,
    pub supplier: String,
    pub doc_type: DocType,
}

/// 人工修正 - 仅能通过所属单据修改明细
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemPatch {
    pub sku: Option<String>,
    pub name: Option<String>,
    /// 原始输入文本, 无法解析时按 0 处理
    pub quantity: Option<String>,
    pub unit_of_measure: Option<String>,
    pub unit_price: Option<String>,
    pub total_price: Option<String>,
    pub category: Option<String>,
}

/// 来源单据 (发票 / 送货单 / 盘点单)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    pub id: String,
    pub document_number: String,
    pub date: NaiveDate,
    pub supplier: String,
    pub total_amount: BigDecimal,
    #[serde(default)]
    pub file_name: String,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    pub line_items: Vec<LineItem>,
}

impl SourceDocument {
    /// 单据金额 = 明细合计 (盘点单恒为 0)
    pub fn computed_total(&self) -> BigDecimal {
        if self.doc_type == DocType::PhysicalCount {
            return BigDecimal::zero();
        }
        self.line_items
            .iter()
            .fold(BigDecimal::zero(), |acc, item| acc + &item.total_price)
    }

    /// 重新计算单据金额
    pub fn recompute_total(&mut self) {
        self.total_amount = self.computed_total();
    }

    /// 修改供应商, 同步明细上的来源信息; 空名称忽略
    pub fn rename_supplier(&mut self, supplier: &str) -> bool {
        let supplier = supplier.trim();
        if supplier.is_empty() {
            return false;
        }
        self.supplier = supplier.to_string();
        for item in &mut self.line_items {
            item.supplier = self.supplier.clone();
        }
        true
    }
}
