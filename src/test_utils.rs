//! 单元测试辅助: 构造单据与明细

use crate::models::{DocType, LineItem, SourceDocument};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// 明细: (sku, 名称, 数量, 单位, 行金额)
pub fn item(sku: &str, name: &str, qty: &str, unit: &str, total: &str) -> LineItem {
    let quantity = dec(qty);
    let total_price = dec(total);
    let unit_price = if quantity > BigDecimal::from(0) {
        &total_price / &quantity
    } else {
        BigDecimal::from(0)
    };
    LineItem {
        sku: sku.to_string(),
        name: name.to_string(),
        quantity,
        unit_of_measure: unit.to_string(),
        unit_price,
        total_price,
        category: "Generico".to_string(),
        document_date: date("2024-01-01"),
        document_id: String::new(),
        document_number: String::new(),
        supplier: String::new(),
        doc_type: DocType::Invoice,
    }
}

pub fn document(id: &str, doc_type: DocType, day: &str, items: Vec<LineItem>) -> SourceDocument {
    let mut doc = SourceDocument {
        id: id.to_string(),
        document_number: format!("N-{id}"),
        date: date(day),
        supplier: format!("Fornitore {id}"),
        total_amount: BigDecimal::from(0),
        file_name: format!("{id}.pdf"),
        doc_type,
        line_items: items
            .into_iter()
            .map(|mut item| {
                item.document_date = date(day);
                item.document_id = id.to_string();
                item.document_number = format!("N-{id}");
                item.supplier = format!("Fornitore {id}");
                item.doc_type = doc_type;
                item
            })
            .collect(),
    };
    doc.recompute_total();
    doc
}
