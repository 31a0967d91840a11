use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;
use std::collections::{BTreeMap, HashSet};

use crate::models::{
    ConsolidatedStockEntry, GroupBy, Inventory, InventoryGroup, SourceDocument, StockSummary,
};
use crate::service::unit::normalize_unit;

/// 库存搜索: 名称/供应商/SKU/单据编号/分类 子串匹配 (忽略大小写), 按入库日期倒序
pub fn search(inventory: &Inventory, term: &str) -> Vec<ConsolidatedStockEntry> {
    let term = term.trim().to_lowercase();
    let mut found: Vec<ConsolidatedStockEntry> = inventory
        .iter()
        .filter(|e| {
            term.is_empty()
                || [&e.name, &e.supplier, &e.sku, &e.document_number, &e.category]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&term))
        })
        .cloned()
        .collect();
    // 稳定排序, 同日期保持汇总顺序
    found.sort_by(|a, b| b.last_load_date.cmp(&a.last_load_date));
    found
}

/// 库存分组 (组按首次出现顺序)
pub fn group_inventory(entries: Vec<ConsolidatedStockEntry>, group_by: GroupBy) -> Vec<InventoryGroup> {
    let mut groups: IndexMap<String, Vec<ConsolidatedStockEntry>> = IndexMap::new();
    for entry in entries {
        let label = match group_by {
            GroupBy::Month => entry.last_load_date.format("%Y-%m").to_string(),
            GroupBy::Category => non_empty_or(&entry.category, "Senza Categoria"),
            GroupBy::Supplier => non_empty_or(&entry.supplier, "Sconosciuto"),
            GroupBy::None => "Giacenza Totale".to_string(),
        };
        groups.entry(label).or_default().push(entry);
    }

    groups
        .into_iter()
        .map(|(label, entries)| InventoryGroup {
            label,
            total_value: entries
                .iter()
                .fold(BigDecimal::zero(), |acc, e| acc + &e.total_price),
            entries,
        })
        .collect()
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

/// 仪表盘统计
///
/// `documents` 为发票与送货单, 用于供应商数与月度采购金额.
pub fn summarize<'a, I>(inventory: &Inventory, documents: I) -> StockSummary
where
    I: IntoIterator<Item = &'a SourceDocument>,
{
    let distinct_products: HashSet<String> =
        inventory.iter().map(|e| e.name.to_lowercase()).collect();

    let mut quantity_by_unit: IndexMap<String, BigDecimal> = IndexMap::new();
    let mut quantity_by_category: IndexMap<String, BigDecimal> = IndexMap::new();
    for entry in inventory.iter() {
        *quantity_by_unit
            .entry(normalize_unit(&entry.unit_of_measure))
            .or_insert_with(BigDecimal::zero) += &entry.quantity;
        *quantity_by_category
            .entry(non_empty_or(&entry.category, "Altro"))
            .or_insert_with(BigDecimal::zero) += &entry.quantity;
    }

    let mut suppliers: HashSet<String> = HashSet::new();
    let mut spend: BTreeMap<String, BigDecimal> = BTreeMap::new();
    for doc in documents {
        if !doc.doc_type.feeds_inventory() {
            continue;
        }
        suppliers.insert(doc.supplier.to_lowercase());
        *spend
            .entry(doc.date.format("%Y-%m").to_string())
            .or_insert_with(BigDecimal::zero) += &doc.total_amount;
    }

    StockSummary {
        total_value: inventory.total_value(),
        distinct_products: distinct_products.len(),
        distinct_suppliers: suppliers.len(),
        quantity_by_unit,
        quantity_by_category,
        spend_by_month: spend.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocType;
    use crate::service::aggregator::consolidate;
    use crate::test_utils::{dec, document, item};

    fn docs() -> Vec<SourceDocument> {
        let mut olio = item("A1", "Olio", "10", "UD", "50");
        olio.category = "Condimenti".to_string();
        let mut farina = item("", "Farina", "8", "KG", "12");
        farina.category = String::new();
        vec![
            document("1", DocType::Invoice, "2024-03-05", vec![olio, farina]),
            document("2", DocType::DeliveryNote, "2024-01-20", vec![item("", "Uova", "6", "pz", "3")]),
            document("3", DocType::PhysicalCount, "2024-03-06", vec![item("A1", "Olio", "9", "UD", "0")]),
        ]
    }

    #[test]
    fn search_matches_fields_and_sorts_newest_first() {
        let inventory = consolidate(&docs());
        let all = search(&inventory, "");
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].name, "Uova");

        let by_supplier = search(&inventory, "FORNITORE 2");
        assert_eq!(by_supplier.len(), 1);
        assert_eq!(by_supplier[0].name, "Uova");

        assert_eq!(search(&inventory, "condim").len(), 1);
        assert!(search(&inventory, "caffè").is_empty());
    }

    #[test]
    fn groups_by_month_category_and_none() {
        let inventory = consolidate(&docs());
        let entries: Vec<_> = inventory.iter().cloned().collect();

        let by_month = group_inventory(entries.clone(), GroupBy::Month);
        let labels: Vec<&str> = by_month.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-03", "2024-01"]);
        assert_eq!(by_month[0].total_value, dec("62"));

        let by_category = group_inventory(entries.clone(), GroupBy::Category);
        assert!(by_category.iter().any(|g| g.label == "Senza Categoria"));

        let single = group_inventory(entries, GroupBy::None);
        assert_eq!(single.len(), 1);
        assert_eq!(single[0].label, "Giacenza Totale");
        assert_eq!(single[0].entries.len(), 3);
    }

    #[test]
    fn summary_counts_units_suppliers_and_spend() {
        let documents = docs();
        let inventory = consolidate(&documents);
        let summary = summarize(&inventory, &documents);

        assert_eq!(summary.total_value, dec("65"));
        assert_eq!(summary.distinct_products, 3);
        assert_eq!(summary.distinct_suppliers, 2);
        assert_eq!(summary.quantity_by_unit["UD"], dec("16"));
        assert_eq!(summary.quantity_by_unit["KG"], dec("8"));
        assert_eq!(summary.quantity_by_category["Altro"], dec("8"));
        assert_eq!(
            summary.spend_by_month,
            vec![("2024-01".to_string(), dec("3")), ("2024-03".to_string(), dec("62"))]
        );
    }
}
