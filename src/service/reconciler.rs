use bigdecimal::{BigDecimal, Zero};

use crate::models::{
    ConsolidatedStockEntry, Inventory, LineItem, ReconciliationRow, ReconciliationStatus,
    SourceDocument,
};

/// 盘点对账: 按盘点单明细顺序逐行与汇总库存比较
///
/// 只读分析, 不修改库存与盘点单. 仅在库存中存在而未盘点的商品不出现在结果中.
pub fn reconcile(physical: &SourceDocument, inventory: &Inventory) -> Vec<ReconciliationRow> {
    let rows: Vec<ReconciliationRow> = physical
        .line_items
        .iter()
        .map(|counted| reconcile_item(counted, inventory))
        .collect();

    tracing::debug!(
        "盘点单 {} 对账完成: {} 行, 库存行 {}",
        physical.id,
        rows.len(),
        inventory.len()
    );
    rows
}

fn reconcile_item(counted: &LineItem, inventory: &Inventory) -> ReconciliationRow {
    let matched = find_system_entry(counted, inventory);
    let system_quantity = matched
        .map(|e| e.quantity.clone())
        .unwrap_or_else(BigDecimal::zero);
    let difference = &counted.quantity - &system_quantity;

    ReconciliationRow {
        sku: counted.sku.clone(),
        name: counted.name.clone(),
        unit_of_measure: counted.unit_of_measure.clone(),
        physical_quantity: counted.quantity.clone(),
        system_quantity,
        status: ReconciliationStatus::classify(&difference),
        difference,
        matched_key: matched.map(|e| e.key.clone()),
    }
}

/// 查找账面库存行 (第一条命中即返回)
///
/// SKU 相同 (忽略大小写), 或 名称与单位都相同 (忽略大小写).
/// 与合并键规则不同: 这里比较的是盘点单上的原始单位.
pub fn find_system_entry<'a>(
    counted: &LineItem,
    inventory: &'a Inventory,
) -> Option<&'a ConsolidatedStockEntry> {
    let sku = counted.sku.trim().to_lowercase();
    let name = counted.name.to_lowercase();
    let unit = counted.unit_of_measure.to_uppercase();

    inventory.iter().find(|entry| {
        let sku_match = !sku.is_empty() && entry.sku.trim().to_lowercase() == sku;
        sku_match
            || (entry.name.to_lowercase() == name && entry.unit_of_measure.to_uppercase() == unit)
    })
}
