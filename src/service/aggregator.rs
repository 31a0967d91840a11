use bigdecimal::{BigDecimal, Zero};

use crate::models::{ConsolidatedStockEntry, Inventory, LineItem, SourceDocument};
use crate::service::merge_key::build_key;
use crate::service::unit::normalize_unit;

/// 汇总库存: 按输入顺序折叠所有发票与送货单明细
///
/// 每个合并键的第一条明细决定分类、供应商、日期、单位等元数据,
/// 之后的明细只累加数量与金额. 盘点单不参与汇总.
/// 结果顺序为合并键首次出现的顺序.
pub fn consolidate<'a, I>(documents: I) -> Inventory
where
    I: IntoIterator<Item = &'a SourceDocument>,
{
    let start = std::time::Instant::now();
    let mut inventory = Inventory::new();
    let mut folded = 0usize;

    for doc in documents {
        if !doc.doc_type.feeds_inventory() {
            tracing::debug!("跳过盘点单 {} (不参与库存汇总)", doc.id);
            continue;
        }
        for item in &doc.line_items {
            fold_item(&mut inventory, doc, item);
            folded += 1;
        }
    }

    tracing::debug!(
        "库存汇总完成: {} 条明细 -> {} 个库存行, 耗时: {:?}",
        folded,
        inventory.len(),
        start.elapsed()
    );
    inventory
}

fn fold_item(inventory: &mut Inventory, doc: &SourceDocument, item: &LineItem) {
    let key = build_key(item);
    let entries = inventory.entries_mut();

    if let Some(entry) = entries.get_mut(&key) {
        entry.quantity += &item.quantity;
        entry.total_price += &item.total_price;
        // 数量 <= 0 时保留上一次的单价, 避免除零
        if entry.quantity > BigDecimal::zero() {
            entry.unit_price = &entry.total_price / &entry.quantity;
        }
        return;
    }

    entries.insert(
        key.clone(),
        ConsolidatedStockEntry {
            key,
            sku: item.sku.clone(),
            name: item.name.clone(),
            category: item.category.clone(),
            supplier: doc.supplier.clone(),
            unit_of_measure: normalize_unit(&item.unit_of_measure),
            original_unit: item.unit_of_measure.clone(),
            quantity: item.quantity.clone(),
            total_price: item.total_price.clone(),
            unit_price: item.unit_price.clone(),
            last_load_date: doc.date,
            document_id: doc.id.clone(),
            document_number: doc.document_number.clone(),
            doc_type: doc.doc_type,
        },
    );
}
