use crate::models::{LineItem, MergeKey};
use crate::service::unit::normalize_unit;

/// 生成合并键: 有SKU用SKU, 否则用 名称+规范单位
pub fn build_key(item: &LineItem) -> MergeKey {
    key_for(&item.sku, &item.name, &item.unit_of_measure)
}

pub(crate) fn key_for(sku: &str, name: &str, unit: &str) -> MergeKey {
    let sku = sku.trim().to_lowercase();
    if !sku.is_empty() {
        return MergeKey::sku(&sku);
    }
    let name = name.trim().to_lowercase();
    MergeKey::name(&name, &normalize_unit(unit))
}
