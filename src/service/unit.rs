/// 单件 (UN / PZ / UD 的规范形式)
pub const UNIT_PIECE: &str = "UD";
pub const UNIT_KILOGRAM: &str = "KG";
pub const UNIT_CASE: &str = "CJ";

/// 表示"单件"的同义词
const PIECE_SYNONYMS: [&str; 3] = ["UN", "PZ", "UD"];

/// 单位规范化: 去空格、转大写, UN/PZ/UD 合并为 UD, 其他原样保留
pub fn normalize_unit(raw: &str) -> String {
    let unit = raw.trim().to_uppercase();
    if unit.is_empty() || PIECE_SYNONYMS.contains(&unit.as_str()) {
        return UNIT_PIECE.to_string();
    }
    unit
}
