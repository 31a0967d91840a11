//! 入库边界: 抽取结果 / 盘点表 -> 强类型单据
//!
//! 所有数值在这里统一转换 (无法解析按 0), 核心逻辑只接收干净数据.

use bigdecimal::{BigDecimal, Zero};
use chrono::{Local, NaiveDate};
use serde_json::Value;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ExtractionError;
use crate::external::{ExtractedDocument, ExtractedProduct};
use crate::models::{DocType, LineItem, LineItemPatch, SourceDocument};

const DEFAULT_CATEGORY: &str = "Generico";
const DEFAULT_UNIT: &str = "UN";

/// 文本转十进制: 只取开头的数字部分 ("12 kg" -> 12), 没有数字返回 0
pub fn coerce_text(raw: &str) -> BigDecimal {
    let text = raw.trim();
    let end = numeric_prefix_len(text.as_bytes());
    if end == 0 {
        return BigDecimal::zero();
    }
    BigDecimal::from_str(&text[..end]).unwrap_or_else(|_| BigDecimal::zero())
}

fn digits_from(bytes: &[u8], start: usize) -> usize {
    bytes[start.min(bytes.len())..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count()
}

/// 形如 [+-]digits[.digits][e[+-]digits] 的前缀长度, 至少要有一位数字
fn numeric_prefix_len(bytes: &[u8]) -> usize {
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = digits_from(bytes, end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits_from(bytes, end + 1);
        if frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exp_digits = digits_from(bytes, end + 1 + sign);
        if exp_digits > 0 {
            end += 1 + sign + exp_digits;
        }
    }
    end
}

/// 盘点表数量: 分号分隔的表格使用逗号作小数点
fn coerce_sheet_number(raw: &str, decimal_comma: bool) -> BigDecimal {
    if decimal_comma {
        coerce_text(&raw.replace(',', "."))
    } else {
        coerce_text(raw)
    }
}

/// JSON 值转十进制 (数字或数字字符串), 其他返回 0
pub fn coerce_value(value: &Value) -> BigDecimal {
    match value {
        Value::Number(n) => coerce_text(&n.to_string()),
        Value::String(s) => coerce_text(s),
        _ => BigDecimal::zero(),
    }
}

/// JSON 值转文本 (去空格), 空值返回 None
fn text_of(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// 生成内部单据ID
pub fn new_document_id(doc_type: DocType) -> String {
    format!("{}-{}", doc_type.id_prefix(), Uuid::new_v4())
}

fn fallback_number(prefix: &str) -> String {
    format!("{}-{}", prefix, Local::now().timestamp_millis())
}

fn parse_date(raw: Option<&str>) -> NaiveDate {
    let today = Local::now().date_naive();
    match non_empty(raw) {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d").unwrap_or_else(|_| {
            tracing::warn!("无法解析单据日期 '{}', 使用当天日期", s);
            today
        }),
        None => today,
    }
}

/// 单据头信息
struct Header {
    id: String,
    document_number: String,
    date: NaiveDate,
    supplier: String,
    doc_type: DocType,
}

impl Header {
    fn line_item(&self, sku: String, name: String, unit: String, category: String) -> LineItem {
        LineItem {
            sku,
            name,
            quantity: BigDecimal::zero(),
            unit_of_measure: unit,
            unit_price: BigDecimal::zero(),
            total_price: BigDecimal::zero(),
            category,
            document_date: self.date,
            document_id: self.id.clone(),
            document_number: self.document_number.clone(),
            supplier: self.supplier.clone(),
            doc_type: self.doc_type,
        }
    }

    fn into_document(self, file_name: &str, line_items: Vec<LineItem>) -> SourceDocument {
        let mut doc = SourceDocument {
            id: self.id,
            document_number: self.document_number,
            date: self.date,
            supplier: self.supplier,
            total_amount: BigDecimal::zero(),
            file_name: file_name.to_string(),
            doc_type: self.doc_type,
            line_items,
        };
        doc.recompute_total();
        doc
    }
}

/// 由抽取结果构建单据
pub fn build_document(doc_type: DocType, file_name: &str, extracted: &ExtractedDocument) -> SourceDocument {
    let (supplier_default, number_prefix) = match doc_type {
        DocType::PhysicalCount => ("Inventario Estratto", "INV"),
        _ => ("Fornitore Sconosciuto", "DOC"),
    };

    let header = Header {
        id: new_document_id(doc_type),
        document_number: text_of(&extracted.document_number)
            .unwrap_or_else(|| fallback_number(number_prefix)),
        date: parse_date(text_of(&extracted.date).as_deref()),
        supplier: text_of(&extracted.supplier)
            .unwrap_or_else(|| supplier_default.to_string()),
        doc_type,
    };

    let line_items: Vec<LineItem> = extracted
        .products
        .iter()
        .map(|p| build_line_item(&header, p))
        .collect();

    tracing::info!(
        "单据 {} ({}) 入库: {} 条明细, 供应商 {}",
        header.document_number,
        doc_type,
        line_items.len(),
        header.supplier
    );
    header.into_document(file_name, line_items)
}

fn build_line_item(header: &Header, p: &ExtractedProduct) -> LineItem {
    let name_default = match header.doc_type {
        DocType::PhysicalCount => "Prodotto",
        _ => "Prodotto senza nome",
    };
    let mut item = header.line_item(
        text_of(&p.code).unwrap_or_default(),
        text_of(&p.name).unwrap_or_else(|| name_default.to_string()),
        text_of(&p.unit)
            .unwrap_or_else(|| DEFAULT_UNIT.to_string())
            .to_uppercase(),
        text_of(&p.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
    );
    item.quantity = coerce_value(&p.quantity);

    // 盘点单不带价格
    if header.doc_type != DocType::PhysicalCount {
        item.unit_price = coerce_value(&p.unit_price);
        let total = coerce_value(&p.total_price);
        item.total_price = if total.is_zero() {
            &item.quantity * &item.unit_price
        } else {
            total
        };
    }
    item
}

const SKU_HEADERS: [&str; 2] = ["sku", "codice"];
const NAME_HEADERS: [&str; 3] = ["nome", "descrizione", "prodotto"];
const QUANTITY_HEADERS: [&str; 3] = ["quantità", "giacenza", "conteggio"];
const UNIT_HEADERS: [&str; 1] = ["unità"];

/// 解析盘点表 (CSV, 逗号或分号分隔)
pub fn parse_physical_count_sheet(bytes: &[u8], file_name: &str) -> Result<SourceDocument, ExtractionError> {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or_default();
    let delimiter = if first_line.contains(&b';') && !first_line.contains(&b',') {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| ExtractionError::InvalidSheet(e.to_string()))?
        .clone();
    let column = |aliases: &[&str]| {
        headers
            .iter()
            .position(|h| aliases.contains(&h.trim_start_matches('\u{feff}').to_lowercase().as_str()))
    };
    let (sku_col, name_col, qty_col, unit_col) = (
        column(&SKU_HEADERS),
        column(&NAME_HEADERS),
        column(&QUANTITY_HEADERS),
        column(&UNIT_HEADERS),
    );
    if name_col.is_none() && sku_col.is_none() {
        return Err(ExtractionError::InvalidSheet(
            "missing product name or code column".to_string(),
        ));
    }

    let header = Header {
        id: new_document_id(DocType::PhysicalCount),
        document_number: fallback_number("INV"),
        date: Local::now().date_naive(),
        supplier: "Inventario Manuale".to_string(),
        doc_type: DocType::PhysicalCount,
    };

    let mut line_items = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractionError::InvalidSheet(e.to_string()))?;
        if record.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let cell = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let mut item = header.line_item(
            cell(sku_col).unwrap_or_default(),
            cell(name_col).unwrap_or_else(|| "Senza Nome".to_string()),
            cell(unit_col)
                .unwrap_or_else(|| DEFAULT_UNIT.to_string())
                .to_uppercase(),
            DEFAULT_CATEGORY.to_string(),
        );
        item.quantity = cell(qty_col)
            .map(|q| coerce_sheet_number(&q, delimiter == b';'))
            .unwrap_or_else(BigDecimal::zero);
        line_items.push(item);
    }

    tracing::info!("盘点表 {} 导入: {} 条明细", file_name, line_items.len());
    Ok(header.into_document(file_name, line_items))
}

/// 人工修正明细 (数值文本无法解析按 0)
pub fn apply_patch(item: &mut LineItem, patch: &LineItemPatch) {
    if let Some(sku) = &patch.sku {
        item.sku = sku.trim().to_string();
    }
    if let Some(name) = non_empty(patch.name.as_deref()) {
        item.name = name;
    }
    if let Some(quantity) = &patch.quantity {
        item.quantity = coerce_text(quantity);
    }
    if let Some(unit) = &patch.unit_of_measure {
        let unit = unit.trim().to_uppercase();
        item.unit_of_measure = if unit.is_empty() { "UD".to_string() } else { unit };
    }
    if let Some(unit_price) = &patch.unit_price {
        item.unit_price = coerce_text(unit_price);
    }
    if let Some(total_price) = &patch.total_price {
        item.total_price = coerce_text(total_price);
    }
    if let Some(category) = non_empty(patch.category.as_deref()) {
        item.category = category;
    }
}
