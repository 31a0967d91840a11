//! 报表导出 (CSV). 金额只在这里统一保留两位小数.

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use csv::Writer;
use std::io::Write;

use crate::error::{AppError, AppResult};
use crate::models::{ConsolidatedStockEntry, ReconciliationReport};

const INVENTORY_HEADER: [&str; 9] = [
    "SKU/Codice",
    "Descrizione",
    "Categoria",
    "Ultimo Fornitore",
    "Giacenza",
    "Unità",
    "Prezzo Medio Unit.",
    "Valore Totale",
    "Data Ultimo Carico",
];

const RECONCILIATION_HEADER: [&str; 7] = [
    "Codice SKU",
    "Descrizione",
    "Unità",
    "Quantità Rilevata (Fisica)",
    "Giacenza Sistema",
    "Differenza",
    "Stato",
];

/// 金额: 两位小数
pub fn fmt_money(value: &BigDecimal) -> String {
    value.round(2).with_scale(2).to_string()
}

/// 数量: 最多三位小数, 去掉多余的 0
pub fn fmt_quantity(value: &BigDecimal) -> String {
    let text = value.round(3).with_scale(3).to_string();
    let trimmed = text.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-" | "-0" => "0".to_string(),
        t => t.to_string(),
    }
}

fn fmt_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn sku_or_na(sku: &str) -> &str {
    if sku.trim().is_empty() {
        "N/D"
    } else {
        sku
    }
}

/// 导出库存 (空库存视为错误)
pub fn write_inventory_csv<W: Write>(entries: &[ConsolidatedStockEntry], out: W) -> AppResult<()> {
    if entries.is_empty() {
        return Err(AppError::Export("Nessun dato da esportare".to_string()));
    }

    let mut writer = Writer::from_writer(out);
    writer.write_record(INVENTORY_HEADER)?;
    for e in entries {
        writer.write_record([
            sku_or_na(&e.sku).to_string(),
            e.name.clone(),
            e.category.clone(),
            e.supplier.clone(),
            fmt_quantity(&e.quantity),
            e.unit_of_measure.clone(),
            fmt_money(&e.unit_price),
            fmt_money(&e.total_price),
            fmt_date(e.last_load_date),
        ])?;
    }
    writer.flush().map_err(|e| AppError::Export(e.to_string()))?;
    tracing::info!("库存导出完成: {} 行", entries.len());
    Ok(())
}

/// 导出对账报告
pub fn write_reconciliation_csv<W: Write>(report: &ReconciliationReport, out: W) -> AppResult<()> {
    let mut writer = Writer::from_writer(out);
    writer.write_record(RECONCILIATION_HEADER)?;
    for row in &report.rows {
        let difference = fmt_quantity(&row.difference);
        let difference = if row.difference > BigDecimal::zero() {
            format!("+{difference}")
        } else {
            difference
        };
        writer.write_record([
            sku_or_na(&row.sku).to_string(),
            row.name.clone(),
            row.unit_of_measure.clone(),
            fmt_quantity(&row.physical_quantity),
            fmt_quantity(&row.system_quantity),
            difference,
            row.status.label().to_string(),
        ])?;
    }
    writer.flush().map_err(|e| AppError::Export(e.to_string()))?;
    Ok(())
}

pub fn inventory_file_name(today: NaiveDate) -> String {
    format!("Giacenze_{}.csv", today.format("%Y-%m-%d"))
}

pub fn reconciliation_file_name(report: &ReconciliationReport) -> String {
    let number: String = report
        .document_number
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("Report_Inventario_{}_{}.csv", number, report.date.format("%Y-%m-%d"))
}
