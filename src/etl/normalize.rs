use crate::bse::parsing::types::{unit_element_key, UNKNOWN};
use crate::etl::table::TableRow;

/// Concept names whose first appearance marks the start of the real
/// document body; anything before it is leading boilerplate some
/// extractions include.
pub const DOCUMENT_START_MARKERS: [&str; 3] = ["ScripCode", "Symbol", "ISIN"];

/// One row ready for the dictionary join, in the canonical column order.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedRow {
    pub company_code: Option<String>,
    pub financial_year: Option<String>,
    pub quarter: Option<String>,
    pub element_name: String,
    pub unit: Option<String>,
    pub value: String,
    pub decimal: Option<String>,
    pub unit_element_name: String,
    pub period_start_date: Option<String>,
    pub period_end_date: Option<String>,
}

/// Per-file normalization: trim leading boilerplate, drop sentinel and
/// empty values and rows without a concept name, and derive the join key.
pub fn normalize_table(rows: Vec<TableRow>) -> Vec<NormalizedRow> {
    let start = rows.iter().position(|row| {
        row.element_name.as_deref().is_some_and(|name| {
            DOCUMENT_START_MARKERS
                .iter()
                .any(|marker| name.contains(marker))
        })
    });
    // without a marker row the table is kept unmodified
    let trimmed = match start {
        Some(index) => &rows[index..],
        None => &rows[..],
    };

    trimmed
        .iter()
        .filter_map(|row| {
            let element_name = row.element_name.clone()?;
            let value = row
                .value
                .clone()
                .filter(|value| !value.is_empty() && value != UNKNOWN)?;
            let unit = row.unit.as_deref().unwrap_or("");
            Some(NormalizedRow {
                company_code: row.company_code.clone(),
                financial_year: row.financial_year.clone(),
                quarter: row.quarter.clone(),
                unit_element_name: unit_element_key(unit, &element_name),
                element_name,
                unit: row.unit.clone(),
                value,
                decimal: row.decimal.clone(),
                period_start_date: row.period_start_date.clone(),
                period_end_date: row.period_end_date.clone(),
            })
        })
        .collect()
}
