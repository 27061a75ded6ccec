use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::bse::parsing::types::{BroadcastRow, PerFactRow};

/// One row of an extracted table as it comes back off disk. Every column is
/// optional: older extractions may lack columns, and the append step
/// synthesizes nulls for whatever is missing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(rename = "Company Code", default)]
    pub company_code: Option<String>,
    #[serde(rename = "Financial Year", default)]
    pub financial_year: Option<String>,
    #[serde(rename = "Quarter", default)]
    pub quarter: Option<String>,
    #[serde(rename = "Element Name", default)]
    pub element_name: Option<String>,
    #[serde(rename = "Unit", default)]
    pub unit: Option<String>,
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
    #[serde(rename = "Decimal", default)]
    pub decimal: Option<String>,
    #[serde(rename = "Period Start Date", default)]
    pub period_start_date: Option<String>,
    #[serde(rename = "Period End Date", default)]
    pub period_end_date: Option<String>,
}

pub fn write_broadcast_table(path: &Path, rows: &[BroadcastRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create table: {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_per_fact_table(path: &Path, rows: &[PerFactRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create table: {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_table(path: &Path) -> Result<Vec<TableRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open table: {}", path.display()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize::<TableRow>() {
        rows.push(record.with_context(|| format!("bad row in {}", path.display()))?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_table_survives_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let rows = vec![BroadcastRow {
            company_code: "500325".to_string(),
            financial_year: "2024".to_string(),
            quarter: "01".to_string(),
            element_name: "Revenue".to_string(),
            unit: "OneD".to_string(),
            value: Some("1000".to_string()),
            decimal: "-3".to_string(),
            period_start_date: "2023-04-01".to_string(),
            period_end_date: "2023-06-30".to_string(),
        }];

        write_broadcast_table(&path, &rows).unwrap();
        let read = read_table(&path).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].element_name.as_deref(), Some("Revenue"));
        assert_eq!(read[0].value.as_deref(), Some("1000"));
        assert_eq!(read[0].unit.as_deref(), Some("OneD"));
    }

    #[test]
    fn test_missing_columns_read_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");
        std::fs::write(
            &path,
            "Element Name,Unit,Value\nRevenue,OneD,1000\n",
        )
        .unwrap();

        let rows = read_table(&path).unwrap();
        assert_eq!(rows[0].element_name.as_deref(), Some("Revenue"));
        assert_eq!(rows[0].decimal, None);
        assert_eq!(rows[0].company_code, None);
    }
}
