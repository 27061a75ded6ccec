use anyhow::{Context, Result};
use itertools::{Itertools, MinMaxResult};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::etl::manifest::{Manifest, WorkStatus};
use crate::etl::normalize::{normalize_table, NormalizedRow};
use crate::etl::table;
use crate::utils::dirs;

/// One consolidated row: a normalized fact plus its resolved taxonomy
/// identifier. A null identifier marks an unmapped concept; such rows are
/// persisted anyway and surfaced through the unmatched-key log.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsolidatedRow {
    pub taxonomy_id: Option<String>,
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

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MissingTaxonomyEntry {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Unit-Element_Name")]
    pub unit_element_name: String,
}

/// Result of one batch assembly across all qualifying entity folders.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub consolidated: Vec<ConsolidatedRow>,
    pub missing: Vec<MissingTaxonomyEntry>,
    /// Serials of the folders that contributed rows, in processing order.
    pub serials: Vec<u32>,
}

/// Walk every `<serial>_<entitycode>` folder under `root`, normalize its
/// tables, left-join against the dictionary and move consumed files into
/// the loaded folder under `loaded_root`. The join never drops rows; moves
/// are permanent with no rollback across folders.
pub fn assemble_batch(
    root: &Path,
    loaded_root: &Path,
    dictionary: &HashMap<String, String>,
    manifest: &mut Manifest,
    run_id: Uuid,
) -> Result<BatchOutcome> {
    let mut outcome = BatchOutcome::default();

    for folder in entity_folders(root)? {
        let folder_name = folder
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();

        let Some((serial, _)) = dirs::parse_working_folder_name(&folder_name) else {
            warn!("skipping folder with invalid serial prefix: {}", folder_name);
            continue;
        };

        info!("Processing folder for company: {}", folder_name);
        let rows = normalize_folder(&folder);
        if rows.is_empty() {
            info!("no rows in {}, skipping", folder_name);
            continue;
        }

        for row in rows {
            let taxonomy_id = dictionary.get(&row.unit_element_name).cloned();
            if taxonomy_id.is_none() {
                outcome.missing.push(MissingTaxonomyEntry {
                    company: folder_name.clone(),
                    unit_element_name: row.unit_element_name.clone(),
                });
            }
            outcome.consolidated.push(consolidate(row, taxonomy_id));
        }
        outcome.serials.push(serial);

        move_to_loaded(&folder, &folder_name, loaded_root)?;

        let base = dirs::base_folder_name(&folder_name);
        let symbol = dirs::parse_working_folder_name(base)
            .map(|(_, symbol)| symbol)
            .unwrap_or_default();
        manifest.mark(base, serial, symbol, WorkStatus::Loaded, run_id);
    }

    Ok(outcome)
}

fn consolidate(row: NormalizedRow, taxonomy_id: Option<String>) -> ConsolidatedRow {
    ConsolidatedRow {
        taxonomy_id,
        company_code: row.company_code,
        financial_year: row.financial_year,
        quarter: row.quarter,
        element_name: row.element_name,
        unit: row.unit,
        value: row.value,
        decimal: row.decimal,
        unit_element_name: row.unit_element_name,
        period_start_date: row.period_start_date,
        period_end_date: row.period_end_date,
    }
}

/// Normalize every table file in one folder. A file that fails to read
/// contributes nothing; the rest of the folder still loads.
fn normalize_folder(folder: &Path) -> Vec<NormalizedRow> {
    let mut rows = Vec::new();
    let mut files: Vec<PathBuf> = match fs::read_dir(folder) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect(),
        Err(e) => {
            warn!("failed to read folder {}: {}", folder.display(), e);
            return rows;
        }
    };
    files.sort();

    for file in files {
        match table::read_table(&file) {
            Ok(table_rows) => rows.extend(normalize_table(table_rows)),
            Err(e) => warn!("error with file {}: {:#}", file.display(), e),
        }
    }
    rows
}

fn move_to_loaded(folder: &Path, folder_name: &str, loaded_root: &Path) -> Result<()> {
    let target = loaded_root.join(dirs::loaded_folder_name(folder_name));
    dirs::ensure_dir(&target)?;

    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        if path.is_file() {
            let Some(file_name) = path.file_name() else {
                continue;
            };
            dirs::move_file(&path, &target.join(file_name))?;
            info!("Moved {:?} to {}", file_name, target.display());
        }
    }
    Ok(())
}

fn entity_folders(root: &Path) -> Result<Vec<PathBuf>> {
    let mut folders: Vec<PathBuf> = fs::read_dir(root)
        .with_context(|| format!("failed to read root folder: {}", root.display()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    folders.sort();
    Ok(folders)
}

/// Write the unmatched-key log, named by the serial range that contributed
/// rows this run. No folder contributed, no file.
pub fn write_missing_log(log_dir: &Path, outcome: &BatchOutcome) -> Result<Option<PathBuf>> {
    let (start_serial, end_serial) = match outcome.serials.iter().minmax() {
        MinMaxResult::NoElements => return Ok(None),
        MinMaxResult::OneElement(serial) => (*serial, *serial),
        MinMaxResult::MinMax(min, max) => (*min, *max),
    };

    dirs::ensure_dir(log_dir)?;
    let path = log_dir.join(format!(
        "{}_to_{}_missing_taxonomy.csv",
        start_serial, end_serial
    ));

    let mut writer = csv::Writer::from_path(&path)?;
    for entry in &outcome.missing {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    info!("Log file saved as {}", path.display());
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_missing_log_names_serial_range() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = BatchOutcome {
            consolidated: Vec::new(),
            missing: vec![MissingTaxonomyEntry {
                company: "5_ABC_Converted_Excels".to_string(),
                unit_element_name: "OneD-Mystery".to_string(),
            }],
            serials: vec![7, 5, 6],
        };
        let path = write_missing_log(dir.path(), &outcome).unwrap().unwrap();
        assert!(path.ends_with("5_to_7_missing_taxonomy.csv"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("OneD-Mystery"));
    }

    #[test]
    fn test_no_serials_no_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = BatchOutcome::default();
        assert!(write_missing_log(dir.path(), &outcome).unwrap().is_none());
    }
}
