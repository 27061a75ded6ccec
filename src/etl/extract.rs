use anyhow::{Context, Result};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bse::parsing::document;
use crate::bse::parsing::facts::{self, PERIOD_END_ELEMENT};
use crate::bse::parsing::types::{
    BroadcastRow, Dialect, DocumentMeta, PerFactRow, DEFAULT_CONTEXT,
};
use crate::bse::roster::RosterEntry;
use crate::etl::manifest::{Manifest, WorkStatus};
use crate::etl::runlog::RunLog;
use crate::etl::table;
use crate::utils::dirs;
use crate::utils::progress::ProgressTracker;

const UNKNOWN_START_DATE: &str = "UNKNOWN_START_DATE";
const UNKNOWN_END_DATE: &str = "UNKNOWN_END_DATE";
const UNKNOWN_DATE_PREFIX: &str = "UNKNOWN_DATE";

/// Filings downloaded before the period was known carry a
/// `YYYY-YYYY_QN_` prefix; it is replaced by the resolved period tag.
static YEAR_QUARTER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{4}_Q\d_").unwrap());

/// Extract every roster entity's working folder under `input_root`,
/// writing one fact table per filing under `output_root`. Per-file
/// failures go to the run log and never abort the batch.
pub fn run(
    entries: &[RosterEntry],
    input_root: &Path,
    output_root: &Path,
    dialect: Dialect,
    manifest: &mut Manifest,
    log: &mut RunLog,
) -> Result<()> {
    let progress = ProgressTracker::new(entries.len() as u64, "extracting");
    for entry in entries {
        let folder_name = entry.working_folder_name();
        progress.update_message(&folder_name);

        let folder = input_root.join(&folder_name);
        if !folder.is_dir() {
            warn!("working folder not found, skipping: {}", folder.display());
            progress.increment(1);
            continue;
        }

        info!("Processing folder: {}", folder.display());
        process_entity_folder(&folder_name, &folder, output_root, dialect, log)?;
        manifest.mark(
            &folder_name,
            entry.serial,
            entry.symbol.as_str(),
            WorkStatus::Extracted,
            log.run_id,
        );
        progress.increment(1);
    }
    progress.finish();
    Ok(())
}

/// Process every XML filing in one working folder: edit, parse, extract,
/// write the table, then move the source document out of the way.
pub fn process_entity_folder(
    folder_name: &str,
    folder: &Path,
    output_root: &Path,
    dialect: Dialect,
    log: &mut RunLog,
) -> Result<()> {
    let processed_dir =
        output_root.join(format!("{}{}", folder_name, dirs::PROCESSED_XMLS_SUFFIX));
    let tables_dir =
        output_root.join(format!("{}{}", folder_name, dirs::CONVERTED_TABLES_SUFFIX));
    dirs::ensure_dir(&processed_dir)?;
    dirs::ensure_dir(&tables_dir)?;

    for xml_path in xml_files(folder)? {
        let file_name = xml_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("filing.xml")
            .to_string();

        match process_filing(&xml_path, &tables_dir, dialect) {
            Ok(table_path) => {
                dirs::move_file(&xml_path, &processed_dir.join(&file_name))?;
                info!("Saved table: {}", table_path.display());
                log.success(folder_name, &file_name);
            }
            Err(e) => {
                error!("failed to process {}: {:#}", xml_path.display(), e);
                log.error(folder_name, &file_name, &e);
            }
        }
    }
    Ok(())
}

/// One filing: strip the marker comment in place, parse, extract in the
/// requested dialect and write the table. Returns the table path.
pub fn process_filing(xml_path: &Path, tables_dir: &Path, dialect: Dialect) -> Result<PathBuf> {
    document::strip_marker_comment(xml_path)?;
    let content = document::read_document(xml_path)?;
    let doc = document::parse_document(&content)?;

    let stem = xml_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("filing");

    let table_path = match dialect {
        Dialect::Broadcast => {
            let meta = facts::resolve_metadata(&doc);
            let rows: Vec<BroadcastRow> = facts::broadcast_rows(&doc, &meta).collect();
            let path = tables_dir.join(broadcast_table_name(&meta, stem));
            table::write_broadcast_table(&path, &rows)?;
            path
        }
        Dialect::PerFact => {
            let rows: Vec<PerFactRow> = facts::per_fact_rows(&doc).collect();
            let path = tables_dir.join(per_fact_table_name(&rows, stem));
            table::write_per_fact_table(&path, &rows)?;
            path
        }
    };
    Ok(table_path)
}

/// Broadcast-dialect table name: period bounds plus the original stem, with
/// explicit UNKNOWN tags for whichever side did not resolve.
pub fn broadcast_table_name(meta: &DocumentMeta, stem: &str) -> String {
    let start = meta.period_start.found().unwrap_or(UNKNOWN_START_DATE);
    let end = meta.period_end.found().unwrap_or(UNKNOWN_END_DATE);
    format!("{}_{}_{}.csv", start, end, stem)
}

/// Per-fact-dialect table name: the `YYYYMM` of the reporting period end
/// reported under the sentinel context, replacing any year-quarter prefix
/// the stem already carries.
pub fn per_fact_table_name(rows: &[PerFactRow], stem: &str) -> String {
    let period_tag = rows
        .iter()
        .find(|row| row.element_name == PERIOD_END_ELEMENT && row.unit == DEFAULT_CONTEXT)
        .and_then(|row| row.fact_value.as_deref())
        .and_then(|value| chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok())
        .map(|date| date.format("%Y%m").to_string());

    match period_tag {
        Some(tag) => {
            let base = YEAR_QUARTER_PREFIX.replace(stem, "");
            format!("{}_{}.csv", tag, base)
        }
        None => format!("{}_{}.csv", UNKNOWN_DATE_PREFIX, stem),
    }
}

fn xml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_xml_files(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_xml_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)
        .with_context(|| format!("failed to read folder: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect_xml_files(&path, files)?;
        } else if path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
        {
            files.push(path);
        }
    }
    Ok(())
}
