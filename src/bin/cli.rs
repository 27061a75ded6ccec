use anyhow::Result;
use colored::*;
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use uuid::Uuid;

use factline::bse::parsing::types::Dialect;
use factline::bse::roster;
use factline::core::config::EtlConfig;
use factline::db;
use factline::etl::manifest::Manifest;
use factline::etl::runlog::RunLog;
use factline::etl::{extract, load};
use factline::utils::dirs;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "factline",
    about = "Extract facts from exchange result filings and load them against the taxonomy dictionary"
)]
enum Opt {
    /// Convert downloaded XML filings into per-filing fact tables
    Extract {
        /// Roster CSV with Sr No, Symbol and Security Code columns
        #[structopt(long, parse(from_os_str))]
        roster: PathBuf,
        /// Root directory holding <serial>_<symbol> working folders
        #[structopt(long, parse(from_os_str))]
        input: PathBuf,
        /// Root directory for converted tables and processed XMLs
        #[structopt(long, parse(from_os_str))]
        output: PathBuf,
        /// Directory the run log is written to
        #[structopt(long, parse(from_os_str))]
        log_dir: PathBuf,
        /// Period resolution dialect: broadcast or per-fact
        #[structopt(long, default_value = "broadcast")]
        dialect: Dialect,
    },
    /// Join extracted tables against the taxonomy dictionary and append to Postgres
    Load {
        /// Root directory holding the converted table folders
        #[structopt(long, parse(from_os_str))]
        root: PathBuf,
        /// Directory loaded folders are moved into
        #[structopt(long, parse(from_os_str))]
        loaded: PathBuf,
        /// Directory the unmatched-key log is written to
        #[structopt(long, parse(from_os_str))]
        log_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    match Opt::from_args() {
        Opt::Extract {
            roster,
            input,
            output,
            log_dir,
            dialect,
        } => run_extract(&roster, &input, &output, &log_dir, dialect),
        Opt::Load {
            root,
            loaded,
            log_dir,
        } => run_load(&root, &loaded, &log_dir).await,
    }
}

fn run_extract(
    roster: &Path,
    input: &Path,
    output: &Path,
    log_dir: &Path,
    dialect: Dialect,
) -> Result<()> {
    let entries = roster::load_roster(roster)?;
    dirs::ensure_dir(output)?;
    dirs::ensure_dir(log_dir)?;

    let mut manifest = Manifest::load_or_default(&output.join(dirs::MANIFEST_FILE))?;
    let mut log = RunLog::new();

    extract::run(&entries, input, output, dialect, &mut manifest, &mut log)?;
    manifest.save()?;

    let log_path = log_dir.join("xml_to_excel_log.csv");
    log.write_csv(&log_path)?;

    let errors = log.error_count();
    if errors > 0 {
        println!(
            "{} {} file(s) failed; see {}",
            "Extraction finished with errors:".yellow().bold(),
            errors,
            log_path.display()
        );
    } else {
        println!(
            "{} Log file saved to {}",
            "Process complete.".green().bold(),
            log_path.display()
        );
    }
    Ok(())
}

async fn run_load(root: &Path, loaded: &Path, log_dir: &Path) -> Result<()> {
    let config = EtlConfig::from_env()?;
    let pool = db::get_pool(&config.database_url).await?;
    let dictionary = db::load_taxonomy_dictionary(&pool, &config.taxonomy_table).await?;

    dirs::ensure_dir(loaded)?;
    let mut manifest = Manifest::load_or_default(&root.join(dirs::MANIFEST_FILE))?;
    let run_id = Uuid::new_v4();

    let outcome = load::assemble_batch(root, loaded, &dictionary, &mut manifest, run_id)?;
    manifest.save()?;

    if outcome.consolidated.is_empty() {
        println!("{}", "No data was processed or extracted.".yellow());
        return Ok(());
    }

    if let Some(path) = load::write_missing_log(log_dir, &outcome)? {
        println!("Unmatched taxonomy keys logged to {}", path.display());
    }

    match db::append_consolidated(&pool, &config.output_table, &outcome.consolidated).await {
        Ok(count) => {
            println!(
                "{} {} rows appended to '{}'",
                "Data processing completed successfully!".green().bold(),
                count,
                config.output_table
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error saving data to Postgres:".red().bold(), e);
            Err(e)
        }
    }
}
