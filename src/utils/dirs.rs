use anyhow::Result;
use std::fs;
use std::path::Path;

// Folder-name tokens marking the processing stage of an entity's files.
// The manifest is the source of truth for progress; these names are kept
// as side effects so the on-disk layout matches the downstream tooling.
pub const PROCESSED_XMLS_SUFFIX: &str = "_XMLS_Processed";
pub const CONVERTED_TABLES_SUFFIX: &str = "_Converted_Excels";
pub const CONVERTED_TOKEN: &str = "Converted_Excels";
pub const LOADED_TOKEN: &str = "loaded";

pub const MANIFEST_FILE: &str = "manifest.json";

/// Working folder for one roster entry, e.g. serial 5 + symbol ABC -> `5_ABC`.
pub fn working_folder_name(serial: u32, symbol: &str) -> String {
    format!("{}_{}", serial, symbol)
}

/// Split `<serial>_<rest>` into its numeric serial and the remainder.
/// Returns None when the name does not carry a numeric serial prefix.
pub fn parse_working_folder_name(name: &str) -> Option<(u32, &str)> {
    let (serial, rest) = name.split_once('_')?;
    let serial = serial.parse().ok()?;
    Some((serial, rest))
}

/// Name of the folder a processed table folder is moved to once loaded.
pub fn loaded_folder_name(folder_name: &str) -> String {
    if folder_name.contains(CONVERTED_TOKEN) {
        folder_name.replace(CONVERTED_TOKEN, LOADED_TOKEN)
    } else {
        format!("{}_{}", folder_name, LOADED_TOKEN)
    }
}

/// Strip the converted-tables suffix, recovering the working folder name.
pub fn base_folder_name(folder_name: &str) -> &str {
    folder_name
        .strip_suffix(CONVERTED_TABLES_SUFFIX)
        .unwrap_or(folder_name)
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Rename, falling back to copy + remove when the rename crosses devices.
pub fn move_file(src: &Path, dst: &Path) -> Result<()> {
    if fs::rename(src, dst).is_err() {
        fs::copy(src, dst)?;
        fs::remove_file(src)?;
    }
    Ok(())
}
