use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Processing stage of one entity working folder. The manifest, not the
/// folder-name suffix, is the source of truth; folder moves accompany the
/// transition as side effects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum WorkStatus {
    Pending,
    Extracted,
    Loaded,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub serial: u32,
    pub symbol: String,
    pub status: WorkStatus,
    pub updated_by_run: Uuid,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    entries: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    pub fn load_or_default(path: &Path) -> Result<Self> {
        let entries = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read manifest: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse manifest: {}", path.display()))?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn mark(&mut self, folder: &str, serial: u32, symbol: &str, status: WorkStatus, run_id: Uuid) {
        self.entries.insert(
            folder.to_string(),
            ManifestEntry {
                serial,
                symbol: symbol.to_string(),
                status,
                updated_by_run: run_id,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn status(&self, folder: &str) -> Option<WorkStatus> {
        self.entries.get(folder).map(|entry| entry.status)
    }

    pub fn entries(&self) -> &BTreeMap<String, ManifestEntry> {
        &self.entries
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)
            .with_context(|| format!("failed to write manifest: {}", self.path.display()))?;
        Ok(())
    }
}
