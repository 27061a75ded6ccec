use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, strum::Display)]
pub enum RunStatus {
    Success,
    Error,
}

#[derive(Clone, Debug, Serialize)]
pub struct RunLogEntry {
    #[serde(rename = "Stock")]
    pub stock: String,
    #[serde(rename = "Period")]
    pub period: String,
    #[serde(rename = "Status")]
    pub status: RunStatus,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Error Line")]
    pub error_line: Option<String>,
}

/// Per-file outcome collector for one batch run. Passed by reference into
/// each processing call and written out once at the end; there is no
/// ambient global log.
#[derive(Debug)]
pub struct RunLog {
    pub run_id: Uuid,
    entries: Vec<RunLogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            entries: Vec::new(),
        }
    }

    pub fn success(&mut self, stock: &str, period: &str) {
        self.entries.push(RunLogEntry {
            stock: stock.to_string(),
            period: period.to_string(),
            status: RunStatus::Success,
            message: "Processing completed successfully.".to_string(),
            error_line: None,
        });
    }

    pub fn error(&mut self, stock: &str, period: &str, error: &anyhow::Error) {
        // the root cause stands in for the source line of the failure
        let error_line = error.chain().last().map(|cause| cause.to_string());
        self.entries.push(RunLogEntry {
            stock: stock.to_string(),
            period: period.to_string(),
            status: RunStatus::Error,
            message: error.to_string(),
            error_line,
        });
    }

    pub fn merge(&mut self, other: RunLog) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[RunLogEntry] {
        &self.entries
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == RunStatus::Error)
            .count()
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for entry in &self.entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}
