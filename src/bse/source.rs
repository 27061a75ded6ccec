use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::bse::roster::RosterEntry;

// Hardcoded values
pub const RESULTS_URL: &str = "https://www.bseindia.com/corporates/Comp_Resultsnew.aspx";
pub const USER_AGENT: &str = "factline/0.1 (research@example.com)";

/// Fixed pause between artifacts so externally triggered page updates settle.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);
/// Bounded wait for a fetched artifact to become available on disk.
pub const ARTIFACT_TIMEOUT: Duration = Duration::from_secs(10);
const ARTIFACT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One row of the exchange's results listing for a security.
#[derive(Debug, Clone)]
pub struct ListedFiling {
    pub security_code: String,
    pub period: String,
    pub file_name: String,
    pub document_url: Url,
}

/// The exchange results page, reduced to the one question the pipeline asks
/// of it. The production implementation drives the site with a browser and
/// lives outside this crate.
#[async_trait]
pub trait ResultsSource {
    /// Quarterly result filings listed for one security code.
    async fn quarterly_filings(&self, security_code: &str) -> Result<Vec<ListedFiling>>;
}

/// Download one filing document and save it, verifying the payload is
/// well-formed XML before anything downstream sees it.
pub async fn fetch_and_save(
    client: &Client,
    url: &Url,
    filepath: &Path,
    user_agent: &str,
) -> Result<()> {
    debug!("Fetching URL: {}", url);

    let response = client
        .get(url.as_str())
        .header(reqwest::header::USER_AGENT, user_agent)
        .header(reqwest::header::ACCEPT, mime::TEXT_XML.as_ref())
        .send()
        .await?;

    debug!("Response status: {}", response.status());

    if !response.status().is_success() {
        return Err(anyhow!(
            "HTTP request failed with status: {}",
            response.status()
        ));
    }

    let body = response.bytes().await?;
    let (content, _, _) = encoding_rs::UTF_8.decode(&body);

    roxmltree::Document::parse(&content)
        .map_err(|e| anyhow!("downloaded artifact is not well-formed XML: {}", e))?;

    std::fs::write(filepath, content.as_bytes())?;
    debug!("Saved {} bytes to {:?}", content.len(), filepath);

    Ok(())
}

/// Poll until `path` exists, up to `timeout`. Timing out is a failure for
/// this one artifact only, never for the batch.
pub async fn wait_for_artifact(path: &Path, timeout: Duration) -> Result<()> {
    let mut waited = Duration::ZERO;
    while waited < timeout {
        if path.exists() {
            return Ok(());
        }
        tokio::time::sleep(ARTIFACT_POLL_INTERVAL).await;
        waited += ARTIFACT_POLL_INTERVAL;
    }
    Err(anyhow!(
        "timed out waiting for artifact: {}",
        path.display()
    ))
}

/// Download every listed filing for one roster entry into its working
/// folder, one at a time. Per-item failures are logged and skipped.
pub async fn download_filings(
    source: &dyn ResultsSource,
    client: &Client,
    entry: &RosterEntry,
    input_root: &Path,
    user_agent: &str,
) -> Result<Vec<PathBuf>> {
    let folder = input_root.join(entry.working_folder_name());
    std::fs::create_dir_all(&folder)?;

    let listings = source.quarterly_filings(&entry.security_code).await?;
    info!("{}: {} filings listed", entry.symbol, listings.len());

    let mut downloaded = Vec::new();
    for filing in listings {
        let target = folder.join(&filing.file_name);
        match fetch_and_save(client, &filing.document_url, &target, user_agent).await {
            Ok(()) => match wait_for_artifact(&target, ARTIFACT_TIMEOUT).await {
                Ok(()) => downloaded.push(target),
                Err(e) => warn!("{}: {}", filing.file_name, e),
            },
            Err(e) => warn!(
                "failed to fetch {} from {}: {}",
                filing.file_name, filing.document_url, e
            ),
        }
        tokio::time::sleep(SETTLE_DELAY).await;
    }

    Ok(downloaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bse::roster::Symbol;

    struct StubSource {
        filings: Vec<ListedFiling>,
    }

    #[async_trait]
    impl ResultsSource for StubSource {
        async fn quarterly_filings(&self, security_code: &str) -> Result<Vec<ListedFiling>> {
            Ok(self
                .filings
                .iter()
                .filter(|f| f.security_code == security_code)
                .cloned()
                .collect())
        }
    }

    fn entry() -> RosterEntry {
        RosterEntry {
            serial: 5,
            symbol: Symbol::new("ABC".to_string()).unwrap(),
            security_code: "500325".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_artifact_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("never.xml");
        let err = wait_for_artifact(&missing, Duration::from_secs(3))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_wait_for_artifact_finds_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("here.xml");
        std::fs::write(&path, "<xml/>").unwrap();
        wait_for_artifact(&path, Duration::from_secs(1)).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_filings_skips_failed_fetches() {
        let dir = tempfile::tempdir().unwrap();
        // reqwest cannot fetch file URLs, so every item fails and is skipped
        let source = StubSource {
            filings: vec![ListedFiling {
                security_code: "500325".to_string(),
                period: "Jun 2024".to_string(),
                file_name: "ABC_Jun2024.xml".to_string(),
                document_url: Url::parse("file:///nonexistent.xml").unwrap(),
            }],
        };
        let client = Client::new();
        let downloaded = download_filings(&source, &client, &entry(), dir.path(), USER_AGENT)
            .await
            .unwrap();
        assert!(downloaded.is_empty());
        assert!(dir.path().join("5_ABC").is_dir());
    }

    #[tokio::test]
    async fn test_stub_listing_filters_by_security_code() {
        let source = StubSource {
            filings: vec![ListedFiling {
                security_code: "1".to_string(),
                period: "Jun 2024".to_string(),
                file_name: "a.xml".to_string(),
                document_url: Url::parse("https://example.com/a.xml").unwrap(),
            }],
        };
        assert_eq!(source.quarterly_filings("1").await.unwrap().len(), 1);
        assert!(source.quarterly_filings("2").await.unwrap().is_empty());
    }
}
