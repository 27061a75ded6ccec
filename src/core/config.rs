use anyhow::{anyhow, Result};

use crate::bse::source;

#[derive(Clone, Debug)]
pub struct EtlConfig {
    pub database_url: String,
    pub user_agent: String,
    pub taxonomy_table: String,
    pub output_table: String,
}

impl EtlConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow!("DATABASE_URL environment variable not set"))?;

        let user_agent =
            std::env::var("USER_AGENT").unwrap_or_else(|_| source::USER_AGENT.to_string());

        let taxonomy_table =
            std::env::var("TAXONOMY_TABLE").unwrap_or_else(|_| "taxonomy_table".to_string());

        let output_table =
            std::env::var("OUTPUT_TABLE").unwrap_or_else(|_| "taxonomy_output".to_string());

        Ok(Self {
            database_url,
            user_agent,
            taxonomy_table,
            output_table,
        })
    }
}
